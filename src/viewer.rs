//! View state of the single document window.
//!
//! `Viewer` owns everything the UI draws from: the idle/displaying state,
//! the display surface, the selected-file readout, the transient alert,
//! the path prompt and the copy toast. All of it is touched only from the
//! UI thread; the loader feeds it `LoadResult`s.

use std::time::Instant;

use crate::candidate::CandidateFile;
use crate::clipboard::{prune_toast, CopyOutcome, CopyTarget, CopyToast};
use crate::loader::{LoadJob, LoadOutcome, LoadResult};
use crate::render::{HtmlRenderer, RenderError, RenderedDocument, Renderer};

pub const APP_TITLE: &str = "mddrop";

pub const UNSUPPORTED_MESSAGE: &str = "Please choose a Markdown file (.md or .markdown)";
pub const READ_FAILED_MESSAGE: &str = "Failed to read the file, please try again.";
pub const EDITOR_TEXT_MESSAGE: &str = "That drop only carried text, not a file. \
Drag the file from your file manager, or click to browse for it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    #[default]
    Idle,
    Displaying,
}

/// What the content area shows.
#[derive(Debug, Clone, Default)]
pub enum DisplaySurface {
    #[default]
    Empty,
    Document(RenderedDocument),
    /// The render attempt failed; the string is shown inside the
    /// placeholder.
    RenderFailed(String),
}

/// A transient message shown over the current layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alert {
    Unsupported,
    ReadFailed,
    EditorTextOnly,
}

impl Alert {
    pub fn message(self) -> &'static str {
        match self {
            Alert::Unsupported => UNSUPPORTED_MESSAGE,
            Alert::ReadFailed => READ_FAILED_MESSAGE,
            Alert::EditorTextOnly => EDITOR_TEXT_MESSAGE,
        }
    }

    /// Advisories are informational, the rest are errors.
    pub fn is_advisory(self) -> bool {
        matches!(self, Alert::EditorTextOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
}

/// The inline path prompt used when no native dialog is available.
#[derive(Debug, Clone, Default)]
pub struct PathPrompt {
    pub visible: bool,
    pub text: String,
}

pub struct Viewer {
    renderer: Option<Box<dyn Renderer>>,
    state: ViewState,
    surface: DisplaySurface,
    selected: Option<SelectedFile>,
    alert: Option<Alert>,
    generation: u64,
    /// Name of the file whose load is in flight.
    loading: Option<String>,
    pub prompt: PathPrompt,
    scroll_to_top: bool,
    toast: Option<CopyToast>,
}

impl Default for Viewer {
    fn default() -> Self {
        Self::new(Some(Box::new(HtmlRenderer::default())))
    }
}

impl Viewer {
    /// `renderer` may be absent; loads then end in the render-failed
    /// placeholder.
    pub fn new(renderer: Option<Box<dyn Renderer>>) -> Self {
        Self {
            renderer,
            state: ViewState::Idle,
            surface: DisplaySurface::Empty,
            selected: None,
            alert: None,
            generation: 0,
            loading: None,
            prompt: PathPrompt::default(),
            scroll_to_top: false,
            toast: None,
        }
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    pub fn surface(&self) -> &DisplaySurface {
        &self.surface
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn alert(&self) -> Option<Alert> {
        self.alert
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    pub fn loading(&self) -> Option<&str> {
        self.loading.as_deref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// HTML of the displayed document, if any.
    pub fn html(&self) -> Option<&str> {
        match &self.surface {
            DisplaySurface::Document(doc) => Some(&doc.html),
            _ => None,
        }
    }

    pub fn title(&self) -> String {
        match &self.selected {
            Some(file) => format!("{APP_TITLE} - {}", file.name),
            None => APP_TITLE.to_string(),
        }
    }

    /// Start a new acquisition. Any earlier load still in flight is
    /// superseded.
    pub fn begin_load(&mut self, file: CandidateFile) -> LoadJob {
        self.generation += 1;
        self.loading = Some(file.display_name().to_string());
        self.alert = None;
        log::info!(
            "loading {} (generation {})",
            file.display_name(),
            self.generation
        );
        LoadJob {
            generation: self.generation,
            file,
        }
    }

    /// The job for the current generation never reached the worker.
    pub fn submit_failed(&mut self) {
        self.loading = None;
        self.alert = Some(Alert::ReadFailed);
    }

    /// Apply a loader result. Results from superseded generations are
    /// discarded; returns whether the result was applied.
    pub fn apply_result(&mut self, result: LoadResult) -> bool {
        if result.generation != self.generation {
            log::debug!(
                "discarding stale result for generation {} (current {})",
                result.generation,
                self.generation
            );
            return false;
        }
        self.loading = None;
        match result.outcome {
            LoadOutcome::Loaded { name, size, text } => self.display(name, size, &text),
            LoadOutcome::Rejected { .. } => self.alert = Some(Alert::Unsupported),
            LoadOutcome::ReadFailed { .. } => self.alert = Some(Alert::ReadFailed),
        }
        true
    }

    /// Render `text` and switch to the displaying layout. A failed render
    /// still switches, showing the failure in place of the document.
    pub fn display(&mut self, name: String, size: u64, text: &str) {
        let rendered = match &self.renderer {
            Some(renderer) => renderer.render(text),
            None => Err(RenderError::Unavailable),
        };
        self.surface = match rendered {
            Ok(doc) => DisplaySurface::Document(doc),
            Err(err) => {
                log::error!("rendering {name} failed: {err}");
                DisplaySurface::RenderFailed(err.to_string())
            }
        };
        self.selected = Some(SelectedFile { name, size });
        self.state = ViewState::Displaying;
        self.prompt = PathPrompt::default();
        self.toast = None;
        self.scroll_to_top = true;
    }

    /// Drop the document and go back to the idle layout. Loads still in
    /// flight are abandoned. Calling it twice is the same as once.
    pub fn reset(&mut self) {
        if self.loading.take().is_some() {
            self.generation += 1;
        }
        self.surface = DisplaySurface::Empty;
        self.state = ViewState::Idle;
        self.selected = None;
        self.prompt.text.clear();
        self.toast = None;
        self.scroll_to_top = true;
    }

    pub fn report_editor_text_drop(&mut self) {
        self.alert = Some(Alert::EditorTextOnly);
    }

    /// Show the inline path prompt.
    pub fn open_prompt(&mut self) {
        self.prompt.visible = true;
    }

    /// Consumed by the UI to scroll the content view back to the top.
    pub fn take_scroll_to_top(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_top)
    }

    /// Record a copy click, replacing any running toast.
    pub fn record_copy(&mut self, target: CopyTarget, outcome: CopyOutcome, now: Instant) {
        self.toast = Some(CopyToast::new(target, outcome, now));
    }

    /// The live toast at `now`, if any. Expired toasts are dropped.
    pub fn toast(&mut self, now: Instant) -> Option<&CopyToast> {
        prune_toast(&mut self.toast, now);
        self.toast.as_ref()
    }
}
