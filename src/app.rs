//! Main application logic for the viewer
//!
//! This module wires acquisition, the loader worker, the view state and the
//! document view into an egui application.

use std::path::PathBuf;
use std::time::Instant;

use egui::{CentralPanel, Context, RichText, TopBottomPanel};

use crate::acquisition::{
    acquire_from_drop, browse_action, candidate_from_prompt, pick_with_dialog, BrowseAction,
    DropOutcome, HostCapabilities, TransferPayload,
};
use crate::candidate::CandidateFile;
use crate::clipboard::{
    copy_with_fallback, ClipboardSink, CopyOutcome, CopyTarget, EguiClipboard, SystemClipboard,
};
use crate::loader::{load_candidate, LoadResult, Loader};
use crate::markdown_view::{DocumentView, ViewAction};
use crate::theme::{apply_dark_mode_visuals, ThemeColors};
use crate::viewer::{DisplaySurface, ViewState, Viewer, APP_TITLE};
use crate::window_state::{save_app_settings, save_window_state, AppSettings, WindowState};

/// Main application state
pub struct MddropApp {
    viewer: Viewer,
    view: DocumentView,
    /// Background loader; `None` means loads run inline on the UI thread.
    loader: Option<Loader>,
    caps: HostCapabilities,
    settings: AppSettings,
    clipboard: Box<dyn ClipboardSink>,
    drop_hover: bool,
    last_title: String,
}

impl MddropApp {
    /// Create the app with a loader worker. `repaint` wakes the UI when a
    /// load finishes.
    pub fn new(settings: AppSettings, caps: HostCapabilities, repaint: Option<Context>) -> Self {
        let loader = match Loader::new(repaint) {
            Ok(loader) => Some(loader),
            Err(e) => {
                log::error!("failed to start loader thread, loading inline: {e}");
                None
            }
        };
        Self::with_loader(settings, caps, loader)
    }

    /// Create the app without a worker: every load completes before the
    /// call that started it returns.
    pub fn synchronous(settings: AppSettings, caps: HostCapabilities) -> Self {
        Self::with_loader(settings, caps, None)
    }

    fn with_loader(settings: AppSettings, caps: HostCapabilities, loader: Option<Loader>) -> Self {
        let mut view = DocumentView::new();
        view.set_zoom(settings.zoom);
        Self {
            viewer: Viewer::default(),
            view,
            loader,
            caps,
            settings,
            clipboard: Box::new(SystemClipboard::new()),
            drop_hover: false,
            last_title: String::new(),
        }
    }

    /// Replace the primary clipboard.
    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    pub fn viewer_mut(&mut self) -> &mut Viewer {
        &mut self.viewer
    }

    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    pub fn is_drop_hovered(&self) -> bool {
        self.drop_hover
    }

    /// Start loading `file`, superseding any load in flight.
    pub fn open_candidate(&mut self, file: CandidateFile) {
        let job = self.viewer.begin_load(file);
        match &self.loader {
            Some(loader) => {
                if !loader.submit(job) {
                    self.viewer.submit_failed();
                }
            }
            None => {
                let outcome = load_candidate(&job.file);
                self.viewer.apply_result(LoadResult {
                    generation: job.generation,
                    outcome,
                });
            }
        }
    }

    /// Load a file named on the command line.
    pub fn open_path(&mut self, path: impl Into<PathBuf>) {
        self.open_candidate(CandidateFile::from_path(path));
    }

    /// Apply every loader result that has arrived.
    pub fn poll_loader(&mut self) {
        let Some(loader) = &self.loader else {
            return;
        };
        for result in loader.poll() {
            self.viewer.apply_result(result);
        }
    }

    /// Handle one drop gesture.
    pub fn handle_drop(&mut self, payload: &TransferPayload) {
        match acquire_from_drop(payload) {
            DropOutcome::File(file) => self.open_candidate(file),
            DropOutcome::EditorTextOnly => self.viewer.report_editor_text_drop(),
            DropOutcome::Empty => log::debug!("ignoring drop without files"),
        }
    }

    /// Click-to-browse: the native dialog when available, else the inline
    /// path prompt. Cancelling the dialog does nothing.
    pub fn browse(&mut self) {
        match browse_action(self.caps) {
            BrowseAction::NativeDialog => {
                if let Some(file) = pick_with_dialog() {
                    self.open_candidate(file);
                }
            }
            BrowseAction::PathPrompt => self.viewer.open_prompt(),
        }
    }

    /// Load whatever the path prompt holds. Blank input is ignored.
    pub fn submit_prompt(&mut self) {
        if let Some(file) = candidate_from_prompt(&self.viewer.prompt.text) {
            self.open_candidate(file);
        }
    }

    pub fn reset(&mut self) {
        self.viewer.reset();
        if let Some(loader) = &self.loader {
            loader.supersede(self.viewer.generation());
        }
    }

    /// Copy `text` and show the outcome on a toast.
    pub fn copy(&mut self, ctx: &Context, target: CopyTarget, text: &str) {
        let mut fallback = EguiClipboard::new(ctx);
        let outcome = copy_with_fallback(self.clipboard.as_mut(), &mut fallback, text);
        self.viewer.record_copy(target, outcome, Instant::now());
    }

    pub fn zoom_in(&mut self) {
        self.view.zoom_in();
        self.settings.zoom = self.view.zoom();
    }

    pub fn zoom_out(&mut self) {
        self.view.zoom_out();
        self.settings.zoom = self.view.zoom();
    }

    pub fn reset_zoom(&mut self) {
        self.view.reset_zoom();
        self.settings.zoom = self.view.zoom();
    }

    pub fn toggle_theme(&mut self, ctx: &Context) {
        self.settings.dark_mode = !self.settings.dark_mode;
        apply_dark_mode_visuals(ctx, self.settings.dark_mode);
    }

    /// Handle keyboard shortcuts
    fn handle_shortcuts(&mut self, ctx: &Context) {
        let ctrl = |key| egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, key);
        let prompt_focused = ctx.memory(|m| m.focused().is_some());

        let mut open = false;
        let mut clear = false;
        let mut zoom_in = false;
        let mut zoom_out = false;
        let mut zoom_reset = false;
        let mut fullscreen = false;
        let mut quit = false;
        ctx.input_mut(|i| {
            open = i.consume_shortcut(&ctrl(egui::Key::O));
            clear = i.consume_shortcut(&ctrl(egui::Key::W))
                || (!prompt_focused && i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));
            zoom_in = i.consume_shortcut(&ctrl(egui::Key::Plus))
                || i.consume_shortcut(&ctrl(egui::Key::Equals));
            zoom_out = i.consume_shortcut(&ctrl(egui::Key::Minus));
            zoom_reset = i.consume_shortcut(&ctrl(egui::Key::Num0));
            fullscreen = i.consume_key(egui::Modifiers::NONE, egui::Key::F11);
            quit = i.consume_shortcut(&ctrl(egui::Key::Q));
        });

        if open {
            self.browse();
        }
        if clear {
            self.reset();
        }
        if zoom_in {
            self.zoom_in();
        }
        if zoom_out {
            self.zoom_out();
        }
        if zoom_reset {
            self.reset_zoom();
        }
        if fullscreen {
            let is_fullscreen = ctx.input(|i| i.viewport().fullscreen.unwrap_or(false));
            ctx.send_viewport_cmd(egui::ViewportCommand::Fullscreen(!is_fullscreen));
        }
        if quit {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    /// Track drag hover and take this frame's drops.
    fn handle_file_drops(&mut self, ctx: &Context) {
        let (hovering, dropped) = ctx.input(|i| {
            (
                !i.raw.hovered_files.is_empty(),
                i.raw.dropped_files.clone(),
            )
        });
        self.drop_hover = hovering;
        if !dropped.is_empty() {
            self.drop_hover = false;
            let payload = TransferPayload::from_dropped_files(&dropped);
            self.handle_drop(&payload);
        }
    }

    fn update_title(&mut self, ctx: &Context) {
        let title = self.viewer.title();
        if title != self.last_title {
            ctx.send_viewport_cmd(egui::ViewportCommand::Title(title.clone()));
            self.last_title = title;
        }
    }

    /// Header bar of the displaying layout.
    fn render_header(&mut self, ctx: &Context) {
        let mut open = false;
        let mut clear = false;
        let mut copy_html = false;
        TopBottomPanel::top("header_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(file) = self.viewer.selected() {
                    ui.label(RichText::new(format!("📄 {}", file.name)).strong());
                    ui.label(
                        RichText::new(format_size(file.size))
                            .color(ThemeColors::current(ui.visuals().dark_mode).status_hint),
                    );
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    clear = ui.button("✖ Clear").on_hover_text("Ctrl+W").clicked();
                    open = ui.button("📁 Open…").on_hover_text("Ctrl+O").clicked();
                    if self.viewer.html().is_some() {
                        copy_html = ui.button("Copy HTML").clicked();
                    }
                });
            });
        });

        if copy_html {
            if let Some(html) = self.viewer.html().map(str::to_owned) {
                self.copy(ctx, CopyTarget::Html, &html);
            }
        }
        if open {
            self.browse();
        }
        if clear {
            self.reset();
        }
    }

    /// Render the status bar
    fn render_status_bar(&mut self, ctx: &Context) {
        let mut toggle_theme = false;
        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            let colors = ThemeColors::current(ui.visuals().dark_mode);
            ui.horizontal(|ui| {
                match self.viewer.loading() {
                    Some(name) => {
                        ui.spinner();
                        ui.label(format!("Loading {name}…"));
                    }
                    None => {
                        ui.label(
                            RichText::new("Drop a Markdown file anywhere, or press Ctrl+O")
                                .color(colors.status_hint),
                        );
                    }
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let icon = if self.settings.dark_mode { "☀" } else { "🌙" };
                    toggle_theme = ui.small_button(icon).on_hover_text("Toggle theme").clicked();
                    ui.label(format!("{:.0}%", self.view.zoom() * 100.0));
                });
            });
        });
        if toggle_theme {
            self.toggle_theme(ctx);
        }
    }

    /// Idle layout: the drop zone and, when needed, the path prompt.
    fn render_drop_zone(&mut self, ui: &mut egui::Ui) {
        let colors = ThemeColors::current(ui.visuals().dark_mode);
        let (fill, border) = colors.drop_zone(self.drop_hover);
        let mut browse = false;
        let mut submit = false;

        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            let size = egui::vec2(ui.available_width().min(560.0), 220.0);
            let (rect, response) = ui.allocate_exact_size(size, egui::Sense::click());
            let painter = ui.painter();
            painter.rect(rect, 12.0, fill, egui::Stroke::new(2.0, border));
            let text = if self.drop_hover {
                "Release to open"
            } else {
                "Drop a Markdown file here\nor click to browse"
            };
            painter.text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                text,
                egui::FontId::proportional(20.0),
                colors.drop_zone_text,
            );
            browse = response
                .on_hover_cursor(egui::CursorIcon::PointingHand)
                .clicked();

            ui.add_space(12.0);
            ui.label(RichText::new(".md and .markdown files are supported").color(colors.status_hint));

            if self.viewer.prompt.visible {
                ui.add_space(16.0);
                ui.label("Path to a Markdown file:");
                ui.horizontal(|ui| {
                    let edit = ui.add(
                        egui::TextEdit::singleline(&mut self.viewer.prompt.text)
                            .hint_text("/path/to/notes.md")
                            .desired_width(420.0),
                    );
                    let entered = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    submit = ui.button("Open").clicked() || entered;
                });
            }
        });

        if browse {
            self.browse();
        }
        if submit {
            self.submit_prompt();
        }
    }

    /// Displaying layout: the rendered document or the render-failed
    /// placeholder.
    fn render_document(&mut self, ui: &mut egui::Ui, ctx: &Context) {
        let now = Instant::now();
        let toast = self.viewer.toast(now).cloned();
        let mut scroll = egui::ScrollArea::vertical()
            .id_source("document_scroll")
            .auto_shrink([false, false]);
        if self.viewer.take_scroll_to_top() {
            scroll = scroll.vertical_scroll_offset(0.0);
        }

        let mut action = None;
        scroll.show(ui, |ui| match self.viewer.surface() {
            DisplaySurface::Document(doc) => {
                action = self.view.render_to_ui(ui, &doc.blocks, toast.as_ref());
            }
            DisplaySurface::RenderFailed(reason) => {
                let colors = ThemeColors::current(ui.visuals().dark_mode);
                ui.add_space(24.0);
                ui.colored_label(
                    colors.alert_error,
                    RichText::new("⚠ This file could not be rendered.").size(18.0),
                );
                ui.label(reason.as_str());
            }
            DisplaySurface::Empty => {}
        });

        if let Some(ViewAction::CopyCode { block, text }) = action {
            self.copy(ctx, CopyTarget::CodeBlock(block), &text);
        }
    }

    fn render_alert(&mut self, ctx: &Context) {
        let Some(alert) = self.viewer.alert() else {
            return;
        };
        let colors = ThemeColors::current(ctx.style().visuals.dark_mode);
        let (title, color) = if alert.is_advisory() {
            ("Nothing to open", colors.alert_info)
        } else {
            ("Cannot open file", colors.alert_error)
        };
        let mut dismiss = false;
        egui::Window::new(title)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.colored_label(color, alert.message());
                ui.add_space(8.0);
                dismiss = ui.button("OK").clicked();
            });
        if dismiss {
            self.viewer.dismiss_alert();
        }
    }

    fn render_toast(&mut self, ctx: &Context) {
        let now = Instant::now();
        let Some(toast) = self.viewer.toast(now).cloned() else {
            return;
        };
        let colors = ThemeColors::current(ctx.style().visuals.dark_mode);
        let color = match toast.outcome {
            CopyOutcome::Copied => colors.toast_ok,
            CopyOutcome::Failed => colors.toast_failed,
        };
        egui::Area::new(egui::Id::new("copy_toast"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-16.0, -40.0])
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.colored_label(color, toast.message());
                });
            });
        if let Some(left) = toast.remaining(now) {
            ctx.request_repaint_after(left);
        }
    }

    /// Save window geometry and settings.
    fn persist(&self, ctx: &Context) {
        let (outer, inner, maximized) = ctx.input(|i| {
            let vp = i.viewport();
            (vp.outer_rect, vp.inner_rect, vp.maximized.unwrap_or(false))
        });
        if let (Some(outer), Some(inner)) = (outer, inner) {
            let state = WindowState {
                pos: [outer.min.x, outer.min.y],
                size: [inner.width(), inner.height()],
                maximized,
            };
            if let Err(e) = save_window_state(&state) {
                log::warn!("failed to save window state: {e}");
            }
        }
        if let Err(e) = save_app_settings(&self.settings) {
            log::warn!("failed to save settings: {e}");
        }
    }
}

impl eframe::App for MddropApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        self.poll_loader();
        self.handle_file_drops(ctx);
        self.handle_shortcuts(ctx);

        if self.viewer.state() == ViewState::Displaying {
            self.render_header(ctx);
        }
        self.render_status_bar(ctx);

        CentralPanel::default().show(ctx, |ui| match self.viewer.state() {
            ViewState::Idle => self.render_drop_zone(ui),
            ViewState::Displaying => self.render_document(ui, ctx),
        });

        self.render_alert(ctx);
        self.render_toast(ctx);
        self.update_title(ctx);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.persist(ctx);
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KIB {
        format!("{bytes} B")
    } else if b < KIB * KIB {
        format!("{:.1} KiB", b / KIB)
    } else {
        format!("{:.1} MiB", b / (KIB * KIB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{FileEntry, TransferItem};
    use crate::clipboard::ClipboardError;
    use crate::viewer::Alert;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    fn no_dialog() -> HostCapabilities {
        HostCapabilities {
            native_dialog: false,
        }
    }

    fn app() -> MddropApp {
        MddropApp::synchronous(AppSettings::default(), no_dialog())
    }

    fn drop_bytes(name: &str, body: &str) -> TransferPayload {
        TransferPayload {
            items: vec![TransferItem::File(FileEntry {
                name: Some(name.into()),
                path: None,
                bytes: Some(Arc::from(body.as_bytes())),
            })],
            files: Vec::new(),
        }
    }

    #[derive(Clone, Default)]
    struct RecordingClipboard(Arc<Mutex<Vec<String>>>);

    impl ClipboardSink for RecordingClipboard {
        fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.0
                .lock()
                .map_err(|_| ClipboardError::Write("poisoned".into()))?
                .push(text.to_string());
            Ok(())
        }
    }

    #[test]
    fn test_app_starts_idle() {
        let app = app();
        assert_eq!(app.viewer().state(), ViewState::Idle);
        assert!(!app.is_drop_hovered());
        assert_eq!(app.viewer().title(), APP_TITLE);
    }

    #[test]
    fn test_drop_markdown_displays() {
        let mut app = app();
        app.handle_drop(&drop_bytes("notes.md", "# Notes\n\nbody"));
        assert_eq!(app.viewer().state(), ViewState::Displaying);
        assert_eq!(app.viewer().title(), "mddrop - notes.md");
    }

    #[test]
    fn test_drop_unsupported_alerts_and_stays_idle() {
        let mut app = app();
        app.handle_drop(&drop_bytes("photo.jpg", "\u{1}\u{2}binary"));
        assert_eq!(app.viewer().state(), ViewState::Idle);
        assert_eq!(app.viewer().alert(), Some(Alert::Unsupported));
    }

    #[test]
    fn test_editor_text_drop_alerts() {
        let mut app = app();
        app.handle_drop(&TransferPayload {
            items: vec![TransferItem::Text("/home/me/a.md".into())],
            files: Vec::new(),
        });
        assert_eq!(app.viewer().alert(), Some(Alert::EditorTextOnly));
        assert_eq!(app.viewer().state(), ViewState::Idle);
    }

    #[test]
    fn test_browse_without_dialog_opens_prompt() -> anyhow::Result<()> {
        let mut app = app();
        app.browse();
        assert!(app.viewer().prompt.visible);

        let mut temp = tempfile::Builder::new().suffix(".markdown").tempfile()?;
        temp.write_all(b"- one\n- two\n")?;
        temp.flush()?;
        app.viewer_mut().prompt.text = format!("  {}  ", temp.path().display());
        app.submit_prompt();
        assert_eq!(app.viewer().state(), ViewState::Displaying);
        assert!(!app.viewer().prompt.visible);
        Ok(())
    }

    #[test]
    fn test_blank_prompt_is_ignored() {
        let mut app = app();
        app.browse();
        app.submit_prompt();
        assert_eq!(app.viewer().state(), ViewState::Idle);
        assert!(app.viewer().alert().is_none());
    }

    #[test]
    fn test_open_path_missing_file_alerts() {
        let mut app = app();
        app.open_path("/nonexistent/dir/file.md");
        assert_eq!(app.viewer().alert(), Some(Alert::ReadFailed));
        assert_eq!(app.viewer().state(), ViewState::Idle);
    }

    #[test]
    fn test_open_path_and_reset() -> anyhow::Result<()> {
        let mut app = app();
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("README");
        std::fs::write(&path, "plain words")?;

        app.open_path(&path);
        assert_eq!(app.viewer().state(), ViewState::Displaying);
        assert_eq!(app.viewer().title(), "mddrop - README");

        app.reset();
        app.reset();
        assert_eq!(app.viewer().state(), ViewState::Idle);
        assert!(app.viewer().selected().is_none());
        Ok(())
    }

    #[test]
    fn test_copy_uses_primary_clipboard() {
        let ctx = egui::Context::default();
        let recorder = RecordingClipboard::default();
        let mut app = app().with_clipboard(Box::new(recorder.clone()));
        app.handle_drop(&drop_bytes("c.md", "```\nlet x = 1;\n```\n"));

        app.copy(&ctx, CopyTarget::CodeBlock(0), "let x = 1;\n");
        let toast = app.viewer_mut().toast(Instant::now()).cloned().expect("toast");
        assert_eq!(toast.outcome, CopyOutcome::Copied);
        assert_eq!(toast.target, CopyTarget::CodeBlock(0));
        assert_eq!(
            recorder.0.lock().expect("lock").as_slice(),
            ["let x = 1;\n".to_string()]
        );
    }

    #[test]
    fn test_zoom_updates_settings() {
        let mut app = app();
        app.zoom_in();
        assert!(app.settings().zoom > 1.0);
        app.reset_zoom();
        assert_eq!(app.settings().zoom, 1.0);
        app.zoom_out();
        assert!(app.settings().zoom < 1.0);
    }

    #[test]
    fn test_worker_backed_load() -> anyhow::Result<()> {
        let mut app = MddropApp::new(AppSettings::default(), no_dialog(), None);
        app.handle_drop(&drop_bytes("w.md", "# Worker"));
        assert_eq!(app.viewer().loading(), Some("w.md"));

        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while app.viewer().state() != ViewState::Displaying {
            anyhow::ensure!(Instant::now() < deadline, "worker never answered");
            app.poll_loader();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        assert!(app.viewer().loading().is_none());
        Ok(())
    }

    fn settle(app: &mut MddropApp, done: impl Fn(&Viewer) -> bool) -> anyhow::Result<()> {
        let deadline = Instant::now() + std::time::Duration::from_secs(5);
        while !done(app.viewer()) {
            anyhow::ensure!(Instant::now() < deadline, "worker never answered");
            app.poll_loader();
            std::thread::sleep(std::time::Duration::from_millis(10));
        }
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_slow_read_does_not_refuse_later_acquisitions() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let fifo = dir.path().join("slow.md");
        let status = std::process::Command::new("mkfifo").arg(&fifo).status()?;
        anyhow::ensure!(status.success(), "mkfifo failed");

        let mut app = MddropApp::new(AppSettings::default(), no_dialog(), None);
        app.open_path(&fifo);
        std::thread::sleep(std::time::Duration::from_millis(100));
        for i in 0..4 {
            app.handle_drop(&drop_bytes(&format!("stale{i}.md"), "# stale"));
        }
        app.handle_drop(&drop_bytes("good.md", "# good"));
        assert!(app.viewer().alert().is_none());
        assert_eq!(app.viewer().loading(), Some("good.md"));

        let writer = fifo.clone();
        std::thread::spawn(move || {
            if let Ok(mut pipe) = std::fs::OpenOptions::new().write(true).open(&writer) {
                let _ = pipe.write_all(b"# slow\n");
            }
        });

        settle(&mut app, |viewer| viewer.state() == ViewState::Displaying)?;
        assert!(app.viewer().alert().is_none());
        assert_eq!(
            app.viewer().selected().map(|f| f.name.as_str()),
            Some("good.md")
        );
        Ok(())
    }

    #[test]
    fn test_reset_abandons_worker_load() -> anyhow::Result<()> {
        let mut app = MddropApp::new(AppSettings::default(), no_dialog(), None);
        app.handle_drop(&drop_bytes("gone.md", "# gone"));
        app.reset();
        assert!(app.viewer().loading().is_none());

        app.handle_drop(&drop_bytes("kept.md", "# kept"));
        settle(&mut app, |viewer| viewer.state() == ViewState::Displaying)?;
        assert_eq!(
            app.viewer().selected().map(|f| f.name.as_str()),
            Some("kept.md")
        );
        Ok(())
    }

    #[test]
    fn test_hover_highlight_and_egui_drop() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("dragged.md");
        std::fs::write(&path, "# Dragged\n")?;

        let ctx = egui::Context::default();
        let mut app = app();

        ctx.begin_frame(egui::RawInput {
            hovered_files: vec![egui::HoveredFile {
                path: Some(path.clone()),
                ..Default::default()
            }],
            ..Default::default()
        });
        app.handle_file_drops(&ctx);
        let _ = ctx.end_frame();
        assert!(app.is_drop_hovered());

        // Hovering ends without a drop.
        ctx.begin_frame(egui::RawInput::default());
        app.handle_file_drops(&ctx);
        let _ = ctx.end_frame();
        assert!(!app.is_drop_hovered());
        assert_eq!(app.viewer().state(), ViewState::Idle);

        ctx.begin_frame(egui::RawInput {
            hovered_files: vec![egui::HoveredFile {
                path: Some(path.clone()),
                ..Default::default()
            }],
            ..Default::default()
        });
        app.handle_file_drops(&ctx);
        let _ = ctx.end_frame();
        assert!(app.is_drop_hovered());

        ctx.begin_frame(egui::RawInput {
            hovered_files: vec![egui::HoveredFile {
                path: Some(path.clone()),
                ..Default::default()
            }],
            dropped_files: vec![egui::DroppedFile {
                path: Some(path),
                name: "dragged.md".into(),
                ..Default::default()
            }],
            ..Default::default()
        });
        app.handle_file_drops(&ctx);
        let _ = ctx.end_frame();

        assert!(!app.is_drop_hovered());
        assert_eq!(app.viewer().state(), ViewState::Displaying);
        assert_eq!(app.viewer().title(), "mddrop - dragged.md");
        Ok(())
    }

    #[test]
    fn test_unsupported_egui_drop_still_clears_highlight() -> anyhow::Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("photo.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n")?;

        let ctx = egui::Context::default();
        let mut app = app();
        ctx.begin_frame(egui::RawInput {
            hovered_files: vec![egui::HoveredFile {
                path: Some(path.clone()),
                ..Default::default()
            }],
            dropped_files: vec![egui::DroppedFile {
                path: Some(path),
                ..Default::default()
            }],
            ..Default::default()
        });
        app.handle_file_drops(&ctx);
        let _ = ctx.end_frame();

        assert!(!app.is_drop_hovered());
        assert_eq!(app.viewer().alert(), Some(Alert::Unsupported));
        Ok(())
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
    }
}
