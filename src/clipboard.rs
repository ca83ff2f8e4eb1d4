//! Copy-to-clipboard for code blocks and the rendered HTML.
//!
//! The OS clipboard (`arboard`) is tried first; when it is unavailable or
//! refuses the write, the text goes out through egui's platform output
//! instead. The outcome is reported with a short-lived toast.

use std::time::{Duration, Instant};

/// How long a copy toast stays visible.
pub const TOAST_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("clipboard write failed: {0}")]
    Write(String),
}

/// Somewhere copied text can go.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The OS clipboard. The handle is opened on first use and kept.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.inner.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            self.inner = Some(clipboard);
        }
        match self.inner.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_owned())
                .map_err(|e| ClipboardError::Write(e.to_string())),
            None => Err(ClipboardError::Unavailable("no clipboard handle".into())),
        }
    }
}

/// egui's platform output; the integration hands the text to the host at
/// the end of the frame.
pub struct EguiClipboard<'a> {
    ctx: &'a egui::Context,
}

impl<'a> EguiClipboard<'a> {
    pub fn new(ctx: &'a egui::Context) -> Self {
        Self { ctx }
    }
}

impl ClipboardSink for EguiClipboard<'_> {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.ctx.output_mut(|o| o.copied_text = text.to_owned());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Failed,
}

/// What the user asked to copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyTarget {
    /// Code block by document order.
    CodeBlock(usize),
    /// The whole rendered HTML.
    Html,
}

/// Copy `text` to `primary`, falling back to `fallback` on error.
pub fn copy_with_fallback(
    primary: &mut dyn ClipboardSink,
    fallback: &mut dyn ClipboardSink,
    text: &str,
) -> CopyOutcome {
    match primary.set_text(text) {
        Ok(()) => CopyOutcome::Copied,
        Err(err) => {
            log::debug!("primary clipboard failed ({err}), using fallback");
            match fallback.set_text(text) {
                Ok(()) => CopyOutcome::Copied,
                Err(err) => {
                    log::warn!("copy failed: {err}");
                    CopyOutcome::Failed
                }
            }
        }
    }
}

/// Feedback for the most recent copy click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyToast {
    pub target: CopyTarget,
    pub outcome: CopyOutcome,
    pub shown_at: Instant,
}

impl CopyToast {
    pub fn new(target: CopyTarget, outcome: CopyOutcome, now: Instant) -> Self {
        Self {
            target,
            outcome,
            shown_at: now,
        }
    }

    pub fn message(&self) -> &'static str {
        match self.outcome {
            CopyOutcome::Copied => "Copied to clipboard",
            CopyOutcome::Failed => "Copy failed",
        }
    }

    /// Time left before the toast disappears, `None` once expired.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.shown_at);
        TOAST_DURATION
            .checked_sub(elapsed)
            .filter(|left| !left.is_zero())
    }

    pub fn is_live(&self, now: Instant) -> bool {
        self.remaining(now).is_some()
    }
}

/// Drop an expired toast from `slot`.
pub fn prune_toast(slot: &mut Option<CopyToast>, now: Instant) {
    if slot.as_ref().is_some_and(|toast| !toast.is_live(now)) {
        *slot = None;
    }
}
