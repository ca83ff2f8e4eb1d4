//! Drag-and-drop Markdown viewer built with Rust and egui.
//!
//! A file arrives by drag-and-drop, the native file dialog or an inline
//! path prompt, passes an acceptance heuristic, is read on a background
//! worker, rendered with `pulldown-cmark` and shown in a single window with
//! a reset action.

pub mod acceptance;
pub mod acquisition;
pub mod app;
pub mod candidate;
pub mod clipboard;
pub mod loader;
pub mod markdown_view;
pub mod render;
pub mod theme;
pub mod viewer;
pub mod window_state;

pub use acceptance::{accept, AcceptError, Acceptance};
pub use acquisition::{
    acquire_from_drop, DropOutcome, FileEntry, HostCapabilities, TransferItem, TransferPayload,
};
pub use app::MddropApp;
pub use candidate::{CandidateFile, FileSource, ReadError};
pub use loader::{load_candidate, LoadJob, LoadOutcome, LoadResult, Loader};
pub use markdown_view::{DocumentView, InlineSpan, MarkdownElement};
pub use render::{HtmlRenderer, RenderError, RenderOptions, RenderedDocument, Renderer};
pub use theme::{apply_dark_mode_visuals, ThemeColors};
pub use viewer::{Alert, DisplaySurface, ViewState, Viewer, APP_TITLE};
pub use window_state::{
    load_app_settings, load_window_state, sanitize_window_state, save_app_settings,
    save_window_state, AppSettings, WindowState,
};
