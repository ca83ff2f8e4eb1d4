//! Turning user gestures into at most one candidate file.
//!
//! Drops arrive as a `TransferPayload` with two views of the same gesture:
//! an ordered item list (files and text hints) and a flat file list. Drag
//! sources fill these inconsistently, so both are consulted. The file
//! dialog and the inline path prompt each yield a candidate directly.

use std::path::PathBuf;

use rfd::FileDialog;

use crate::candidate::CandidateFile;

/// One entry of a drop's item list.
#[derive(Debug, Clone)]
pub enum TransferItem {
    File(FileEntry),
    /// A text hint, usually a path or URI exported by an editor.
    Text(String),
}

/// A file-kind item that still has to be turned into a handle.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub bytes: Option<std::sync::Arc<[u8]>>,
}

impl FileEntry {
    /// Bytes carried inline win over a path; an entry with neither cannot
    /// be materialized.
    pub fn materialize(&self) -> Option<CandidateFile> {
        if let Some(bytes) = &self.bytes {
            let name = self.name.clone().or_else(|| {
                self.path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
            });
            return Some(CandidateFile::from_bytes(name, bytes.clone()));
        }
        self.path.as_ref().map(CandidateFile::from_path)
    }
}

/// Everything a single drop delivered.
#[derive(Debug, Clone, Default)]
pub struct TransferPayload {
    pub items: Vec<TransferItem>,
    pub files: Vec<CandidateFile>,
}

impl TransferPayload {
    /// Build a payload from the files egui reports for this frame.
    ///
    /// Entries with a path or bytes become file items (and flat files);
    /// entries with neither but a name are text hints.
    pub fn from_dropped_files(dropped: &[egui::DroppedFile]) -> Self {
        let mut payload = Self::default();
        for file in dropped {
            let name = (!file.name.is_empty()).then(|| file.name.clone());
            if file.path.is_none() && file.bytes.is_none() {
                if let Some(hint) = name {
                    payload.items.push(TransferItem::Text(hint));
                }
                continue;
            }
            let entry = FileEntry {
                name,
                path: file.path.clone(),
                bytes: file.bytes.clone(),
            };
            if let Some(candidate) = entry.materialize() {
                payload.files.push(candidate);
            }
            payload.items.push(TransferItem::File(entry));
        }
        payload
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.files.is_empty()
    }
}

/// Result of inspecting a drop.
#[derive(Debug, Clone)]
pub enum DropOutcome {
    File(CandidateFile),
    /// Only text hints arrived, no file at all.
    EditorTextOnly,
    Empty,
}

/// Pick the file a drop refers to. Item-list files take priority over the
/// flat list; a payload holding nothing but text hints is reported
/// separately so the user can be told why nothing opened.
pub fn acquire_from_drop(payload: &TransferPayload) -> DropOutcome {
    let found = payload.items.iter().find_map(|item| match item {
        TransferItem::File(entry) => entry.materialize(),
        TransferItem::Text(_) => None,
    });
    if let Some(file) = found {
        return DropOutcome::File(file);
    }
    if let Some(file) = payload.files.first() {
        return DropOutcome::File(file.clone());
    }

    let has_text = payload
        .items
        .iter()
        .any(|item| matches!(item, TransferItem::Text(_)));
    let has_file_items = payload
        .items
        .iter()
        .any(|item| matches!(item, TransferItem::File(_)));
    if has_text && !has_file_items {
        log::info!("drop carried only text hints, no file");
        DropOutcome::EditorTextOnly
    } else {
        DropOutcome::Empty
    }
}

/// How click-to-browse can reach the user's files on this host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// A native file dialog can be shown. Without it the inline path
    /// prompt is used.
    pub native_dialog: bool,
}

impl HostCapabilities {
    /// Probe once at startup. `allow_native` carries the user's preference
    /// from settings or the command line.
    pub fn probe(allow_native: bool) -> Self {
        let caps = Self {
            native_dialog: allow_native && display_server_present(),
        };
        log::debug!("host capabilities: {caps:?}");
        caps
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
fn display_server_present() -> bool {
    std::env::var_os("WAYLAND_DISPLAY").is_some() || std::env::var_os("DISPLAY").is_some()
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
fn display_server_present() -> bool {
    true
}

/// What click-to-browse should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseAction {
    /// Show the native dialog now.
    NativeDialog,
    /// Reveal the inline path prompt.
    PathPrompt,
}

pub fn browse_action(caps: HostCapabilities) -> BrowseAction {
    if caps.native_dialog {
        BrowseAction::NativeDialog
    } else {
        BrowseAction::PathPrompt
    }
}

/// Show the native file dialog. Cancelling returns `None`.
pub fn pick_with_dialog() -> Option<CandidateFile> {
    FileDialog::new()
        .add_filter("Markdown files", &["md", "markdown"])
        .add_filter("All files", &["*"])
        .set_title("Open Markdown File")
        .pick_file()
        .map(CandidateFile::from_path)
}

/// Resolve the text typed into the path prompt. Surrounding whitespace and
/// quotes (as pasted from a shell or explorer) are ignored; blank input is
/// treated as a cancel.
pub fn candidate_from_prompt(input: &str) -> Option<CandidateFile> {
    let trimmed = input.trim().trim_matches(|c| c == '"' || c == '\'');
    if trimmed.is_empty() {
        return None;
    }
    let path = trimmed.strip_prefix("file://").unwrap_or(trimmed);
    Some(CandidateFile::from_path(path))
}
