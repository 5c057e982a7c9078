use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Access state of a granted directory in the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    Prompt,
}

impl PermissionState {
    /// Stored column value.
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionState::Granted => "granted",
            PermissionState::Denied => "denied",
            PermissionState::Prompt => "prompt",
        }
    }

    /// Parse a stored column value, treating unknown values as needing a prompt.
    pub fn from_str_lossy(value: &str) -> Self {
        match value {
            "granted" => PermissionState::Granted,
            "denied" => PermissionState::Denied,
            _ => PermissionState::Prompt,
        }
    }
}

/// Boundary to whatever grants directory access: a picker dialog, CLI
/// arguments, or a test double.
pub trait DirectoryAccess {
    /// Ask the user for a directory. `None` means the dialog was dismissed.
    fn pick_directory(&mut self) -> Option<PathBuf>;

    /// Check access to a previously granted root without prompting.
    fn query_permission(&self, root: &Path) -> PermissionState;

    /// Prompt again for access to a previously granted root.
    fn request_permission(&mut self, root: &Path) -> PermissionState {
        self.query_permission(root)
    }
}

/// Filesystem-backed access: a root is granted while it is a readable directory.
#[derive(Debug, Default)]
pub struct FsAccess {
    pending_pick: Option<PathBuf>,
}

impl FsAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Access that answers the next picker request with `path`.
    pub fn with_pick(path: impl Into<PathBuf>) -> Self {
        Self {
            pending_pick: Some(path.into()),
        }
    }

    /// Queue the answer for the next picker request.
    pub fn set_pick(&mut self, path: impl Into<PathBuf>) {
        self.pending_pick = Some(path.into());
    }
}

impl DirectoryAccess for FsAccess {
    fn pick_directory(&mut self) -> Option<PathBuf> {
        self.pending_pick.take()
    }

    fn query_permission(&self, root: &Path) -> PermissionState {
        if !root.is_dir() {
            return PermissionState::Denied;
        }
        match std::fs::read_dir(root) {
            Ok(_) => PermissionState::Granted,
            Err(err) if err.kind() == std::io::ErrorKind::PermissionDenied => {
                PermissionState::Denied
            }
            Err(_) => PermissionState::Prompt,
        }
    }
}
