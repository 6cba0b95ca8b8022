use serde::{Deserialize, Serialize};

/// Files larger than this are reported with a truncated body.
pub const MAX_FILE_DIFF_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub before: Option<String>,
    pub after: Option<String>,
    pub binary: bool,
    pub truncated: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DiffStats {
    pub files: usize,
    pub additions: usize,
    pub deletions: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDiff {
    pub unified_text: String,
    pub files: Vec<FileChange>,
    pub stats: DiffStats,
}

impl WorkspaceDiff {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
