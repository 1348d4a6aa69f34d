use serde::{Deserialize, Serialize};

/// Lifecycle state of a remote task.
///
/// `Pending -> Processing -> {Completed, Failed, Error}`; the last three
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    Error,
}

impl TaskState {
    /// Returns `true` once the task can no longer change state.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Error)
    }

    /// Returns `true` for the non-success terminal states.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Wire name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte- and part-level progress of a multipart upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgress {
    pub uploaded_bytes: u64,
    pub total_bytes: u64,
    /// 0-100, rounded to two decimals.
    pub percentage: f64,
    pub uploaded_chunks: u32,
    pub total_chunks: u32,
}

impl UploadProgress {
    /// Builds a snapshot, deriving `percentage` from the byte counters.
    pub fn new(uploaded_bytes: u64, total_bytes: u64, uploaded_chunks: u32, total_chunks: u32) -> Self {
        Self {
            uploaded_bytes,
            total_bytes,
            percentage: percentage_of(uploaded_bytes, total_bytes),
            uploaded_chunks,
            total_chunks,
        }
    }

    /// Returns `true` when every chunk has been uploaded.
    pub fn is_complete(&self) -> bool {
        self.uploaded_chunks == self.total_chunks
    }
}

/// `done / total * 100` rounded to two decimals, 0 for an empty total.
pub fn percentage_of(done: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = done as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
