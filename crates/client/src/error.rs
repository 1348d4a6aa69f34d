//! SDK error type.

use std::time::Duration;

use fusion_protocol::TaskState;
use fusion_transfer::TransferError;

/// Boxed underlying cause kept for diagnostics.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced by the Fusion client.
///
/// `Display` is the error message; wrapped causes are reachable through
/// [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum FusionError {
    #[error("failed to submit task: {message}")]
    TaskSubmit {
        message: String,
        status_code: Option<u16>,
        response: String,
    },

    #[error("task {session_id} timed out after {} seconds", timeout.as_secs_f64())]
    TaskTimeout {
        session_id: String,
        service: String,
        timeout: Duration,
    },

    #[error("task {session_id} failed with state: {state}")]
    TaskFailed {
        session_id: String,
        service: String,
        state: TaskState,
        error_details: Option<String>,
    },

    #[error("task {session_id} was cancelled")]
    TaskCancelled { session_id: String, service: String },

    #[error("network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("failed to upload {file_name}: {message}")]
    FileUpload {
        file_name: String,
        message: String,
        upload_id: Option<String>,
        part_number: Option<u32>,
        #[source]
        source: Option<BoxError>,
    },

    #[error("file size {file_size} bytes exceeds maximum allowed size {max_size} bytes")]
    FileTooLarge { file_size: u64, max_size: u64 },

    #[error("upload of {file_name} was cancelled")]
    UploadCancelled {
        file_name: String,
        upload_id: Option<String>,
    },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FusionError {
    /// Transport-level failure, optionally wrapping its cause.
    pub fn network(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Self::Network {
            message: message.into(),
            source,
        }
    }

    /// Upload failure for `file_name` without session context.
    pub fn file_upload(
        file_name: &str,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Self::FileUpload {
            file_name: file_name.to_string(),
            message: message.into(),
            upload_id: None,
            part_number: None,
            source,
        }
    }

    /// Maps a transfer-layer error for `file_name`.
    ///
    /// Size violations keep their own variant; everything else becomes
    /// [`FusionError::FileUpload`].
    pub fn from_transfer(file_name: &str, err: TransferError) -> Self {
        match err {
            TransferError::FileTooLarge {
                file_size,
                max_size,
            } => Self::FileTooLarge {
                file_size,
                max_size,
            },
            other => Self::file_upload(file_name, other.to_string(), Some(Box::new(other))),
        }
    }

    /// Returns `true` for transient failures worth another attempt.
    ///
    /// Logical failures (task state, size, type, validation) never are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Remote upload session left behind by a failed multipart upload.
    pub fn upload_id(&self) -> Option<&str> {
        match self {
            Self::FileUpload { upload_id, .. } | Self::UploadCancelled { upload_id, .. } => {
                upload_id.as_deref()
            }
            _ => None,
        }
    }

    /// Part whose retries were exhausted, for multipart failures.
    pub fn part_number(&self) -> Option<u32> {
        match self {
            Self::FileUpload { part_number, .. } => *part_number,
            _ => None,
        }
    }
}
