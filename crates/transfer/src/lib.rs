//! Transport-independent upload mechanics.
//!
//! Decides how a file is uploaded (single request or multipart), splits
//! it into parts, reads part bytes from memory or disk, tracks each part's
//! state, and aggregates progress across concurrent part uploads.

mod chunked;
mod progress;
mod source;
mod strategy;
mod types;
mod validation;

pub use chunked::{PartRange, plan_parts, total_parts};
pub use progress::{ProgressAggregator, ProgressUpdate, UploadProgressCallback};
pub use source::UploadSource;
pub use strategy::{UploadStrategy, select_strategy};
pub use types::{CompletedPart, PartStatus, UploadPart, UploadSession};
pub use validation::{SUPPORTED_FILE_TYPES, content_type_for, file_extension};

pub use fusion_protocol::constants::{
    DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE, MAX_FILE_SIZE,
};

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file name must have an extension: {0}")]
    MissingExtension(String),

    #[error("unsupported file type: .{extension} ({file_name})")]
    UnsupportedFileType {
        file_name: String,
        extension: String,
    },

    #[error("file size {file_size} bytes exceeds maximum allowed size {max_size} bytes")]
    FileTooLarge { file_size: u64, max_size: u64 },

    #[error("part size must be greater than zero")]
    ZeroPartSize,

    #[error("byte range {start}..{end} is outside a source of {len} bytes")]
    RangeOutOfBounds { start: u64, end: u64, len: u64 },

    #[error("part {part_number}: invalid transition {from:?} -> {to:?}")]
    InvalidTransition {
        part_number: u32,
        from: PartStatus,
        to: PartStatus,
    },
}
