use crate::{MAX_FILE_SIZE, TransferError};

/// How a file is sent to storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One presigned form POST.
    Single,
    /// Session + concurrent part PUTs + complete.
    Multipart,
}

/// Picks the upload strategy for a file of `file_size` bytes.
///
/// Files above [`MAX_FILE_SIZE`] are rejected outright. The threshold
/// comparison is strict: a file of exactly `multipart_threshold` bytes
/// goes multipart.
pub fn select_strategy(
    file_size: u64,
    multipart_threshold: u64,
) -> Result<UploadStrategy, TransferError> {
    if file_size > MAX_FILE_SIZE {
        return Err(TransferError::FileTooLarge {
            file_size,
            max_size: MAX_FILE_SIZE,
        });
    }
    if file_size < multipart_threshold {
        Ok(UploadStrategy::Single)
    } else {
        Ok(UploadStrategy::Multipart)
    }
}
