use crate::TransferError;

/// Recognized file extensions and the content type each is uploaded with.
pub const SUPPORTED_FILE_TYPES: [(&str, &str); 17] = [
    // Images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    // Audio / video
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    // Documents
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("pdf", "application/pdf"),
    ("epub", "application/epub+zip"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    // Data
    ("csv", "text/csv"),
    ("json", "application/json"),
    ("zip", "application/zip"),
];

/// Returns the lower-cased text after the last `.` in `file_name`.
///
/// Only the name is inspected, never the file content.
pub fn file_extension(file_name: &str) -> Result<String, TransferError> {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => Ok(ext.to_ascii_lowercase()),
        None => Err(TransferError::MissingExtension(file_name.to_string())),
    }
}

/// Maps `file_name` to its upload content type.
///
/// Rejects names without an extension and extensions outside
/// [`SUPPORTED_FILE_TYPES`].
pub fn content_type_for(file_name: &str) -> Result<&'static str, TransferError> {
    let ext = file_extension(file_name)?;
    SUPPORTED_FILE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, content_type)| *content_type)
        .ok_or_else(|| TransferError::UnsupportedFileType {
            file_name: file_name.to_string(),
            extension: ext,
        })
}
