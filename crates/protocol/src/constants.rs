/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://fusion-api.oomol.com/v1";

/// Largest file the upload endpoints accept (500 MiB).
pub const MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Files at or above this size go through multipart upload (5 MiB).
pub const DEFAULT_MULTIPART_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Part size assumed when the server omits `partSize` (5 MiB).
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Single-file presigned POST target.
pub const GENERATE_PRESIGNED_URL_PATH: &str = "file-upload/action/generate-presigned-url";

/// Opens a multipart upload session.
pub const CREATE_MULTIPART_UPLOAD_PATH: &str = "file-upload/action/create-multipart-upload";

/// Batch presigned PUT URLs for multipart parts.
pub const GENERATE_PRESIGNED_URLS_PATH: &str = "file-upload/action/generate-presigned-urls";

/// Finalizes a multipart upload session.
pub const COMPLETE_MULTIPART_UPLOAD_PATH: &str = "file-upload/action/complete-multipart-upload";

/// Relative path of the task submit endpoint for `service`.
pub fn submit_path(service: &str) -> String {
    format!("{service}/submit")
}

/// Relative path of the task status endpoint.
pub fn result_path(service: &str, session_id: &str) -> String {
    format!("{service}/result/{session_id}")
}

/// Relative path of the task cancel endpoint.
pub fn cancel_path(service: &str, session_id: &str) -> String {
    format!("{service}/cancel/{session_id}")
}
