use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::TaskState;

// ---------------------------------------------------------------------------
// Task endpoints
// ---------------------------------------------------------------------------

/// Response of `POST {service}/submit`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SubmitTaskResponse {
    #[serde(rename = "sessionID", default)]
    pub session_id: String,
    #[serde(default)]
    pub success: bool,
}

/// Response of `GET {service}/result/{sessionID}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    #[serde(default)]
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Usually a string; some services send a structured object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
    /// 0-100 when the service reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
}

impl TaskStatusResponse {
    /// Renders the `error` field as text, if present.
    pub fn error_message(&self) -> Option<String> {
        match &self.error {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Single-file upload
// ---------------------------------------------------------------------------

/// Body of the presigned-POST request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedPostRequest {
    pub file_suffix: String,
}

/// A presigned form-upload target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PresignedPost {
    #[serde(rename = "uploadURL", default)]
    pub upload_url: String,
    /// Form fields that must precede the file part.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    #[serde(rename = "downloadURL", default)]
    pub download_url: String,
}

// ---------------------------------------------------------------------------
// Multipart upload
// ---------------------------------------------------------------------------

/// Body of the create-multipart-upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMultipartUploadRequest {
    pub file_suffix: String,
    pub file_size: u64,
}

/// Session returned by create-multipart-upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MultipartUploadCreated {
    #[serde(rename = "uploadID", default)]
    pub upload_id: String,
    #[serde(default)]
    pub key: String,
    #[serde(rename = "partSize", default, skip_serializing_if = "Option::is_none")]
    pub part_size: Option<u64>,
}

/// Body of the batch presigned-URL request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresignedPartUrlsRequest {
    #[serde(rename = "uploadID")]
    pub upload_id: String,
    pub key: String,
    #[serde(rename = "partNumbers")]
    pub part_numbers: Vec<u32>,
}

/// One entry of the batch presigned-URL response.
///
/// The server normally returns numbered objects; a bare URL list is
/// accepted and matched to part numbers by position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PresignedPartUrl {
    Numbered {
        #[serde(rename = "partNumber")]
        part_number: u32,
        #[serde(rename = "uploadURL")]
        upload_url: String,
    },
    Bare(String),
}

impl PresignedPartUrl {
    /// Explicit part number, if the server sent one.
    pub fn part_number(&self) -> Option<u32> {
        match self {
            Self::Numbered { part_number, .. } => Some(*part_number),
            Self::Bare(_) => None,
        }
    }

    /// The presigned PUT URL.
    pub fn url(&self) -> &str {
        match self {
            Self::Numbered { upload_url, .. } => upload_url,
            Self::Bare(url) => url,
        }
    }
}

/// `(partNumber, etag)` pair sent to complete-multipart-upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPartEntry {
    #[serde(rename = "partNumber")]
    pub part_number: u32,
    pub etag: String,
}

/// Body of the complete-multipart-upload request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompleteMultipartUploadRequest {
    #[serde(rename = "uploadID")]
    pub upload_id: String,
    pub key: String,
    /// Sorted ascending by `part_number`.
    pub parts: Vec<CompletedPartEntry>,
}

/// Response of complete-multipart-upload.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompleteMultipartUploadResponse {
    #[serde(rename = "downloadURL", default)]
    pub download_url: String,
}
