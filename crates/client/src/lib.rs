//! Async client for OOMOL Fusion.
//!
//! Submits remote tasks and polls them to completion, and uploads files
//! to Fusion storage. Small files go in one presigned form POST; larger
//! files use a multipart session with a bounded pool of part workers,
//! per-part retries, and aggregated progress.
//!
//! ```no_run
//! # async fn demo() -> Result<(), fusion_client::FusionError> {
//! use fusion_client::{ClientConfig, FusionClient, RunOptions, SubmitTaskRequest, UploadOptions};
//!
//! let client = FusionClient::new(ClientConfig::new("token"))?;
//! let result = client
//!     .run(
//!         &SubmitTaskRequest::new("pdf-transform", serde_json::json!({ "url": "..." })),
//!         &RunOptions::default(),
//!     )
//!     .await?;
//! let url = client
//!     .upload_file(std::path::Path::new("a.png"), "a.png", &UploadOptions::default())
//!     .await?;
//! # let _ = (result, url);
//! # Ok(())
//! # }
//! ```

mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod options;
pub mod retry;
pub mod task;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod testing;

pub use client::FusionClient;
pub use config::ClientConfig;
pub use error::FusionError;
pub use options::{RunOptions, TaskProgressCallback, UploadOptions};
pub use retry::RetryPolicy;
pub use task::{SubmitTaskRequest, TaskClient, TaskResult};
pub use transport::{ReqwestTransport, Transport, TransportError};
pub use upload::FileUploader;

pub use fusion_protocol::messages::{SubmitTaskResponse, TaskStatusResponse};
pub use fusion_protocol::{TaskState, UploadProgress};
pub use fusion_transfer::{ProgressUpdate, UploadProgressCallback, UploadSource};
pub use tokio_util::sync::CancellationToken;
