use std::sync::Arc;

use fusion_protocol::messages::{SubmitTaskResponse, TaskStatusResponse};
use fusion_transfer::UploadSource;

use crate::api::ApiContext;
use crate::config::ClientConfig;
use crate::error::FusionError;
use crate::options::{RunOptions, UploadOptions};
use crate::task::{SubmitTaskRequest, TaskClient, TaskResult};
use crate::transport::{ReqwestTransport, Transport};
use crate::upload::FileUploader;

/// Entry point to the Fusion API.
///
/// Cheap to share behind an `Arc`; every call may run concurrently with
/// any other.
pub struct FusionClient {
    api: Arc<ApiContext>,
    tasks: TaskClient,
    uploader: FileUploader,
}

impl FusionClient {
    /// Creates a client over HTTPS.
    pub fn new(config: ClientConfig) -> Result<Self, FusionError> {
        let transport = ReqwestTransport::new()
            .map_err(|e| FusionError::Config(format!("failed to build HTTP client: {e}")))?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Creates a client over a custom transport.
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, FusionError> {
        config.validate()?;
        tracing::debug!(base_url = %config.base_url, "fusion client created");
        let api = Arc::new(ApiContext::new(config, transport));
        Ok(Self {
            tasks: TaskClient::new(Arc::clone(&api)),
            uploader: FileUploader::new(Arc::clone(&api)),
            api,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        self.api.config()
    }

    pub fn tasks(&self) -> &TaskClient {
        &self.tasks
    }

    pub fn uploader(&self) -> &FileUploader {
        &self.uploader
    }

    /// Submits a task and waits for its result.
    pub async fn run(
        &self,
        request: &SubmitTaskRequest,
        options: &RunOptions,
    ) -> Result<TaskResult, FusionError> {
        self.tasks.run(request, options).await
    }

    pub async fn submit(
        &self,
        request: &SubmitTaskRequest,
    ) -> Result<SubmitTaskResponse, FusionError> {
        self.tasks.submit(request).await
    }

    pub async fn wait_for(
        &self,
        service: &str,
        session_id: &str,
        options: &RunOptions,
    ) -> Result<TaskResult, FusionError> {
        self.tasks.wait_for(service, session_id, options).await
    }

    pub async fn get_task_status(
        &self,
        service: &str,
        session_id: &str,
    ) -> Result<TaskStatusResponse, FusionError> {
        self.tasks.get_task_status(service, session_id).await
    }

    pub async fn cancel(&self, service: &str, session_id: &str) -> Result<(), FusionError> {
        self.tasks.cancel(service, session_id).await
    }

    /// Uploads a file and returns its download URL.
    pub async fn upload_file(
        &self,
        source: impl Into<UploadSource>,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<String, FusionError> {
        self.uploader.upload_file(source, file_name, options).await
    }
}
