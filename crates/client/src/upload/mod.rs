//! File upload: strategy dispatch over the single and multipart paths.

mod multipart;
mod single;

use std::sync::Arc;

use fusion_transfer::{
    UploadSource, UploadStrategy, content_type_for, file_extension, select_strategy,
};
use tracing::info;

use crate::api::ApiContext;
use crate::error::FusionError;
use crate::options::UploadOptions;

pub use multipart::MultipartUploadOrchestrator;
pub use single::SingleFileUploader;

use multipart::MultipartFile;

/// Uploads files to Fusion storage and returns their download URLs.
pub struct FileUploader {
    api: Arc<ApiContext>,
}

impl FileUploader {
    pub(crate) fn new(api: Arc<ApiContext>) -> Self {
        Self { api }
    }

    /// Uploads `source` under `file_name` and returns the download URL.
    ///
    /// Size and file type are checked before any request is sent. Files
    /// below `options.multipart_threshold` go in one form POST; larger
    /// ones use a multipart session.
    pub async fn upload_file(
        &self,
        source: impl Into<UploadSource>,
        file_name: &str,
        options: &UploadOptions,
    ) -> Result<String, FusionError> {
        options.validate()?;
        let source = source.into();

        let size = source
            .size()
            .await
            .map_err(|e| FusionError::from_transfer(file_name, e))?;
        let strategy = select_strategy(size, options.multipart_threshold)
            .map_err(|e| FusionError::from_transfer(file_name, e))?;
        let extension =
            file_extension(file_name).map_err(|e| FusionError::from_transfer(file_name, e))?;
        let content_type =
            content_type_for(file_name).map_err(|e| FusionError::from_transfer(file_name, e))?;

        if options.cancel.is_cancelled() {
            return Err(FusionError::UploadCancelled {
                file_name: file_name.to_string(),
                upload_id: None,
            });
        }

        info!(file_name, size, ?strategy, content_type, "starting upload");
        match strategy {
            UploadStrategy::Single => {
                let data = source
                    .read_all()
                    .await
                    .map_err(|e| FusionError::from_transfer(file_name, e))?;
                SingleFileUploader::new(&self.api)
                    .upload(data, file_name, &extension, content_type, options)
                    .await
            }
            UploadStrategy::Multipart => {
                let file = MultipartFile {
                    source: &source,
                    file_name,
                    extension: &extension,
                    content_type,
                    size,
                };
                MultipartUploadOrchestrator::new(&self.api)
                    .upload(&file, options)
                    .await
            }
        }
    }
}
