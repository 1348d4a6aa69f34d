use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use fusion_protocol::ApiEnvelope;
use fusion_protocol::constants::GENERATE_PRESIGNED_URL_PATH;
use fusion_protocol::messages::{PresignedPost, PresignedPostRequest};
use fusion_transfer::ProgressUpdate;
use tracing::{debug, info};

use crate::api::ApiContext;
use crate::error::FusionError;
use crate::options::UploadOptions;
use crate::transport::{FormUpload, HttpRequest, HttpResponse};

/// Uploads a whole file with one presigned form POST.
///
/// The presigned target is requested once and reused across retries,
/// unless storage reports it expired.
pub struct SingleFileUploader<'a> {
    api: &'a ApiContext,
}

/// What one attempt needs to know about the file.
struct FileToSend<'f> {
    data: Bytes,
    file_name: &'f str,
    extension: &'f str,
    content_type: &'f str,
}

impl<'a> SingleFileUploader<'a> {
    pub(crate) fn new(api: &'a ApiContext) -> Self {
        Self { api }
    }

    pub(crate) async fn upload(
        &self,
        data: Bytes,
        file_name: &str,
        extension: &str,
        content_type: &str,
        options: &UploadOptions,
    ) -> Result<String, FusionError> {
        let file = FileToSend {
            data,
            file_name,
            extension,
            content_type,
        };
        let target = Mutex::new(None);

        let result = options
            .retry_policy()
            .run("single upload", &options.cancel, |attempt| {
                self.attempt(attempt, &target, &file, options)
            })
            .await;

        match result {
            Ok(download_url) => {
                info!(file_name, size = file.data.len(), "single upload complete");
                Ok(download_url)
            }
            Err(_) if options.cancel.is_cancelled() => Err(FusionError::UploadCancelled {
                file_name: file_name.to_string(),
                upload_id: None,
            }),
            Err(err) => Err(FusionError::file_upload(
                file_name,
                err.to_string(),
                Some(Box::new(err)),
            )),
        }
    }

    async fn attempt(
        &self,
        attempt: u32,
        slot: &Mutex<Option<PresignedPost>>,
        file: &FileToSend<'_>,
        options: &UploadOptions,
    ) -> Result<String, FusionError> {
        let cached = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let target = match cached {
            Some(target) => target,
            None => {
                let fresh = self.request_target(file.extension).await?;
                *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(fresh.clone());
                fresh
            }
        };

        debug!(file_name = file.file_name, attempt, "uploading file");
        options.report(ProgressUpdate::Percent(50.0));

        let form = FormUpload {
            fields: target.fields,
            file_name: file.file_name.to_string(),
            content_type: file.content_type.to_string(),
            data: file.data.clone(),
        };
        let resp = self
            .api
            .send_storage(HttpRequest::post(target.upload_url).form(form))
            .await?;

        if resp.is_success() {
            options.report(ProgressUpdate::Percent(100.0));
            return Ok(target.download_url);
        }
        if is_expired(&resp) {
            debug!(file_name = file.file_name, "presigned target expired, refreshing");
            *slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        }
        Err(FusionError::network(
            format!("storage rejected upload: HTTP {}: {}", resp.status, resp.text()),
            None,
        ))
    }

    async fn request_target(&self, extension: &str) -> Result<PresignedPost, FusionError> {
        let body = PresignedPostRequest {
            file_suffix: extension.to_string(),
        };
        let resp = self.api.post_json(GENERATE_PRESIGNED_URL_PATH, &body).await?;
        if resp.status != 200 {
            return Err(FusionError::network(
                format!("failed to get presigned URL: HTTP {}", resp.status),
                None,
            ));
        }
        let target = ApiEnvelope::<PresignedPost>::from_slice(&resp.body)
            .map_err(|e| FusionError::network("malformed presigned URL response", Some(Box::new(e))))?
            .into_inner();
        if target.upload_url.is_empty() || target.download_url.is_empty() {
            return Err(FusionError::network(
                "presigned URL response is missing uploadURL or downloadURL",
                None,
            ));
        }
        Ok(target)
    }
}

/// Storage answers 403 with an "expired" message once a presigned policy
/// lapses.
fn is_expired(resp: &HttpResponse) -> bool {
    resp.status == 403 && resp.text().to_ascii_lowercase().contains("expired")
}
