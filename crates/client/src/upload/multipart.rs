use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};

use fusion_protocol::ApiEnvelope;
use fusion_protocol::constants::{
    COMPLETE_MULTIPART_UPLOAD_PATH, CREATE_MULTIPART_UPLOAD_PATH, DEFAULT_PART_SIZE,
    GENERATE_PRESIGNED_URLS_PATH,
};
use fusion_protocol::messages::{
    CompleteMultipartUploadRequest, CompleteMultipartUploadResponse, CompletedPartEntry,
    CreateMultipartUploadRequest, MultipartUploadCreated, PresignedPartUrl,
    PresignedPartUrlsRequest,
};
use fusion_transfer::{CompletedPart, ProgressAggregator, UploadPart, UploadSession, UploadSource};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiContext;
use crate::error::FusionError;
use crate::options::UploadOptions;
use crate::retry::RetryPolicy;
use crate::transport::HttpRequest;

/// Drives one multipart upload: create the session, presign every part in
/// one call, upload parts with a fixed pool of workers, then complete.
///
/// A part that exhausts its retries stops the pool: no new parts start,
/// in-flight parts finish, and complete is never called. The remote
/// session is left open; its id is carried by the returned error.
pub struct MultipartUploadOrchestrator<'a> {
    api: &'a ApiContext,
}

/// The file being uploaded.
pub(crate) struct MultipartFile<'f> {
    pub source: &'f UploadSource,
    pub file_name: &'f str,
    pub extension: &'f str,
    pub content_type: &'f str,
    pub size: u64,
}

/// State shared by the part workers of one upload.
struct PartRun<'r> {
    file: &'r MultipartFile<'r>,
    session: &'r UploadSession,
    urls: HashMap<u32, String>,
    queue: Mutex<VecDeque<UploadPart>>,
    completed: Mutex<Vec<CompletedPart>>,
    failure: Mutex<Option<PartFailure>>,
    progress: ProgressAggregator,
    policy: RetryPolicy,
    /// Tripped by the caller's token or by the first exhausted part.
    halt: CancellationToken,
}

struct PartFailure {
    part_number: u32,
    attempts: u32,
    error: FusionError,
}

impl PartRun<'_> {
    fn next_part(&self) -> Option<UploadPart> {
        if self.halt.is_cancelled() {
            return None;
        }
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    /// Keeps the first failure and halts the pool.
    fn fail(&self, failure: PartFailure) {
        let mut slot = self.failure.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            warn!(
                upload_id = self.session.upload_id(),
                part_number = failure.part_number,
                attempts = failure.attempts,
                error = %failure.error,
                "part failed, stopping upload"
            );
            *slot = Some(failure);
        }
        drop(slot);
        self.halt.cancel();
    }

    fn upload_error(&self, message: String) -> FusionError {
        bare(self.file.file_name, Some(self.session.upload_id()), message)
    }
}

impl<'a> MultipartUploadOrchestrator<'a> {
    pub(crate) fn new(api: &'a ApiContext) -> Self {
        Self { api }
    }

    pub(crate) async fn upload(
        &self,
        file: &MultipartFile<'_>,
        options: &UploadOptions,
    ) -> Result<String, FusionError> {
        let session = self.create_session(file).await?;
        info!(
            file_name = file.file_name,
            upload_id = session.upload_id(),
            total_parts = session.total_parts(),
            part_size = session.part_size(),
            "multipart session created"
        );

        let urls = self.presign_parts(file, &session).await?;
        let parts = session
            .plan()
            .map_err(|e| FusionError::from_transfer(file.file_name, e))?;

        let run = PartRun {
            file,
            session: &session,
            urls,
            queue: Mutex::new(parts.into()),
            completed: Mutex::new(Vec::with_capacity(session.total_parts() as usize)),
            failure: Mutex::new(None),
            progress: ProgressAggregator::new(
                session.total_size(),
                session.total_parts(),
                options.on_progress.clone(),
            ),
            policy: options.retry_policy(),
            halt: options.cancel.child_token(),
        };

        let workers = options
            .max_concurrent_uploads
            .min(session.total_parts() as usize)
            .max(1);
        debug!(upload_id = session.upload_id(), workers, "starting part workers");
        join_all((0..workers).map(|worker| self.run_worker(worker, &run))).await;

        if options.cancel.is_cancelled() {
            warn!(upload_id = session.upload_id(), "multipart upload cancelled");
            return Err(FusionError::UploadCancelled {
                file_name: file.file_name.to_string(),
                upload_id: Some(session.upload_id().to_string()),
            });
        }

        let PartRun {
            completed, failure, ..
        } = run;
        if let Some(failure) = failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(FusionError::FileUpload {
                file_name: file.file_name.to_string(),
                message: format!(
                    "part {} failed after {} attempts",
                    failure.part_number, failure.attempts
                ),
                upload_id: Some(session.upload_id().to_string()),
                part_number: Some(failure.part_number),
                source: Some(Box::new(failure.error)),
            });
        }

        let mut completed = completed.into_inner().unwrap_or_else(PoisonError::into_inner);
        if completed.len() != session.total_parts() as usize {
            return Err(bare(
                file.file_name,
                Some(session.upload_id()),
                format!(
                    "only {} of {} parts uploaded",
                    completed.len(),
                    session.total_parts()
                ),
            ));
        }
        completed.sort();

        self.complete(file, &session, completed).await
    }

    async fn run_worker(&self, worker: usize, run: &PartRun<'_>) {
        while let Some(part) = run.next_part() {
            let part_number = part.part_number();
            let bytes = part.len();
            match self.upload_part(part, run).await {
                Ok(done) => {
                    run.completed
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .push(done);
                    run.progress.record_part_done(part_number, bytes);
                }
                Err(failure) => {
                    run.fail(failure);
                    break;
                }
            }
        }
        debug!(worker, "part worker finished");
    }

    /// Uploads one part with its own retry budget.
    async fn upload_part(
        &self,
        part: UploadPart,
        run: &PartRun<'_>,
    ) -> Result<CompletedPart, PartFailure> {
        let part_number = part.part_number();
        let Some(url) = run.urls.get(&part_number) else {
            return Err(PartFailure {
                part_number,
                attempts: 0,
                error: run.upload_error(format!("no presigned URL for part {part_number}")),
            });
        };

        let part = Mutex::new(part);
        let result = run
            .policy
            .run("part upload", &run.halt, |attempt| {
                self.put_part(attempt, &part, url, run)
            })
            .await;
        let attempts = part.lock().unwrap_or_else(PoisonError::into_inner).attempts();

        result.map_err(|error| PartFailure {
            part_number,
            attempts,
            error,
        })
    }

    async fn put_part(
        &self,
        attempt: u32,
        part: &Mutex<UploadPart>,
        url: &str,
        run: &PartRun<'_>,
    ) -> Result<CompletedPart, FusionError> {
        let file_name = run.file.file_name;
        let range = {
            let mut part = part.lock().unwrap_or_else(PoisonError::into_inner);
            part.begin_attempt()
                .map_err(|e| FusionError::from_transfer(file_name, e))?;
            part.range()
        };
        debug!(
            upload_id = run.session.upload_id(),
            part_number = range.part_number,
            attempt,
            bytes = range.len(),
            "uploading part"
        );

        let outcome = async {
            let data = run
                .file
                .source
                .read_range(range.start, range.end)
                .await
                .map_err(|e| FusionError::from_transfer(file_name, e))?;
            let resp = self
                .api
                .send_storage(HttpRequest::put(url).binary(run.file.content_type, data))
                .await?;
            if !resp.is_success() {
                return Err(FusionError::network(
                    format!("part {} rejected: HTTP {}", range.part_number, resp.status),
                    None,
                ));
            }
            let etag = resp
                .header("etag")
                .map(|v| v.trim().trim_matches('"').to_string())
                .unwrap_or_default();
            if etag.is_empty() {
                return Err(FusionError::network(
                    format!("part {} response has no ETag", range.part_number),
                    None,
                ));
            }
            Ok::<_, FusionError>(etag)
        }
        .await;

        let mut part = part.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Ok(etag) => part
                .mark_done(etag)
                .map_err(|e| FusionError::from_transfer(file_name, e)),
            Err(err) => {
                part.mark_failed()
                    .map_err(|e| FusionError::from_transfer(file_name, e))?;
                Err(err)
            }
        }
    }

    async fn create_session(&self, file: &MultipartFile<'_>) -> Result<UploadSession, FusionError> {
        let body = CreateMultipartUploadRequest {
            file_suffix: file.extension.to_string(),
            file_size: file.size,
        };
        let resp = self
            .api
            .post_json(CREATE_MULTIPART_UPLOAD_PATH, &body)
            .await
            .map_err(|e| wrap(file.file_name, None, "failed to create multipart upload", e))?;
        if resp.status != 200 {
            return Err(FusionError::file_upload(
                file.file_name,
                format!("failed to create multipart upload: HTTP {}", resp.status),
                None,
            ));
        }

        let created = ApiEnvelope::<MultipartUploadCreated>::from_slice(&resp.body)
            .map_err(|e| {
                wrap(file.file_name, None, "malformed multipart session", e.into())
            })?
            .into_inner();
        if created.upload_id.is_empty() || created.key.is_empty() {
            return Err(FusionError::file_upload(
                file.file_name,
                "multipart session is missing uploadID or key",
                None,
            ));
        }

        let part_size = created
            .part_size
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PART_SIZE);
        UploadSession::new(created.upload_id, created.key, part_size, file.size)
            .map_err(|e| FusionError::from_transfer(file.file_name, e))
    }

    /// Requests every part URL in one call, keyed by part number.
    async fn presign_parts(
        &self,
        file: &MultipartFile<'_>,
        session: &UploadSession,
    ) -> Result<HashMap<u32, String>, FusionError> {
        let upload_id = Some(session.upload_id());
        let body = PresignedPartUrlsRequest {
            upload_id: session.upload_id().to_string(),
            key: session.storage_key().to_string(),
            part_numbers: session.part_numbers(),
        };
        let resp = self
            .api
            .post_json(GENERATE_PRESIGNED_URLS_PATH, &body)
            .await
            .map_err(|e| wrap(file.file_name, upload_id, "failed to presign parts", e))?;
        if resp.status != 200 {
            return Err(bare(
                file.file_name,
                upload_id,
                format!("failed to presign parts: HTTP {}: {}", resp.status, resp.text()),
            ));
        }

        let entries = ApiEnvelope::<Vec<PresignedPartUrl>>::from_slice(&resp.body)
            .map_err(|e| wrap(file.file_name, upload_id, "malformed presigned part URLs", e.into()))?
            .into_inner();
        let total = session.total_parts();
        if entries.len() != total as usize {
            return Err(bare(
                file.file_name,
                upload_id,
                format!("expected {total} presigned URLs, got {}", entries.len()),
            ));
        }

        let mut urls = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            let part_number = entry.part_number().unwrap_or(index as u32 + 1);
            if part_number == 0 || part_number > total || entry.url().is_empty() {
                return Err(FusionError::FileUpload {
                    file_name: file.file_name.to_string(),
                    message: format!("invalid presigned URL entry for part {part_number}"),
                    upload_id: upload_id.map(str::to_string),
                    part_number: Some(part_number),
                    source: None,
                });
            }
            urls.insert(part_number, entry.url().to_string());
        }
        if urls.len() != total as usize {
            return Err(bare(
                file.file_name,
                upload_id,
                "presigned URLs contain duplicate part numbers".into(),
            ));
        }
        Ok(urls)
    }

    async fn complete(
        &self,
        file: &MultipartFile<'_>,
        session: &UploadSession,
        parts: Vec<CompletedPart>,
    ) -> Result<String, FusionError> {
        let upload_id = Some(session.upload_id());
        let body = CompleteMultipartUploadRequest {
            upload_id: session.upload_id().to_string(),
            key: session.storage_key().to_string(),
            parts: parts
                .into_iter()
                .map(|p| CompletedPartEntry {
                    part_number: p.part_number,
                    etag: p.etag,
                })
                .collect(),
        };
        let resp = self
            .api
            .post_json(COMPLETE_MULTIPART_UPLOAD_PATH, &body)
            .await
            .map_err(|e| wrap(file.file_name, upload_id, "failed to complete multipart upload", e))?;
        if resp.status != 200 {
            return Err(bare(
                file.file_name,
                upload_id,
                format!(
                    "failed to complete multipart upload: HTTP {}: {}",
                    resp.status,
                    resp.text()
                ),
            ));
        }

        let completed = ApiEnvelope::<CompleteMultipartUploadResponse>::from_slice(&resp.body)
            .map_err(|e| wrap(file.file_name, upload_id, "malformed complete response", e.into()))?
            .into_inner();
        if completed.download_url.is_empty() {
            return Err(bare(
                file.file_name,
                upload_id,
                "complete response has no downloadURL".into(),
            ));
        }

        info!(
            file_name = file.file_name,
            upload_id = session.upload_id(),
            parts = session.total_parts(),
            "multipart upload complete"
        );
        Ok(completed.download_url)
    }
}

fn wrap(file_name: &str, upload_id: Option<&str>, message: &str, source: FusionError) -> FusionError {
    FusionError::FileUpload {
        file_name: file_name.to_string(),
        message: message.to_string(),
        upload_id: upload_id.map(str::to_string),
        part_number: None,
        source: Some(Box::new(source)),
    }
}

fn bare(file_name: &str, upload_id: Option<&str>, message: String) -> FusionError {
    FusionError::FileUpload {
        file_name: file_name.to_string(),
        message,
        upload_id: upload_id.map(str::to_string),
        part_number: None,
        source: None,
    }
}
