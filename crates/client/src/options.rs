//! Per-call option snapshots.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use fusion_transfer::{DEFAULT_MULTIPART_THRESHOLD, ProgressUpdate, UploadProgressCallback};
use tokio_util::sync::CancellationToken;

use crate::error::FusionError;
use crate::retry::RetryPolicy;

/// Callback receiving task progress (0-100).
pub type TaskProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

const DEFAULT_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 3;

/// Options for `run` / `wait_for`.
///
/// `polling_interval` and `timeout` fall back to the client config when
/// unset. `retries` bounds transport failures of a single status query.
#[derive(Clone)]
pub struct RunOptions {
    pub on_progress: Option<TaskProgressCallback>,
    pub polling_interval: Option<Duration>,
    pub timeout: Option<Duration>,
    pub retries: u32,
    pub retry_delay: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            on_progress: None,
            polling_interval: None,
            timeout: None,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl fmt::Debug for RunOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("polling_interval", &self.polling_interval)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .finish()
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: impl Fn(f64) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.retry_delay)
    }
}

/// Options for `upload_file`.
#[derive(Clone)]
pub struct UploadOptions {
    pub on_progress: Option<UploadProgressCallback>,
    /// Parts uploaded at once (multipart only).
    pub max_concurrent_uploads: usize,
    /// Files at or above this size use multipart.
    pub multipart_threshold: u64,
    /// Retries per request: the single upload, or each part.
    pub retries: u32,
    pub retry_delay: Duration,
    /// Stops scheduling new parts and retries once cancelled.
    pub cancel: CancellationToken,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            on_progress: None,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD,
            retries: DEFAULT_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
            cancel: CancellationToken::new(),
        }
    }
}

impl fmt::Debug for UploadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("max_concurrent_uploads", &self.max_concurrent_uploads)
            .field("multipart_threshold", &self.multipart_threshold)
            .field("retries", &self.retries)
            .field("retry_delay", &self.retry_delay)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl UploadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(mut self, callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn max_concurrent_uploads(mut self, n: usize) -> Self {
        self.max_concurrent_uploads = n;
        self
    }

    pub fn multipart_threshold(mut self, bytes: u64) -> Self {
        self.multipart_threshold = bytes;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if self.max_concurrent_uploads == 0 {
            return Err(FusionError::InvalidRequest(
                "max_concurrent_uploads must be at least 1".into(),
            ));
        }
        if self.multipart_threshold == 0 {
            return Err(FusionError::InvalidRequest(
                "multipart_threshold must be at least 1 byte".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.retry_delay)
    }

    pub(crate) fn report(&self, update: ProgressUpdate) {
        if let Some(cb) = &self.on_progress {
            cb(update);
        }
    }
}
