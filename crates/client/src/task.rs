//! Task submission and polling.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use fusion_protocol::TaskState;
use fusion_protocol::constants::{cancel_path, result_path, submit_path};
use fusion_protocol::messages::{SubmitTaskResponse, TaskStatusResponse};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::ApiContext;
use crate::error::FusionError;
use crate::options::RunOptions;

/// A task to run on a Fusion service.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitTaskRequest {
    pub service: String,
    /// JSON object sent verbatim as the request body.
    pub inputs: Value,
}

impl SubmitTaskRequest {
    pub fn new(service: impl Into<String>, inputs: Value) -> Self {
        Self {
            service: service.into(),
            inputs,
        }
    }

    fn validate(&self) -> Result<(), FusionError> {
        if self.service.trim().is_empty() {
            return Err(FusionError::InvalidRequest("service name is required".into()));
        }
        if !self.inputs.is_object() {
            return Err(FusionError::InvalidRequest(
                "inputs must be a JSON object".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskResult {
    pub data: Value,
    pub session_id: String,
    pub service: String,
}

/// Submits tasks and waits for their terminal state.
pub struct TaskClient {
    api: Arc<ApiContext>,
    /// Only sessions with at least one active `wait_for` have an entry.
    cancellations: Mutex<HashMap<String, WaitSlot>>,
}

/// Cancellation token shared by every concurrent wait on one session.
struct WaitSlot {
    token: CancellationToken,
    waiters: usize,
}

impl TaskClient {
    pub(crate) fn new(api: Arc<ApiContext>) -> Self {
        Self {
            api,
            cancellations: Mutex::new(HashMap::new()),
        }
    }

    /// Submits a task and returns the server-assigned session.
    pub async fn submit(
        &self,
        request: &SubmitTaskRequest,
    ) -> Result<SubmitTaskResponse, FusionError> {
        request.validate()?;
        let service = request.service.as_str();

        let resp = self
            .api
            .post_json(&submit_path(service), &request.inputs)
            .await?;
        if resp.status != 200 {
            return Err(FusionError::TaskSubmit {
                message: format!("server returned status {}", resp.status),
                status_code: Some(resp.status),
                response: resp.text(),
            });
        }

        let submitted: SubmitTaskResponse = resp.json().map_err(|e| FusionError::TaskSubmit {
            message: format!("malformed submit response: {e}"),
            status_code: Some(resp.status),
            response: resp.text(),
        })?;
        if submitted.session_id.is_empty() {
            return Err(FusionError::TaskSubmit {
                message: "submit response has no sessionID".into(),
                status_code: Some(resp.status),
                response: resp.text(),
            });
        }

        info!(service, session_id = %submitted.session_id, "task submitted");
        Ok(submitted)
    }

    /// Queries the task once. `200` and `202` both carry a status body.
    pub async fn get_task_status(
        &self,
        service: &str,
        session_id: &str,
    ) -> Result<TaskStatusResponse, FusionError> {
        let resp = self.api.get(&result_path(service, session_id)).await?;
        if resp.status != 200 && resp.status != 202 {
            return Err(FusionError::network(
                format!("failed to get task status: HTTP {}", resp.status),
                None,
            ));
        }
        let status: TaskStatusResponse = resp.json().map_err(|e| {
            FusionError::network("malformed task status response", Some(Box::new(e)))
        })?;
        debug!(service, session_id, state = %status.state, progress = ?status.progress, "task status");
        Ok(status)
    }

    /// Polls until the task reaches a terminal state, the deadline passes,
    /// or [`cancel`](Self::cancel) is called for the session.
    ///
    /// The deadline is checked before every query; sleeps never run past
    /// it, so a short timeout with a long polling interval yields exactly
    /// one query.
    pub async fn wait_for(
        &self,
        service: &str,
        session_id: &str,
        options: &RunOptions,
    ) -> Result<TaskResult, FusionError> {
        let config = self.api.config();
        let polling_interval = options.polling_interval.unwrap_or(config.polling_interval);
        let timeout = options.timeout.unwrap_or(config.timeout);
        let policy = options.retry_policy();

        let registration = self.register(session_id);
        let cancel = registration.token.clone();
        let cancelled = || FusionError::TaskCancelled {
            session_id: session_id.to_string(),
            service: service.to_string(),
        };

        let started = Instant::now();
        let timed_out = || FusionError::TaskTimeout {
            session_id: session_id.to_string(),
            service: service.to_string(),
            timeout,
        };
        let mut last_progress: Option<f64> = None;

        loop {
            if cancel.is_cancelled() {
                return Err(cancelled());
            }
            if started.elapsed() >= timeout {
                warn!(service, session_id, timeout_secs = timeout.as_secs_f64(), "task timed out");
                return Err(timed_out());
            }

            // Retries and their backoff count against the same deadline.
            let status = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(timeout.saturating_sub(started.elapsed())) => {
                    warn!(
                        service,
                        session_id,
                        timeout_secs = timeout.as_secs_f64(),
                        "task timed out while querying status"
                    );
                    return Err(timed_out());
                }
                status = policy.run("task status", &cancel, |_| {
                    self.get_task_status(service, session_id)
                }) => status?,
            };

            if let Some(progress) = status.progress {
                if last_progress != Some(progress) {
                    last_progress = Some(progress);
                    notify(options, progress);
                }
            }

            match status.state {
                TaskState::Completed => {
                    if last_progress != Some(100.0) {
                        notify(options, 100.0);
                    }
                    info!(service, session_id, "task completed");
                    return Ok(TaskResult {
                        data: status.data.unwrap_or(Value::Null),
                        session_id: session_id.to_string(),
                        service: service.to_string(),
                    });
                }
                state if state.is_failure() => {
                    let error_details = status.error_message();
                    warn!(service, session_id, %state, error = ?error_details, "task failed");
                    return Err(FusionError::TaskFailed {
                        session_id: session_id.to_string(),
                        service: service.to_string(),
                        state,
                        error_details,
                    });
                }
                _ => {}
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            let nap = polling_interval.min(remaining);
            tokio::select! {
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = tokio::time::sleep(nap) => {}
            }
        }
    }

    /// Submits a task and waits for its result.
    pub async fn run(
        &self,
        request: &SubmitTaskRequest,
        options: &RunOptions,
    ) -> Result<TaskResult, FusionError> {
        let submitted = self.submit(request).await?;
        self.wait_for(&request.service, &submitted.session_id, options)
            .await
    }

    /// Stops any active wait on the session, then asks the server to cancel.
    ///
    /// Waits in progress fail with [`FusionError::TaskCancelled`] at once.
    /// Nothing is remembered for sessions without an active wait. A failed
    /// remote call is returned as an error.
    pub async fn cancel(&self, service: &str, session_id: &str) -> Result<(), FusionError> {
        let waiting = self
            .cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .map(|slot| slot.token.clone());
        match waiting {
            Some(token) => {
                token.cancel();
                info!(service, session_id, "task cancellation requested");
            }
            None => info!(service, session_id, "task cancellation requested, no active wait"),
        }

        let resp = self
            .api
            .post_json(&cancel_path(service, session_id), &serde_json::json!({}))
            .await
            .inspect_err(|e| warn!(service, session_id, error = %e, "remote cancel failed"))?;
        if !resp.is_success() {
            warn!(service, session_id, status = resp.status, "remote cancel rejected");
            return Err(FusionError::network(
                format!("cancel request rejected: HTTP {}", resp.status),
                None,
            ));
        }
        Ok(())
    }

    fn register(&self, session_id: &str) -> Registration<'_> {
        let mut registry = self
            .cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = registry
            .entry(session_id.to_string())
            .or_insert_with(|| WaitSlot {
                token: CancellationToken::new(),
                waiters: 0,
            });
        slot.waiters += 1;
        Registration {
            token: slot.token.clone(),
            session_id: session_id.to_string(),
            registry: &self.cancellations,
        }
    }

    #[cfg(test)]
    fn registered_sessions(&self) -> usize {
        self.cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn notify(options: &RunOptions, progress: f64) {
    if let Some(cb) = &options.on_progress {
        cb(progress);
    }
}

/// Releases the session's slot when the last wait on it ends.
struct Registration<'a> {
    token: CancellationToken,
    session_id: String,
    registry: &'a Mutex<HashMap<String, WaitSlot>>,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = registry.get_mut(&self.session_id) {
            slot.waiters = slot.waiters.saturating_sub(1);
            if slot.waiters == 0 {
                registry.remove(&self.session_id);
            }
        }
    }
}
