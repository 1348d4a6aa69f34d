//! Scripted in-memory Fusion API for unit tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use fusion_protocol::constants::{
    COMPLETE_MULTIPART_UPLOAD_PATH, CREATE_MULTIPART_UPLOAD_PATH, DEFAULT_PART_SIZE,
    GENERATE_PRESIGNED_URL_PATH, GENERATE_PRESIGNED_URLS_PATH,
};
use serde_json::{Value, json};

use crate::client::FusionClient;
use crate::config::ClientConfig;
use crate::transport::{HttpRequest, HttpResponse, Method, RequestBody, Transport, TransportError};

pub(crate) const BASE_URL: &str = "https://api.test/v1";
pub(crate) const SINGLE_UPLOAD_URL: &str = "https://storage.test/form";
pub(crate) const PART_URL_PREFIX: &str = "https://storage.test/part/";
pub(crate) const SINGLE_DOWNLOAD_URL: &str = "https://cdn.test/uploads/single";
pub(crate) const MULTIPART_DOWNLOAD_URL: &str = "https://cdn.test/uploads/multipart";
pub(crate) const UPLOAD_ID: &str = "upload-1";
pub(crate) const STORAGE_KEY: &str = "uploads/object-key";

/// What the next status query returns.
pub(crate) enum StatusStep {
    Reply(Value),
    HttpStatus(u16),
    Disconnect,
}

impl StatusStep {
    pub(crate) fn state(state: &str) -> Self {
        Self::Reply(json!({ "state": state }))
    }

    pub(crate) fn progress(state: &str, progress: f64) -> Self {
        Self::Reply(json!({ "state": state, "progress": progress }))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub timeout: Option<Duration>,
    pub json: Option<Value>,
    pub form_fields: Option<BTreeMap<String, String>>,
    pub body_len: usize,
}

struct Script {
    submit: (u16, String),
    statuses: VecDeque<StatusStep>,
    part_size: Option<u64>,
    part_failures: HashMap<u32, u32>,
    missing_etags: HashMap<u32, u32>,
    single_failures: VecDeque<(u16, &'static str)>,
    presigned_urls: Option<Value>,
    complete_status: u16,
    cancel_status: u16,
}

pub(crate) struct FakeApi {
    script: Mutex<Script>,
    log: Mutex<Vec<RecordedRequest>>,
    put_delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeApi {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                submit: (200, r#"{"sessionID":"session-1","success":true}"#.into()),
                statuses: VecDeque::new(),
                part_size: Some(DEFAULT_PART_SIZE),
                part_failures: HashMap::new(),
                missing_etags: HashMap::new(),
                single_failures: VecDeque::new(),
                presigned_urls: None,
                complete_status: 200,
                cancel_status: 200,
            }),
            log: Mutex::new(Vec::new()),
            put_delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    fn edit(self, f: impl FnOnce(&mut Script)) -> Self {
        f(&mut self.script.lock().unwrap());
        self
    }

    pub(crate) fn submit_reply(self, status: u16, body: &str) -> Self {
        self.edit(|s| s.submit = (status, body.to_string()))
    }

    /// Status replies in order; once exhausted every query sees `processing`.
    pub(crate) fn statuses(self, steps: Vec<StatusStep>) -> Self {
        self.edit(|s| s.statuses = steps.into())
    }

    pub(crate) fn part_size(self, part_size: Option<u64>) -> Self {
        self.edit(|s| s.part_size = part_size)
    }

    /// Part `n` answers 500 for its first `times` attempts.
    pub(crate) fn fail_part(self, n: u32, times: u32) -> Self {
        self.edit(|s| {
            s.part_failures.insert(n, times);
        })
    }

    /// Part `n` answers 200 without an ETag for its first `times` attempts.
    pub(crate) fn omit_etag(self, n: u32, times: u32) -> Self {
        self.edit(|s| {
            s.missing_etags.insert(n, times);
        })
    }

    /// Leading form-upload replies before the storage accepts the file.
    pub(crate) fn single_failures(self, failures: Vec<(u16, &'static str)>) -> Self {
        self.edit(|s| s.single_failures = failures.into())
    }

    pub(crate) fn presigned_urls(self, data: Value) -> Self {
        self.edit(|s| s.presigned_urls = Some(data))
    }

    pub(crate) fn complete_status(self, status: u16) -> Self {
        self.edit(|s| s.complete_status = status)
    }

    pub(crate) fn cancel_status(self, status: u16) -> Self {
        self.edit(|s| s.cancel_status = status)
    }

    /// Base PUT latency; part `n` takes `(n % 3 + 1)` times this, so parts
    /// finish out of order.
    pub(crate) fn put_delay(mut self, delay: Duration) -> Self {
        self.put_delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.log.lock().unwrap().clone()
    }

    /// Requests whose URL contains `needle`.
    pub(crate) fn requests_to(&self, needle: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.contains(needle))
            .collect()
    }

    /// Requests whose URL ends with `suffix`.
    pub(crate) fn requests_at(&self, suffix: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url.ends_with(suffix))
            .collect()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, request: &HttpRequest) {
        let (json, form_fields, content_type, body_len) = match &request.body {
            RequestBody::Empty => (None, None, None, 0),
            RequestBody::Json(v) => (Some(v.clone()), None, None, 0),
            RequestBody::Binary { content_type, data } => {
                (None, None, Some(content_type.clone()), data.len())
            }
            RequestBody::Form(form) => (
                None,
                Some(form.fields.clone()),
                Some(form.content_type.clone()),
                form.data.len(),
            ),
        };
        self.log.lock().unwrap().push(RecordedRequest {
            method: request.method,
            url: request.url.clone(),
            authorization: request.header_value("authorization").map(str::to_string),
            content_type,
            timeout: request.timeout,
            json,
            form_fields,
            body_len,
        });
    }

    async fn handle(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.record(&request);
        if let Some(n) = request.url.strip_prefix(PART_URL_PREFIX) {
            let n = n.parse().unwrap_or(0);
            return Ok(self.put_part(n).await);
        }
        if request.url == SINGLE_UPLOAD_URL {
            return Ok(self.form_upload());
        }
        self.route_api(&request)
    }

    async fn put_part(&self, n: u32) -> HttpResponse {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.put_delay.is_zero() {
            tokio::time::sleep(self.put_delay * (n % 3 + 1)).await;
        }
        let (fail, omit_etag) = {
            let mut script = self.script.lock().unwrap();
            (
                take_one(&mut script.part_failures, n),
                take_one(&mut script.missing_etags, n),
            )
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if fail {
            HttpResponse::new(500, "internal error")
        } else if omit_etag {
            HttpResponse::new(200, "")
        } else {
            HttpResponse::new(200, "").with_header("ETag", format!("\"etag-{n}\""))
        }
    }

    fn form_upload(&self) -> HttpResponse {
        match self.script.lock().unwrap().single_failures.pop_front() {
            Some((status, body)) => HttpResponse::new(status, body),
            None => HttpResponse::new(204, ""),
        }
    }

    fn route_api(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request
            .url
            .strip_prefix(BASE_URL)
            .unwrap_or(&request.url)
            .trim_start_matches('/');
        let mut script = self.script.lock().unwrap();

        let resp = if path.ends_with("/submit") {
            HttpResponse::new(script.submit.0, script.submit.1.clone())
        } else if path.contains("/result/") {
            match script.statuses.pop_front() {
                Some(StatusStep::Reply(v)) => HttpResponse::new(200, v.to_string()),
                Some(StatusStep::HttpStatus(code)) => HttpResponse::new(code, "unavailable"),
                Some(StatusStep::Disconnect) => {
                    return Err(TransportError::Connection("connection reset".into()));
                }
                None => HttpResponse::new(200, r#"{"state":"processing"}"#),
            }
        } else if path.contains("/cancel/") {
            HttpResponse::new(script.cancel_status, "{}")
        } else if path == GENERATE_PRESIGNED_URL_PATH {
            reply(json!({ "data": {
                "uploadURL": SINGLE_UPLOAD_URL,
                "fields": { "key": "uploads/abc", "policy": "p0l1cy" },
                "downloadURL": SINGLE_DOWNLOAD_URL,
            }}))
        } else if path == CREATE_MULTIPART_UPLOAD_PATH {
            reply(json!({ "data": {
                "uploadID": UPLOAD_ID,
                "key": STORAGE_KEY,
                "partSize": script.part_size,
            }}))
        } else if path == GENERATE_PRESIGNED_URLS_PATH {
            match &script.presigned_urls {
                Some(data) => reply(json!({ "data": data })),
                None => {
                    let numbers: Vec<u64> = request
                        .body_json()
                        .and_then(|v| v.get("partNumbers").cloned())
                        .and_then(|v| serde_json::from_value(v).ok())
                        .unwrap_or_default();
                    // Reverse order: the client must match by partNumber.
                    let urls: Vec<Value> = numbers
                        .iter()
                        .rev()
                        .map(|n| json!({ "partNumber": n, "uploadURL": format!("{PART_URL_PREFIX}{n}") }))
                        .collect();
                    reply(json!({ "data": urls }))
                }
            }
        } else if path == COMPLETE_MULTIPART_UPLOAD_PATH {
            if script.complete_status == 200 {
                reply(json!({ "data": { "downloadURL": MULTIPART_DOWNLOAD_URL } }))
            } else {
                HttpResponse::new(script.complete_status, "complete failed")
            }
        } else {
            HttpResponse::new(404, "not found")
        };
        Ok(resp)
    }
}

impl Transport for FakeApi {
    fn send(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + Send + '_>> {
        Box::pin(self.handle(request))
    }
}

impl HttpRequest {
    fn body_json(&self) -> Option<&Value> {
        match &self.body {
            RequestBody::Json(v) => Some(v),
            _ => None,
        }
    }
}

fn take_one(counts: &mut HashMap<u32, u32>, n: u32) -> bool {
    match counts.get_mut(&n) {
        Some(left) if *left > 0 => {
            *left -= 1;
            true
        }
        _ => false,
    }
}

fn reply(body: Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string()).with_header("content-type", "application/json")
}

pub(crate) fn test_config() -> ClientConfig {
    ClientConfig::new("test-token").with_base_url(BASE_URL)
}

pub(crate) fn client_for(fake: &Arc<FakeApi>) -> FusionClient {
    FusionClient::with_transport(test_config(), fake.clone()).unwrap()
}
