use std::sync::Arc;

use serde::Serialize;

use crate::config::ClientConfig;
use crate::error::FusionError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Shared request plumbing: endpoint URLs, auth, and per-request timeouts.
///
/// Only API endpoints carry the bearer token; presigned storage URLs go
/// through [`send_storage`](Self::send_storage) untouched.
pub(crate) struct ApiContext {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl ApiContext {
    pub(crate) fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub(crate) fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `{base_url}/{path}` with exactly one separating slash.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<HttpResponse, FusionError> {
        let request = HttpRequest::post(self.endpoint(path)).json(serde_json::to_value(body)?);
        self.send_api(request).await
    }

    pub(crate) async fn get(&self, path: &str) -> Result<HttpResponse, FusionError> {
        self.send_api(HttpRequest::get(self.endpoint(path))).await
    }

    async fn send_api(&self, request: HttpRequest) -> Result<HttpResponse, FusionError> {
        let request = request
            .bearer(&self.config.token)
            .header("accept", "application/json")
            .timeout(self.config.request_timeout);
        self.dispatch(request).await
    }

    /// Sends a request to a presigned storage URL with the upload timeout.
    pub(crate) async fn send_storage(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, FusionError> {
        self.dispatch(request.timeout(self.config.upload_timeout))
            .await
    }

    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, FusionError> {
        let method = request.method;
        let url = request.url.clone();
        tracing::debug!(?method, url = %url, "sending request");
        let resp = self.transport.send(request).await.map_err(|e| {
            FusionError::network(format!("{method:?} {url} failed"), Some(Box::new(e)))
        })?;
        tracing::debug!(?method, url = %url, status = resp.status, "received response");
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeApi;

    fn context(base_url: &str, fake: &Arc<FakeApi>) -> ApiContext {
        let config = ClientConfig::new("tok").with_base_url(base_url);
        ApiContext::new(config, fake.clone())
    }

    #[test]
    fn endpoint_joins_with_single_slash() {
        let fake = Arc::new(FakeApi::new());
        let api = context("https://api.test/v1/", &fake);
        assert_eq!(api.endpoint("/svc/submit"), "https://api.test/v1/svc/submit");
        let api = context("https://api.test/v1", &fake);
        assert_eq!(api.endpoint("svc/submit"), "https://api.test/v1/svc/submit");
    }

    #[tokio::test]
    async fn api_calls_carry_token_storage_calls_do_not() {
        let fake = Arc::new(FakeApi::new());
        let api = context("https://api.test/v1", &fake);

        api.get("svc/result/s-1").await.unwrap();
        api.send_storage(HttpRequest::put("https://storage.test/part/1"))
            .await
            .unwrap();

        let log = fake.requests();
        assert_eq!(log[0].authorization.as_deref(), Some("Bearer tok"));
        assert!(log[1].authorization.is_none());
        assert_eq!(log[1].timeout, Some(api.config().upload_timeout));
    }
}
