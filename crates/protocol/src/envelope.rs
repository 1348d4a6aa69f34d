use serde::{Deserialize, Serialize};

/// `{"data": ...}` wrapper used by every file-upload endpoint.
///
/// A missing `data` key decodes as `T::default()`, matching how the
/// server omits it on empty results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    /// Wraps `data` in an envelope.
    pub fn new(data: T) -> Self {
        Self { data }
    }

    /// Unwraps the payload.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: for<'de> Deserialize<'de> + Default> ApiEnvelope<T> {
    /// Decodes an envelope from a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}
