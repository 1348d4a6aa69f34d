fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use fusion_protocol::ApiEnvelope;
    use fusion_protocol::messages::{
        CompleteMultipartUploadRequest, CompleteMultipartUploadResponse, MultipartUploadCreated,
        PresignedPartUrl, PresignedPost, SubmitTaskResponse, TaskStatusResponse,
    };

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Normalizes JSON numbers so that `40` and `40.0` compare equal.
    ///
    /// The server sends integral progress values; `f64` fields re-serialize
    /// them with a fractional part.
    fn normalize_value(v: &serde_json::Value) -> serde_json::Value {
        match v {
            serde_json::Value::Number(n) => match n.as_f64() {
                Some(f) => serde_json::json!(f),
                None => v.clone(),
            },
            serde_json::Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), normalize_value(v)))
                    .collect(),
            ),
            serde_json::Value::Array(arr) => {
                serde_json::Value::Array(arr.iter().map(normalize_value).collect())
            }
            _ => v.clone(),
        }
    }

    /// Deserializes a fixture into `T`, re-serializes it, and compares the
    /// JSON values (order-independent, number-normalized).
    fn roundtrip_test<T>(name: &str) -> T
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            normalize_value(&fixture),
            normalize_value(&reserialized),
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  rust:   {reserialized}"
        );
        parsed
    }

    // --- Task endpoints ---

    #[test]
    fn fixture_submit_task_response() {
        let resp = roundtrip_test::<SubmitTaskResponse>("submit_task_response.json");
        assert_eq!(resp.session_id, "8f2c1e4a-33d0-4b7e-9d61-0a5b7c2e9f10");
    }

    #[test]
    fn fixture_task_status_processing() {
        let resp = roundtrip_test::<TaskStatusResponse>("task_status_processing.json");
        assert_eq!(resp.progress, Some(40.0));
        assert!(!resp.state.is_terminal());
    }

    #[test]
    fn fixture_task_status_completed() {
        let resp = roundtrip_test::<TaskStatusResponse>("task_status_completed.json");
        assert!(resp.state.is_terminal());
        assert_eq!(resp.data.as_ref().map(|d| d["pages"].clone()), Some(12.into()));
    }

    #[test]
    fn fixture_task_status_failed() {
        let resp = roundtrip_test::<TaskStatusResponse>("task_status_failed.json");
        assert!(resp.state.is_failure());
        assert_eq!(resp.error_message().as_deref(), Some("quota exceeded"));
    }

    // --- Upload endpoints ---

    #[test]
    fn fixture_presigned_post() {
        let env = roundtrip_test::<ApiEnvelope<PresignedPost>>("presigned_post.json");
        assert_eq!(env.data.fields.len(), 3);
        assert!(env.data.download_url.ends_with("a.png"));
    }

    #[test]
    fn fixture_multipart_created() {
        let env = roundtrip_test::<ApiEnvelope<MultipartUploadCreated>>("multipart_created.json");
        assert_eq!(env.data.part_size, Some(5 * 1024 * 1024));
    }

    #[test]
    fn fixture_presigned_part_urls() {
        let env = roundtrip_test::<ApiEnvelope<Vec<PresignedPartUrl>>>("presigned_part_urls.json");
        let numbers: Vec<_> = env.data.iter().filter_map(|u| u.part_number()).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn fixture_complete_multipart_request() {
        let req = roundtrip_test::<CompleteMultipartUploadRequest>(
            "complete_multipart_request.json",
        );
        assert!(req.parts.windows(2).all(|w| w[0].part_number < w[1].part_number));
    }

    #[test]
    fn fixture_complete_multipart_response() {
        let env = roundtrip_test::<ApiEnvelope<CompleteMultipartUploadResponse>>(
            "complete_multipart_response.json",
        );
        assert!(env.data.download_url.ends_with("archive.zip"));
    }
}
