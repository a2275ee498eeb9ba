//! Common test utilities for API testing with mocks.
//!
//! This module provides a test fixture that builds the router in-process
//! with a mock storage provider and a mock tile generator, so requests run
//! complete jobs without cloud accounts or a tiling tool.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use dzpublish_core::{
    testing::{MockSource, MockTileGenerator, MOCK_PROVIDER},
    Config, InlineSpawner, JobRunner, SourceRegistry, StorageSource,
};

/// Test fixture with mock dependencies.
///
/// Jobs run inline, so by the time a `POST /api/v1/jobs` response arrives
/// the job has finished and its marker is in `source`.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_submit() {
///     let fixture = TestFixture::new().await;
///     fixture.seed_image("raw", "scans/slide.tiff").await;
///
///     let response = fixture.post("/api/v1/jobs", json!({
///         "provider": "mock",
///         "container": "raw",
///         "image_key": "scans/slide.tiff"
///     })).await;
///
///     assert_eq!(response.status, 202);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock storage - seed images, inspect uploads and markers
    pub source: MockSource,
    /// Mock tile generator - shape pyramids, inject failures
    pub tiler: MockTileGenerator,
    /// Temporary directory holding the scratch root
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let source = MockSource::new();
        let tiler = MockTileGenerator::new();

        let mut config = Config::default();
        config.scratch.root = temp_dir.path().join("scratch");
        config.storage.azure.account_key = Some("c2VjcmV0".to_string());

        let mut registry = SourceRegistry::with_builtin_sources();
        let shared = source.clone();
        registry.register(MOCK_PROVIDER, move |_| {
            Ok(Arc::new(shared.clone()) as Arc<dyn StorageSource>)
        });

        let runner = JobRunner::new(
            Arc::new(registry),
            Arc::new(tiler.clone()),
            config.scratch.root.clone(),
        )
        .with_default_settings(config.storage.source_settings())
        .with_spawner(Arc::new(InlineSpawner));

        let state = Arc::new(dzpublish_server::state::AppState::new(
            config,
            Arc::new(runner),
        ));
        let router = dzpublish_server::api::create_router(state);

        Self {
            router,
            source,
            tiler,
            temp_dir,
        }
    }

    /// Store a source image in the mock provider.
    pub async fn seed_image(&self, container: &str, key: &str) {
        self.source
            .put_object(container, key, b"raster".to_vec())
            .await;
    }

    /// Number of entries left in the scratch root.
    pub fn scratch_entries(&self) -> usize {
        std::fs::read_dir(self.temp_dir.path().join("scratch"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status, $response.status, $response.text
        );
    };
}
