//! Mock storage source for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::source::{SourceError, StorageSource};

/// Provider identifier reported by [`MockSource`].
pub const MOCK_PROVIDER: &str = "mock";

/// A recorded upload attempt for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub container: String,
    pub key: String,
    pub zone: Option<String>,
    /// Body that was sent.
    pub data: Vec<u8>,
    /// Whether the upload succeeded.
    pub success: bool,
}

/// A recorded download attempt for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDownload {
    pub container: String,
    pub key: String,
    pub zone: Option<String>,
}

#[derive(Debug, Default)]
struct MockSourceState {
    objects: HashMap<(String, String), Vec<u8>>,
    uploads: Vec<RecordedUpload>,
    downloads: Vec<RecordedDownload>,
    /// Key -> successful uploads still allowed before every later one fails.
    upload_failures: HashMap<String, usize>,
    download_error: Option<String>,
    upload_delay: Duration,
}

/// In-memory implementation of [`StorageSource`].
///
/// Clones share state, so a test can keep one handle while the runner owns
/// another:
/// - seed objects and inspect what was written
/// - fail uploads for chosen keys, immediately or after N successes
/// - fail every download
/// - slow uploads down and observe peak concurrency
///
/// # Example
///
/// ```rust,ignore
/// let source = MockSource::new();
/// source.fail_upload_after("scans/slide.txt", 1).await;
///
/// // ... run a job ...
///
/// let history = source.write_history("raw", "scans/slide.txt").await;
/// assert_eq!(history, vec!["pending"]);
/// ```
#[derive(Debug, Clone)]
pub struct MockSource {
    name: String,
    state: Arc<RwLock<MockSourceState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Create a new, empty mock source.
    pub fn new() -> Self {
        Self::with_name(MOCK_PROVIDER)
    }

    /// Create a mock source reporting a custom provider name.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(RwLock::new(MockSourceState::default())),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Store an object without recording an upload.
    pub async fn put_object(&self, container: &str, key: &str, data: Vec<u8>) {
        self.state
            .write()
            .await
            .objects
            .insert((container.to_string(), key.to_string()), data);
    }

    /// Current body of an object.
    pub async fn object(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        self.state
            .read()
            .await
            .objects
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    /// Make every upload to `key` fail.
    pub async fn fail_upload(&self, key: impl Into<String>) {
        self.fail_upload_after(key, 0).await;
    }

    /// Let `successes` uploads to `key` through, then fail the rest.
    pub async fn fail_upload_after(&self, key: impl Into<String>, successes: usize) {
        self.state
            .write()
            .await
            .upload_failures
            .insert(key.into(), successes);
    }

    /// Make every download fail with `message`.
    pub async fn set_download_error(&self, message: impl Into<String>) {
        self.state.write().await.download_error = Some(message.into());
    }

    /// Delay applied to every upload.
    pub async fn set_upload_delay(&self, delay: Duration) {
        self.state.write().await.upload_delay = delay;
    }

    /// Every upload attempt, in order.
    pub async fn recorded_uploads(&self) -> Vec<RecordedUpload> {
        self.state.read().await.uploads.clone()
    }

    /// Every download attempt, in order.
    pub async fn recorded_downloads(&self) -> Vec<RecordedDownload> {
        self.state.read().await.downloads.clone()
    }

    /// Keys successfully uploaded to `container`, in completion order.
    pub async fn uploaded_keys(&self, container: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .uploads
            .iter()
            .filter(|u| u.success && u.container == container)
            .map(|u| u.key.clone())
            .collect()
    }

    /// Bodies of every upload attempt to one key, failed ones included.
    pub async fn write_history(&self, container: &str, key: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .uploads
            .iter()
            .filter(|u| u.container == container && u.key == key)
            .map(|u| String::from_utf8_lossy(&u.data).into_owned())
            .collect()
    }

    /// Highest number of uploads observed running at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn download(
        &self,
        container: &str,
        key: &str,
        zone: Option<&str>,
    ) -> Result<Vec<u8>, SourceError> {
        let mut state = self.state.write().await;
        state.downloads.push(RecordedDownload {
            container: container.to_string(),
            key: key.to_string(),
            zone: zone.map(str::to_string),
        });

        if let Some(message) = &state.download_error {
            return Err(SourceError::Download {
                provider: self.name.clone(),
                container: container.to_string(),
                key: key.to_string(),
                source: injected(message.clone()),
            });
        }

        match state
            .objects
            .get(&(container.to_string(), key.to_string()))
        {
            Some(data) => Ok(data.clone()),
            None => Err(SourceError::Download {
                provider: self.name.clone(),
                container: container.to_string(),
                key: key.to_string(),
                source: object_store::Error::NotFound {
                    path: format!("{}/{}", container, key),
                    source: "no such object".into(),
                },
            }),
        }
    }

    async fn upload(
        &self,
        data: Vec<u8>,
        key: &str,
        container: &str,
        zone: Option<&str>,
    ) -> Result<(), SourceError> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(running, Ordering::SeqCst);

        let delay = self.state.read().await.upload_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        let success = match state.upload_failures.get_mut(key) {
            Some(0) => false,
            Some(remaining) => {
                *remaining -= 1;
                true
            }
            None => true,
        };

        state.uploads.push(RecordedUpload {
            container: container.to_string(),
            key: key.to_string(),
            zone: zone.map(str::to_string),
            data: data.clone(),
            success,
        });
        if success {
            state
                .objects
                .insert((container.to_string(), key.to_string()), data);
        }
        drop(state);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if success {
            Ok(())
        } else {
            Err(SourceError::Upload {
                provider: self.name.clone(),
                container: container.to_string(),
                key: key.to_string(),
                source: injected("upload rejected".to_string()),
            })
        }
    }
}

/// Provider-native error carrying an injected failure message.
fn injected(message: String) -> object_store::Error {
    object_store::Error::Generic {
        store: MOCK_PROVIDER,
        source: message.into(),
    }
}
