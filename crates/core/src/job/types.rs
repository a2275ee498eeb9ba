//! Types for the job module.

use chrono::{DateTime, Utc};
use object_store::path::Path as ObjectPath;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::fanout::join_key;
use crate::source::SourceSettings;

use super::error::JobError;

/// Extension of the status marker object.
pub const STATUS_EXTENSION: &str = "txt";

/// Immutable description of one tiling job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Registered provider identifier (e.g. "azure", "s3").
    pub provider: String,
    /// Container holding the source image.
    pub source_container: String,
    /// Key of the source image.
    pub image_key: String,
    /// Container receiving the pyramid and status marker.
    /// Defaults to the source container.
    #[serde(default)]
    pub dest_container: Option<String>,
    /// Zone / region for region-scoped providers.
    #[serde(default)]
    pub zone: Option<String>,
    /// Per-job provider settings, layered over the configured defaults.
    #[serde(default)]
    pub settings: SourceSettings,
}

impl JobSpec {
    /// Creates a job that publishes next to the source image.
    pub fn new(
        provider: impl Into<String>,
        source_container: impl Into<String>,
        image_key: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            source_container: source_container.into(),
            image_key: image_key.into(),
            dest_container: None,
            zone: None,
            settings: SourceSettings::default(),
        }
    }

    /// Sets the destination container.
    pub fn with_dest_container(mut self, container: impl Into<String>) -> Self {
        self.dest_container = Some(container.into());
        self
    }

    /// Sets the zone.
    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }

    /// Sets per-job provider settings.
    pub fn with_settings(mut self, settings: SourceSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Container receiving the pyramid and status marker.
    pub fn dest_container(&self) -> &str {
        self.dest_container
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.source_container)
    }

    /// Zone, if a non-empty one was given.
    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref().filter(|z| !z.is_empty())
    }
}

/// Remote key layout derived from the image key.
///
/// `scans/2024/slide.tiff` gives directory `scans/2024/` and base name
/// `slide`; the marker lives at `scans/2024/slide.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobKeys {
    /// Everything up to and including the last `/`, or empty.
    pub key_dir: String,
    /// Final segment without its last extension.
    pub base_name: String,
}

impl JobKeys {
    /// Derives the key layout from an image key.
    pub fn from_image_key(image_key: &str) -> Result<Self, JobError> {
        let invalid = |reason| JobError::InvalidImageKey {
            key: image_key.to_string(),
            reason,
        };

        if image_key.is_empty() {
            return Err(invalid("key is empty"));
        }
        if image_key.ends_with('/') {
            return Err(invalid("key names a directory"));
        }
        // Providers parse the key the same way on every request.
        if ObjectPath::parse(image_key).is_err() {
            return Err(invalid("key is not a valid object path"));
        }

        let (key_dir, file_name) = match image_key.rfind('/') {
            Some(i) => (&image_key[..=i], &image_key[i + 1..]),
            None => ("", image_key),
        };

        let base_name = match file_name.rfind('.') {
            Some(i) if i > 0 => &file_name[..i],
            _ => file_name,
        };

        if base_name == "." || base_name == ".." || base_name.contains('\\') {
            return Err(invalid("file name is not usable"));
        }

        Ok(Self {
            key_dir: key_dir.to_string(),
            base_name: base_name.to_string(),
        })
    }

    /// Key of the status marker.
    pub fn status_key(&self) -> String {
        join_key(
            &self.key_dir,
            &format!("{}.{}", self.base_name, STATUS_EXTENSION),
        )
    }

    /// Key of the deep zoom index.
    pub fn index_key(&self) -> String {
        join_key(&self.key_dir, &format!("{}.dzi", self.base_name))
    }
}

/// Body of the status marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, work in progress.
    Pending,
    /// Pyramid fully published.
    Ok,
    /// Job failed; the message is the marker body.
    Error(String),
}

impl JobStatus {
    /// Marker body bytes.
    pub fn body(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }

    /// Interprets a marker body.
    pub fn parse(body: &[u8]) -> Self {
        match String::from_utf8_lossy(body).as_ref() {
            "pending" => Self::Pending,
            "ok" => Self::Ok,
            other => Self::Error(other.to_string()),
        }
    }

    /// Whether this status ends the job.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Ok => f.write_str("ok"),
            Self::Error(message) => f.write_str(message),
        }
    }
}

/// Stage of a running job, used for logging and failure attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    Generating,
    Uploading,
    Ok,
    Error,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Generating => "generating",
            Self::Uploading => "uploading",
            Self::Ok => "ok",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

/// Handle returned once a job is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobTicket {
    pub job_id: Uuid,
    /// Container holding the status marker.
    pub status_container: String,
    /// Key of the status marker to poll.
    pub status_key: String,
}

/// Final result of a job run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobOutcome {
    pub job_id: Uuid,
    /// Terminal status the job ended in.
    pub status: JobStatus,
    /// Stage that failed, if any.
    pub failed_stage: Option<JobState>,
    /// Files uploaded (index included).
    pub files_uploaded: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobOutcome {
    /// Whether the job finished with `ok`.
    pub fn is_ok(&self) -> bool {
        self.status == JobStatus::Ok
    }
}
