//! Job runner implementation.
//!
//! Drives one image through download, tiling and upload:
//! - Acceptance: resolve provider, write `pending` (caller waits)
//! - Execution: scratch dir, download, generate, fan-out (spawned)
//! - Completion: one terminal marker, scratch always removed

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use prometheus::IntGauge;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::fanout::{FanOutReport, UploadFanOut};
use crate::metrics::{JOBS_ACTIVE, JOBS_TOTAL, JOB_DURATION};
use crate::source::{SourceRegistry, SourceSettings, StorageSource};
use crate::tiler::TileGenerator;

use super::error::JobError;
use super::scratch::ScratchWorkspace;
use super::spawner::{JobSpawner, TokioSpawner};
use super::types::{JobKeys, JobOutcome, JobSpec, JobState, JobStatus, JobTicket};

/// A job whose `pending` marker is already written.
struct AcceptedJob {
    id: Uuid,
    spec: JobSpec,
    keys: JobKeys,
    source: Arc<dyn StorageSource>,
    started_at: DateTime<Utc>,
}

impl AcceptedJob {
    fn ticket(&self) -> JobTicket {
        JobTicket {
            job_id: self.id,
            status_container: self.spec.dest_container().to_string(),
            status_key: self.keys.status_key(),
        }
    }
}

/// Holds a gauge raised for as long as it lives.
struct ActiveGuard(IntGauge);

impl ActiveGuard {
    fn raise(gauge: &IntGauge) -> Self {
        gauge.inc();
        Self(gauge.clone())
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.dec();
    }
}

fn count_rejected() {
    JOBS_TOTAL.with_label_values(&["rejected"]).inc();
}

/// Runs tiling jobs against any registered storage provider.
pub struct JobRunner {
    registry: Arc<SourceRegistry>,
    tiler: Arc<dyn TileGenerator>,
    fan_out: UploadFanOut,
    scratch_root: PathBuf,
    defaults: SourceSettings,
    spawner: Arc<dyn JobSpawner>,
}

impl JobRunner {
    /// Create a runner with an unbounded fan-out and detached execution.
    pub fn new(
        registry: Arc<SourceRegistry>,
        tiler: Arc<dyn TileGenerator>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            tiler,
            fan_out: UploadFanOut::unbounded(),
            scratch_root: scratch_root.into(),
            defaults: SourceSettings::default(),
            spawner: Arc::new(TokioSpawner),
        }
    }

    /// Set the upload fan-out.
    pub fn with_fan_out(mut self, fan_out: UploadFanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Set provider settings applied under every job's own settings.
    pub fn with_default_settings(mut self, defaults: SourceSettings) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set where accepted jobs execute.
    pub fn with_spawner(mut self, spawner: Arc<dyn JobSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    /// Provider registry.
    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Tile generator.
    pub fn tiler(&self) -> &Arc<dyn TileGenerator> {
        &self.tiler
    }

    /// Root under which scratch directories are created.
    pub fn scratch_root(&self) -> &Path {
        &self.scratch_root
    }

    /// Accepts a job and hands it to the spawner.
    ///
    /// Returns once the `pending` marker is written. Provider and
    /// status-channel failures are returned here and leave no scratch
    /// directory; everything later is reported through the marker only.
    pub async fn submit(self: &Arc<Self>, spec: JobSpec) -> Result<JobTicket, JobError> {
        let job = self.accept(spec).await?;
        let ticket = job.ticket();

        let runner = Arc::clone(self);
        self.spawner
            .spawn(Box::pin(async move {
                runner.execute(job).await;
            }))
            .await;

        Ok(ticket)
    }

    /// Accepts a job and runs it to completion in the current task.
    pub async fn run(&self, spec: JobSpec) -> Result<JobOutcome, JobError> {
        let job = self.accept(spec).await?;
        Ok(self.execute(job).await)
    }

    async fn accept(&self, spec: JobSpec) -> Result<AcceptedJob, JobError> {
        let keys = JobKeys::from_image_key(&spec.image_key).inspect_err(|_| count_rejected())?;
        let settings = self.defaults.merged_with(&spec.settings);

        let source = self
            .registry
            .create(&spec.provider, &settings)
            .inspect_err(|_| count_rejected())?;

        let job = AcceptedJob {
            id: Uuid::new_v4(),
            spec,
            keys,
            source,
            started_at: Utc::now(),
        };

        if let Err(e) = self.write_status(&job, &JobStatus::Pending).await {
            count_rejected();
            return Err(JobError::StatusUnavailable(e));
        }

        info!(
            job_id = %job.id,
            provider = %job.spec.provider,
            container = %job.spec.source_container,
            image_key = %job.spec.image_key,
            state = %JobState::Pending,
            "Job accepted"
        );
        Ok(job)
    }

    async fn execute(&self, job: AcceptedJob) -> JobOutcome {
        let active = ActiveGuard::raise(&JOBS_ACTIVE);
        let timer = Instant::now();

        let result = self.run_stages(&job).await;

        let (status, failed_stage, files_uploaded) = match result {
            Ok(report) => {
                if let Err(e) = self.write_status(&job, &JobStatus::Ok).await {
                    // The pyramid is complete; the marker stays `pending`.
                    error!(
                        job_id = %job.id,
                        error = %e,
                        "Failed to write ok status marker"
                    );
                }
                info!(
                    job_id = %job.id,
                    files = report.uploaded,
                    bytes = report.bytes,
                    state = %JobState::Ok,
                    "Job finished"
                );
                (JobStatus::Ok, None, report.uploaded)
            }
            Err(e) => {
                let stage = e.stage();
                let status = JobStatus::Error(e.to_string());
                warn!(
                    job_id = %job.id,
                    stage = %stage,
                    state = %JobState::Error,
                    "Job failed: {}",
                    e
                );
                if let Err(write_err) = self.write_status(&job, &status).await {
                    error!(
                        job_id = %job.id,
                        error = %write_err,
                        "Failed to write error status marker"
                    );
                }
                (status, Some(stage), 0)
            }
        };

        let label = if failed_stage.is_none() { "ok" } else { "error" };
        JOBS_TOTAL.with_label_values(&[label]).inc();
        JOB_DURATION
            .with_label_values(&[label])
            .observe(timer.elapsed().as_secs_f64());
        drop(active);

        JobOutcome {
            job_id: job.id,
            status,
            failed_stage,
            files_uploaded,
            started_at: job.started_at,
            finished_at: Utc::now(),
        }
    }

    /// Runs every stage inside a fresh scratch directory, then removes it.
    async fn run_stages(&self, job: &AcceptedJob) -> Result<FanOutReport, JobError> {
        let scratch = ScratchWorkspace::create(&self.scratch_root)
            .await
            .map_err(JobError::Scratch)?;
        debug!(job_id = %job.id, scratch = %scratch.path().display(), "Scratch directory created");

        let result = self.run_in_scratch(job, scratch.path()).await;

        let path = scratch.path().to_path_buf();
        if let Err(e) = scratch.cleanup().await {
            warn!(
                job_id = %job.id,
                scratch = %path.display(),
                "Failed to remove scratch directory: {}",
                e
            );
        }

        result
    }

    async fn run_in_scratch(
        &self,
        job: &AcceptedJob,
        scratch_dir: &Path,
    ) -> Result<FanOutReport, JobError> {
        let zone = job.spec.zone();

        let image = job
            .source
            .download(&job.spec.source_container, &job.spec.image_key, zone)
            .await
            .map_err(JobError::Download)?;
        debug!(job_id = %job.id, bytes = image.len(), "Image downloaded");

        info!(job_id = %job.id, state = %JobState::Generating, tiler = self.tiler.name(), "Generating tiles");
        self.tiler
            .generate(scratch_dir, &image, &job.keys.base_name)
            .await?;
        drop(image);

        info!(job_id = %job.id, state = %JobState::Uploading, "Uploading pyramid");
        let report = self
            .fan_out
            .upload_all(
                scratch_dir,
                &job.keys.base_name,
                &job.keys.key_dir,
                job.spec.dest_container(),
                zone,
                Arc::clone(&job.source),
            )
            .await?;

        Ok(report)
    }

    async fn write_status(
        &self,
        job: &AcceptedJob,
        status: &JobStatus,
    ) -> Result<(), crate::source::SourceError> {
        job.source
            .upload(
                status.body(),
                &job.keys.status_key(),
                job.spec.dest_container(),
                job.spec.zone(),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::InlineSpawner;
    use crate::source::RegistryError;
    use crate::testing::{MockSource, MockTileGenerator};
    use crate::tiler::TilerError;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Harness {
        source: MockSource,
        tiler: MockTileGenerator,
        scratch: TempDir,
        runner: Arc<JobRunner>,
    }

    async fn harness() -> Harness {
        let source = MockSource::new();
        source
            .put_object("raw", "scans/slide.tiff", b"raster".to_vec())
            .await;
        let tiler = MockTileGenerator::new();
        let scratch = TempDir::new().unwrap();

        let mut registry = SourceRegistry::new();
        let shared = source.clone();
        registry.register("mock", move |_| {
            Ok(Arc::new(shared.clone()) as Arc<dyn StorageSource>)
        });

        let runner = JobRunner::new(
            Arc::new(registry),
            Arc::new(tiler.clone()),
            scratch.path().join("work"),
        )
        .with_spawner(Arc::new(InlineSpawner));

        Harness {
            source,
            tiler,
            scratch,
            runner: Arc::new(runner),
        }
    }

    fn spec() -> JobSpec {
        JobSpec::new("mock", "raw", "scans/slide.tiff")
    }

    fn scratch_entries(h: &Harness) -> usize {
        match std::fs::read_dir(h.runner.scratch_root()) {
            Ok(entries) => entries.count(),
            Err(_) => 0,
        }
    }

    #[tokio::test]
    async fn test_successful_job_publishes_pyramid() {
        let h = harness().await;

        let outcome = h.runner.run(spec()).await.unwrap();

        assert!(outcome.is_ok());
        assert_eq!(outcome.files_uploaded, h.tiler.files_per_pyramid().await);
        assert_eq!(
            h.source.write_history("raw", "scans/slide.txt").await,
            vec!["pending", "ok"]
        );
        assert!(h.source.object("raw", "scans/slide.dzi").await.is_some());
        assert!(h
            .source
            .object("raw", "scans/slide_files/2/3_0.jpeg")
            .await
            .is_some());
        assert_eq!(h.tiler.recorded_calls().await[0].base_name, "slide");
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_pending_precedes_every_tile_upload() {
        let h = harness().await;
        h.runner.run(spec()).await.unwrap();

        let uploads = h.source.recorded_uploads().await;
        assert_eq!(uploads.first().unwrap().key, "scans/slide.txt");
        assert_eq!(uploads.last().unwrap().key, "scans/slide.txt");
        assert_eq!(uploads.last().unwrap().data, b"ok");
    }

    #[tokio::test]
    async fn test_dest_container_and_zone() {
        let h = harness().await;
        let spec = spec().with_dest_container("public").with_zone("eu-west-1");

        let ticket = h.runner.submit(spec).await.unwrap();

        assert_eq!(ticket.status_container, "public");
        assert_eq!(ticket.status_key, "scans/slide.txt");
        assert_eq!(
            h.source.write_history("public", "scans/slide.txt").await,
            vec!["pending", "ok"]
        );
        assert!(h.source.uploaded_keys("raw").await.is_empty());
        assert!(h
            .source
            .recorded_uploads()
            .await
            .iter()
            .all(|u| u.zone.as_deref() == Some("eu-west-1")));
        assert_eq!(
            h.source.recorded_downloads().await[0].zone.as_deref(),
            Some("eu-west-1")
        );
    }

    #[tokio::test]
    async fn test_download_failure_writes_error_marker() {
        let h = harness().await;
        h.source.set_download_error("connection reset").await;

        let outcome = h.runner.run(spec()).await.unwrap();

        assert_eq!(outcome.failed_stage, Some(JobState::Pending));
        let history = h.source.write_history("raw", "scans/slide.txt").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], "pending");
        assert!(history[1].starts_with("error downloading image"));
        assert!(h.tiler.recorded_calls().await.is_empty());
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_uploads_nothing() {
        let h = harness().await;
        h.tiler
            .set_next_error(TilerError::process_failed("exit status: 1", "VipsForeignLoad: bad file"))
            .await;

        let outcome = h.runner.run(spec()).await.unwrap();

        assert_eq!(outcome.failed_stage, Some(JobState::Generating));
        match &outcome.status {
            JobStatus::Error(message) => {
                assert!(message.starts_with("error generating tiles"));
                assert!(message.contains("bad file"));
            }
            other => panic!("unexpected status: {other}"),
        }
        assert_eq!(h.source.uploaded_keys("raw").await, vec!["scans/slide.txt"; 2]);
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_upload_failure_attempts_every_file() {
        let h = harness().await;
        h.source.fail_upload("scans/slide_files/2/1_0.jpeg").await;

        let outcome = h.runner.run(spec()).await.unwrap();

        assert_eq!(outcome.failed_stage, Some(JobState::Uploading));
        let pyramid = h.tiler.files_per_pyramid().await;
        // pending + pyramid + error marker
        assert_eq!(h.source.recorded_uploads().await.len(), pyramid + 2);
        let history = h.source.write_history("raw", "scans/slide.txt").await;
        assert!(history[1].starts_with("error uploading tiles"));
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_unknown_provider_has_no_side_effects() {
        let h = harness().await;

        let err = h
            .runner
            .run(JobSpec::new("gcs", "raw", "scans/slide.tiff"))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::Provider(RegistryError::ProviderNotFound(_))));
        assert!(err.is_configuration());
        assert!(h.source.recorded_uploads().await.is_empty());
        assert!(!h.runner.scratch_root().exists());
    }

    #[tokio::test]
    async fn test_pending_write_failure_is_returned_to_caller() {
        let h = harness().await;
        h.source.fail_upload("scans/slide.txt").await;

        let err = h.runner.submit(spec()).await.unwrap_err();

        assert!(matches!(err, JobError::StatusUnavailable(_)));
        assert!(h.source.recorded_downloads().await.is_empty());
        assert_eq!(h.source.recorded_uploads().await.len(), 1);
        assert!(!h.runner.scratch_root().exists());
    }

    #[tokio::test]
    async fn test_ok_write_failure_leaves_single_terminal_attempt() {
        let h = harness().await;
        h.source.fail_upload_after("scans/slide.txt", 1).await;

        let outcome = h.runner.run(spec()).await.unwrap();

        assert!(outcome.is_ok());
        assert_eq!(
            h.source.write_history("raw", "scans/slide.txt").await,
            vec!["pending", "ok"]
        );
        assert_eq!(
            h.source.object("raw", "scans/slide.txt").await,
            Some(b"pending".to_vec())
        );
    }

    #[tokio::test]
    async fn test_invalid_image_key() {
        let h = harness().await;
        let rejected = JOBS_TOTAL.with_label_values(&["rejected"]);
        let before = rejected.get();

        let err = h
            .runner
            .run(JobSpec::new("mock", "raw", "scans/"))
            .await
            .unwrap_err();

        assert!(matches!(err, JobError::InvalidImageKey { .. }));
        assert!(h.source.recorded_uploads().await.is_empty());
        assert!(rejected.get() >= before + 1);
    }

    #[tokio::test]
    async fn test_scratch_failure_writes_error_marker() {
        let h = harness().await;
        let blocker = h.scratch.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let runner = JobRunner::new(
            Arc::new(h.runner.registry().clone()),
            Arc::new(h.tiler.clone()),
            blocker.join("scratch"),
        )
        .with_spawner(Arc::new(InlineSpawner));

        let outcome = runner.run(spec()).await.unwrap();

        assert_eq!(outcome.failed_stage, Some(JobState::Pending));
        let history = h.source.write_history("raw", "scans/slide.txt").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0], "pending");
        assert!(history[1].starts_with("error creating scratch workspace"));
        assert!(h.source.recorded_downloads().await.is_empty());
        assert!(h.tiler.recorded_calls().await.is_empty());
    }

    #[test]
    fn test_active_guard_lowers_gauge_on_panic() {
        let gauge = IntGauge::new("test_jobs_active", "test gauge").unwrap();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _active = ActiveGuard::raise(&gauge);
            assert_eq!(gauge.get(), 1);
            panic!("tiler blew up");
        }));

        assert!(result.is_err());
        assert_eq!(gauge.get(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_jobs_use_separate_scratch_dirs() {
        let h = harness().await;
        h.source
            .put_object("raw", "other/slide.tiff", b"raster two".to_vec())
            .await;
        h.tiler.set_delay(Duration::from_millis(20)).await;

        let (a, b) = tokio::join!(
            h.runner.run(spec()),
            h.runner.run(JobSpec::new("mock", "raw", "other/slide.tiff")),
        );
        assert!(a.unwrap().is_ok());
        assert!(b.unwrap().is_ok());

        let calls = h.tiler.recorded_calls().await;
        assert_eq!(calls.len(), 2);
        assert_ne!(calls[0].scratch_dir, calls[1].scratch_dir);
        assert_eq!(
            h.source.write_history("raw", "other/slide.txt").await,
            vec!["pending", "ok"]
        );
        assert_eq!(scratch_entries(&h), 0);
    }

    #[tokio::test]
    async fn test_submit_with_tokio_spawner_reaches_ok() {
        let h = harness().await;
        let runner = Arc::new(
            JobRunner::new(
                Arc::new(h.runner.registry().clone()),
                Arc::new(h.tiler.clone()),
                h.scratch.path().join("detached"),
            )
            .with_spawner(Arc::new(TokioSpawner)),
        );

        let ticket = runner.submit(spec()).await.unwrap();

        let body = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let body = h.source.object("raw", &ticket.status_key).await;
                if body.as_deref() == Some(b"ok".as_slice()) {
                    break body;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(body, Some(b"ok".to_vec()));
    }
}
