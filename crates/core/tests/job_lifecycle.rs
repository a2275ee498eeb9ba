//! Job lifecycle integration tests.
//!
//! These tests run complete jobs through the public API:
//! pending -> generating -> uploading -> ok | error

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use dzpublish_core::{
    source::LocalSource,
    testing::{MockSource, MockTileGenerator},
    InlineSpawner, JobError, JobRunner, JobSpec, JobStatus, SourceRegistry, SourceSettings,
    StorageSource, UploadConfig, UploadFanOut,
};

/// Test helper wiring a local-disk provider to a runner.
struct TestHarness {
    storage_root: PathBuf,
    scratch_root: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self {
            storage_root: temp_dir.path().join("storage"),
            scratch_root: temp_dir.path().join("scratch"),
            _temp_dir: temp_dir,
        }
    }

    fn settings(&self) -> SourceSettings {
        SourceSettings {
            local_root: Some(self.storage_root.clone()),
            ..Default::default()
        }
    }

    fn runner(&self, tiler: Arc<dyn dzpublish_core::TileGenerator>) -> Arc<JobRunner> {
        Arc::new(
            JobRunner::new(
                Arc::new(SourceRegistry::with_builtin_sources()),
                tiler,
                &self.scratch_root,
            )
            .with_default_settings(self.settings())
            .with_fan_out(UploadFanOut::new(UploadConfig::bounded(4)))
            .with_spawner(Arc::new(InlineSpawner)),
        )
    }

    fn seed(&self, container: &str, key: &str, data: &[u8]) {
        let path = self.storage_root.join(container).join(key);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, data).unwrap();
    }

    fn read(&self, container: &str, key: &str) -> Option<Vec<u8>> {
        std::fs::read(self.storage_root.join(container).join(key)).ok()
    }

    fn scratch_is_empty(&self) -> bool {
        match std::fs::read_dir(&self.scratch_root) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }
}

#[tokio::test]
async fn test_local_provider_round_trip() {
    let harness = TestHarness::new();
    let source = LocalSource::new(&harness.settings()).unwrap();

    let body = (0u8..=255).cycle().take(10_000).collect::<Vec<_>>();
    assert_ok!(source.upload(body.clone(), "a/b/blob.bin", "bucket", None).await);
    let downloaded = assert_ok!(source.download("bucket", "a/b/blob.bin", None).await);
    assert_eq!(downloaded, body);

    let missing = assert_err!(source.download("bucket", "a/b/none.bin", None).await);
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn test_job_publishes_to_local_storage() {
    let harness = TestHarness::new();
    harness.seed("raw", "scans/2024/slide.tiff", b"raster");
    let tiler = MockTileGenerator::new();
    tiler.set_levels(vec![(0, 1), (1, 2), (2, 6)]).await;
    let runner = harness.runner(Arc::new(tiler.clone()));

    let spec = JobSpec::new("local", "raw", "scans/2024/slide.tiff").with_dest_container("public");
    let ticket = assert_ok!(runner.submit(spec).await);

    assert_eq!(ticket.status_container, "public");
    assert_eq!(ticket.status_key, "scans/2024/slide.txt");
    assert_eq!(
        harness.read("public", "scans/2024/slide.txt"),
        Some(b"ok".to_vec())
    );
    assert!(harness.read("public", "scans/2024/slide.dzi").is_some());
    for i in 0..6 {
        let key = format!("scans/2024/slide_files/2/{}_0.jpeg", i);
        assert!(harness.read("public", &key).is_some(), "missing {}", key);
    }
    assert!(harness.read("public", "scans/2024/slide.tiff").is_none());
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_missing_image_leaves_error_marker() {
    let harness = TestHarness::new();
    let runner = harness.runner(Arc::new(MockTileGenerator::new()));

    let outcome = assert_ok!(runner.run(JobSpec::new("local", "raw", "scans/none.tiff")).await);

    assert!(!outcome.is_ok());
    let marker = harness.read("raw", "scans/none.txt").unwrap();
    match JobStatus::parse(&marker) {
        JobStatus::Error(message) => assert!(message.starts_with("error downloading image")),
        other => panic!("unexpected marker: {other}"),
    }
    assert!(harness.scratch_is_empty());
}

#[tokio::test]
async fn test_rejected_job_writes_nothing() {
    let harness = TestHarness::new();
    let runner = harness.runner(Arc::new(MockTileGenerator::new()));

    let err = assert_err!(runner.submit(JobSpec::new("gcs", "raw", "a.tiff")).await);
    assert!(matches!(err, JobError::Provider(_)));

    let err = assert_err!(runner.submit(JobSpec::new("local", "raw", "")).await);
    assert!(matches!(err, JobError::InvalidImageKey { .. }));

    assert!(!harness.storage_root.join("raw").exists());
    assert!(!harness.scratch_root.exists());
}

#[tokio::test]
async fn test_per_job_settings_override_defaults() {
    let harness = TestHarness::new();
    let other_root = harness.storage_root.with_file_name("other");
    let other = LocalSource::with_root(&other_root).unwrap();
    assert_ok!(other.upload(b"raster".to_vec(), "slide.tiff", "raw", None).await);

    let runner = harness.runner(Arc::new(MockTileGenerator::new()));
    let spec = JobSpec::new("local", "raw", "slide.tiff").with_settings(SourceSettings {
        local_root: Some(other_root.clone()),
        ..Default::default()
    });
    let outcome = assert_ok!(runner.run(spec).await);

    assert!(outcome.is_ok());
    assert_eq!(
        std::fs::read(other_root.join("raw/slide.txt")).unwrap(),
        b"ok"
    );
    assert!(harness.read("raw", "slide.txt").is_none());
}

#[tokio::test]
async fn test_many_jobs_share_one_runner() {
    let source = MockSource::new();
    let mut registry = SourceRegistry::new();
    let shared = source.clone();
    registry.register("mock", move |_| Ok(Arc::new(shared.clone()) as Arc<dyn StorageSource>));

    let scratch = TempDir::new().unwrap();
    let runner = Arc::new(JobRunner::new(
        Arc::new(registry),
        Arc::new(MockTileGenerator::new()),
        scratch.path(),
    ));

    for i in 0..8 {
        source
            .put_object("raw", &format!("batch/{}.tiff", i), vec![i as u8; 64])
            .await;
    }

    let mut handles = Vec::new();
    for i in 0..8 {
        let runner = Arc::clone(&runner);
        handles.push(tokio::spawn(async move {
            runner
                .run(JobSpec::new("mock", "raw", format!("batch/{}.tiff", i)))
                .await
        }));
    }
    for handle in handles {
        let outcome = assert_ok!(handle.await.unwrap());
        assert!(outcome.is_ok());
    }

    for i in 0..8 {
        assert_eq!(
            source.write_history("raw", &format!("batch/{}.txt", i)).await,
            vec!["pending", "ok"]
        );
    }
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}

#[cfg(unix)]
mod vips_script {
    use super::*;
    use dzpublish_core::{TilerConfig, VipsTileGenerator};
    use std::os::unix::fs::PermissionsExt;

    fn fake_vips(dir: &Path) -> PathBuf {
        let path = dir.join("vips");
        std::fs::write(
            &path,
            r#"#!/bin/sh
[ "$1" = "dzsave" ] || exit 2
[ -s "$2" ] || { echo "empty input" >&2; exit 1; }
echo '<Image TileSize="254"/>' > "$3.dzi"
mkdir -p "$3_files/0" "$3_files/1"
echo a > "$3_files/0/0_0.jpeg"
echo b > "$3_files/1/0_0.jpeg"
echo c > "$3_files/1/1_0.jpeg"
"#,
        )
        .unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn test_end_to_end_with_tiling_tool() {
        let harness = TestHarness::new();
        let bin = TempDir::new().unwrap();
        let tiler = VipsTileGenerator::new(TilerConfig::with_vips_path(fake_vips(bin.path())));
        harness.seed("raw", "x/scan.svs", b"raster");
        let runner = harness.runner(Arc::new(tiler));

        let outcome = assert_ok!(runner.run(JobSpec::new("local", "raw", "x/scan.svs")).await);

        assert!(outcome.is_ok());
        assert_eq!(outcome.files_uploaded, 4);
        assert_eq!(harness.read("raw", "x/scan.txt"), Some(b"ok".to_vec()));
        assert_eq!(harness.read("raw", "x/scan_files/1/1_0.jpeg"), Some(b"c\n".to_vec()));
        assert!(harness.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_tool_failure_reaches_marker() {
        let harness = TestHarness::new();
        let bin = TempDir::new().unwrap();
        let tiler = VipsTileGenerator::new(TilerConfig::with_vips_path(fake_vips(bin.path())));
        harness.seed("raw", "x/empty.tiff", b"");
        let runner = harness.runner(Arc::new(tiler));

        let outcome = assert_ok!(runner.run(JobSpec::new("local", "raw", "x/empty.tiff")).await);

        let marker = String::from_utf8(harness.read("raw", "x/empty.txt").unwrap()).unwrap();
        assert!(marker.starts_with("error generating tiles"));
        assert!(marker.contains("empty input"));
        assert_eq!(outcome.status, JobStatus::Error(marker));
        assert!(harness.scratch_is_empty());
    }
}
