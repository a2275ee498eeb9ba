//! Concurrent upload of a generated pyramid.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::metrics::{TILES_UPLOADED, UPLOADS_TOTAL};
use crate::source::StorageSource;
use crate::tiler::TileArtifacts;

use super::config::UploadConfig;
use super::error::{FanOutError, UploadTaskError};
use super::keys::{destination_key, join_key};

/// Summary of a successful fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Tasks scheduled (index + tiles).
    pub scheduled: usize,
    /// Tasks that completed successfully.
    pub uploaded: usize,
    /// Total bytes uploaded.
    pub bytes: u64,
}

/// Shared, read-only state of one fan-out.
struct UploadContext {
    source: Arc<dyn StorageSource>,
    container: String,
    zone: Option<String>,
    limiter: Option<Arc<Semaphore>>,
}

type TaskResult = Result<u64, UploadTaskError>;

/// Uploads an index file and its whole tile tree, one task per file.
///
/// Every discoverable file is scheduled before the join, failures never stop
/// the traversal, and the join waits for every task. The optional
/// `max_concurrent` bound only changes how many uploads are in flight.
#[derive(Debug, Clone, Default)]
pub struct UploadFanOut {
    config: UploadConfig,
}

impl UploadFanOut {
    /// Creates a fan-out with the given configuration.
    pub fn new(config: UploadConfig) -> Self {
        Self { config }
    }

    /// Creates an unbounded fan-out.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Uploads `<scratch_dir>/<base_name>.dzi` and every file below
    /// `<scratch_dir>/<base_name>_files/` into `dest_container`.
    ///
    /// Keys are `dest_prefix` followed by the file's path relative to
    /// `scratch_dir`.
    pub async fn upload_all(
        &self,
        scratch_dir: &Path,
        base_name: &str,
        dest_prefix: &str,
        dest_container: &str,
        zone: Option<&str>,
        source: Arc<dyn StorageSource>,
    ) -> Result<FanOutReport, FanOutError> {
        let artifacts = TileArtifacts::expected(scratch_dir, base_name);
        let context = Arc::new(UploadContext {
            source,
            container: dest_container.to_string(),
            zone: zone.map(str::to_string),
            limiter: self
                .config
                .max_concurrent
                .map(|limit| Arc::new(Semaphore::new(limit.max(1)))),
        });

        let mut tasks: JoinSet<TaskResult> = JoinSet::new();

        let index_key = join_key(dest_prefix, &format!("{}.dzi", base_name));
        spawn_upload(&mut tasks, &context, artifacts.index_path.clone(), index_key);

        if let Err(e) = schedule_tree(
            &mut tasks,
            &context,
            scratch_dir,
            &artifacts.tiles_dir,
            dest_prefix,
        )
        .await
        {
            let drained = tasks.len();
            while tasks.join_next().await.is_some() {}
            warn!(error = %e, drained, "Tile traversal failed, drained scheduled uploads");
            return Err(e);
        }

        let scheduled = tasks.len();
        debug!(scheduled, container = dest_container, "Uploads scheduled");

        let report = join_all(&mut tasks, scheduled).await?;
        info!(
            uploaded = report.uploaded,
            bytes = report.bytes,
            container = dest_container,
            prefix = dest_prefix,
            "Pyramid uploaded"
        );
        Ok(report)
    }
}

/// Walks the tile tree and schedules one upload per non-directory entry.
async fn schedule_tree(
    tasks: &mut JoinSet<TaskResult>,
    context: &Arc<UploadContext>,
    scratch_dir: &Path,
    tiles_dir: &Path,
    dest_prefix: &str,
) -> Result<(), FanOutError> {
    let walk_error = |path: &Path, source| FanOutError::Walk {
        path: path.to_path_buf(),
        source,
    };

    let mut directories = vec![tiles_dir.to_path_buf()];
    while let Some(dir) = directories.pop() {
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| walk_error(&dir, e))?;

        while let Some(entry) = entries.next_entry().await.map_err(|e| walk_error(&dir, e))? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(|e| walk_error(&path, e))?;

            if file_type.is_dir() {
                directories.push(path);
                continue;
            }

            let key = destination_key(dest_prefix, scratch_dir, &path)?;
            spawn_upload(tasks, context, path, key);
        }
    }

    Ok(())
}

fn spawn_upload(
    tasks: &mut JoinSet<TaskResult>,
    context: &Arc<UploadContext>,
    path: PathBuf,
    key: String,
) {
    let context = Arc::clone(context);
    tasks.spawn(async move {
        let _permit = match &context.limiter {
            Some(limiter) => Arc::clone(limiter).acquire_owned().await.ok(),
            None => None,
        };

        let result = upload_file(&context, path, &key).await;
        let outcome = if result.is_ok() { "success" } else { "failed" };
        UPLOADS_TOTAL.with_label_values(&[outcome]).inc();
        result
    });
}

async fn upload_file(context: &UploadContext, path: PathBuf, key: &str) -> TaskResult {
    let data = match fs::read(&path).await {
        Ok(data) => data,
        Err(source) => return Err(UploadTaskError::Read { path, source }),
    };
    let bytes = data.len() as u64;

    if let Err(source) = context
        .source
        .upload(data, key, &context.container, context.zone.as_deref())
        .await
    {
        return Err(UploadTaskError::Upload { path, source });
    }

    debug!(key, bytes, "Uploaded");
    Ok(bytes)
}

/// Waits for every task; keeps the first failure observed.
async fn join_all(
    tasks: &mut JoinSet<TaskResult>,
    scheduled: usize,
) -> Result<FanOutReport, FanOutError> {
    enum FirstFailure {
        Task(UploadTaskError),
        Panic(String),
    }

    let mut report = FanOutReport {
        scheduled,
        ..Default::default()
    };
    let mut failed = 0;
    let mut first: Option<FirstFailure> = None;

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(bytes)) => {
                report.uploaded += 1;
                report.bytes += bytes;
            }
            Ok(Err(e)) => {
                failed += 1;
                warn!(error = %e, "Upload failed");
                if first.is_none() {
                    first = Some(FirstFailure::Task(e));
                }
            }
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Upload task aborted");
                if first.is_none() {
                    first = Some(FirstFailure::Panic(e.to_string()));
                }
            }
        }
    }

    TILES_UPLOADED.observe(report.uploaded as f64);

    match first {
        None => Ok(report),
        Some(FirstFailure::Task(source)) => Err(FanOutError::Upload {
            failed,
            scheduled,
            source,
        }),
        Some(FirstFailure::Panic(message)) => Err(FanOutError::TaskPanicked {
            failed,
            scheduled,
            message,
        }),
    }
}
