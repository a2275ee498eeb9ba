//! Spawn seam between accepting a job and running it.

use async_trait::async_trait;
use futures::future::BoxFuture;

/// Work handed to a spawner.
pub type JobFuture = BoxFuture<'static, ()>;

/// Decides where an accepted job runs.
///
/// The job reports only through its status marker, so spawners return
/// nothing.
#[async_trait]
pub trait JobSpawner: Send + Sync {
    /// Starts the job.
    async fn spawn(&self, job: JobFuture);
}

/// Runs jobs detached on the tokio runtime; the join handle is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawner;

#[async_trait]
impl JobSpawner for TokioSpawner {
    async fn spawn(&self, job: JobFuture) {
        tokio::spawn(job);
    }
}

/// Runs jobs to completion before `spawn` returns. Used in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineSpawner;

#[async_trait]
impl JobSpawner for InlineSpawner {
    async fn spawn(&self, job: JobFuture) {
        job.await;
    }
}
