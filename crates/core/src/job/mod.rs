//! Job orchestration: one image in, one published pyramid out.
//!
//! A job moves `pending -> generating -> uploading -> ok | error`. The only
//! channel back to whoever submitted it is a small status marker object
//! written next to the outputs (`<dir>/<base>.txt`) with the body
//! `pending`, `ok`, or the error text.
//!
//! # Example
//!
//! ```ignore
//! use dzpublish_core::job::{JobRunner, JobSpec};
//!
//! let runner = Arc::new(JobRunner::new(registry, tiler, "/var/tmp/dzpublish"));
//! let ticket = runner
//!     .submit(JobSpec::new("s3", "slides", "2024/scan.svs").with_zone("eu-west-1"))
//!     .await?;
//!
//! // Poll ticket.status_container / ticket.status_key for "ok".
//! ```

mod error;
mod runner;
mod scratch;
mod spawner;
mod types;

pub use error::JobError;
pub use runner::JobRunner;
pub use scratch::{ScratchWorkspace, SCRATCH_PREFIX};
pub use spawner::{InlineSpawner, JobFuture, JobSpawner, TokioSpawner};
pub use types::{
    JobKeys, JobOutcome, JobSpec, JobState, JobStatus, JobTicket, STATUS_EXTENSION,
};
