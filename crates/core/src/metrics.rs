//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Jobs (started, finished by result, duration, active)
//! - Uploads (per-file results, files per pyramid)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Job Metrics
// =============================================================================

/// Jobs finished total by result.
pub static JOBS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dzpublish_jobs_total", "Total jobs finished"),
        &["result"], // "ok", "error"
    )
    .unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("dzpublish_job_duration_seconds", "Duration of tiling jobs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

/// Jobs currently running.
pub static JOBS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("dzpublish_jobs_active", "Number of jobs currently running").unwrap()
});

// =============================================================================
// Upload Metrics
// =============================================================================

/// File uploads total by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dzpublish_uploads_total", "Total file uploads"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Files uploaded per pyramid.
pub static TILES_UPLOADED: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "dzpublish_tiles_uploaded",
            "Number of files uploaded per pyramid",
        )
        .buckets(vec![1.0, 10.0, 100.0, 1000.0, 10000.0, 100000.0]),
    )
    .unwrap()
});

/// All core metrics, for registration in the server registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(JOBS_TOTAL.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(JOBS_ACTIVE.clone()),
        Box::new(UPLOADS_TOTAL.clone()),
        Box::new(TILES_UPLOADED.clone()),
    ]
}
