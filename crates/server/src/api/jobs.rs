//! Job API handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use dzpublish_core::{JobError, JobSpec, JobTicket, SourceSettings};

use crate::metrics::JOBS_SUBMITTED_TOTAL;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a tiling job
#[derive(Debug, Deserialize)]
pub struct CreateJobBody {
    /// Storage provider identifier ("azure", "azure_sas", "s3", ...)
    pub provider: String,
    /// Container holding the source image
    pub container: String,
    /// Key of the source image
    pub image_key: String,
    /// Container receiving the pyramid (defaults to `container`)
    pub dest_container: Option<String>,
    /// Region for region-scoped providers
    pub zone: Option<String>,
    /// Storage account, overriding the configured one
    pub account_name: Option<String>,
    /// SAS token for `azure_sas`
    pub sas_token: Option<String>,
}

impl CreateJobBody {
    fn validate(&self) -> Result<(), String> {
        for (field, value) in [
            ("provider", &self.provider),
            ("container", &self.container),
            ("image_key", &self.image_key),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} cannot be empty", field));
            }
        }
        Ok(())
    }

    fn into_spec(self) -> JobSpec {
        let settings = SourceSettings {
            account_name: self.account_name,
            sas_token: self.sas_token,
            ..Default::default()
        };

        JobSpec {
            provider: self.provider,
            source_container: self.container,
            image_key: self.image_key,
            dest_container: self.dest_container,
            zone: self.zone,
            settings,
        }
    }
}

/// Response for an accepted job
#[derive(Debug, Serialize)]
pub struct JobAcceptedResponse {
    pub job_id: String,
    /// Container holding the status marker
    pub status_container: String,
    /// Key of the status marker to poll
    pub status_key: String,
}

impl From<JobTicket> for JobAcceptedResponse {
    fn from(ticket: JobTicket) -> Self {
        Self {
            job_id: ticket.job_id.to_string(),
            status_container: ticket.status_container,
            status_key: ticket.status_key,
        }
    }
}

/// Error response
#[derive(Debug, Serialize)]
pub struct JobErrorResponse {
    pub error: String,
}

fn error_status(error: &JobError) -> StatusCode {
    if error.is_configuration() {
        StatusCode::BAD_REQUEST
    } else if matches!(error, JobError::StatusUnavailable(_)) {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a tiling job.
///
/// Answers once the `pending` marker is written; the job keeps running in
/// the background and reports only through that marker.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateJobBody>,
) -> Result<(StatusCode, Json<JobAcceptedResponse>), (StatusCode, Json<JobErrorResponse>)> {
    if let Err(message) = body.validate() {
        JOBS_SUBMITTED_TOTAL.with_label_values(&["rejected"]).inc();
        return Err((
            StatusCode::BAD_REQUEST,
            Json(JobErrorResponse { error: message }),
        ));
    }

    match state.runner().submit(body.into_spec()).await {
        Ok(ticket) => {
            JOBS_SUBMITTED_TOTAL.with_label_values(&["accepted"]).inc();
            info!(
                job_id = %ticket.job_id,
                status_key = %ticket.status_key,
                "Job submitted"
            );
            Ok((StatusCode::ACCEPTED, Json(ticket.into())))
        }
        Err(e) => {
            let status = error_status(&e);
            let label = if status == StatusCode::BAD_REQUEST {
                "rejected"
            } else {
                "unavailable"
            };
            JOBS_SUBMITTED_TOTAL.with_label_values(&[label]).inc();
            warn!("Job submission failed: {}", e);
            Err((
                status,
                Json(JobErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}
