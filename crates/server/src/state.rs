use std::sync::Arc;
use dzpublish_core::{Config, JobRunner, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    runner: Arc<JobRunner>,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<JobRunner>) -> Self {
        Self { config, runner }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }
}
