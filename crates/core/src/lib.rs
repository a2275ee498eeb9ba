pub mod config;
pub mod fanout;
pub mod job;
pub mod metrics;
pub mod source;
pub mod testing;
pub mod tiler;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, SanitizedConfig,
};
pub use fanout::{FanOutError, FanOutReport, UploadConfig, UploadFanOut};
pub use job::{
    InlineSpawner, JobError, JobOutcome, JobRunner, JobSpawner, JobSpec, JobState, JobStatus,
    JobTicket, TokioSpawner,
};
pub use source::{
    RegistryError, SourceError, SourceRegistry, SourceSettings, StorageSource,
};
pub use tiler::{TileGenerator, TilerConfig, TilerError, VipsTileGenerator};
