//! Upload fan-out: one concurrent upload per generated file.
//!
//! The index and every file of the tile tree become independent tasks on a
//! `JoinSet`. Destination keys keep the tile tree's nesting exactly:
//! `<prefix><path relative to the scratch root>`.

mod config;
mod error;
mod keys;
mod upload;

pub use config::UploadConfig;
pub use error::{FanOutError, UploadTaskError};
pub use keys::{destination_key, join_key, relative_key};
pub use upload::{FanOutReport, UploadFanOut};
