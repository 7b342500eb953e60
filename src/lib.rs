//! Economic YouTube Headline - transcript acquisition and headline extraction
//!
//! This library resolves YouTube video references, discovers recent uploads for
//! channels, fetches transcripts with TLS and proxy fallbacks, classifies how
//! usable each transcript is, and extracts headline candidates in batch.

pub mod channel;
pub mod classify;
pub mod cli;
pub mod config;
pub mod headlines;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod storage;
pub mod transcript;
pub mod utils;
pub mod video;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use models::{BatchResult, HeadlineResult, ProcessingStatus};
pub use pipeline::Pipeline;
pub use transcript::{TranscriptFetcher, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to headline generation
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum HeadlineError {
    #[error("Unable to parse YouTube video id from URL: {0}")]
    InvalidReference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage operation failed: {0}")]
    Storage(String),
}
