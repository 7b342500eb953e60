use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "eyt-headline",
    about = "Economic YouTube Headline - Extract headline candidates from YouTube transcripts",
    version,
    long_about = "Fetches transcripts for YouTube videos (or the latest uploads of channels), classifies how complete each transcript is, and extracts headline candidates into a markdown or JSON brief."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate per-video headlines
    Generate {
        /// YouTube video URL or id (repeatable)
        #[arg(long = "video-url", value_name = "URL")]
        video_urls: Vec<String>,

        /// File with one URL per line (blank lines and `#` comments are skipped)
        #[arg(long, value_name = "FILE")]
        input_file: Option<PathBuf>,

        /// Channel id, handle, URL or name used when no videos are given (repeatable)
        #[arg(long = "channel", value_name = "TOKEN")]
        channels: Vec<String>,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "markdown")]
        output_format: OutputFormat,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,

        /// Use this run id instead of a generated one
        #[arg(long, value_name = "ID", env = "EYT_HEADLINE_RUN_ID")]
        run_id: Option<String>,

        /// Skip appending the batch to the daily result file
        #[arg(long)]
        no_store: bool,
    },

    /// List recent upload URLs for channels
    Channels {
        /// Channel ids, handles, URLs or names
        #[arg(value_name = "TOKEN", required = true)]
        tokens: Vec<String>,

        /// Uploads per channel (defaults to the configured limit)
        #[arg(short, long, value_name = "COUNT")]
        limit: Option<usize>,
    },

    /// Write a default configuration file or show the current one
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Markdown brief
    Markdown,
    /// Full batch as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
