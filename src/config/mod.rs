use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcript::proxy::DEFAULT_RETRIES_WHEN_BLOCKED;
use crate::HeadlineError;

const ENV_PREFIX: &str = "EYT_HEADLINE_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transcript acquisition and classification
    pub transcript: TranscriptSettings,

    /// Channel discovery when no explicit videos are given
    pub channels: ChannelSettings,

    /// Proxy routing for transcript requests
    pub proxy: ProxySettings,

    /// Result and session log locations
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Transcripts shorter than this are classified partial
    pub min_chars: usize,

    /// Headlines extracted per video
    pub max_headlines: usize,

    /// Only changes warning wording for short transcripts
    pub allow_partial: bool,

    /// Comma-separated language priority list
    pub languages: String,

    /// Pause between videos, in milliseconds
    pub request_delay_ms: u64,

    /// Retry once without certificate verification on TLS failures
    pub allow_insecure_fallback: bool,

    /// Fixed transcript used instead of fetching (testing and demos)
    pub mock_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Channel ids, handles, URLs or names
    pub targets: Vec<String>,

    /// Recent uploads taken per channel
    pub video_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub http_url: Option<String>,
    pub https_url: Option<String>,
    pub webshare_username: Option<String>,
    pub webshare_password: Option<String>,

    /// Comma-separated exit location codes
    pub webshare_locations: Option<String>,

    pub webshare_retries_when_blocked: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Daily JSONL result files
    pub result_dir: Option<PathBuf>,

    /// Session event logs
    pub log_dir: Option<PathBuf>,

    /// Runs sharing a session id append to one log file
    pub session_id: Option<String>,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            min_chars: 700,
            max_headlines: 5,
            allow_partial: true,
            languages: "ko,en".to_string(),
            request_delay_ms: 0,
            allow_insecure_fallback: true,
            mock_text: None,
        }
    }
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            video_limit: 5,
        }
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            http_url: None,
            https_url: None,
            webshare_username: None,
            webshare_password: None,
            webshare_locations: None,
            webshare_retries_when_blocked: DEFAULT_RETRIES_WHEN_BLOCKED,
        }
    }
}

impl TranscriptSettings {
    /// Language priority list, blanks dropped
    pub fn language_list(&self) -> Vec<String> {
        split_list(&self.languages)
    }
}

impl StorageSettings {
    pub fn result_dir(&self) -> PathBuf {
        self.result_dir
            .clone()
            .unwrap_or_else(|| data_dir().join("results"))
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| data_dir().join("logs"))
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("eyt-headline")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        HeadlineError::Config(format!(
            "{}{} must be a number, got {:?}",
            ENV_PREFIX, name, value
        ))
        .into()
    })
}

impl Config {
    /// Load configuration from file (if any), then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::existing_config_path()? {
            Some(path) => {
                let content = fs_err::read_to_string(&path)
                    .context("Failed to read config file")?;
                serde_yaml::from_str(&content).context("Failed to parse config file")?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate();
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(config_path)
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(format!("{}CONFIG", ENV_PREFIX)) {
            return Ok(PathBuf::from(path));
        }

        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("eyt-headline").join("config.yaml"))
    }

    fn existing_config_path() -> Result<Option<PathBuf>> {
        let path = Self::config_path()?;
        Ok(path.exists().then_some(path))
    }

    /// Overlay `EYT_HEADLINE_*` variables read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

        let transcript = &mut self.transcript;
        if let Some(v) = get("MIN_TRANSCRIPT_CHARS") {
            transcript.min_chars = parse_number("MIN_TRANSCRIPT_CHARS", &v)?;
        }
        if let Some(v) = get("MAX_HEADLINES") {
            transcript.max_headlines = parse_number("MAX_HEADLINES", &v)?;
        }
        if let Some(v) = get("ALLOW_PARTIAL") {
            transcript.allow_partial = parse_bool(&v);
        }
        if let Some(v) = get("TRANSCRIPT_LANGUAGES") {
            transcript.languages = v;
        }
        if let Some(v) = get("TRANSCRIPT_REQUEST_DELAY_MS") {
            transcript.request_delay_ms = parse_number("TRANSCRIPT_REQUEST_DELAY_MS", &v)?;
        }
        if let Some(v) = get("ALLOW_INSECURE_SSL_FALLBACK") {
            transcript.allow_insecure_fallback = parse_bool(&v);
        }
        if let Some(v) = get("MOCK_TRANSCRIPT_TEXT") {
            transcript.mock_text = Some(v).filter(|v| !v.is_empty());
        }

        if let Some(v) = get("TARGET_CHANNELS") {
            self.channels.targets = split_list(&v);
        }
        if let Some(v) = get("CHANNEL_VIDEO_LIMIT") {
            self.channels.video_limit = parse_number("CHANNEL_VIDEO_LIMIT", &v)?;
        }

        let proxy = &mut self.proxy;
        if let Some(v) = get("PROXY_HTTP_URL") {
            proxy.http_url = Some(v);
        }
        if let Some(v) = get("PROXY_HTTPS_URL") {
            proxy.https_url = Some(v);
        }
        if let Some(v) = get("WEBSHARE_PROXY_USERNAME") {
            proxy.webshare_username = Some(v);
        }
        if let Some(v) = get("WEBSHARE_PROXY_PASSWORD") {
            proxy.webshare_password = Some(v);
        }
        if let Some(v) = get("WEBSHARE_PROXY_LOCATIONS") {
            proxy.webshare_locations = Some(v);
        }
        if let Some(v) = get("WEBSHARE_RETRIES_WHEN_BLOCKED") {
            proxy.webshare_retries_when_blocked =
                parse_number("WEBSHARE_RETRIES_WHEN_BLOCKED", &v)?;
        }

        if let Some(v) = get("RESULT_DIR") {
            self.storage.result_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("LOG_DIR") {
            self.storage.log_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = get("SESSION_ID") {
            self.storage.session_id = Some(v).filter(|v| !v.is_empty());
        }

        Ok(())
    }

    /// Clamp numeric settings into their supported ranges
    pub fn validate(&mut self) {
        let clamped_min = self.transcript.min_chars.max(100);
        if clamped_min != self.transcript.min_chars {
            tracing::warn!(
                "Minimum transcript chars raised from {} to {}",
                self.transcript.min_chars,
                clamped_min
            );
        }
        self.transcript.min_chars = clamped_min;
        self.transcript.max_headlines = self.transcript.max_headlines.clamp(1, 20);
        self.channels.video_limit = self.channels.video_limit.clamp(1, 50);
    }

    /// Display current configuration
    pub fn display(&self) {
        let t = &self.transcript;
        println!("Current Configuration:");
        println!("  Min Transcript Chars: {}", t.min_chars);
        println!("  Max Headlines: {}", t.max_headlines);
        println!("  Allow Partial: {}", t.allow_partial);
        println!("  Languages: {}", t.language_list().join(", "));
        println!("  Request Delay: {} ms", t.request_delay_ms);
        println!("  Insecure TLS Fallback: {}", t.allow_insecure_fallback);
        if t.mock_text.is_some() {
            println!("  Mock Transcript: enabled");
        }
        if !self.channels.targets.is_empty() {
            println!("  Target Channels: {}", self.channels.targets.join(", "));
        }
        println!("  Channel Video Limit: {}", self.channels.video_limit);
        match crate::transcript::build_proxy_config(&self.proxy) {
            Some(proxy) => println!("  Proxy: {} (credentials hidden)", proxy.label()),
            None => println!("  Proxy: none"),
        }
        println!("  Result Dir: {}", self.storage.result_dir().display());
        println!("  Log Dir: {}", self.storage.log_dir().display());
    }
}
