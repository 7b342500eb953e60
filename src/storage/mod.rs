use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::pipeline::EventSink;
use crate::utils::sanitize_filename;

/// Append one JSON line to `<result_dir>/<slug>-<date_key>.jsonl`
pub fn append_daily_result<T: Serialize>(
    result_dir: &Path,
    date_key: &str,
    slug: &str,
    payload: &T,
) -> Result<PathBuf> {
    let target = result_dir.join(format!("{}-{}.jsonl", sanitize_filename(slug), date_key));
    let line = serde_json::to_string(payload).context("Failed to serialize result payload")?;
    append_line(&target, &line)?;
    tracing::debug!(path = %target.display(), "Appended daily result");
    Ok(target)
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs_err::create_dir_all(parent)?;
    }
    let mut file = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", line)
        .map_err(|e| crate::HeadlineError::Storage(e.to_string()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Serialize)]
struct SessionRow<'a> {
    timestamp: String,
    level: LogLevel,
    repo: &'a str,
    run_id: &'a str,
    session_id: &'a str,
    event: &'a str,
    payload: &'a serde_json::Value,
}

/// Append-only JSONL event log shared by every run of a session
#[derive(Debug, Clone)]
pub struct SessionLogger {
    repo: String,
    run_id: String,
    session_id: String,
    log_path: PathBuf,
}

impl SessionLogger {
    /// Logger writing to `<log_dir>/<session_id>.log`
    pub fn new(log_dir: &Path, repo: &str, run_id: &str, session_id: &str) -> Self {
        let log_path = log_dir.join(format!("{}.log", sanitize_filename(session_id)));
        Self {
            repo: repo.to_string(),
            run_id: run_id.to_string(),
            session_id: session_id.to_string(),
            log_path,
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn write(&self, level: LogLevel, event: &str, payload: &serde_json::Value) -> Result<()> {
        let row = SessionRow {
            timestamp: Utc::now().to_rfc3339(),
            level,
            repo: &self.repo,
            run_id: &self.run_id,
            session_id: &self.session_id,
            event,
            payload,
        };
        let line = serde_json::to_string(&row)?;
        append_line(&self.log_path, &line)
    }

    pub fn info(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.write(LogLevel::Info, event, payload)
    }

    pub fn warn(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.write(LogLevel::Warn, event, payload)
    }

    pub fn error(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.write(LogLevel::Error, event, payload)
    }
}

impl EventSink for SessionLogger {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        self.info(event, payload)
    }
}
