use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name stamped on every serialized batch
pub const REPO_NAME: &str = "economic-youtube-headline-skill";

/// Processing outcome of a single video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Complete,
    Partial,
    EndedLive,
    Unavailable,
    Error,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Complete => "complete",
            ProcessingStatus::Partial => "partial",
            ProcessingStatus::EndedLive => "ended_live",
            ProcessingStatus::Unavailable => "unavailable",
            ProcessingStatus::Error => "error",
        }
    }

    /// Whether headlines may be extracted for this status
    pub fn yields_headlines(&self) -> bool {
        match self {
            ProcessingStatus::Complete | ProcessingStatus::Partial => true,
            ProcessingStatus::EndedLive | ProcessingStatus::Unavailable | ProcessingStatus::Error => {
                false
            }
        }
    }
}

impl std::fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a result is flagged as partial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartialReason {
    BelowMinChars,
    LiveEndedTranscriptPending,
}

impl PartialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartialReason::BelowMinChars => "below_min_chars",
            PartialReason::LiveEndedTranscriptPending => "live_ended_transcript_pending",
        }
    }
}

/// Partial-coverage descriptor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialInfo {
    pub is_partial: bool,

    /// Transcript length over the configured minimum, rounded to 3 decimals.
    /// Only set when a transcript exists but is below the minimum.
    pub coverage_ratio: Option<f64>,

    pub reason: Option<PartialReason>,
}

impl PartialInfo {
    pub fn complete() -> Self {
        Self::default()
    }

    pub fn below_min_chars(coverage_ratio: f64) -> Self {
        Self {
            is_partial: true,
            coverage_ratio: Some(coverage_ratio),
            reason: Some(PartialReason::BelowMinChars),
        }
    }

    pub fn live_pending() -> Self {
        Self {
            is_partial: true,
            coverage_ratio: None,
            reason: Some(PartialReason::LiveEndedTranscriptPending),
        }
    }
}

/// Canonical identity of a video reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoIdentity {
    pub video_id: String,
    pub was_live: bool,
}

/// Video identity plus display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub video_id: String,
    pub url: String,
    pub channel_name: String,
    pub title: String,
    pub was_live: bool,
}

impl VideoDescriptor {
    /// Descriptor with placeholder display metadata derived from the id
    pub fn from_identity(identity: VideoIdentity, url: &str) -> Self {
        Self {
            channel_name: format!("Unknown Channel ({})", identity.video_id),
            title: format!("Unknown Title ({})", identity.video_id),
            video_id: identity.video_id,
            url: url.to_string(),
            was_live: identity.was_live,
        }
    }

    /// Descriptor for a reference that could not be resolved
    pub fn unresolved(url: &str) -> Self {
        Self {
            video_id: String::new(),
            url: url.to_string(),
            channel_name: "Unknown Channel".to_string(),
            title: "Unknown Title".to_string(),
            was_live: false,
        }
    }
}

/// Failure recorded on an `Error` result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultError {
    /// The reference did not contain a usable video id
    InvalidReference,
    /// Reserved for extraction-time faults
    ProcessingError,
}

impl ResultError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultError::InvalidReference => "invalid_reference",
            ResultError::ProcessingError => "processing_error",
        }
    }
}

/// Result for one video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineResult {
    pub status: ProcessingStatus,
    pub video: VideoDescriptor,
    pub transcript_chars: usize,
    pub partial: PartialInfo,
    pub headlines: Vec<String>,

    /// Fetch warnings followed by classification warnings, in order
    pub warnings: Vec<String>,

    /// Set if and only if `status` is `Error`
    pub error: Option<ResultError>,
}

/// One invocation's worth of results, in input order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub results: Vec<HeadlineResult>,
    pub repo: String,
}

impl BatchResult {
    pub fn new(run_id: String, results: Vec<HeadlineResult>) -> Self {
        Self {
            run_id,
            generated_at: Utc::now(),
            results,
            repo: REPO_NAME.to_string(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn count_by_status(&self, status: ProcessingStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let value = serde_json::to_value(ProcessingStatus::EndedLive).unwrap();
        assert_eq!(value, serde_json::json!("ended_live"));
        assert_eq!(ProcessingStatus::EndedLive.to_string(), "ended_live");
    }

    #[test]
    fn test_only_complete_and_partial_yield_headlines() {
        assert!(ProcessingStatus::Complete.yields_headlines());
        assert!(ProcessingStatus::Partial.yields_headlines());
        assert!(!ProcessingStatus::EndedLive.yields_headlines());
        assert!(!ProcessingStatus::Unavailable.yields_headlines());
        assert!(!ProcessingStatus::Error.yields_headlines());
    }

    #[test]
    fn test_batch_json_carries_repo_and_status_strings() {
        let identity = VideoIdentity {
            video_id: "dQw4w9WgXcQ".to_string(),
            was_live: false,
        };
        let batch = BatchResult::new(
            "abc".to_string(),
            vec![HeadlineResult {
                status: ProcessingStatus::Partial,
                video: VideoDescriptor::from_identity(identity, "https://youtu.be/dQw4w9WgXcQ"),
                transcript_chars: 16,
                partial: PartialInfo::below_min_chars(0.023),
                headlines: vec![],
                warnings: vec!["Partial transcript detected.".to_string()],
                error: None,
            }],
        );

        let json = batch.to_json().unwrap();
        assert_eq!(json["repo"], REPO_NAME);
        assert_eq!(json["results"][0]["status"], "partial");
        assert_eq!(json["results"][0]["partial"]["reason"], "below_min_chars");
        assert_eq!(json["results"][0]["video"]["title"], "Unknown Title (dQw4w9WgXcQ)");
        assert_eq!(batch.count_by_status(ProcessingStatus::Partial), 1);
    }
}
