use async_trait::async_trait;
use std::sync::Arc;

pub mod diagnostics;
pub mod proxy;
pub mod youtube;

pub use proxy::{build_proxy_config, ProxyConfig};
pub use youtube::HttpTranscriptSource;

/// Upstream transcript failures, one variant per failure kind
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("{0}")]
    TlsVerification(String),

    #[error("YouTube is blocking requests for video {0}")]
    RequestBlocked(String),

    #[error("Too many requests; YouTube blocked this IP while fetching video {0}")]
    IpBlocked(String),

    #[error("{0}")]
    Http(String),

    #[error("Transcripts are disabled for video {0}")]
    TranscriptsDisabled(String),

    #[error("No transcript found for video {0} in languages {1:?}")]
    NoTranscriptFound(String, Vec<String>),

    #[error("Video {0} is unavailable")]
    VideoUnavailable(String),

    #[error("Video {0} is unplayable: {1}")]
    VideoUnplayable(String, String),

    #[error("Video {0} is age restricted")]
    AgeRestricted(String),

    #[error("Video {0} requires a PO token")]
    PoTokenRequired(String),

    #[error("Could not parse YouTube data for video {0}")]
    DataUnparsable(String),

    #[error("{0}")]
    Client(String),
}

impl TranscriptError {
    /// Stable name of the failure kind, used in diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            TranscriptError::TlsVerification(_) => "TlsVerification",
            TranscriptError::RequestBlocked(_) => "RequestBlocked",
            TranscriptError::IpBlocked(_) => "IpBlocked",
            TranscriptError::Http(_) => "Http",
            TranscriptError::TranscriptsDisabled(_) => "TranscriptsDisabled",
            TranscriptError::NoTranscriptFound(..) => "NoTranscriptFound",
            TranscriptError::VideoUnavailable(_) => "VideoUnavailable",
            TranscriptError::VideoUnplayable(..) => "VideoUnplayable",
            TranscriptError::AgeRestricted(_) => "AgeRestricted",
            TranscriptError::PoTokenRequired(_) => "PoTokenRequired",
            TranscriptError::DataUnparsable(_) => "DataUnparsable",
            TranscriptError::Client(_) => "Client",
        }
    }
}

/// A single strategy for retrieving transcript text
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
        proxy: Option<&ProxyConfig>,
    ) -> Result<String, TranscriptError>;
}

/// Transcript text, absent only when every strategy failed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptOutcome {
    pub text: Option<String>,
    pub warnings: Vec<String>,
}

impl TranscriptOutcome {
    fn text(text: String, warnings: Vec<String>) -> Self {
        Self {
            text: Some(text),
            warnings,
        }
    }

    fn failed(warnings: Vec<String>) -> Self {
        Self {
            text: None,
            warnings,
        }
    }
}

/// Layered transcript retrieval.
///
/// One attempt over the verified source; a TLS verification failure may be
/// retried exactly once over the insecure source. Nothing loops.
#[derive(Clone)]
pub struct TranscriptFetcher {
    verified: Arc<dyn TranscriptSource>,
    insecure: Arc<dyn TranscriptSource>,
}

impl TranscriptFetcher {
    pub fn new(verified: Arc<dyn TranscriptSource>, insecure: Arc<dyn TranscriptSource>) -> Self {
        Self { verified, insecure }
    }

    /// Fetcher backed by the YouTube HTTP source in both TLS modes
    pub fn http() -> crate::Result<Self> {
        Ok(Self::new(
            Arc::new(HttpTranscriptSource::verified()?),
            Arc::new(HttpTranscriptSource::insecure()?),
        ))
    }

    pub async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
        allow_insecure_fallback: bool,
        proxy: Option<&ProxyConfig>,
    ) -> TranscriptOutcome {
        let error = match self.verified.fetch_transcript(video_id, languages, proxy).await {
            Ok(text) => return TranscriptOutcome::text(text, Vec::new()),
            Err(error) => error,
        };

        if diagnostics::is_tls_failure(&error) {
            if !allow_insecure_fallback {
                tracing::warn!(video_id, error = %error, "TLS verification failed, fallback disabled");
                return TranscriptOutcome::failed(vec![diagnostics::tls_fallback_disabled(&error)]);
            }

            tracing::warn!(video_id, error = %error, "TLS verification failed, retrying insecure");
            let mut warnings = vec![diagnostics::tls_fallback_retry(&error)];

            return match self.insecure.fetch_transcript(video_id, languages, proxy).await {
                Ok(text) => TranscriptOutcome::text(text, warnings),
                Err(fallback_error) => {
                    tracing::warn!(video_id, error = %fallback_error, "Insecure TLS fallback failed");
                    warnings.push(diagnostics::tls_fallback_failed(&fallback_error));
                    TranscriptOutcome::failed(warnings)
                }
            };
        }

        tracing::warn!(video_id, kind = error.kind(), error = %error, "Transcript fetch failed");
        let mut warnings = vec![diagnostics::fetch_failed(&error)];
        if diagnostics::is_blocked(&error) {
            warnings.push(diagnostics::PROXY_GUIDANCE.to_string());
        }
        TranscriptOutcome::failed(warnings)
    }
}
