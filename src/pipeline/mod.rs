//! Batch orchestration.
//!
//! Runs resolve, fetch, classify and extract over each reference strictly in
//! input order, pausing between videos and reporting progress to an
//! optional event sink.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::classify::classify;
use crate::config::Config;
use crate::headlines::{HeadlineExtractor, SentenceHeadlines};
use crate::models::{
    BatchResult, HeadlineResult, PartialInfo, ProcessingStatus, ResultError, VideoDescriptor,
};
use crate::transcript::{build_proxy_config, ProxyConfig, TranscriptFetcher, TranscriptOutcome};
use crate::utils::generate_run_id;
use crate::video;

/// Suspends the batch between videos
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, delay: Duration);
}

/// Timed pause on the tokio clock
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Receives lifecycle events. Errors are logged and otherwise ignored.
pub trait EventSink {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> anyhow::Result<()>;
}

/// Fan out to two sinks; both are always called
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        let first = self.0.log_event(event, payload);
        let second = self.1.log_event(event, payload);
        first.and(second)
    }
}

impl<T: EventSink + ?Sized> EventSink for &T {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        (**self).log_event(event, payload)
    }
}

/// Forwards events to `tracing` at debug level
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        tracing::debug!(event, %payload, "pipeline event");
        Ok(())
    }
}

/// Sequential headline pipeline
pub struct Pipeline {
    fetcher: TranscriptFetcher,
    extractor: Box<dyn HeadlineExtractor>,
    pacer: Arc<dyn Pacer>,
}

impl Pipeline {
    pub fn new(
        fetcher: TranscriptFetcher,
        extractor: Box<dyn HeadlineExtractor>,
        pacer: Arc<dyn Pacer>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            pacer,
        }
    }

    /// Pipeline over the live YouTube sources
    pub fn http() -> crate::Result<Self> {
        Ok(Self::new(
            TranscriptFetcher::http()?,
            Box::new(SentenceHeadlines),
            Arc::new(TokioPacer),
        ))
    }

    /// Process every reference in order and assemble the batch
    pub async fn run(
        &self,
        urls: &[String],
        config: &Config,
        sink: Option<&dyn EventSink>,
        run_id: Option<String>,
    ) -> BatchResult {
        let run_id = run_id.unwrap_or_else(generate_run_id);
        let proxy = build_proxy_config(&config.proxy);
        let delay = Duration::from_millis(config.transcript.request_delay_ms);

        tracing::info!(
            run_id = %run_id,
            videos = urls.len(),
            proxy = proxy.as_ref().map(ProxyConfig::label),
            "Starting headline run"
        );

        let mut results = Vec::with_capacity(urls.len());
        for (index, url) in urls.iter().enumerate() {
            if index > 0 && !delay.is_zero() {
                self.pacer.pause(delay).await;
            }

            emit(sink, "video_start", json!({ "index": index, "url": url }));

            let result = self.process(url, config, proxy.as_ref()).await;

            emit(
                sink,
                "video_done",
                json!({
                    "index": index,
                    "url": url,
                    "video_id": result.video.video_id,
                    "status": result.status.as_str(),
                    "headline_count": result.headlines.len(),
                    "warning_count": result.warnings.len(),
                }),
            );
            results.push(result);
        }

        let batch = BatchResult::new(run_id, results);
        tracing::info!(
            run_id = %batch.run_id,
            complete = batch.count_by_status(ProcessingStatus::Complete),
            partial = batch.count_by_status(ProcessingStatus::Partial),
            "Headline run finished"
        );
        batch
    }

    async fn process(
        &self,
        url: &str,
        config: &Config,
        proxy: Option<&ProxyConfig>,
    ) -> HeadlineResult {
        let identity = match video::resolve(url) {
            Ok(identity) => identity,
            Err(err) => {
                tracing::debug!(url, error = %err, "Skipping unresolvable video reference");
                return HeadlineResult {
                    status: ProcessingStatus::Error,
                    video: VideoDescriptor::unresolved(url),
                    transcript_chars: 0,
                    partial: PartialInfo::complete(),
                    headlines: Vec::new(),
                    warnings: vec![err.to_string()],
                    error: Some(ResultError::InvalidReference),
                };
            }
        };
        let video = VideoDescriptor::from_identity(identity, url);

        let settings = &config.transcript;
        let outcome = match &settings.mock_text {
            Some(text) => TranscriptOutcome {
                text: Some(text.clone()),
                warnings: Vec::new(),
            },
            None => {
                self.fetcher
                    .fetch(
                        &video.video_id,
                        &settings.language_list(),
                        settings.allow_insecure_fallback,
                        proxy,
                    )
                    .await
            }
        };

        let text = outcome.text.as_deref();
        let classification = classify(
            video.was_live,
            text,
            settings.min_chars,
            settings.allow_partial,
        );

        let mut warnings = outcome.warnings.clone();
        warnings.extend(classification.warnings);
        for warning in &warnings {
            tracing::debug!(video_id = %video.video_id, "{}", warning);
        }

        let headlines = match text {
            Some(text)
                if classification.status.yields_headlines() && !text.trim().is_empty() =>
            {
                self.extractor.extract(text, settings.max_headlines)
            }
            _ => Vec::new(),
        };

        let error = match classification.status {
            ProcessingStatus::Error => Some(ResultError::ProcessingError),
            _ => None,
        };

        HeadlineResult {
            status: classification.status,
            transcript_chars: text.map_or(0, |t| t.chars().count()),
            video,
            partial: classification.partial,
            headlines,
            warnings,
            error,
        }
    }
}

fn emit(sink: Option<&dyn EventSink>, event: &str, payload: serde_json::Value) {
    if let Some(sink) = sink {
        if let Err(err) = sink.log_event(event, &payload) {
            tracing::warn!(event, error = %err, "Event sink failed");
        }
    }
}
