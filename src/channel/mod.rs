use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use std::time::Duration;

use crate::utils::{dedupe_preserving_order, validate_and_normalize_url, watch_url};

/// Ceiling for channel page and feed requests
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const PAGE_USER_AGENT: &str = "Mozilla/5.0";

lazy_static! {
    static ref CHANNEL_ID_RE: Regex = Regex::new(r"^UC[A-Za-z0-9_-]{22}$").unwrap();
    static ref HANDLE_RE: Regex = Regex::new(r"^@[A-Za-z0-9._-]{3,30}$").unwrap();
    static ref CHANNEL_ID_IN_HTML_RE: Regex =
        Regex::new(r#""channelId":"(UC[A-Za-z0-9_-]{22})""#).unwrap();
    static ref VIDEO_ID_IN_FEED_RE: Regex =
        Regex::new(r"<yt:videoId>([A-Za-z0-9_-]{11})</yt:videoId>").unwrap();
}

/// Why a channel token contributed no videos
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelFailure {
    #[error("invalid handle format")]
    InvalidHandle,

    #[error("could not resolve channel id")]
    Unresolved,

    #[error("no uploads feed")]
    NoUploadsFeed,

    #[error("no videos in uploads feed")]
    EmptyFeed,
}

/// Best-effort page retrieval; any failure is `None`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

/// Plain HTTP page fetcher with a fixed timeout
pub struct HttpPageFetcher {
    client: Client,
}

impl HttpPageFetcher {
    pub fn new() -> crate::Result<Self> {
        let client = Client::builder()
            .user_agent(PAGE_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "Page request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(url, status = %response.status(), "Page request rejected");
            return None;
        }

        response.text().await.ok()
    }
}

pub fn is_channel_id(token: &str) -> bool {
    CHANNEL_ID_RE.is_match(token)
}

pub fn is_valid_handle(token: &str) -> bool {
    HANDLE_RE.is_match(token)
}

fn channel_id_from_html(html: Option<&str>) -> Option<String> {
    CHANNEL_ID_IN_HTML_RE
        .captures(html?)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Channel id from a `/channel/<id>` URL path
fn channel_id_from_url(url: &url::Url) -> Option<String> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    match (segments.next(), segments.next()) {
        (Some("channel"), Some(id)) if is_channel_id(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Resolves channel tokens and lists their recent uploads
pub struct ChannelDiscovery<F> {
    fetcher: F,
}

impl<F: PageFetcher> ChannelDiscovery<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }

    async fn scrape_channel_id(&self, url: &str) -> Option<String> {
        let html = self.fetcher.fetch_text(url).await;
        channel_id_from_html(html.as_deref())
    }

    /// Resolve an explicit id, handle, URL, or free-text name to a channel id
    pub async fn resolve_channel_id(&self, token: &str) -> Result<String, ChannelFailure> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ChannelFailure::Unresolved);
        }
        if is_channel_id(token) {
            return Ok(token.to_string());
        }

        if token.starts_with('@') {
            if !is_valid_handle(token) {
                return Err(ChannelFailure::InvalidHandle);
            }
            return self
                .scrape_channel_id(&format!("https://www.youtube.com/{}", token))
                .await
                .ok_or(ChannelFailure::Unresolved);
        }

        if token.starts_with("http://") || token.starts_with("https://") {
            let normalized =
                validate_and_normalize_url(token).map_err(|_| ChannelFailure::Unresolved)?;
            let parsed = url::Url::parse(&normalized).map_err(|_| ChannelFailure::Unresolved)?;
            if let Some(id) = channel_id_from_url(&parsed) {
                return Ok(id);
            }
            return self
                .scrape_channel_id(&normalized)
                .await
                .ok_or(ChannelFailure::Unresolved);
        }

        // Free text: try it as a handle (any script), then fall back to search
        let candidate = token.replace(' ', "");
        let handle_url = format!(
            "https://www.youtube.com/@{}",
            urlencoding::encode(&candidate)
        );
        if let Some(id) = self.scrape_channel_id(&handle_url).await {
            return Ok(id);
        }

        let search_url = format!(
            "https://www.youtube.com/results?search_query={}",
            urlencoding::encode(token)
        );
        self.scrape_channel_id(&search_url)
            .await
            .ok_or(ChannelFailure::Unresolved)
    }

    /// Up to `limit` distinct watch URLs from the channel feed, in feed order
    pub async fn list_uploads(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<String>, ChannelFailure> {
        let feed_url = format!(
            "https://www.youtube.com/feeds/videos.xml?channel_id={}",
            channel_id
        );
        let xml = self
            .fetcher
            .fetch_text(&feed_url)
            .await
            .filter(|xml| !xml.trim().is_empty())
            .ok_or(ChannelFailure::NoUploadsFeed)?;

        let ids = VIDEO_ID_IN_FEED_RE
            .captures_iter(&xml)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        let urls: Vec<String> = dedupe_preserving_order(ids)
            .into_iter()
            .take(limit)
            .map(|id| watch_url(&id))
            .collect();

        if urls.is_empty() {
            return Err(ChannelFailure::EmptyFeed);
        }
        Ok(urls)
    }

    /// Collect upload URLs across tokens; failures become warnings
    pub async fn collect_from_channels(
        &self,
        tokens: &[String],
        limit_per_channel: usize,
    ) -> (Vec<String>, Vec<String>) {
        let mut collected = Vec::new();
        let mut warnings = Vec::new();

        for token in tokens {
            let channel_id = match self.resolve_channel_id(token).await {
                Ok(id) => id,
                Err(reason) => {
                    tracing::warn!(token = %token, %reason, "Channel resolution failed");
                    warnings.push(format!(
                        "Failed to resolve channel token: {} ({})",
                        token, reason
                    ));
                    continue;
                }
            };

            match self.list_uploads(&channel_id, limit_per_channel).await {
                Ok(urls) => {
                    tracing::info!(token = %token, channel_id = %channel_id, count = urls.len(), "Channel uploads listed");
                    collected.extend(urls);
                }
                Err(reason) => {
                    tracing::warn!(token = %token, %reason, "Channel uploads unavailable");
                    warnings.push(format!(
                        "No uploaded videos found for channel: {} ({})",
                        token, reason
                    ));
                }
            }
        }

        (dedupe_preserving_order(collected), warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    const CHANNEL_ID: &str = "UC1234567890123456789012";
    const OTHER_ID: &str = "UCabcdefghijabcdefghijab";

    const TWO_ENTRY_FEED: &str = r#"
        <feed>
          <entry><yt:videoId>dQw4w9WgXcQ</yt:videoId></entry>
          <entry><yt:videoId>aqz-KE-bpKQ</yt:videoId></entry>
        </feed>
    "#;

    /// Serves canned pages by URL substring and records every request
    struct FakePages {
        pages: HashMap<&'static str, &'static str>,
        requests: Mutex<Vec<String>>,
    }

    impl FakePages {
        fn new(pages: &[(&'static str, &'static str)]) -> Self {
            Self {
                pages: pages.iter().copied().collect(),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakePages {
        async fn fetch_text(&self, url: &str) -> Option<String> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .iter()
                .find(|(needle, _)| url.contains(*needle))
                .map(|(_, body)| body.to_string())
        }
    }

    #[tokio::test]
    async fn test_collect_video_urls_from_channel_id() {
        let discovery = ChannelDiscovery::new(FakePages::new(&[("feeds/videos.xml", TWO_ENTRY_FEED)]));

        let (urls, warnings) = discovery
            .collect_from_channels(&[CHANNEL_ID.to_string()], 2)
            .await;

        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "https://www.youtube.com/watch?v=aqz-KE-bpKQ",
            ]
        );
        assert!(warnings.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_handle_never_hits_network() {
        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch_text().times(0);
        let discovery = ChannelDiscovery::new(fetcher);

        let outcome = discovery.resolve_channel_id("@bad handle!").await;

        assert_eq!(outcome, Err(ChannelFailure::InvalidHandle));
        assert_eq!(outcome.unwrap_err().to_string(), "invalid handle format");
    }

    #[tokio::test]
    async fn test_handle_scrapes_embedded_channel_id() {
        let mut fetcher = MockPageFetcher::new();
        fetcher
            .expect_fetch_text()
            .withf(|url| url.ends_with("youtube.com/@sample-channel"))
            .times(1)
            .returning(|_| Some(format!(r#"<script>{{"channelId":"{}"}}</script>"#, CHANNEL_ID)));
        let discovery = ChannelDiscovery::new(fetcher);

        assert_eq!(
            discovery.resolve_channel_id("@sample-channel").await,
            Ok(CHANNEL_ID.to_string())
        );
    }

    #[tokio::test]
    async fn test_channel_url_is_parsed_without_fetching() {
        let pages = FakePages::new(&[]);
        let discovery = ChannelDiscovery::new(pages);

        let id = discovery
            .resolve_channel_id(&format!("https://www.youtube.com/channel/{}/videos", OTHER_ID))
            .await;

        assert_eq!(id, Ok(OTHER_ID.to_string()));
        assert!(discovery.fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn test_free_text_falls_back_to_search() {
        let search_page = r#"{"channelId":"UCabcdefghijabcdefghijab","title":"x"}"#;
        let discovery = ChannelDiscovery::new(FakePages::new(&[("results?search_query=", search_page)]));

        let id = discovery.resolve_channel_id("Sample Economy News").await;

        assert_eq!(id, Ok(OTHER_ID.to_string()));
        let requests = discovery.fetcher.requests();
        assert_eq!(requests[0], "https://www.youtube.com/@SampleEconomyNews");
        assert_eq!(
            requests[1],
            "https://www.youtube.com/results?search_query=Sample%20Economy%20News"
        );
    }

    #[tokio::test]
    async fn test_non_latin_name_tries_handle_page_first() {
        let handle_page = r#"{"channelId":"UCabcdefghijabcdefghijab"}"#;
        let discovery = ChannelDiscovery::new(FakePages::new(&[("/@", handle_page)]));

        let id = discovery.resolve_channel_id("한국경제 TV").await;

        assert_eq!(id, Ok(OTHER_ID.to_string()));
        assert_eq!(
            discovery.fetcher.requests(),
            vec!["https://www.youtube.com/@%ED%95%9C%EA%B5%AD%EA%B2%BD%EC%A0%9CTV"]
        );
    }

    #[tokio::test]
    async fn test_list_uploads_dedupes_and_limits() {
        let feed = r#"<feed>
            <yt:videoId>dQw4w9WgXcQ</yt:videoId>
            <yt:videoId>dQw4w9WgXcQ</yt:videoId>
            <yt:videoId>aqz-KE-bpKQ</yt:videoId>
            <yt:videoId>oHg5SJYRHA0</yt:videoId>
        </feed>"#;
        let discovery = ChannelDiscovery::new(FakePages::new(&[("feeds/videos.xml", feed)]));

        let urls = discovery.list_uploads(CHANNEL_ID, 2).await.unwrap();

        assert_eq!(
            urls,
            vec![
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                "https://www.youtube.com/watch?v=aqz-KE-bpKQ",
            ]
        );
    }

    #[tokio::test]
    async fn test_feed_failure_reasons_are_distinct() {
        let missing = ChannelDiscovery::new(FakePages::new(&[]));
        assert_eq!(
            missing.list_uploads(CHANNEL_ID, 5).await,
            Err(ChannelFailure::NoUploadsFeed)
        );

        let empty = ChannelDiscovery::new(FakePages::new(&[("feeds/videos.xml", "<feed></feed>")]));
        assert_eq!(
            empty.list_uploads(CHANNEL_ID, 5).await,
            Err(ChannelFailure::EmptyFeed)
        );
    }

    #[tokio::test]
    async fn test_each_failing_token_yields_one_warning() {
        // Resolvable id with an empty feed, plus a handle that resolves nowhere
        let discovery = ChannelDiscovery::new(FakePages::new(&[(
            "feeds/videos.xml",
            "<feed><title>nothing yet</title></feed>",
        )]));

        let (urls, warnings) = discovery
            .collect_from_channels(&["@ghost-channel".to_string(), CHANNEL_ID.to_string()], 3)
            .await;

        assert!(urls.is_empty());
        assert_eq!(
            warnings,
            vec![
                "Failed to resolve channel token: @ghost-channel (could not resolve channel id)"
                    .to_string(),
                format!(
                    "No uploaded videos found for channel: {} (no videos in uploads feed)",
                    CHANNEL_ID
                ),
            ]
        );
    }

    #[test]
    fn test_urls_dedupe_across_channels() {
        let discovery = ChannelDiscovery::new(FakePages::new(&[("feeds/videos.xml", TWO_ENTRY_FEED)]));

        let (urls, warnings) = tokio_test::block_on(
            discovery.collect_from_channels(&[CHANNEL_ID.to_string(), OTHER_ID.to_string()], 5),
        );

        assert_eq!(urls.len(), 2);
        assert!(warnings.is_empty());
    }
}
