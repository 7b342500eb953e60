use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::future::Future;

use super::diagnostics;
use super::{ProxyConfig, TranscriptError, TranscriptSource};

const WATCH_URL: &str = "https://www.youtube.com/watch?v={video_id}";
const INNERTUBE_API_URL: &str = "https://www.youtube.com/youtubei/v1/player?key={api_key}";

/// Desktop browser user agent; bare clients get blocked quickly
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

lazy_static! {
    static ref API_KEY_RE: Regex =
        Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).unwrap();
    static ref CAPTION_LINE_RE: Regex = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref NUMERIC_ENTITY_RE: Regex = Regex::new(r"&#(x?)([0-9a-fA-F]+);").unwrap();
}

/// One caption track advertised by the player response
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionTrack {
    pub language_code: String,
    pub base_url: String,
    pub is_generated: bool,
}

/// Transcript source talking to YouTube over HTTP.
///
/// The verified and insecure transports are two instances that differ only
/// in certificate verification.
pub struct HttpTranscriptSource {
    client: Client,
    verify_tls: bool,
}

impl HttpTranscriptSource {
    pub fn verified() -> Result<Self, TranscriptError> {
        Self::new(true)
    }

    pub fn insecure() -> Result<Self, TranscriptError> {
        Self::new(false)
    }

    fn new(verify_tls: bool) -> Result<Self, TranscriptError> {
        Ok(Self {
            client: build_client(verify_tls, None)?,
            verify_tls,
        })
    }

    /// Client for one request; a proxy needs its own client
    fn client_for(&self, proxy: Option<&ProxyConfig>) -> Result<Client, TranscriptError> {
        match proxy {
            Some(proxy) => build_client(self.verify_tls, Some(proxy)),
            None => Ok(self.client.clone()),
        }
    }

    async fn fetch_once(
        &self,
        client: &Client,
        video_id: &str,
        languages: &[String],
    ) -> Result<String, TranscriptError> {
        let html = self.fetch_video_html(client, video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        let player = self.fetch_innertube_data(client, video_id, &api_key).await?;
        let tracks = extract_caption_tracks(video_id, &player)?;
        let track = select_track(video_id, &tracks, languages)?;

        if track.base_url.contains("&exp=xpe") {
            return Err(TranscriptError::PoTokenRequired(video_id.to_string()));
        }

        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated,
            "Fetching caption track"
        );

        let response = client
            .get(&track.base_url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_http_status(response.status(), video_id)?;
        let xml = response.text().await.map_err(map_reqwest_error)?;

        Ok(parse_caption_xml(&xml))
    }

    async fn fetch_video_html(&self, client: &Client, video_id: &str) -> Result<String, TranscriptError> {
        let url = WATCH_URL.replace("{video_id}", video_id);
        let response = client.get(&url).send().await.map_err(map_reqwest_error)?;
        check_http_status(response.status(), video_id)?;
        response.text().await.map_err(map_reqwest_error)
    }

    async fn fetch_innertube_data(
        &self,
        client: &Client,
        video_id: &str,
        api_key: &str,
    ) -> Result<Value, TranscriptError> {
        let url = INNERTUBE_API_URL.replace("{api_key}", api_key);
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "ANDROID",
                    "clientVersion": "20.10.38"
                }
            },
            "videoId": video_id
        });

        let response = client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        check_http_status(response.status(), video_id)?;

        response
            .json()
            .await
            .map_err(|_| TranscriptError::DataUnparsable(video_id.to_string()))
    }
}

#[async_trait]
impl TranscriptSource for HttpTranscriptSource {
    async fn fetch_transcript(
        &self,
        video_id: &str,
        languages: &[String],
        proxy: Option<&ProxyConfig>,
    ) -> Result<String, TranscriptError> {
        let client = self.client_for(proxy)?;
        let retries = proxy.map(ProxyConfig::retries_when_blocked).unwrap_or(0);

        let client = &client;
        retry_when_blocked(retries, video_id, move || {
            self.fetch_once(client, video_id, languages)
        })
        .await
    }
}

/// Run `attempt` once, then again up to `retries` times while it reports a block
async fn retry_when_blocked<F, Fut>(
    retries: u32,
    video_id: &str,
    mut attempt: F,
) -> Result<String, TranscriptError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String, TranscriptError>>,
{
    let mut retried = 0;
    loop {
        match attempt().await {
            Err(error) if retried < retries && diagnostics::is_blocked(&error) => {
                retried += 1;
                tracing::debug!(video_id, attempt = retried, "Blocked behind rotating proxy, retrying");
            }
            other => return other,
        }
    }
}

fn build_client(verify_tls: bool, proxy: Option<&ProxyConfig>) -> Result<Client, TranscriptError> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::ACCEPT_LANGUAGE,
        reqwest::header::HeaderValue::from_static("en-US"),
    );

    // A rotating pool hands out a new exit IP per connection, so never reuse one
    let rotating = matches!(proxy, Some(ProxyConfig::Webshare { .. }));
    if rotating {
        headers.insert(
            reqwest::header::CONNECTION,
            reqwest::header::HeaderValue::from_static("close"),
        );
    }

    let mut builder = Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .danger_accept_invalid_certs(!verify_tls);
    if rotating {
        builder = builder.pool_max_idle_per_host(0);
    }

    if let Some(proxy) = proxy {
        builder = proxy
            .apply(builder)
            .map_err(|e| TranscriptError::Client(format!("Invalid proxy configuration: {}", e)))?;
    }

    builder
        .build()
        .map_err(|e| TranscriptError::Client(format!("Failed to build HTTP client: {}", e)))
}

/// Flatten a reqwest error, surfacing certificate failures from the source chain
fn map_reqwest_error(error: reqwest::Error) -> TranscriptError {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(&error);
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }

    let lower = message.to_lowercase();
    if lower.contains("certificate") || lower.contains("unknownissuer") {
        TranscriptError::TlsVerification(message)
    } else {
        TranscriptError::Http(message)
    }
}

fn check_http_status(status: StatusCode, video_id: &str) -> Result<(), TranscriptError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(TranscriptError::IpBlocked(video_id.to_string()));
    }
    if !status.is_success() {
        return Err(TranscriptError::Http(format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown error")
        )));
    }
    Ok(())
}

fn extract_innertube_api_key(html: &str, video_id: &str) -> Result<String, TranscriptError> {
    if html.contains("g-recaptcha") {
        return Err(TranscriptError::IpBlocked(video_id.to_string()));
    }

    API_KEY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| TranscriptError::DataUnparsable(video_id.to_string()))
}

fn assert_playability(video_id: &str, player: &Value) -> Result<(), TranscriptError> {
    let Some(playability) = player.get("playabilityStatus") else {
        return Ok(());
    };

    let status = playability
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or("");
    if status == "OK" {
        return Ok(());
    }

    let reason = playability
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or("");

    match status {
        "LOGIN_REQUIRED" if reason.contains("not a bot") => {
            Err(TranscriptError::RequestBlocked(video_id.to_string()))
        }
        "LOGIN_REQUIRED" if reason.contains("inappropriate") => {
            Err(TranscriptError::AgeRestricted(video_id.to_string()))
        }
        "ERROR" if reason.contains("unavailable") => {
            Err(TranscriptError::VideoUnavailable(video_id.to_string()))
        }
        _ => Err(TranscriptError::VideoUnplayable(
            video_id.to_string(),
            reason.to_string(),
        )),
    }
}

pub fn extract_caption_tracks(
    video_id: &str,
    player: &Value,
) -> Result<Vec<CaptionTrack>, TranscriptError> {
    assert_playability(video_id, player)?;

    let tracks: Vec<CaptionTrack> = player
        .pointer("/captions/playerCaptionsTracklistRenderer/captionTracks")
        .and_then(Value::as_array)
        .map(|tracks| {
            tracks
                .iter()
                .filter_map(|track| {
                    Some(CaptionTrack {
                        language_code: track.get("languageCode")?.as_str()?.to_string(),
                        base_url: track.get("baseUrl")?.as_str()?.replace("&fmt=srv3", ""),
                        is_generated: track.get("kind").and_then(Value::as_str) == Some("asr"),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled(video_id.to_string()));
    }
    Ok(tracks)
}

/// Pick a track by language priority, manual captions before generated
pub fn select_track<'a>(
    video_id: &str,
    tracks: &'a [CaptionTrack],
    languages: &[String],
) -> Result<&'a CaptionTrack, TranscriptError> {
    for language in languages {
        let matching = tracks.iter().filter(|t| &t.language_code == language);
        if let Some(track) = matching.clone().find(|t| !t.is_generated) {
            return Ok(track);
        }
        if let Some(track) = matching.clone().next() {
            return Ok(track);
        }
    }

    Err(TranscriptError::NoTranscriptFound(
        video_id.to_string(),
        languages.to_vec(),
    ))
}

/// Join caption lines of a timed-text document with single spaces
pub fn parse_caption_xml(xml: &str) -> String {
    CAPTION_LINE_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| {
            let stripped = TAG_RE.replace_all(m.as_str(), "");
            crate::utils::collapse_whitespace(&unescape_html(&stripped))
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn unescape_html(text: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
