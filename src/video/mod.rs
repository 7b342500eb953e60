//! Video reference resolution.
//!
//! Turns a user supplied URL (or bare id) into a canonical 11 character
//! video id plus a live-broadcast flag. Purely syntactic, never touches the
//! network.

use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::models::VideoIdentity;
use crate::HeadlineError;

lazy_static! {
    static ref VIDEO_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{11}$").unwrap();
}

/// Markers that flag a URL as a (former) live broadcast
const LIVE_MARKERS: &[&str] = &["/live/", "live_stream"];

/// Whether a token has the shape of a video id
pub fn is_video_id(token: &str) -> bool {
    VIDEO_ID_RE.is_match(token)
}

/// Locate the video id in a reference.
///
/// Tried in order: the short-link path, the `v` query parameter, then any
/// path segment shaped like an id.
pub fn parse_video_id(reference: &str) -> Result<String, HeadlineError> {
    let trimmed = reference.trim();
    if is_video_id(trimmed) {
        return Ok(trimmed.to_string());
    }

    let parsed = parse_loose(trimmed)
        .ok_or_else(|| HeadlineError::InvalidReference(reference.to_string()))?;

    if parsed.host_str() == Some("youtu.be") {
        let candidate = parsed.path().trim_start_matches('/');
        if is_video_id(candidate) {
            return Ok(candidate.to_string());
        }
    }

    if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
        if is_video_id(&v) {
            return Ok(v.into_owned());
        }
    }

    parsed
        .path_segments()
        .into_iter()
        .flatten()
        .find(|segment| is_video_id(segment))
        .map(str::to_string)
        .ok_or_else(|| HeadlineError::InvalidReference(reference.to_string()))
}

/// Syntactic live-broadcast check, case-insensitive
pub fn infer_was_live(reference: &str) -> bool {
    let lowered = reference.to_lowercase();
    LIVE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// Resolve a reference into its identity
pub fn resolve(reference: &str) -> Result<VideoIdentity, HeadlineError> {
    let video_id = parse_video_id(reference)?;
    Ok(VideoIdentity {
        video_id,
        was_live: infer_was_live(reference),
    })
}

/// Accept scheme-less references such as `youtu.be/<id>`
fn parse_loose(reference: &str) -> Option<Url> {
    Url::parse(reference)
        .or_else(|_| Url::parse(&format!("https://{}", reference)))
        .ok()
}
