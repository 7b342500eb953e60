use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;

use crate::utils::collapse_whitespace;

/// Shortest fragment accepted as a headline
pub const MIN_HEADLINE_CHARS: usize = 12;

/// Prefix length used when no fragment qualifies
const FALLBACK_PREFIX_CHARS: usize = 160;

lazy_static! {
    static ref SENTENCE_BREAK_RE: Regex = Regex::new(r"[.!?\n]+").unwrap();
}

/// Turns transcript text into an ordered list of headline candidates
pub trait HeadlineExtractor: Send + Sync {
    fn extract(&self, transcript_text: &str, max_count: usize) -> Vec<String>;
}

/// Sentence-splitting extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct SentenceHeadlines;

impl HeadlineExtractor for SentenceHeadlines {
    fn extract(&self, transcript_text: &str, max_count: usize) -> Vec<String> {
        extract_headlines(transcript_text, max_count)
    }
}

fn normalize(fragment: &str) -> String {
    collapse_whitespace(fragment)
        .trim_matches(|c: char| c == ' ' || c == '-' || c == '•')
        .to_string()
}

pub fn extract_headlines(transcript_text: &str, max_count: usize) -> Vec<String> {
    let mut headlines = Vec::new();
    let mut seen = HashSet::new();

    for fragment in SENTENCE_BREAK_RE.split(transcript_text) {
        if headlines.len() >= max_count {
            break;
        }
        let candidate = normalize(fragment);
        if candidate.chars().count() < MIN_HEADLINE_CHARS {
            continue;
        }
        if seen.insert(candidate.clone()) {
            headlines.push(candidate);
        }
    }

    if !headlines.is_empty() || max_count == 0 {
        return headlines;
    }

    let prefix: String = transcript_text.chars().take(FALLBACK_PREFIX_CHARS).collect();
    let fallback = normalize(&prefix);
    if fallback.is_empty() {
        Vec::new()
    } else {
        vec![fallback]
    }
}
