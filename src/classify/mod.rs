//! Transcript state classification
//!
//! Maps a fetched (or missing) transcript to a [`ProcessingStatus`], the
//! partial-transcript details and the warnings shown to the user. Pure, no I/O.

use crate::models::{PartialInfo, ProcessingStatus};

pub const WARN_LIVE_PENDING: &str =
    "Ended live video detected but transcript is unavailable (captions pending).";
pub const WARN_UNAVAILABLE: &str = "Transcript is unavailable.";
pub const WARN_PARTIAL: &str = "Partial transcript detected.";
pub const WARN_PARTIAL_DISABLED: &str = "Partial transcript detected but partial mode is disabled.";

/// Outcome of classifying one transcript
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: ProcessingStatus,
    pub partial: PartialInfo,
    pub warnings: Vec<String>,
}

/// Map transcript presence and length onto a processing status.
///
/// The live check runs first, so an empty transcript on a live URL is
/// `EndedLive` rather than `Unavailable`. `allow_partial` only changes the
/// warning wording; status and ratio are identical either way.
pub fn classify(
    was_live: bool,
    transcript_text: Option<&str>,
    min_chars: usize,
    allow_partial: bool,
) -> Classification {
    let transcript = transcript_text.unwrap_or_default().trim();

    if transcript.is_empty() {
        if was_live {
            return Classification {
                status: ProcessingStatus::EndedLive,
                partial: PartialInfo::live_pending(),
                warnings: vec![WARN_LIVE_PENDING.to_string()],
            };
        }
        return Classification {
            status: ProcessingStatus::Unavailable,
            partial: PartialInfo::complete(),
            warnings: vec![WARN_UNAVAILABLE.to_string()],
        };
    }

    let length = transcript.chars().count();
    if length < min_chars {
        let warning = if allow_partial {
            WARN_PARTIAL
        } else {
            WARN_PARTIAL_DISABLED
        };
        return Classification {
            status: ProcessingStatus::Partial,
            partial: PartialInfo::below_min_chars(coverage_ratio(length, min_chars)),
            warnings: vec![warning.to_string()],
        };
    }

    Classification {
        status: ProcessingStatus::Complete,
        partial: PartialInfo::complete(),
        warnings: Vec::new(),
    }
}

/// `length / min_chars` rounded to three decimals, unclamped
///
/// Rounds the exact binary value with ties to even, so 50/160 gives 0.312.
fn coverage_ratio(length: usize, min_chars: usize) -> f64 {
    let ratio = length as f64 / min_chars as f64;
    format!("{:.3}", ratio).parse().unwrap_or(ratio)
}
