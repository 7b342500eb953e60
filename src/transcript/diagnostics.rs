//! Failure diagnostics for transcript fetches
//!
//! Decides whether a failure is a TLS verification problem or an upstream
//! block, and renders warnings that are always safe to put on one log line.

use super::TranscriptError;
use crate::utils::log_line_safe;

/// Message fragments that identify certificate verification failures
const TLS_PATTERNS: &[&str] = &[
    "certificate verify failed",
    "certificate_verify_failed",
    "invalid peer certificate",
    "certificate verification",
    "unknownissuer",
    "self signed certificate",
    "self-signed certificate",
];

/// Message fragments that identify blocking or rate limiting
const BLOCKED_PATTERNS: &[&str] = &[
    "requestblocked",
    "request blocked",
    "ipblocked",
    "ip blocked",
    "too many requests",
    "429",
    "not a bot",
];

/// Hint appended when upstream appears to be blocking us
pub const PROXY_GUIDANCE: &str = "Upstream appears to be blocking requests. Configure proxy env vars \
     (EYT_HEADLINE_WEBSHARE_PROXY_USERNAME/PASSWORD or EYT_HEADLINE_PROXY_HTTP_URL/HTTPS_URL).";

/// Lowercased message of the unstructured variants; structured ones are
/// matched by variant only
fn free_text(error: &TranscriptError) -> Option<String> {
    match error {
        TranscriptError::Http(message) | TranscriptError::Client(message) => {
            Some(message.to_lowercase())
        }
        _ => None,
    }
}

pub fn is_tls_failure(error: &TranscriptError) -> bool {
    if matches!(error, TranscriptError::TlsVerification(_)) {
        return true;
    }
    free_text(error).is_some_and(|lower| TLS_PATTERNS.iter().any(|p| lower.contains(p)))
}

pub fn is_blocked(error: &TranscriptError) -> bool {
    if matches!(
        error,
        TranscriptError::RequestBlocked(_) | TranscriptError::IpBlocked(_)
    ) {
        return true;
    }
    free_text(error).is_some_and(|lower| BLOCKED_PATTERNS.iter().any(|p| lower.contains(p)))
}

/// `<Kind>: <message>`, collapsed and truncated
pub fn describe(error: &TranscriptError) -> String {
    let message = error.to_string();
    if message.trim().is_empty() {
        return error.kind().to_string();
    }
    log_line_safe(&format!("{}: {}", error.kind(), message))
}

pub fn fetch_failed(error: &TranscriptError) -> String {
    format!("Transcript fetch failed: {}", describe(error))
}

pub fn tls_fallback_disabled(error: &TranscriptError) -> String {
    format!(
        "Transcript fetch failed: {} (TLS verification failed; insecure fallback disabled)",
        describe(error)
    )
}

pub fn tls_fallback_retry(error: &TranscriptError) -> String {
    format!(
        "TLS verification failed ({}); retrying with insecure TLS fallback.",
        describe(error)
    )
}

pub fn tls_fallback_failed(error: &TranscriptError) -> String {
    format!(
        "Transcript fetch failed after insecure TLS fallback: {}",
        describe(error)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_tls_by_variant_and_message() {
        assert!(is_tls_failure(&TranscriptError::TlsVerification(
            "anything".to_string()
        )));
        assert!(is_tls_failure(&TranscriptError::Http(
            "[SSL: CERTIFICATE_VERIFY_FAILED] certificate verify failed".to_string()
        )));
        assert!(is_tls_failure(&TranscriptError::Client(
            "invalid peer certificate: UnknownIssuer".to_string()
        )));
        assert!(!is_tls_failure(&TranscriptError::Http("boom happened".to_string())));
    }

    #[test]
    fn test_detects_blocking() {
        assert!(is_blocked(&TranscriptError::IpBlocked("abc".to_string())));
        assert!(is_blocked(&TranscriptError::Client(
            "RequestBlocked: status 429".to_string()
        )));
        assert!(!is_blocked(&TranscriptError::TranscriptsDisabled(
            "abc".to_string()
        )));
    }

    #[test]
    fn test_fetch_failed_names_kind() {
        let warning = fetch_failed(&TranscriptError::Client("boom happened".to_string()));
        assert_eq!(warning, "Transcript fetch failed: Client: boom happened");
    }

    #[test]
    fn test_describe_is_log_line_safe() {
        let noisy = format!("line one\nline two\t{}", "z".repeat(400));
        let described = describe(&TranscriptError::Http(noisy));
        assert!(!described.contains('\n'));
        assert!(!described.contains('\t'));
        assert!(described.ends_with("..."));
        assert!(described.starts_with("Http: line one line two"));
    }

    #[test]
    fn test_disabled_warning_mentions_fallback() {
        let warning = tls_fallback_disabled(&TranscriptError::TlsVerification(
            "certificate verify failed".to_string(),
        ));
        assert!(warning.contains("fallback disabled"));
        assert!(warning.contains("TlsVerification"));
    }
}
