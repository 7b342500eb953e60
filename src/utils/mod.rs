use anyhow::Result;
use std::collections::HashSet;
use url::Url;

/// Default cap for diagnostic message text
pub const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url)
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    Ok(parsed.to_string())
}

/// Collapse control characters and whitespace runs into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.chars() {
        if c.is_whitespace() || c.is_control() {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Truncate to `max_chars` characters, marking the cut with an ellipsis
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str("...");
    truncated
}

/// Make arbitrary text safe for a single log line
pub fn log_line_safe(text: &str) -> String {
    truncate_chars(&collapse_whitespace(text), MAX_DIAGNOSTIC_CHARS)
}

/// Remove duplicates while keeping the first occurrence of each item
pub fn dedupe_preserving_order<I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Short random run identifier
pub fn generate_run_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Day bucket used for daily result files
pub fn date_key(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Canonical watch URL for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Sanitize a name for use as a file stem
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| {
            match c {
                c if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' => c,
                _ => '_',
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("a\nb\t\tc"), "a b c");
        assert_eq!(collapse_whitespace("  lead\r\n\x07trail  "), "lead trail");
        assert_eq!(collapse_whitespace(""), "");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
        // multi-byte characters count as one
        assert_eq!(truncate_chars("가나다라마바", 5), "가나...");
    }

    #[test]
    fn test_log_line_safe_bounds_length() {
        let long = "x\n".repeat(500);
        let safe = log_line_safe(&long);
        assert_eq!(safe.chars().count(), MAX_DIAGNOSTIC_CHARS);
        assert!(safe.ends_with("..."));
        assert!(!safe.contains('\n'));
    }

    #[test]
    fn test_dedupe_preserving_order() {
        let items = vec!["b", "a", "b", "c", "a"].into_iter().map(String::from);
        assert_eq!(dedupe_preserving_order(items), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), 10);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_run_id());
    }

    #[test]
    fn test_date_key() {
        let at = chrono::Utc.with_ymd_and_hms(2026, 2, 17, 23, 59, 0).unwrap();
        assert_eq!(date_key(at), "20260217");
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("shared-session"), "shared-session");
        assert_eq!(sanitize_filename("../etc/passwd"), ".._etc_passwd");
        assert_eq!(sanitize_filename("a b?c"), "a_b_c");
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }
}
