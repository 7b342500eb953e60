use anyhow::{Context, Result};
use std::path::Path;

use crate::cli::OutputFormat;
use crate::models::{BatchResult, ProcessingStatus};

/// Render the batch as a markdown brief
pub fn render_markdown(batch: &BatchResult) -> String {
    let mut lines = vec![format!("# Economic YouTube Headline Brief ({})", batch.run_id)];

    for (idx, item) in batch.results.iter().enumerate() {
        lines.push(String::new());
        lines.push(format!("## {}. {}", idx + 1, item.video.channel_name));
        lines.push(format!("### {}", item.video.title));
        lines.push(format!("- Link: {}", item.video.url));
        lines.push(format!("- Status: {}", status_label(item.status)));

        if item.partial.is_partial {
            if let Some(reason) = item.partial.reason {
                lines.push(format!("- Partial reason: {}", reason.as_str()));
            }
        }
        if let Some(error) = item.error {
            lines.push(format!("- Error: {}", error.as_str()));
        }

        lines.push("#### Headlines".to_string());
        if item.headlines.is_empty() {
            lines.push("- (no headlines extracted)".to_string());
        } else {
            lines.extend(item.headlines.iter().map(|h| format!("- {}", h)));
        }
    }

    let mut rendered = lines.join("\n").trim().to_string();
    rendered.push('\n');
    rendered
}

fn status_label(status: ProcessingStatus) -> &'static str {
    match status {
        ProcessingStatus::Complete => "complete",
        ProcessingStatus::Partial => "partial",
        ProcessingStatus::EndedLive => "ended_live (captions pending)",
        ProcessingStatus::Unavailable => "unavailable",
        ProcessingStatus::Error => "error",
    }
}

/// Render the batch as pretty-printed JSON
pub fn render_json(batch: &BatchResult) -> Result<String> {
    let value = batch.to_json().context("Failed to serialize batch result")?;
    serde_json::to_string_pretty(&value).context("Failed to serialize batch result")
}

pub fn render(batch: &BatchResult, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(render_markdown(batch)),
        OutputFormat::Json => render_json(batch),
    }
}

/// Save rendered batch to file
pub fn save_to_file(batch: &BatchResult, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(batch, format)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent)?;
    }
    fs_err::write(path, content)?;
    Ok(())
}

/// Print rendered batch to console
pub fn print_to_console(batch: &BatchResult, format: &OutputFormat) -> Result<()> {
    let content = render(batch, format)?;
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        HeadlineResult, PartialInfo, ResultError, VideoDescriptor, VideoIdentity,
    };

    fn result(status: ProcessingStatus, headlines: &[&str]) -> HeadlineResult {
        HeadlineResult {
            status,
            video: VideoDescriptor::from_identity(
                VideoIdentity {
                    video_id: "dQw4w9WgXcQ".to_string(),
                    was_live: false,
                },
                "https://youtu.be/dQw4w9WgXcQ",
            ),
            transcript_chars: 900,
            partial: PartialInfo::complete(),
            headlines: headlines.iter().map(|h| h.to_string()).collect(),
            warnings: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn test_markdown_lists_headlines() {
        let batch = BatchResult::new(
            "abc123".to_string(),
            vec![result(ProcessingStatus::Complete, &["Rates hold steady for now"])],
        );

        let md = render_markdown(&batch);

        assert!(md.starts_with("# Economic YouTube Headline Brief (abc123)\n"));
        assert!(md.contains("## 1. Unknown Channel (dQw4w9WgXcQ)"));
        assert!(md.contains("### Unknown Title (dQw4w9WgXcQ)"));
        assert!(md.contains("- Link: https://youtu.be/dQw4w9WgXcQ"));
        assert!(md.contains("- Status: complete"));
        assert!(md.contains("- Rates hold steady for now"));
        assert!(!md.contains("Partial reason"));
        assert!(md.ends_with("now\n"));
    }

    #[test]
    fn test_markdown_marks_partial_and_errors() {
        let mut partial = result(ProcessingStatus::Partial, &[]);
        partial.partial = PartialInfo::below_min_chars(0.5);
        let mut failed = result(ProcessingStatus::Error, &[]);
        failed.error = Some(ResultError::InvalidReference);

        let batch = BatchResult::new("r".to_string(), vec![partial, failed]);
        let md = render_markdown(&batch);

        assert!(md.contains("- Partial reason: below_min_chars"));
        assert!(md.contains("## 2. "));
        assert!(md.contains("- Error: invalid_reference"));
        assert_eq!(md.matches("- (no headlines extracted)").count(), 2);
    }

    #[test]
    fn test_json_uses_snake_case_status() {
        let batch = BatchResult::new(
            "r".to_string(),
            vec![result(ProcessingStatus::EndedLive, &[])],
        );

        let json: serde_json::Value = serde_json::from_str(&render_json(&batch).unwrap()).unwrap();

        assert_eq!(json["run_id"], "r");
        assert_eq!(json["repo"], crate::models::REPO_NAME);
        assert_eq!(json["results"][0]["status"], "ended_live");
        assert_eq!(json["results"][0]["video"]["video_id"], "dQw4w9WgXcQ");
        assert!(json["results"][0]["error"].is_null());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out").join("brief.md");
        let batch = BatchResult::new("r".to_string(), Vec::new());

        save_to_file(&batch, &path, &OutputFormat::Markdown).unwrap();

        assert_eq!(
            fs_err::read_to_string(&path).unwrap(),
            "# Economic YouTube Headline Brief (r)\n"
        );
    }
}
