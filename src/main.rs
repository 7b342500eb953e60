use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use eyt_headline::channel::{ChannelDiscovery, HttpPageFetcher};
use eyt_headline::cli::{Cli, Commands};
use eyt_headline::config::Config;
use eyt_headline::models::REPO_NAME;
use eyt_headline::pipeline::{EventSink, Pipeline, TracingSink};
use eyt_headline::storage::{append_daily_result, SessionLogger};
use eyt_headline::utils::{date_key, dedupe_preserving_order, generate_run_id};
use eyt_headline::{output, BatchResult};

/// Slug used for daily result files
const RESULT_SLUG: &str = "eyt-headline";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match cli.command {
        Commands::Generate {
            video_urls,
            input_file,
            channels,
            output_format,
            out,
            run_id,
            no_store,
        } => {
            let config = Config::load()?;

            let mut urls = collect_urls(video_urls, input_file.as_deref())?;
            if urls.is_empty() {
                let tokens = if channels.is_empty() {
                    config.channels.targets.clone()
                } else {
                    channels
                };
                if !tokens.is_empty() {
                    let discovery = ChannelDiscovery::new(HttpPageFetcher::new()?);
                    let (found, warnings) = discovery
                        .collect_from_channels(&tokens, config.channels.video_limit)
                        .await;
                    print_warnings("channels", &warnings);
                    urls = found;
                }
            }
            if urls.is_empty() {
                anyhow::bail!(
                    "At least one --video-url, --input-file or --channel (with discoverable uploads) is required."
                );
            }

            let run_id = run_id.unwrap_or_else(generate_run_id);
            let session_id = config
                .storage
                .session_id
                .clone()
                .unwrap_or_else(|| run_id.clone());
            let session = SessionLogger::new(
                &config.storage.log_dir(),
                REPO_NAME,
                &run_id,
                &session_id,
            );
            let progress = ProgressSink::new(urls.len(), cli.quiet)?;

            log_best_effort(
                session.info("run_start", &json!({ "video_count": urls.len() })),
            );

            let pipeline = Pipeline::http()?;
            let sink = (&session, (&progress, TracingSink));
            let batch = pipeline
                .run(&urls, &config, Some(&sink), Some(run_id))
                .await;
            progress.finish();

            for result in &batch.results {
                let label = if result.video.video_id.is_empty() {
                    result.video.url.as_str()
                } else {
                    result.video.video_id.as_str()
                };
                print_warnings(label, &result.warnings);
                if !result.warnings.is_empty() {
                    log_best_effort(session.warn(
                        "video_warnings",
                        &json!({ "url": result.video.url, "warnings": result.warnings }),
                    ));
                }
            }

            if !no_store {
                match store_batch(&batch, &config.storage.result_dir()) {
                    Ok(stored) => tracing::info!(path = %stored.display(), "Batch stored"),
                    Err(err) => {
                        log_best_effort(
                            session.error("store_failed", &json!({ "error": err.to_string() })),
                        );
                        return Err(err);
                    }
                }
            }

            log_best_effort(session.info(
                "run_done",
                &json!({
                    "result_count": batch.results.len(),
                    "statuses": batch.results.iter().map(|r| r.status.as_str()).collect::<Vec<_>>(),
                }),
            ));

            match out {
                Some(path) => {
                    output::save_to_file(&batch, &path, &output_format)?;
                    println!("Written: {}", path.display());
                }
                None => {
                    output::print_to_console(&batch, &output_format)?;
                }
            }
        }
        Commands::Channels { tokens, limit } => {
            let config = Config::load()?;
            let limit = limit
                .unwrap_or(config.channels.video_limit)
                .clamp(1, 50);

            let discovery = ChannelDiscovery::new(HttpPageFetcher::new()?);
            let (urls, warnings) = discovery.collect_from_channels(&tokens, limit).await;
            print_warnings("channels", &warnings);

            for url in urls {
                println!("{}", url);
            }
        }
        Commands::Config { show } => {
            let config = Config::load()?;
            if show {
                config.display();
            } else {
                let path = Config::config_path()?;
                if path.exists() {
                    println!("Configuration already exists: {}", path.display());
                } else {
                    let written = Config::default().save()?;
                    println!("Default configuration written to: {}", written.display());
                }
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "eyt_headline=debug"
    } else {
        "eyt_headline=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

/// URLs from flags then file, blank and `#` lines skipped, first occurrence kept
fn collect_urls(video_urls: Vec<String>, input_file: Option<&Path>) -> Result<Vec<String>> {
    let mut collected: Vec<String> = video_urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if let Some(path) = input_file {
        let content = fs_err::read_to_string(path).context("Failed to read input file")?;
        collected.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    Ok(dedupe_preserving_order(collected))
}

fn store_batch(batch: &BatchResult, result_dir: &Path) -> Result<std::path::PathBuf> {
    append_daily_result(
        result_dir,
        &date_key(batch.generated_at),
        RESULT_SLUG,
        batch,
    )
}

fn print_warnings(label: &str, warnings: &[String]) {
    for warning in warnings {
        eprintln!(
            "{} [{}] {}",
            style("warning:").yellow().bold(),
            style(label).dim(),
            warning
        );
    }
}

fn log_best_effort(result: Result<()>) {
    if let Err(err) = result {
        tracing::warn!(error = %err, "Session log write failed");
    }
}

/// Progress bar advanced by pipeline lifecycle events
struct ProgressSink {
    bar: ProgressBar,
}

impl ProgressSink {
    fn new(total: usize, quiet: bool) -> Result<Self> {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?,
        );
        Ok(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_with_message("done");
    }
}

impl EventSink for ProgressSink {
    fn log_event(&self, event: &str, payload: &serde_json::Value) -> Result<()> {
        match event {
            "video_start" => {
                let url = payload["url"].as_str().unwrap_or_default();
                self.bar.set_message(url.to_string());
            }
            "video_done" => {
                self.bar.inc(1);
            }
            _ => {}
        }
        Ok(())
    }
}
