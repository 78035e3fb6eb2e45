//! mastopost binary: load the feed registry, then run, list or inspect feeds.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use mastopost::cli::{Args, Command};
use mastopost::config::Config;
use mastopost::scheduler::{run_all_once, run_every, FeedJob};
use mastopost::state::{JsonFileStore, WatermarkStore};
use mastopost::telemetry::init_tracing;
use mastopost::{RunStatus, Runner};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    init_tracing(args.json_logs);

    match start(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn start(args: Args) -> Result<ExitCode> {
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Run {
            feeds,
            dry_run,
            every,
        } => {
            let jobs = build_jobs(&config, &feeds)?;
            match every {
                None => Ok(run_once(&jobs, dry_run).await),
                Some(secs) => {
                    let shutdown = async {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            tracing::warn!(error = %e, "ctrl-c handler unavailable");
                            std::future::pending::<()>().await;
                        }
                    };
                    run_every(jobs, Duration::from_secs(secs), dry_run, shutdown).await;
                    Ok(ExitCode::SUCCESS)
                }
            }
        }
        Command::List => {
            for name in config.feed_names() {
                let fc = &config.feeds[name];
                println!(
                    "{name}\t{}\t{}",
                    fc.feed_url.as_deref().unwrap_or("-"),
                    fc.instance.as_deref().unwrap_or("-"),
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Status { feed } => {
            let path = config.state_file_for(&feed)?;
            let store = JsonFileStore::new(path);
            let wm = store
                .load(feed.trim())
                .await
                .with_context(|| format!("reading watermark for `{feed}`"))?;
            println!(
                "{}\tlast_updated={}\tlast_published={}",
                wm.feed_name,
                wm.last_updated.to_rfc3339(),
                wm.last_published.to_rfc3339()
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

// Every feed is validated before anything is fetched.
fn build_jobs(config: &Config, feeds: &[String]) -> Result<Vec<FeedJob>> {
    feeds
        .iter()
        .map(|name| -> Result<FeedJob> {
            let settings = config.feed(name)?;
            let runner = Runner::from_config(config, &settings)?;
            Ok(FeedJob {
                name: settings.name,
                url: settings.feed_url,
                runner: Arc::new(runner),
            })
        })
        .collect()
}

async fn run_once(jobs: &[FeedJob], dry_run: bool) -> ExitCode {
    let mut code = ExitCode::SUCCESS;
    for (name, res) in run_all_once(jobs, dry_run).await {
        match res {
            Ok(report) => {
                let summary = match report.status {
                    RunStatus::NoUpdates => "no updates".to_string(),
                    RunStatus::NoNewEntries => "no new entries".to_string(),
                    RunStatus::DryRun { pending } => format!("dry run, {pending} pending"),
                    RunStatus::Dispatched { sent, failed } => {
                        format!("{sent} posted, {failed} failed")
                    }
                };
                println!("{name}: {summary}");
            }
            Err(e) => {
                println!("{name}: failed: {e}");
                code = ExitCode::FAILURE;
            }
        }
    }
    code
}
