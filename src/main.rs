//! CLI entry point for the feed SDK.

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use feed_sdk::credentials::{StaticToken, TokenProvider};
use feed_sdk::{
    DownloadEngine, DownloadSettings, FeedFilter, FilterOptions, FilterRequest, RetrievalRequest,
    RetryPolicy, load_config, process_requests,
};
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(
        category = ?args.category,
        config = ?args.config,
        filter_only = args.filter_only,
        "CLI arguments parsed"
    );
    let started = Instant::now();

    let token = args
        .token
        .as_deref()
        .and_then(|token| StaticToken::new(token).bearer_token());
    let engine = DownloadEngine::new(
        DownloadSettings::default()
            .with_read_timeout(Duration::from_secs(args.timeout))
            .with_retry_policy(RetryPolicy::new(
                u32::from(args.max_retries),
                feed_sdk::download::DEFAULT_BACKOFF,
            )),
    );
    let feed_filter = FeedFilter::default();

    let succeeded = if let Some(config_path) = &args.config {
        let config = load_config(config_path)
            .with_context(|| format!("loading config {}", config_path.display()))?;
        let outcomes = process_requests(&config, &engine, &feed_filter, token.as_deref()).await;
        !outcomes.is_empty()
            && outcomes.iter().all(|outcome| {
                outcome.download.as_ref().is_none_or(|result| result.is_success())
                    && outcome.filter.as_ref().is_none_or(|result| result.is_success())
            })
    } else {
        run_single(&args, &engine, &feed_filter, token.as_deref()).await
    };

    info!(
        elapsed_ms = started.elapsed().as_millis(),
        "Execution complete"
    );
    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Download (unless `--filter-only`) then filter, from command-line flags.
async fn run_single(
    args: &Args,
    engine: &DownloadEngine,
    feed_filter: &FeedFilter,
    token: Option<&str>,
) -> bool {
    let request = retrieval_request(args, token);
    let criteria = args.criteria();

    let input_path = if args.filter_only {
        request.file_path()
    } else {
        let result = engine.download(&request).await;
        if !result.is_success() {
            error!(
                file_path = ?result.file_path,
                message = %result.message,
                "Exception in downloading feed. Cannot proceed"
            );
            eprintln!("{}", result.message);
            return false;
        }
        let Some(path) = result.file_path else {
            return false;
        };
        if !args.has_filters() {
            info!(path = %path.display(), "no filters given; feed downloaded without filtering");
            return true;
        }
        path
    };

    let options = FilterOptions::default()
        .with_file_format(args.format)
        .with_keep_staging(args.keep_staging);
    let result = feed_filter
        .filter(&FilterRequest::new(input_path, criteria).with_options(options))
        .await;
    if !result.is_success() {
        eprintln!("{}", result.message);
        return false;
    }
    match &result.file_path {
        Some(path) => println!("{}", path.display()),
        None => info!("no rows matched the filters"),
    }
    true
}

fn retrieval_request(args: &Args, token: Option<&str>) -> RetrievalRequest {
    let mut request = RetrievalRequest::new(
        args.category.clone().unwrap_or_default(),
        args.marketplace.as_str(),
    )
    .with_feed_type(args.feed_type)
    .with_scope(args.scope)
    .with_environment(args.environment)
    .with_file_format(args.format);
    if let Some(date) = &args.date {
        request = request.with_date(date.as_str());
    }
    if let Some(location) = &args.download_location {
        request = request.with_download_location(location);
    }
    if let Some(token) = token {
        request = request.with_token(token);
    }
    request
}
