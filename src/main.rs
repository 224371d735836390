use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, warn};

use shiptrack::cli::{Cli, Command};
use shiptrack::config::TrackerConfig;
use shiptrack::provider::HttpTrackingClient;
use shiptrack::tracking::{CandidateId, Category, JobId, TrackingJob, TrackingRequest};
use shiptrack::ui::{self, ResolutionProgress};
use shiptrack::{RefreshOutcome, ResolutionEngine, logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config =
        TrackerConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(max_attempts) = cli.max_attempts {
        config.max_attempts = max_attempts;
    }
    if let Some(interval) = cli.interval {
        config.poll_interval_secs = interval;
    }
    config.validate()?;
    debug!(api_url = %config.api_url, max_attempts = config.max_attempts, "configuration loaded");

    match cli.command {
        Command::Carriers { category } => {
            let catalog = config.catalog();
            let providers = match category {
                Some(category) => catalog.list(category.into()),
                None => catalog.all().to_vec(),
            };
            ui::print_carriers(&providers);
            Ok(ExitCode::SUCCESS)
        }
        Command::Track {
            reference,
            category,
            carrier,
            json,
        } => {
            let category = Category::from(category);
            let request = match carrier {
                Some(carrier) => {
                    TrackingRequest::manual(&reference, category, CandidateId::new(carrier))
                }
                None => TrackingRequest::auto_detect(&reference, category),
            };
            track(&config, request, json).await
        }
        Command::Refresh {
            job_id,
            carrier,
            category,
            reference,
            json,
        } => {
            let job = TrackingJob::new(
                JobId::new(job_id),
                CandidateId::new(carrier),
                category.into(),
                reference,
            );
            refresh(&config, &job, json).await
        }
    }
}

fn engine(config: &TrackerConfig) -> Result<ResolutionEngine> {
    let client = HttpTrackingClient::new(
        config.api_key.clone(),
        config.api_url.clone(),
        config.request_timeout(),
    )?;
    Ok(ResolutionEngine::new(
        Arc::new(client),
        config.catalog(),
        config.engine_config(),
    ))
}

async fn track(config: &TrackerConfig, request: TrackingRequest, json: bool) -> Result<ExitCode> {
    let engine = engine(config)?;
    let progress = ResolutionProgress::start(&request.reference, json);
    let events = engine.subscribe();
    let handle = engine.submit(request);
    let request_id = handle.request_id();

    let cancel = handle.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, abandoning search");
            cancel.cancel();
        }
    });

    let outcome = handle.outcome();
    tokio::pin!(outcome);
    let result = tokio::select! {
        result = &mut outcome => result,
        _ = progress.follow(events, request_id) => outcome.await,
    };

    match result {
        Ok(outcome) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                progress.complete(&outcome);
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            match (json, err.outcome()) {
                (true, Some(outcome)) => println!("{}", serde_json::to_string_pretty(outcome)?),
                _ => progress.fail(&err),
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn refresh(config: &TrackerConfig, job: &TrackingJob, json: bool) -> Result<ExitCode> {
    let engine = engine(config)?;
    let outcome = engine
        .refresh(job)
        .await
        .with_context(|| format!("refresh of job {} failed", job.job_id))?;

    match outcome {
        RefreshOutcome::Updated(result) if json => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        RefreshOutcome::Updated(result) => println!("{}", ui::render_result(&result)),
        RefreshOutcome::Unchanged => println!("job {} unchanged", job.job_id),
        RefreshOutcome::AlreadyPolling => println!("job {} is being polled", job.job_id),
    }
    Ok(ExitCode::SUCCESS)
}
