//! `sessiondigest run`: Process sessions and write analysis results.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use sessiondigest_config::AppConfig;
use sessiondigest_core::record::{BatchOutcome, RunReport};
use sessiondigest_pipeline::{BatchRunner, Enricher, FsStorage, Processor, discover};
use tracing::{info, warn};

#[derive(clap::Args, Debug, Default)]
pub struct RunArgs {
    /// Session file, session folder, or directory of them (default: input_dir from config)
    pub input: Option<PathBuf>,

    /// Output directory (default: output_dir from config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Config file to use instead of ~/.sessiondigest/config.toml
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable LLM enrichment
    #[arg(long)]
    pub enrich: bool,

    /// Fail a session when its enrichment fails (implies --enrich)
    #[arg(long)]
    pub require_enrichment: bool,

    /// Sessions processed at once
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,
}

fn parse_concurrency(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("concurrency must be at least 1".into()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Load the configuration named by `path`, or the default one.
pub fn load_config(path: Option<&std::path::Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path)?,
        None => AppConfig::load()?,
    };
    Ok(config)
}

/// Fold command-line flags into the loaded configuration.
pub fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(input) = &args.input {
        config.input_dir = input.clone();
    }
    if args.enrich || args.require_enrichment {
        config.enrichment_enabled = true;
    }
    if args.require_enrichment {
        config.enrichment_required = true;
    }
    if let Some(n) = args.concurrency {
        config.max_concurrency = n;
    }
}

pub async fn run(args: RunArgs) -> Result<RunReport, Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let enricher = if config.enrichment_enabled {
        let provider = sessiondigest_providers::build_from_config(&config)?;
        Some(Enricher::from_config(provider, &config))
    } else {
        None
    };
    let processor = Processor::from_config(&config, enricher);

    let items = discover(&config.input_dir).await?;
    info!(input = %config.input_dir.display(), items = items.len(), "Inputs discovered");

    let runner = BatchRunner::new(processor, Arc::new(FsStorage), &config.output_dir)
        .with_concurrency(config.max_concurrency);

    let stop = runner.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Stop requested, finishing in-flight sessions");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let report = runner.run(&items).await?;
    print_summary(&report, &config);
    Ok(report)
}

fn print_summary(report: &RunReport, config: &AppConfig) {
    println!();
    println!("📋 Run {}", report.run_id);
    println!(
        "   {} succeeded, {} failed, {} skipped ({} total)",
        report.succeeded,
        report.failed,
        report.skipped,
        report.total()
    );

    for outcome in &report.outcomes {
        match outcome {
            BatchOutcome::Failed {
                input,
                kind,
                message,
            } => println!("   ❌ {input}: {kind}: {message}"),
            BatchOutcome::Skipped { input, reason } => println!("   ⏭️  {input}: {reason}"),
            BatchOutcome::Succeeded { copy_warnings, .. } if !copy_warnings.is_empty() => {
                println!(
                    "   ⚠️  {}: {} artifact(s) not copied",
                    outcome.input(),
                    copy_warnings.len()
                );
            }
            BatchOutcome::Succeeded { .. } => {}
        }
    }

    println!("   Output: {}", config.output_dir.display());
}
