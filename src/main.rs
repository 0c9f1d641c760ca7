// src/main.rs
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use linkage_lib::config::{MatchingConfig, RunSettings};
use linkage_lib::models::{CandidatePair, RecordId, RecordSet};
use linkage_lib::pipeline::{MatchEngine, MatchRun, RunReport};
use linkage_lib::utils::env::load_env;
use linkage_lib::utils::progress_config::ProgressConfig;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find duplicate records within one record set
    Dedupe {
        /// JSON array of normalised records
        #[arg(long)]
        records: PathBuf,

        /// JSON matching config
        #[arg(long)]
        config: PathBuf,

        /// Where to write the JSON report
        #[arg(long)]
        output: PathBuf,

        /// JSON array of reviewed `[left, right]` pairs to accept as matches
        #[arg(long)]
        confirmed: Option<PathBuf>,
    },
    /// Link records of one record set to another
    Link {
        #[arg(long)]
        left: PathBuf,

        #[arg(long)]
        right: PathBuf,

        #[arg(long)]
        config: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long)]
        confirmed: Option<PathBuf>,
    },
}

fn read_records(path: &Path) -> Result<RecordSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record set {}", path.display()))?;
    let records: RecordSet = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse record set {}", path.display()))?;
    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

fn read_config(path: &Path) -> Result<MatchingConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matching config {}", path.display()))?;
    MatchingConfig::from_json_str(&raw)
        .with_context(|| format!("Invalid matching config {}", path.display()))
}

fn read_confirmed(path: Option<&Path>) -> Result<Vec<CandidatePair>> {
    let Some(path) = path else {
        return Ok(Vec::new());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read confirmed pairs {}", path.display()))?;
    let pairs: Vec<(RecordId, RecordId)> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse confirmed pairs {}", path.display()))?;
    info!("Loaded {} confirmed pairs", pairs.len());
    Ok(pairs
        .into_iter()
        .map(|(left, right)| CandidatePair::linked(left, right))
        .collect())
}

fn write_report(
    run: &MatchRun,
    confirmed: &[CandidatePair],
    shards: usize,
    output: &Path,
) -> Result<()> {
    let matched = run
        .matched_pairs(confirmed)
        .context("Confirmed pairs do not fit the run")?;
    let groups = run
        .group(&matched, shards)
        .context("Failed to group matched pairs")?;
    let report = RunReport::new(run, matched.len(), &groups);
    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    fs::write(output, json)
        .with_context(|| format!("Failed to write report {}", output.display()))?;
    info!(
        "📝 Report for run {} written to {} ({} groups)",
        run.run_id,
        output.display(),
        groups.len()
    );
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    info!("Starting record linkage");
    load_env();

    let cli = Cli::parse();
    let settings = RunSettings::from_env();
    settings.log_config();

    let progress_config = ProgressConfig::from_env();
    info!(
        "Progress tracking: enabled={}, detailed={}",
        progress_config.enabled, progress_config.detailed
    );

    let start = Instant::now();
    match cli.command {
        Command::Dedupe {
            records,
            config,
            output,
            confirmed,
        } => {
            let config = read_config(&config)?;
            config.log_config();
            let records = read_records(&records)?;
            let confirmed = read_confirmed(confirmed.as_deref())?;
            let engine = MatchEngine::new(config, settings.clone()).with_progress(progress_config);
            let run = engine
                .deduplicate(&records)
                .context("Deduplication run failed")?;
            write_report(&run, &confirmed, settings.cluster_shards, &output)?;
        }
        Command::Link {
            left,
            right,
            config,
            output,
            confirmed,
        } => {
            let config = read_config(&config)?;
            config.log_config();
            let left = read_records(&left)?;
            let right = read_records(&right)?;
            let confirmed = read_confirmed(confirmed.as_deref())?;
            let engine = MatchEngine::new(config, settings.clone()).with_progress(progress_config);
            let run = engine
                .link(&left, &right)
                .context("Linkage run failed")?;
            write_report(&run, &confirmed, settings.cluster_shards, &output)?;
        }
    }

    info!("Finished in {:.2?}", start.elapsed());
    Ok(())
}
