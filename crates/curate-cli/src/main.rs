//! `curate`: batch front end for the Codex curation queue.
//!
//! # Usage
//!
//! ```
//! curate run --input raw.jsonl --output approved.jsonl --queue-out queue.jsonl
//! curate run --input raw.jsonl --output approved.jsonl --decisions decisions.jsonl
//! curate check approved.jsonl
//! curate codex --codex codex.json
//! ```
//!
//! Settings come from `curate.toml` (or `--config`) and `CURATE_*`
//! environment variables; see [`settings::Settings`].

mod decisions;
mod gateway;
mod settings;

use std::{
  fs,
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use curate_core::codex::{CLEAVAGE_ORDER, CLEAVAGE_SCHEMA_VERSION, Codex, LabelFamily};
use curate_queue::{Orchestrator, ReviewEngine, ReviewQueue, export::parse_export};
use gateway::CommandAnnotator;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "curate", version, about = "Codex annotation review queue")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, global = true, default_value = "curate.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Ingest, annotate, apply decisions and export approved records.
  Run(RunArgs),

  /// Validate an export file against the cleavage schema.
  Check {
    /// Export JSONL to validate.
    file: PathBuf,
  },

  /// Print the cleavage ordering and label counts of the active codex.
  Codex {
    /// Codex JSON file; overrides `codex_path` from the settings.
    #[arg(long, value_name = "FILE")]
    codex: Option<PathBuf>,
  },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
  /// Raw JSONL to ingest.
  #[arg(short, long, value_name = "FILE")]
  input: PathBuf,

  /// Where to write the approved JSONL export.
  #[arg(short, long, value_name = "FILE")]
  output: PathBuf,

  /// Reviewer decisions JSONL to apply after annotation.
  #[arg(long, value_name = "FILE")]
  decisions: Option<PathBuf>,

  /// Approve every record still awaiting review.
  #[arg(long)]
  approve_all: bool,

  /// Write the records left in the queue as JSONL, for later review.
  #[arg(long, value_name = "FILE")]
  queue_out: Option<PathBuf>,

  /// Records per annotator call; overrides the settings.
  #[arg(long, env = "CURATE_CHUNK_SIZE")]
  chunk_size: Option<usize>,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr; stdout carries command output.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  match cli.command {
    Command::Run(args) => run(&settings, args).await,
    Command::Check { file } => check(&file),
    Command::Codex { codex } => {
      let path = codex.or_else(|| settings.codex_path.clone());
      show_codex(&load_codex(path.as_deref())?);
      Ok(())
    }
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

async fn run(settings: &Settings, args: RunArgs) -> Result<()> {
  let codex = load_codex(settings.codex_path.as_deref())?;
  let chunk_size = args.chunk_size.unwrap_or(settings.chunk_size);

  let input = read(&args.input)?;
  let queue = ReviewQueue::new();
  let ingested = queue.ingest(&input);
  if ingested.added == 0 {
    tracing::warn!(input = %args.input.display(), "no valid records to ingest");
  }

  let orchestrator = Orchestrator::new(
    queue.clone(),
    CommandAnnotator::new(&settings.annotator),
    Arc::new(codex),
  )
  .with_chunk_size(chunk_size)?;
  let report = orchestrator.run().await?;

  let engine = ReviewEngine::new(queue.clone());
  if let Some(path) = &args.decisions {
    let parsed = decisions::parse(&read(path)?)
      .with_context(|| format!("failed to parse {}", path.display()))?;
    decisions::apply(&engine, parsed);
  }
  if args.approve_all {
    engine.bulk_approve();
  }

  let export = queue.export()?;
  fs::write(&args.output, export)
    .with_context(|| format!("failed to write {}", args.output.display()))?;

  if let Some(path) = &args.queue_out {
    let lines = queue
      .snapshot()
      .iter()
      .map(serde_json::to_string)
      .collect::<Result<Vec<_>, _>>()?;
    fs::write(path, lines.join("\n"))
      .with_context(|| format!("failed to write {}", path.display()))?;
  }

  let counts = queue.counts();
  println!(
    "ingested {} (skipped {}), annotated {} in {} chunks of up to {}, failed {}, unmatched {}",
    ingested.added,
    ingested.skipped,
    report.merged,
    report.chunks,
    orchestrator.chunk_size(),
    report.failed,
    report.unmatched,
  );
  println!(
    "queue: raw {}, pending_review {}, error {}; approved {}",
    counts.raw, counts.pending_review, counts.error, counts.approved,
  );
  Ok(())
}

fn check(file: &Path) -> Result<()> {
  let records = parse_export(&read(file)?)
    .with_context(|| format!("{} is not a valid export", file.display()))?;
  println!(
    "{}: {} records, schema v{CLEAVAGE_SCHEMA_VERSION}",
    file.display(),
    records.len()
  );
  Ok(())
}

fn show_codex(codex: &Codex) {
  println!("cleavage schema v{CLEAVAGE_SCHEMA_VERSION}");
  for (index, id) in CLEAVAGE_ORDER.iter().enumerate() {
    println!("  {index}: {id}");
  }
  for family in [LabelFamily::Cleavage, LabelFamily::Tactic, LabelFamily::Emotion] {
    let count = codex.family(family).len();
    if count == 0 {
      println!("{family}: open");
    } else {
      println!("{family}: {count} labels");
    }
  }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

fn load_codex(path: Option<&Path>) -> Result<Codex> {
  match path {
    Some(path) => Codex::from_json(&read(path)?)
      .with_context(|| format!("failed to load codex from {}", path.display())),
    None => Ok(Codex::builtin()),
  }
}

fn read(path: &Path) -> Result<String> {
  fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
