mod config;
mod dataset;
mod error;
mod manager;
mod merge;
mod normalize;
mod parser;
mod records;
mod scraper;
mod sources;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::dataset::{Dataset, RunMetadata};
use crate::manager::ScrapeManager;
use crate::parser::analyzer;
use crate::scraper::Fetcher;

#[derive(Parser)]
#[command(
    name = "arcana_scraper",
    about = "Scrape esoteric symbols, traditions and their connections into a JSON dataset"
)]
struct Cli {
    /// Settings file (default: arcana.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape all sources and write (or merge into) a dataset
    Run {
        /// JSON sources file (default: built-in sources)
        #[arg(short, long)]
        sources: Option<PathBuf>,
        /// Existing dataset to merge into
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short, long, default_value = "data/scraped_data.json")]
        output: PathBuf,
        /// Overrides discovery.max_workers
        #[arg(long)]
        max_workers: Option<usize>,
        /// Write only the scraped records, even with --input
        #[arg(long)]
        standalone: bool,
    },
    /// Merge a scraped dataset into an existing one without fetching
    Merge {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        scraped: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Show record counts and the last merge log
    Stats {
        #[arg(short, long, default_value = "data/scraped_data.json")]
        file: PathBuf,
    },
    /// Print the built-in sources as a sources file
    Sources,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.log_file.as_deref())?;
    let t0 = Instant::now();

    match cli.command {
        Commands::Run {
            sources,
            input,
            output,
            max_workers,
            standalone,
        } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            if let Some(n) = max_workers {
                settings.discovery.max_workers = n;
            }
            let entries = match &sources {
                Some(path) => sources::load(path)?,
                None => sources::default_sources(),
            };
            let lists = sources::resolve(entries)?;
            let existing = input.as_deref().map(Dataset::load).transpose()?;
            let fetcher = Fetcher::http(&settings.fetch)?;
            let analyzer = analyzer::select(&settings.analyzer, &settings.scoring);
            info!(
                "Scraping {} source lists with the {} analyzer",
                lists.len(),
                analyzer.name()
            );

            let roster = existing.as_ref().map(Dataset::roster).unwrap_or_default();
            let batch = ScrapeManager::new(fetcher, analyzer, settings.discovery.clone())
                .with_known_symbols(roster)
                .run(&lists)
                .await?;
            if batch.failed_jobs > 0 {
                warn!("{} scrape jobs failed; their records are missing", batch.failed_jobs);
            }

            let mut out = match existing {
                Some(mut data) if !standalone => {
                    let current = data.take_corpus();
                    let (merged, log) = merge::merge(current, batch.corpus);
                    data.merge_log = Some(log);
                    data.with_corpus(merged)
                }
                _ => Dataset::from_corpus(batch.corpus),
            };
            let run = RunMetadata::new(&out, batch.urls_visited);
            out.stamp(&run)?;
            out.save(&output)?;
            println!(
                "Saved {} symbols, {} traditions, {} connections to {} ({} urls visited)",
                run.total_symbols,
                run.total_traditions,
                run.total_connections,
                output.display(),
                run.urls_visited
            );
        }
        Commands::Merge {
            input,
            scraped,
            output,
        } => {
            let mut data = Dataset::load(&input)?;
            let mut incoming = Dataset::load(&scraped)?;
            let urls_visited = incoming
                .metadata
                .get("urls_visited")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize;

            let (merged, log) = merge::merge(data.take_corpus(), incoming.take_corpus());
            print_merge_log(&log);
            data.merge_log = Some(log);
            let mut data = data.with_corpus(merged);
            let run = RunMetadata::new(&data, urls_visited);
            data.stamp(&run)?;
            data.save(&output)?;
            println!("Wrote {}", output.display());
        }
        Commands::Stats { file } => {
            let data = Dataset::load(&file)?;
            let s = data.stats();
            println!("Symbols:     {}", s.symbols);
            println!("Traditions:  {}", s.traditions);
            println!("Connections: {}", s.connections);
            println!("Avg. strength: {:.2}", s.mean_strength);
            if !s.top_traditions.is_empty() {
                println!("\n--- Top symbol traditions ---");
                for (name, count) in &s.top_traditions {
                    println!("  {:<24} {:>4}", name, count);
                }
            }
            if let Some(log) = &data.merge_log {
                println!();
                print_merge_log(log);
            }
        }
        Commands::Sources => {
            let json = serde_json::to_string_pretty(&sources::default_sources())?;
            println!("{}", json);
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

/// Stdout logging filtered by `RUST_LOG` (default `info`), plus an optional file.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let name = path
                .file_name()
                .with_context(|| format!("{} is not a file path", path.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();
    Ok(guard)
}

fn print_merge_log(log: &merge::MergeLog) {
    println!("Merge {}:", log.date);
    println!("  symbols:     +{} added, {} updated", log.symbols_added, log.symbols_updated);
    println!(
        "  traditions:  +{} added, {} updated",
        log.traditions_added, log.traditions_updated
    );
    println!(
        "  connections: +{} added, {} updated",
        log.connections_added, log.connections_updated
    );
    if log.symbol_id_collisions > 0 {
        println!("  id collisions resolved: {}", log.symbol_id_collisions);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
