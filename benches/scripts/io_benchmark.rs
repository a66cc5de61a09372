//! Naive versus batch personnel benchmark.
//!
//! Run: cargo run --release --bin io-benchmark -- benches/corpus --runs 5

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wingmate_core::{
    BatchRepository, BenchmarkHarness, BenchmarkResult, CampaignLayout, FsStore,
    PersonnelResolutionService, RepositoryConfig, TracingSink, json_files,
};

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// Compare one-file-per-lookup loading with batch loading
#[derive(Parser)]
#[command(name = "io-benchmark")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Installation root holding User/Campaigns
    root: PathBuf,

    /// Campaign to benchmark (default: every campaign)
    #[arg(short, long)]
    campaign: Option<String>,

    /// Runs per strategy
    #[arg(short, long, default_value_t = 3)]
    runs: usize,

    /// Repository configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:?}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RepositoryConfig::from_file(path).into_diagnostic()?,
        None => RepositoryConfig::default(),
    };

    let layout = CampaignLayout::new(&cli.root);
    let campaigns = match &cli.campaign {
        Some(name) => vec![name.clone()],
        None => layout.campaigns(),
    };

    let repository = BatchRepository::with_config(FsStore::from_config(&config), config);
    let service = PersonnelResolutionService::new(&repository);
    let harness = BenchmarkHarness::new(&repository).with_runs(cli.runs);

    let mut results = Vec::with_capacity(campaigns.len());
    for campaign in &campaigns {
        repository.begin_session(campaign);

        let rosters = layout.personnel_files(campaign);
        let medal_tables = json_files(&layout.campaigns_dir().join(campaign).join("Medals"));
        let people = service
            .roster_members(&rosters, &medal_tables)
            .into_diagnostic()?;
        info!(
            "Campaign '{}': {} rosters, {} medal tables, {} people",
            campaign,
            rosters.len(),
            medal_tables.len(),
            people.len()
        );

        let result = harness.benchmark(campaign, &people).into_diagnostic()?;
        result.emit(&TracingSink);
        results.push(result);
    }

    repository.metrics().emit(&TracingSink);
    print_results(&results, cli.format)
}

fn print_results(results: &[BenchmarkResult], format: Format) -> Result<()> {
    match format {
        Format::Text => {
            if results.is_empty() {
                println!("No campaigns found");
            }
            for result in results {
                println!("{}", result);
            }
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(results).into_diagnostic()?;
            println!("{}", json);
        }
    }
    Ok(())
}
