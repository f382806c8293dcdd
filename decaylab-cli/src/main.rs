//! DecayLab CLI: toy generation, configuration and candidate-search runs.
//!
//! Commands:
//! - `run`: search a JSON-lines event file and export histograms
//! - `generate`: write toy events with embedded three-body decays
//! - `config`: print the default run configuration as TOML

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;

use decaylab_core::components::CutVerdict;
use decaylab_core::sink::Category;
use decaylab_runner::{
    generate_events, run_from_files, save_events, write_run_dir, RunConfig, RunResult, ToyConfig,
};

#[derive(Parser)]
#[command(
    name = "decaylab",
    version,
    about = "DecayLab CLI: three-body decay vertex candidate search"
)]
struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every event of a JSON-lines file and export the histograms.
    Run {
        /// Path to a TOML run config. An empty file selects every default.
        #[arg(long)]
        config: PathBuf,

        /// JSON-lines event file.
        #[arg(long)]
        events: PathBuf,

        /// Output directory for summary.json and the CSV tables.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Worker threads. Defaults to one per core.
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Generate toy events as JSON lines.
    Generate {
        /// Number of events.
        #[arg(long)]
        events: u64,

        /// Master seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Probability that an event carries a decay.
        #[arg(long)]
        signal_fraction: Option<f64>,

        /// TOML file with generator parameters. CLI flags take precedence.
        #[arg(long)]
        toy_config: Option<PathBuf>,

        /// Output file.
        #[arg(long)]
        output: PathBuf,
    },
    /// Print the default run configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            events,
            output_dir,
            threads,
        } => run_cmd(&config, &events, &output_dir, threads),
        Commands::Generate {
            events,
            seed,
            signal_fraction,
            toy_config,
            output,
        } => generate_cmd(events, seed, signal_fraction, toy_config.as_deref(), &output),
        Commands::Config => {
            print!("{}", RunConfig::default().to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(default)
        .parse_default_env()
        .init();
}

fn run_cmd(
    config: &Path,
    events: &Path,
    output_dir: &Path,
    threads: Option<usize>,
) -> Result<()> {
    let result = run_from_files(config, events, threads).with_context(|| {
        format!(
            "run failed (config {}, events {})",
            config.display(),
            events.display()
        )
    })?;

    print_summary(&result);

    write_run_dir(&result, output_dir)
        .with_context(|| format!("cannot export to {}", output_dir.display()))?;
    println!("Results saved to: {}", output_dir.display());
    Ok(())
}

fn generate_cmd(
    n: u64,
    seed: u64,
    signal_fraction: Option<f64>,
    toy_config: Option<&Path>,
    output: &Path,
) -> Result<()> {
    let mut toy = match toy_config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("cannot read {}", path.display()))?;
            toml::from_str::<ToyConfig>(&text)
                .with_context(|| format!("invalid toy config {}", path.display()))?
        }
        None => ToyConfig::default(),
    };
    toy.seed = seed;
    if let Some(f) = signal_fraction {
        toy.signal_fraction = f;
    }
    toy.validate()?;
    if n == 0 {
        bail!("--events must be at least 1");
    }

    let events = generate_events(&toy, n);
    save_events(output, &events).with_context(|| format!("cannot write {}", output.display()))?;

    let tracks: usize = events.iter().map(|e| e.tracks.len()).sum();
    println!(
        "Generated {} events ({} tracks) to {}",
        events.len(),
        tracks,
        output.display()
    );
    Ok(())
}

fn print_summary(result: &RunResult) {
    let s = &result.stats;
    println!();
    println!("=== Candidate Search ===");
    println!("Run:            {}", result.run_id);
    println!(
        "Events:         {} ({} below vertex-contributor threshold)",
        s.events, s.events_rejected
    );
    println!(
        "Tracks:         {} / {} / {} per channel slot",
        s.species[0], s.species[1], s.species[2]
    );
    println!("Triplets:       {}", s.triplets);
    println!("Candidates:     {}", s.candidates);
    println!("Signal:         {}", s.signal);
    println!(
        "Passing:        {} ({:.1}%)",
        s.passing,
        s.pass_rate() * 100.0
    );
    println!();
    println!("--- Skipped ---");
    println!("Propagation:    {}", s.propagation_failures);
    println!("Degenerate cov: {}", s.degenerate_covariance);
    println!("Fit failures:   {}", s.fit_failures);
    println!();
    println!("--- Cut flow (rejected by clause) ---");
    let flow = &result.histograms.cut_flow;
    for category in Category::ALL {
        let c = category as usize;
        let clauses: Vec<String> = CutVerdict::CLAUSES
            .iter()
            .zip(flow.rejected[c])
            .map(|(name, n)| format!("{name}={n}"))
            .collect();
        println!(
            "{:<15} {} of {} pass; {}",
            format!("{category:?}:"),
            flow.passing[c],
            flow.total[c],
            clauses.join(" ")
        );
    }
    println!("Elapsed:        {} ms", result.elapsed_ms);
}
