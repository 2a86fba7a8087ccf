//! CLI for digitprobe: probe digit and integer sequences for hidden structure.

mod commands;
mod export;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use commands::generate::{DEFAULT_N, DEFAULT_SEED, DatasetKind};

#[derive(Parser)]
#[command(name = "digitprobe")]
#[command(about = "digitprobe: does this digit stream look like noise?")]
#[command(version = digitprobe_core::VERSION)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the metric battery over one or more input files.
    /// Several files are analyzed in parallel.
    Probe {
        /// Input files (digits, or one integer per line with --integers)
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Read one integer per line and reduce modulo --alphabet
        #[arg(long)]
        integers: bool,

        /// Alphabet size M for integer mode (>= 2)
        #[arg(long, requires = "integers")]
        alphabet: Option<u32>,

        /// Analyze only the first N symbols
        #[arg(long = "n")]
        n: Option<usize>,

        /// SchurProbe cap R (effective R = min(R, N))
        #[arg(long, default_value_t = digitprobe_tests::DEFAULT_SCHUR_R)]
        schur_r: usize,

        /// Write the JSON report to this path (single input only)
        #[arg(long, conflicts_with = "report_dir")]
        report_json: Option<PathBuf>,

        /// Write one JSON report per input into this directory
        #[arg(long)]
        report_dir: Option<PathBuf>,

        /// Suppress the human-readable summary
        #[arg(long)]
        quiet: bool,
    },

    /// Compare JSON reports against a baseline and rank them by AnomalyScore
    Compare {
        /// Report files, baseline included
        #[arg(required = true, num_args = 2..)]
        reports: Vec<PathBuf>,

        /// Baseline report (must be one of the inputs)
        #[arg(long)]
        baseline: PathBuf,

        /// Write the ranked table as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Write the ranked table as Markdown
        #[arg(long)]
        md: Option<PathBuf>,

        /// Scoring constants as JSON (defaults to anomaly_score_v1)
        #[arg(long)]
        scoring_config: Option<PathBuf>,
    },

    /// Emit a synthetic dataset with known structure
    Generate {
        #[arg(value_enum)]
        kind: DatasetKind,

        /// Number of values
        #[arg(long = "n", default_value_t = DEFAULT_N)]
        n: usize,

        /// RNG seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,

        /// Output path (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Probe {
            files,
            integers,
            alphabet,
            n,
            schur_r,
            report_json,
            report_dir,
            quiet,
        } => commands::parse_mode(integers, alphabet).and_then(|mode| {
            commands::probe::run(commands::probe::ProbeCommandConfig {
                files: &files,
                mode,
                limit: n,
                schur_r,
                report_json: report_json.as_deref(),
                report_dir: report_dir.as_deref(),
                quiet,
            })
        }),
        Commands::Compare {
            reports,
            baseline,
            csv,
            md,
            scoring_config,
        } => commands::compare::run(commands::compare::CompareCommandConfig {
            reports: &reports,
            baseline: &baseline,
            csv: csv.as_deref(),
            md: md.as_deref(),
            scoring_config: scoring_config.as_deref(),
        }),
        Commands::Generate {
            kind,
            n,
            seed,
            output,
        } => commands::generate::run(kind, n, seed, output.as_deref()),
    };

    if let Err(e) = result {
        commands::exit_with(&e);
    }
}
