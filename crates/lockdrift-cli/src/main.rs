//! Lockdrift CLI - lockfile vs requirements drift checker.

mod report;

use anyhow::Result;
use clap::Parser;
use lockdrift_core::{compare, lockfile, requirements, MarkerEnv};
use std::path::PathBuf;
use std::process::ExitCode;

/// Comparison ran and found no drift.
const EXIT_OK: u8 = 0;
/// Comparison ran and found drift; details were printed.
const EXIT_DRIFT: u8 = 1;
/// A named input file does not exist; the comparison never ran.
const EXIT_MISSING_INPUT: u8 = 2;

#[derive(Parser, Debug)]
#[command(name = "lockdrift")]
#[command(version)]
#[command(about = "Verify that a lockfile matches a requirements manifest", long_about = None)]
struct Cli {
    /// Path to the lockfile
    #[arg(short = 'l', long, default_value = "Pipfile.lock")]
    lockfile: PathBuf,

    /// Path to the requirements manifest
    #[arg(short = 'r', long, default_value = "requirements.txt")]
    requirements: PathBuf,

    /// Comma-separated lockfile sections to check
    #[arg(long, default_value = "default,develop")]
    sections: String,

    /// Also fail on packages present in the lock but not in requirements
    #[arg(long)]
    strict: bool,

    /// Output format
    #[arg(short, long = "output", value_enum, default_value = "human")]
    format: OutputFormat,

    /// Python version assumed when evaluating environment markers
    #[arg(long, value_name = "VERSION")]
    python_version: Option<String>,

    /// Platform name assumed when evaluating environment markers
    #[arg(long, value_name = "NAME")]
    sys_platform: Option<String>,

    /// Verbose output
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<u8> {
    for path in [&cli.lockfile, &cli.requirements] {
        if !path.exists() {
            eprintln!("ERROR: {} not found", path.display());
            return Ok(EXIT_MISSING_INPUT);
        }
    }

    let sections: Vec<&str> = cli
        .sections
        .split(',')
        .map(str::trim)
        .filter(|section| !section.is_empty())
        .collect();

    let env = marker_env(cli);

    let lock = lockfile::load(&cli.lockfile, &sections)?;
    let reqs = requirements::load(&cli.requirements, &env)?;
    let diff = compare(&lock, &reqs, cli.strict);

    match cli.format {
        OutputFormat::Human => report::print_human(&diff),
        OutputFormat::Json => report::print_json(&diff),
    }

    Ok(if diff.ok { EXIT_OK } else { EXIT_DRIFT })
}

fn marker_env(cli: &Cli) -> MarkerEnv {
    let mut env = MarkerEnv::host();
    if let Some(version) = &cli.python_version {
        env.python_version = version.clone();
        env.python_full_version = version.clone();
    }
    if let Some(platform) = &cli.sys_platform {
        env.sys_platform = platform.clone();
    }
    env
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
