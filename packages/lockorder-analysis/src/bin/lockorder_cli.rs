/*
 * Lock Order Analysis CLI
 *
 * Runs deadlock detection (and optionally repair) on a JSON program model.
 *
 * Usage:
 *   lockorder-cli --input program.json
 *   lockorder-cli --input program.json --preset repair --format json
 *   lockorder-cli --input program.json --config lockorder.yaml --mode group
 *
 * Exit codes:
 *   0  deadlock-free (acyclic, or every cycle repaired)
 *   1  error (bad input, bad config)
 *   2  deadlock reported, or repair did not converge
 *
 * Logging goes to stderr; set RUST_LOG=lockorder_analysis=debug for per-iteration output.
 */

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use lockorder_analysis::config::{ConfigError, DetectionMode, LockOrderConfig, Preset};
use lockorder_analysis::features::concurrency_analysis::{LockOrderReport, ProgramModel};
use lockorder_analysis::{LockOrderAnalysis, Result};

#[derive(Parser)]
#[command(name = "lockorder-cli")]
#[command(about = "Static lock-order deadlock detection and repair", long_about = None)]
struct Cli {
    /// Program model (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// YAML configuration file (takes precedence over --preset)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Preset: detect, repair, custom
    #[arg(short, long, default_value = "detect")]
    preset: String,

    /// Override the detection mode: group, lockset
    #[arg(long)]
    mode: Option<String>,

    /// Repair cycles instead of reporting the first one
    #[arg(long)]
    repair: bool,

    /// Override the iteration bound
    #[arg(long)]
    max_iterations: Option<usize>,

    /// Per-pair diagnostics at debug level
    #[arg(long)]
    debug: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(report) => {
            if report.is_deadlock_free() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<LockOrderReport> {
    let config = build_config(cli)?;
    let analysis = LockOrderAnalysis::new(config)?;

    let mut program = ProgramModel::load(&cli.input)?.build()?;
    let report = analysis.analyze_program(&mut program)?;

    match cli.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(report)
}

fn build_config(cli: &Cli) -> Result<LockOrderConfig> {
    let mut config = match &cli.config {
        Some(path) => LockOrderConfig::from_yaml(path)?,
        None => {
            let preset = Preset::from_str(&cli.preset)
                .map_err(|_| ConfigError::UnknownPreset(cli.preset.clone()))?;
            LockOrderConfig::from_preset(preset)
        }
    };

    if let Some(mode) = &cli.mode {
        let mode = DetectionMode::from_str(mode)?;
        if mode == DetectionMode::Group {
            config = config.reorder_locksets(false);
        }
        config = config.mode(mode);
    }
    if cli.repair {
        config = config.repair(true);
    }
    if let Some(max) = cli.max_iterations {
        config = config.max_iterations(max);
    }
    if cli.debug {
        config = config.print_debug(true);
    }
    Ok(config)
}
