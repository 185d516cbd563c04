use std::process::ExitCode;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ili_prevalidator::cli::Cli;
use ili_prevalidator::config::{Config, ConfigManager};
use ili_prevalidator::output::Output;
use ili_prevalidator::validator::Prevalidator;

/// Every file was accepted
const EXIT_ACCEPTED: u8 = 0;
/// At least one file was rejected
const EXIT_REJECTED: u8 = 1;
/// Configuration could not be loaded
const EXIT_CONFIG_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    let config = match ConfigManager::load_config(&cli).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    init_tracing(&config);

    match run(&cli, &config).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

/// Log to stderr so stdout carries only the report
fn init_tracing(config: &Config) {
    let default_level = if config.output.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<u8> {
    let prevalidator =
        Prevalidator::from_config(config).context("Failed to build the model policy")?;

    tracing::debug!(
        policy = ?prevalidator.policy(),
        files = cli.paths.len(),
        "starting pre-validation"
    );

    let report = prevalidator.validate_paths(&cli.paths).await;

    let output = Output::new(config.output.format.into(), config.output.verbosity());
    let rendered = output.render(&report).context("Failed to render report")?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }

    Ok(if report.all_accepted() {
        EXIT_ACCEPTED
    } else {
        EXIT_REJECTED
    })
}
