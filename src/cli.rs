use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only show rejected files
    Quiet,
    /// Show one line per file and a summary
    #[default]
    Normal,
    /// Also show error codes and timings
    Verbose,
}

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    #[default]
    Human,
    /// Machine-readable JSON report
    Json,
}

/// Cheap model check for INTERLIS transfer files and ili2db GeoPackages
#[derive(Parser, Debug, Clone)]
#[command(name = "ili-prevalidator")]
#[command(
    about = "Check that XTF, GeoPackage or zipped files declare the required INTERLIS models before full validation"
)]
#[command(version)]
pub struct Cli {
    /// Files to pre-validate (.xtf, .gpkg or a .zip holding one of them)
    #[arg(required = true, help = "Files to pre-validate")]
    pub paths: Vec<PathBuf>,

    /// Required models; a file must declare at least one of them
    #[arg(
        short = 'r',
        long = "required-model",
        action = clap::ArgAction::Append,
        help = "Required model (repeatable, any one suffices)"
    )]
    pub required_models: Vec<String>,

    /// Model that must be declared in addition to a required one
    #[arg(short = 't', long = "target-model")]
    pub target_model: Option<String>,

    /// Configuration file (TOML or JSON)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (rejections only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Directory for temporary archive extraction
    #[arg(long = "temp-dir")]
    pub temp_dir: Option<PathBuf>,

    /// Maximum uncompressed size of an archive entry in MB
    #[arg(long = "max-entry-size")]
    pub max_entry_size: Option<u64>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn verbosity(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}
