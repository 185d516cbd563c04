use crate::cli::{Cli, OutputFormat, VerbosityLevel};
use crate::error::Result as PrevalidationResult;
use crate::policy::{LADM_COL_LEV_CAT_MODEL, RequiredModelPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

const ENV_REQUIRED_MODELS: &str = "ILI_PREVALIDATOR_REQUIRED_MODELS";
const ENV_TARGET_MODEL: &str = "ILI_PREVALIDATOR_TARGET_MODEL";
const ENV_TEMP_DIR: &str = "ILI_PREVALIDATOR_TEMP_DIR";
const ENV_MAX_ENTRY_SIZE_MB: &str = "ILI_PREVALIDATOR_MAX_ENTRY_SIZE_MB";
const ENV_FORMAT: &str = "ILI_PREVALIDATOR_FORMAT";
const ENV_VERBOSE: &str = "ILI_PREVALIDATOR_VERBOSE";
const ENV_QUIET: &str = "ILI_PREVALIDATOR_QUIET";

/// Configuration file names, in lookup order
pub const CONFIG_FILE_NAMES: [&str; 4] = [
    "ili-prevalidator.toml",
    "ili-prevalidator.json",
    ".ili-prevalidator.toml",
    ".ili-prevalidator.json",
];

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub policy: PolicyConfig,
    pub archive: ArchiveConfig,
    pub output: OutputConfig,
}

/// Which models a file must declare
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PolicyConfig {
    /// A file must declare at least one of these
    pub required_models: Vec<String>,
    /// Checked only once a required model was found
    pub target_model: Option<String>,
}

/// Archive extraction settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Parent of the extraction directories (system temp dir when unset)
    pub temp_dir: Option<PathBuf>,
    /// Largest accepted uncompressed entry, in megabytes
    pub max_entry_size_mb: u64,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Output format
    pub format: OutputFormatConfig,
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (rejections only)
    pub quiet: bool,
}

/// Output format configuration (serializable version of CLI OutputFormat)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormatConfig {
    Human,
    Json,
}

impl From<OutputFormat> for OutputFormatConfig {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputFormatConfig::Human,
            OutputFormat::Json => OutputFormatConfig::Json,
        }
    }
}

impl From<OutputFormatConfig> for OutputFormat {
    fn from(format: OutputFormatConfig) -> Self {
        match format {
            OutputFormatConfig::Human => OutputFormat::Human,
            OutputFormatConfig::Json => OutputFormat::Json,
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            required_models: vec![LADM_COL_LEV_CAT_MODEL.to_string()],
            target_model: None,
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            temp_dir: None,
            max_entry_size_mb: 4096,
        }
    }
}

impl ArchiveConfig {
    /// Entry size limit in bytes
    pub fn max_entry_size_bytes(&self) -> u64 {
        self.max_entry_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormatConfig::Human,
            verbose: false,
            quiet: false,
        }
    }
}

impl OutputConfig {
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

impl Config {
    /// Model policy described by this configuration
    pub fn policy(&self) -> PrevalidationResult<RequiredModelPolicy> {
        RequiredModelPolicy::new(
            self.policy.required_models.clone(),
            self.policy.target_model.clone(),
        )
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        Self::load_config_with(&SystemEnvProvider, cli).await
    }

    /// Load configuration reading environment overrides from `env`
    pub async fn load_config_with(env: &impl EnvProvider, cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides_with(env, config)?;

        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => {
                let config: Config = toml::from_str(&content)?;
                Ok(config)
            }
            Some("json") => {
                let config: Config = serde_json::from_str(&content)?;
                Ok(config)
            }
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    let config: Config = serde_json::from_str(&content)?;
                    Ok(config)
                }
            }
        }
    }

    /// Find configuration file in the working directory, then in the user
    /// config directory
    pub async fn find_config_file() -> Result<Option<Config>> {
        let mut search_dirs = vec![PathBuf::from(".")];
        if let Some(config_dir) = dirs::config_dir() {
            search_dirs.push(config_dir.join("ili-prevalidator"));
        }

        Self::find_config_file_in(&search_dirs).await
    }

    /// First configuration file found in `search_dirs`
    pub async fn find_config_file_in(search_dirs: &[PathBuf]) -> Result<Option<Config>> {
        for dir in search_dirs {
            for name in &CONFIG_FILE_NAMES {
                let path = dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Policy settings
        if let Some(models) = env.get(ENV_REQUIRED_MODELS) {
            config.policy.required_models = models
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(target) = env.get(ENV_TARGET_MODEL) {
            let target = target.trim();
            config.policy.target_model = (!target.is_empty()).then(|| target.to_string());
        }

        // Archive settings
        if let Some(temp_dir) = env.get(ENV_TEMP_DIR) {
            config.archive.temp_dir = Some(PathBuf::from(temp_dir));
        }

        if let Some(max_size) = env.get(ENV_MAX_ENTRY_SIZE_MB) {
            config.archive.max_entry_size_mb = max_size.parse().map_err(|_| {
                ConfigError::Environment(format!(
                    "Invalid {} value: {}",
                    ENV_MAX_ENTRY_SIZE_MB, max_size
                ))
            })?;
        }

        // Output settings
        if let Some(verbose) = env.get(ENV_VERBOSE) {
            config.output.verbose = verbose.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid {} value: {}", ENV_VERBOSE, verbose))
            })?;
        }

        if let Some(quiet) = env.get(ENV_QUIET) {
            config.output.quiet = quiet.parse().map_err(|_| {
                ConfigError::Environment(format!("Invalid {} value: {}", ENV_QUIET, quiet))
            })?;
        }

        if let Some(format) = env.get(ENV_FORMAT) {
            config.output.format = match format.to_lowercase().as_str() {
                "human" => OutputFormatConfig::Human,
                "json" => OutputFormatConfig::Json,
                _ => {
                    return Err(ConfigError::Environment(format!(
                        "Invalid {} value: {}",
                        ENV_FORMAT, format
                    )));
                }
            };
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration; only options actually given
    /// on the command line override
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        // Policy settings
        if !cli.required_models.is_empty() {
            config.policy.required_models = cli.required_models.clone();
        }
        if cli.target_model.is_some() {
            config.policy.target_model = cli.target_model.clone();
        }

        // Archive settings
        if cli.temp_dir.is_some() {
            config.archive.temp_dir = cli.temp_dir.clone();
        }
        if let Some(max_entry_size) = cli.max_entry_size {
            config.archive.max_entry_size_mb = max_entry_size;
        }

        // Output settings
        if let Some(format) = cli.output_format {
            config.output.format = format.into();
        }
        if cli.verbose {
            config.output.verbose = true;
            config.output.quiet = false;
        }
        if cli.quiet {
            config.output.quiet = true;
            config.output.verbose = false;
        }

        config
    }

    /// Merge two configurations (second takes precedence for non-None values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // Policy settings
        if !override_config.policy.required_models.is_empty() {
            base.policy.required_models = override_config.policy.required_models;
        }
        if override_config.policy.target_model.is_some() {
            base.policy.target_model = override_config.policy.target_model;
        }

        // Archive settings
        if override_config.archive.temp_dir.is_some() {
            base.archive.temp_dir = override_config.archive.temp_dir;
        }
        base.archive.max_entry_size_mb = override_config.archive.max_entry_size_mb;

        // Output settings
        base.output.format = override_config.output.format;
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        // Validate policy settings
        if config.policy.required_models.is_empty() {
            return Err(ConfigError::Validation(
                "At least one required model must be specified".to_string(),
            ));
        }

        if config
            .policy
            .required_models
            .iter()
            .chain(config.policy.target_model.iter())
            .any(|model| model.trim().is_empty())
        {
            return Err(ConfigError::Validation(
                "Model names cannot be blank".to_string(),
            ));
        }

        // Validate archive settings
        if config.archive.max_entry_size_mb == 0 {
            return Err(ConfigError::Validation(
                "Maximum archive entry size must be greater than 0".to_string(),
            ));
        }

        // Validate output settings
        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        Ok(())
    }
}
