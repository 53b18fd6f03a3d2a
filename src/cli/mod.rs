//! CLI command implementations

pub mod alias;
pub mod auth;
pub mod bulk;
pub mod error;

pub use alias::AliasCommand;
pub use auth::AuthCommand;
pub use bulk::BulkCommand;
pub use error::CliError;

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::debug;

use crate::alias::AliasResolver;
use crate::cancel::CancelHandle;
use crate::client::ResourceClient;
use crate::config::{self, Settings};

/// ClickUp toolkit CLI
#[derive(Parser, Debug)]
#[command(name = "clickup")]
#[command(about = "Bulk task operations and list aliases for ClickUp", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, default_value = "human")]
    pub output_format: OutputFormat,

    /// Maximum number of retries per request (overrides the settings file, range: 0-20)
    #[arg(long, global = true, value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: Option<u32>,

    /// Directory holding config.json and aliases.json
    #[arg(long, global = true, env = "CLICKUP_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9000)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Import, export and mass-update tasks
    Bulk(BulkCommand),

    /// Manage list aliases
    Alias(AliasCommand),

    /// Check credentials
    Auth(AuthCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// Human-readable output
    Human,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "human" => Ok(OutputFormat::Human),
            _ => Err(format!("Invalid output format: {s}")),
        }
    }
}

impl Cli {
    /// Config directory from `--config-dir` or the platform default
    pub fn config_dir(&self) -> Result<PathBuf, CliError> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config::default_config_dir()?),
        }
    }

    /// Settings file merged with command-line overrides
    pub fn settings(&self) -> Result<Settings, CliError> {
        let mut settings = Settings::load(&self.config_dir()?)?;
        if let Some(max_retries) = self.max_retries {
            settings.max_retries = max_retries;
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Alias table of the config directory
    pub fn alias_resolver(&self) -> Result<AliasResolver, CliError> {
        let path = config::aliases_path(&self.config_dir()?);
        debug!(path = %path.display(), "Opening alias table");
        Ok(AliasResolver::open(path)?)
    }

    /// Resource client using credentials from the environment
    pub fn client(&self, settings: &Settings) -> Result<ResourceClient, CliError> {
        let credentials = config::credentials_from_env()?;
        debug!(auth = credentials.describe(), base_url = %settings.base_url, "Building client");
        Ok(ResourceClient::from_settings(settings, credentials)?)
    }

    /// Run the selected command
    pub async fn execute(&self, cancel: CancelHandle) -> Result<(), CliError> {
        match &self.command {
            Commands::Bulk(cmd) => cmd.execute(self, cancel).await,
            Commands::Alias(cmd) => cmd.execute(self),
            Commands::Auth(cmd) => cmd.execute(self).await,
        }
    }
}
