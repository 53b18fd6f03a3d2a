//! Credential check command

use clap::{Args, Subcommand};
use serde_json::json;

use super::{Cli, CliError, OutputFormat};

/// Auth subcommand
#[derive(Debug, Args)]
pub struct AuthCommand {
    #[command(subcommand)]
    action: AuthAction,
}

/// Auth actions
#[derive(Debug, Subcommand)]
enum AuthAction {
    /// Verify the configured credentials against the API
    Check,
}

impl AuthCommand {
    /// Execute the auth command
    pub async fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        match self.action {
            AuthAction::Check => {
                let settings = cli.settings()?;
                let client = cli.client(&settings)?;
                let report = client.validate_auth().await?;

                let username = report.user.username.as_deref().unwrap_or("(no username)");
                match cli.output_format {
                    OutputFormat::Json => {
                        let workspaces: Vec<_> = report
                            .workspaces
                            .iter()
                            .map(|w| json!({"id": w.id, "name": w.name}))
                            .collect();
                        let output = json!({
                            "authenticated": true,
                            "user": {"id": report.user.id, "username": report.user.username, "email": report.user.email},
                            "workspaces": workspaces,
                        });
                        println!("{output}");
                    }
                    OutputFormat::Human => {
                        println!("Authenticated as {username} ({})", report.user.id);
                        for workspace in &report.workspaces {
                            println!("  workspace {} - {}", workspace.id, workspace.name);
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
