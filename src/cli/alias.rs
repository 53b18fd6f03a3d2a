//! Alias management commands

use clap::{Args, Subcommand};
use serde_json::json;

use super::{Cli, CliError, OutputFormat};
use crate::alias::AliasCategory;

/// Alias subcommand
#[derive(Debug, Args)]
pub struct AliasCommand {
    #[command(subcommand)]
    action: AliasAction,
}

/// Alias actions
#[derive(Debug, Subcommand)]
enum AliasAction {
    /// Map a name to a list id
    Set {
        /// Alias name
        name: String,
        /// List id
        id: String,
    },
    /// Remove an alias
    Remove {
        /// Alias name
        name: String,
    },
    /// Show all list aliases
    List,
    /// Print the list id an alias (or raw id) refers to
    Resolve {
        /// Alias or raw id
        reference: String,
    },
}

impl AliasCommand {
    /// Execute the alias command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        let mut resolver = cli.alias_resolver()?;
        let category = AliasCategory::Lists;

        match &self.action {
            AliasAction::Set { name, id } => {
                let previous = resolver.set(category, name, id)?;
                match (cli.output_format, previous) {
                    (OutputFormat::Json, previous) => {
                        let output = json!({"alias": name.trim(), "id": id.trim(), "previous": previous});
                        println!("{output}");
                    }
                    (OutputFormat::Human, Some(previous)) => {
                        println!("{} -> {} (was {previous})", name.trim(), id.trim())
                    }
                    (OutputFormat::Human, None) => println!("{} -> {}", name.trim(), id.trim()),
                }
            }
            AliasAction::Remove { name } => {
                let removed = resolver.remove(category, name)?;
                match cli.output_format {
                    OutputFormat::Json => {
                        println!("{}", json!({"alias": name.trim(), "removed": removed}))
                    }
                    OutputFormat::Human => println!("Removed {} ({removed})", name.trim()),
                }
            }
            AliasAction::List => {
                let aliases = resolver.list(category);
                match cli.output_format {
                    OutputFormat::Json => println!("{}", json!(aliases)),
                    OutputFormat::Human if aliases.is_empty() => println!("No aliases configured"),
                    OutputFormat::Human => {
                        let width = aliases.keys().map(String::len).max().unwrap_or_default();
                        for (name, id) in &aliases {
                            println!("{name:<width$}  {id}");
                        }
                    }
                }
            }
            AliasAction::Resolve { reference } => {
                let id = resolver.resolve(category, reference)?;
                match cli.output_format {
                    OutputFormat::Json => {
                        println!("{}", json!({"reference": reference.trim(), "id": id}))
                    }
                    OutputFormat::Human => println!("{id}"),
                }
            }
        }
        Ok(())
    }
}
