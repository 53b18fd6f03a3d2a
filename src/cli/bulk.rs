//! Bulk import, export and update commands

use clap::{Args, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use super::{Cli, CliError, OutputFormat};
use crate::bulk::{
    export_tasks, parse_date, BulkError, BulkExecutor, BulkJob, BulkPlanner, BulkResult,
    ExportFilter, RecordOutcome, TaskFilter,
};
use crate::cancel::CancelHandle;
use crate::client::{AssigneeChanges, ResourceClient, TaskQuery, TaskUpdate};
use crate::config::Settings;
use crate::output::{self, OutputError, RecordFormat};
use crate::{Priority, RemoteId};

/// Maximum in-batch concurrency
const MAX_CONCURRENCY: usize = 16;

/// Parse and validate concurrency value
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;

    if value == 0 {
        return Err("concurrency must be at least 1".to_string());
    }
    if value > MAX_CONCURRENCY {
        return Err(format!(
            "concurrency {value} exceeds maximum of {MAX_CONCURRENCY}"
        ));
    }
    Ok(value)
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(value) => Ok(value),
        Err(_) => Err(format!("'{s}' is not a valid number")),
    }
}

fn parse_date_arg(s: &str) -> Result<i64, String> {
    parse_date(s).ok_or_else(|| {
        format!("invalid date '{s}': expected Unix milliseconds, YYYY-MM-DD or RFC 3339")
    })
}

/// Bulk subcommand
#[derive(Debug, Args)]
pub struct BulkCommand {
    #[command(subcommand)]
    action: BulkSubcommand,
}

/// Options shared by every job that writes to ClickUp
#[derive(Debug, Clone, Args)]
struct RunOptions {
    /// Validate and preview without calling the API
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Records per batch (overrides the settings file)
    #[arg(long, value_parser = parse_batch_size)]
    batch_size: Option<usize>,

    /// Concurrent calls inside a batch (overrides the settings file, max: 16)
    #[arg(long, value_parser = parse_concurrency)]
    concurrency: Option<usize>,
}

/// Changes applied by `bulk update`
#[derive(Debug, Clone, Args)]
struct UpdateChanges {
    /// New task name
    #[arg(long)]
    set_name: Option<String>,

    /// New status
    #[arg(long)]
    set_status: Option<String>,

    /// New priority (urgent, high, normal, low or 1-4)
    #[arg(long)]
    set_priority: Option<Priority>,

    /// New due date
    #[arg(long, value_parser = parse_date_arg)]
    set_due_date: Option<i64>,

    /// New start date
    #[arg(long, value_parser = parse_date_arg)]
    set_start_date: Option<i64>,

    /// Assign a user id (repeatable)
    #[arg(long = "add-assignee")]
    add_assignees: Vec<u64>,

    /// Unassign a user id (repeatable)
    #[arg(long = "remove-assignee")]
    remove_assignees: Vec<u64>,
}

impl UpdateChanges {
    fn to_update(&self) -> TaskUpdate {
        TaskUpdate {
            name: self.set_name.clone(),
            description: None,
            status: self.set_status.clone(),
            priority: self.set_priority.map(|p| p.level()),
            due_date: self.set_due_date,
            start_date: self.set_start_date,
            assignees: AssigneeChanges {
                add: self.add_assignees.clone(),
                remove: self.remove_assignees.clone(),
            },
        }
    }
}

/// Bulk actions
#[derive(Debug, Subcommand)]
enum BulkSubcommand {
    /// Create one task per record of a CSV or JSON file
    Import {
        /// Input file (.csv or .json)
        file: PathBuf,

        /// Target list (alias or id)
        #[arg(long)]
        list: String,

        /// Input format, when the extension does not tell
        #[arg(long)]
        format: Option<RecordFormat>,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Write every task of a list to CSV or JSON
    Export {
        /// Source list (alias or id)
        #[arg(long)]
        list: String,

        /// Output file; stdout when omitted
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output format (defaults to the output extension, or csv)
        #[arg(long)]
        format: Option<RecordFormat>,

        /// Only tasks in this status (repeatable)
        #[arg(long = "status")]
        statuses: Vec<String>,

        /// Only tasks assigned to this user id (repeatable)
        #[arg(long = "assignee")]
        assignees: Vec<String>,

        /// Include closed tasks
        #[arg(long, default_value_t = false)]
        include_closed: bool,
    },

    /// Apply the same change to every matching task of a list
    Update {
        /// List to update (alias or id)
        #[arg(long)]
        list: String,

        /// Only tasks in this status
        #[arg(long)]
        status: Option<String>,

        /// Only tasks assigned to this user id
        #[arg(long)]
        assignee: Option<String>,

        /// Only tasks whose name contains this text
        #[arg(long)]
        name_contains: Option<String>,

        /// Only tasks with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Also consider closed tasks
        #[arg(long, default_value_t = false)]
        include_closed: bool,

        #[command(flatten)]
        changes: UpdateChanges,

        #[command(flatten)]
        run: RunOptions,
    },

    /// Apply per-record updates from a file; each record needs an `id`
    UpdateFrom {
        /// Input file (.csv or .json)
        file: PathBuf,

        /// Input format, when the extension does not tell
        #[arg(long)]
        format: Option<RecordFormat>,

        #[command(flatten)]
        run: RunOptions,
    },
}

impl BulkCommand {
    /// Execute the bulk command
    pub async fn execute(&self, cli: &Cli, cancel: CancelHandle) -> Result<(), CliError> {
        let settings = cli.settings()?;

        match &self.action {
            BulkSubcommand::Import {
                file,
                list,
                format,
                run,
            } => {
                let list_id = cli.alias_resolver()?.resolve_list(list)?;
                let records = read_input(file, *format)?;
                let client = cli.client(&settings)?;

                info!(file = %file.display(), list_id = %list_id, records = records.len(), "Planning import");
                let job = planner(&settings, run).import(records, &list_id);
                run_job(cli, &settings, run, client, job, cancel).await
            }
            BulkSubcommand::Export {
                list,
                output,
                format,
                statuses,
                assignees,
                include_closed,
            } => {
                let list_id = cli.alias_resolver()?.resolve_list(list)?;
                let client = cli.client(&settings)?;
                let filter = ExportFilter {
                    statuses: statuses.clone(),
                    assignees: assignees.clone(),
                    include_closed: *include_closed,
                };
                export(&client, &list_id, &filter, output.as_deref(), *format).await
            }
            BulkSubcommand::Update {
                list,
                status,
                assignee,
                name_contains,
                tag,
                include_closed,
                changes,
                run,
            } => {
                let update = changes.to_update();
                if update.is_empty() {
                    return Err(CliError::InvalidArgument(
                        "no changes given; use --set-status, --set-priority, --add-assignee, ..."
                            .to_string(),
                    ));
                }

                let list_id = cli.alias_resolver()?.resolve_list(list)?;
                let client = cli.client(&settings)?;
                let query = TaskQuery {
                    include_closed: *include_closed,
                    ..TaskQuery::default()
                };
                let tasks = client.list_all_tasks(list_id.as_str(), &query).await?;
                let filter = TaskFilter {
                    status: status.clone(),
                    assignee: assignee.clone(),
                    name_contains: name_contains.clone(),
                    tag: tag.clone(),
                };

                let job = planner(&settings, run).update_matching(&tasks, &filter, &update);
                info!(list_id = %list_id, fetched = tasks.len(), matched = job.len(), "Planned update");
                run_job(cli, &settings, run, client, job, cancel).await
            }
            BulkSubcommand::UpdateFrom { file, format, run } => {
                let records = read_input(file, *format)?;
                let client = cli.client(&settings)?;
                let job = planner(&settings, run).updates_from_records(records);
                run_job(cli, &settings, run, client, job, cancel).await
            }
        }
    }
}

fn planner(settings: &Settings, run: &RunOptions) -> BulkPlanner {
    BulkPlanner::new(run.batch_size.unwrap_or(settings.batch_size))
}

fn read_input(
    path: &Path,
    format: Option<RecordFormat>,
) -> Result<Vec<serde_json::Value>, CliError> {
    let format = match format {
        Some(format) => format,
        None => RecordFormat::from_path(path)?,
    };
    let file = File::open(path)
        .map_err(|e| BulkError::Io(format!("Failed to open {}: {e}", path.display())))?;
    Ok(output::read_records_from(format, BufReader::new(file))?)
}

async fn export(
    client: &ResourceClient,
    list_id: &RemoteId,
    filter: &ExportFilter,
    path: Option<&Path>,
    format: Option<RecordFormat>,
) -> Result<(), CliError> {
    let Some(path) = path else {
        let format = format.unwrap_or(RecordFormat::Csv);
        let stdout = std::io::stdout();
        export_tasks(client, list_id, filter, format, stdout.lock()).await?;
        return Ok(());
    };

    let format = match format {
        Some(format) => format,
        None => RecordFormat::from_path(path)?,
    };

    // Write next to the target and rename, so a failed export leaves no partial file
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| BulkError::Io(format!("Failed to create temp file: {e}")))?;

    let written = export_tasks(client, list_id, filter, format, &mut temp).await?;
    temp.flush()
        .map_err(|e| BulkError::Io(format!("Failed to flush export: {e}")))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| BulkError::Io(format!("Failed to sync export: {e}")))?;
    temp.persist(path)
        .map_err(|e| BulkError::Io(format!("Failed to write {}: {}", path.display(), e.error)))?;

    eprintln!("Exported {written} tasks to {}", path.display());
    Ok(())
}

async fn run_job(
    cli: &Cli,
    settings: &Settings,
    run: &RunOptions,
    client: ResourceClient,
    job: BulkJob,
    cancel: CancelHandle,
) -> Result<(), CliError> {
    let job = job.with_dry_run(run.dry_run);
    let progress = match cli.output_format {
        OutputFormat::Human => create_progress_bar(&job),
        OutputFormat::Json => ProgressBar::hidden(),
    };

    let executor = BulkExecutor::new(client)
        .with_concurrency(run.concurrency.unwrap_or(settings.concurrency))
        .with_cancel(cancel)
        .with_progress(progress.clone());

    let result = executor.execute(job).await;
    progress.finish_and_clear();

    match cli.output_format {
        OutputFormat::Json => output_json(&result)?,
        OutputFormat::Human => output_human(&result),
    }

    result.into_result()?;
    Ok(())
}

fn output_json(result: &BulkResult) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(result)
        .map_err(|e| OutputError::SerializationError(e.to_string()))?;
    println!("{text}");
    Ok(())
}

fn output_human(result: &BulkResult) {
    let summary = result.summary();
    let mode = if result.dry_run { " (dry run)" } else { "" };
    println!(
        "\nBulk {}{mode}: {} records in {} batches",
        result.kind,
        summary.total,
        result.batches.len()
    );

    if result.dry_run {
        println!("Would succeed: {}", summary.would_succeed);
        println!("Would fail: {}", summary.would_fail);
    } else {
        println!("Succeeded: {}", summary.succeeded);
        println!("Failed: {}", summary.failed);
    }
    if summary.skipped > 0 {
        println!("Skipped (cancelled): {}", summary.skipped);
    }

    for record in result.failures() {
        match &record.outcome {
            RecordOutcome::Failed { kind, message } => {
                eprintln!("[FAILED] record {} ({kind:?}): {message}", record.index)
            }
            RecordOutcome::WouldFail { reason } => {
                eprintln!("[INVALID] record {}: {reason}", record.index)
            }
            _ => {}
        }
    }
}

/// Create progress bar with style
fn create_progress_bar(job: &BulkJob) -> ProgressBar {
    let pb = ProgressBar::new(job.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(format!("Bulk {}", job.kind));
    pb
}
