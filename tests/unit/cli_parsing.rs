//! Unit tests for CLI argument parsing

use clap::Parser;
use clickup_toolkit::cli::{Cli, Commands, OutputFormat};

#[test]
fn test_max_retries_defaults_to_settings_file() {
    let cli = Cli::parse_from(["clickup", "auth", "check"]);
    assert_eq!(cli.max_retries, None);
    assert_eq!(cli.output_format, OutputFormat::Human);
    assert!(matches!(cli.command, Commands::Auth(_)));
}

#[test]
fn test_bulk_import_flags() {
    let cli = Cli::try_parse_from([
        "clickup",
        "--max-retries",
        "7",
        "bulk",
        "import",
        "tasks.csv",
        "--list",
        "backlog",
        "--dry-run",
        "--batch-size",
        "25",
        "--concurrency",
        "4",
    ])
    .unwrap();
    assert_eq!(cli.max_retries, Some(7));
    assert!(matches!(cli.command, Commands::Bulk(_)));
}

#[test]
fn test_bulk_rejects_out_of_range_values() {
    for args in [
        vec!["clickup", "bulk", "import", "t.csv", "--list", "1", "--batch-size", "0"],
        vec!["clickup", "bulk", "import", "t.csv", "--list", "1", "--concurrency", "64"],
        vec!["clickup", "bulk", "export", "--list", "1", "--format", "xlsx"],
        vec!["clickup", "bulk", "update", "--list", "1", "--set-priority", "critical"],
        vec!["clickup", "bulk", "update", "--list", "1", "--set-due-date", "soon"],
    ] {
        assert!(Cli::try_parse_from(&args).is_err(), "{args:?} should be rejected");
    }
}

#[test]
fn test_bulk_update_flags() {
    let cli = Cli::try_parse_from([
        "clickup",
        "bulk",
        "update",
        "--list",
        "901",
        "--status",
        "open",
        "--set-status",
        "done",
        "--set-priority",
        "high",
        "--add-assignee",
        "5",
        "--add-assignee",
        "6",
    ]);
    assert!(cli.is_ok());
}

#[test]
fn test_metrics_addr_must_be_socket_address() {
    assert!(Cli::try_parse_from(["clickup", "--metrics-addr", "127.0.0.1:9000", "alias", "list"]).is_ok());
    assert!(Cli::try_parse_from(["clickup", "--metrics-addr", "localhost", "alias", "list"]).is_err());
}
