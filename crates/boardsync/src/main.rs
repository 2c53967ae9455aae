//! Command-line front end for boardsync.
//!
//! Usage:
//! ```bash
//! boardsync sync                      # Copy source items to the destination board
//! boardsync sync --dry-run --json     # Plan a run without writing
//! boardsync boards                  # List boards visible to the token
//! boardsync inspect <board>           # Show a board's columns and sample items
//! boardsync links <board>             # Audit the link column on a board
//! ```

use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use boardsync_core::ConfigEnv;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "boardsync", author, version, about)]
struct Cli {
    /// Path to boardsync.toml (default: search the current directory upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level or filter directive, used when `RUST_LOG` is unset
    #[arg(long, global = true, default_value = "info")]
    log: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Copy items from the source board to the destination board
    Sync(commands::sync::SyncArgs),

    /// List the boards the API token can see
    Boards(commands::boards::BoardsArgs),

    /// Show a board's columns and a sample of its items
    Inspect(commands::inspect::InspectArgs),

    /// List items on a board with their stored link values
    Links(commands::links::LinksArgs),
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).context("failed to parse log directive")?,
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log, cli.log_format)?;

    let env = ConfigEnv::from_process();
    let config = commands::load_config(cli.config.as_deref(), &env)?;

    match &cli.command {
        Command::Sync(args) => commands::sync::run(args, &config, &env).await,
        Command::Boards(args) => commands::boards::run(args, &config, &env).await,
        Command::Inspect(args) => commands::inspect::run(args, &config, &env).await,
        Command::Links(args) => commands::links::run(args, &config, &env).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::error::ErrorKind;

    use super::*;

    fn parse(argv: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(argv.iter().copied())
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let err = parse(&["boardsync"]).expect_err("expected clap parse error");
        assert!(
            matches!(
                err.kind(),
                ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand | ErrorKind::MissingSubcommand
            ),
            "unexpected error kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn test_cli_rejects_unknown_subcommand() {
        let err = parse(&["boardsync", "merge"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn test_cli_sync_defaults() -> Result<(), clap::Error> {
        let cli = parse(&["boardsync", "sync"])?;

        assert_eq!(cli.log, "info");
        assert_eq!(cli.log_format, LogFormat::Text);
        let Command::Sync(args) = cli.command else {
            panic!("expected Command::Sync");
        };
        assert!(args.source_board.is_none());
        assert!(args.limit.is_none());
        assert!(!args.dry_run);
        assert!(!args.json);
        assert!(!args.fail_on_errors);
        Ok(())
    }

    #[test]
    fn test_cli_sync_flags_and_global_options() -> Result<(), clap::Error> {
        let cli = parse(&[
            "boardsync",
            "sync",
            "--source-board",
            "111",
            "--dest-board",
            "222",
            "--link-column",
            "origin",
            "--limit",
            "10",
            "--dry-run",
            "--json",
            "--log-format",
            "json",
            "--config",
            "custom.toml",
        ])?;

        assert_eq!(cli.log_format, LogFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        let Command::Sync(args) = cli.command else {
            panic!("expected Command::Sync");
        };
        assert_eq!(args.source_board.as_deref(), Some("111"));
        assert_eq!(args.dest_board.as_deref(), Some("222"));
        assert_eq!(args.link_column.as_deref(), Some("origin"));
        assert_eq!(args.limit, Some(10));
        assert!(args.dry_run);
        assert!(args.json);
        Ok(())
    }

    #[test]
    fn test_cli_sync_rejects_non_numeric_limit() {
        let err = parse(&["boardsync", "sync", "--limit", "ten"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_inspect_requires_board_id() {
        let err = parse(&["boardsync", "inspect"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_cli_inspect_sample_defaults_to_five() -> Result<(), clap::Error> {
        let cli = parse(&["boardsync", "inspect", "123"])?;

        let Command::Inspect(args) = cli.command else {
            panic!("expected Command::Inspect");
        };
        assert_eq!(args.board_id, "123");
        assert_eq!(args.sample, 5);
        Ok(())
    }

    #[test]
    fn test_cli_links_accepts_link_column() -> Result<(), clap::Error> {
        let cli = parse(&["boardsync", "links", "222", "--link-column", "origin"])?;

        let Command::Links(args) = cli.command else {
            panic!("expected Command::Links");
        };
        assert_eq!(args.board_id, "222");
        assert_eq!(args.link_column.as_deref(), Some("origin"));
        Ok(())
    }

    #[test]
    fn test_cli_boards_defaults_and_limit() -> Result<(), clap::Error> {
        let cli = parse(&["boardsync", "boards"])?;
        let Command::Boards(args) = cli.command else {
            panic!("expected Command::Boards");
        };
        assert_eq!(args.limit, 25);
        assert!(!args.json);

        let cli = parse(&["boardsync", "boards", "--limit", "5", "--json"])?;
        let Command::Boards(args) = cli.command else {
            panic!("expected Command::Boards");
        };
        assert_eq!(args.limit, 5);
        assert!(args.json);
        Ok(())
    }

    #[test]
    fn test_cli_rejects_unknown_log_format() {
        let err = parse(&["boardsync", "--log-format", "xml", "sync"]).expect_err("expected clap parse error");
        assert_eq!(err.kind(), ErrorKind::InvalidValue);
    }
}
