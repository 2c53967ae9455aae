//! Run one sync pass from the source board to the destination board.

use std::process::ExitCode;

use anyhow::{Context, Result};
use boardsync_core::{
    Config, ConfigEnv, RecordAction, SyncOverrides, SyncReport, Syncer,
};
use clap::Args;
use console::style;

/// Command-line arguments for the sync command.
#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Board to copy items from (overrides `[sync].source_board`)
    #[arg(long)]
    pub source_board: Option<String>,

    /// Board to copy items to (overrides `[sync].dest_board`)
    #[arg(long)]
    pub dest_board: Option<String>,

    /// Destination column holding the source item key
    #[arg(long)]
    pub link_column: Option<String>,

    /// Only process the first N source items
    #[arg(long)]
    pub limit: Option<usize>,

    /// Translate and match items without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Exit with a failure status when any item could not be written
    #[arg(long)]
    pub fail_on_errors: bool,
}

impl SyncArgs {
    fn overrides(&self) -> SyncOverrides {
        SyncOverrides {
            source_board: self.source_board.clone(),
            dest_board: self.dest_board.clone(),
            link_column: self.link_column.clone(),
            limit: self.limit,
            dry_run: self.dry_run,
        }
    }

    fn should_fail(&self, report: &SyncReport) -> bool {
        self.fail_on_errors && report.stats.errors > 0
    }
}

/// Runs the sync and prints its report.
///
/// Per-item write failures only affect the exit status with
/// `--fail-on-errors`; a failed bootstrap fetch is always an error.
pub async fn run(args: &SyncArgs, config: &Config, env: &ConfigEnv) -> Result<ExitCode> {
    let report = execute(args, config, env).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if args.should_fail(&report) {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn execute(args: &SyncArgs, config: &Config, env: &ConfigEnv) -> Result<SyncReport> {
    let options = config
        .sync_options(&args.overrides())
        .context("invalid sync settings")?;
    let client = super::client(config, env)?;

    Syncer::new(client, options)
        .run()
        .await
        .context("sync aborted")
}

fn print_report(report: &SyncReport) {
    let stats = report.stats;
    let heading = if report.dry_run {
        "Dry run finished (nothing was written)"
    } else {
        "Sync finished"
    };
    let mark = if stats.errors == 0 {
        style("✓").green()
    } else {
        style("✗").red()
    };
    println!("{mark} {}", style(heading).bold());
    println!("  {:<10} {}", "created", stats.created);
    println!("  {:<10} {}", "updated", stats.updated);
    println!("  {:<10} {}", "skipped", stats.skipped);
    println!("  {:<10} {}", "errors", stats.errors);

    if report.source_truncated {
        println!(
            "{} source board has more items than one page; the rest were not synced",
            style("!").yellow()
        );
    }
    if report.dest_truncated {
        println!(
            "{} destination board has more items than one page; unmatched items may be duplicates",
            style("!").yellow()
        );
    }

    if !report.duplicate_links.is_empty() {
        println!(
            "\n{} destination item(s) share a link value with an earlier item:",
            report.duplicate_links.len()
        );
        for duplicate in &report.duplicate_links {
            println!(
                "  {} kept {} ignored {}",
                style(&duplicate.link_value).cyan(),
                duplicate.kept_item_id,
                duplicate.dropped_item_id
            );
        }
    }

    if !report.field_skips.is_empty() {
        println!("\n{} field(s) left out:", report.field_skips.len());
        for skip in &report.field_skips {
            println!(
                "  item {} column {} ({}): {}",
                skip.item_id, skip.column_id, skip.column_type, skip.reason
            );
        }
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("\n{}", style("Failed items:").red().bold());
        for record in failures {
            if let RecordAction::Failed { error } = &record.action {
                println!("  {} {}: {error}", record.item_id, record.item_name);
            }
        }
    }
}
