//! List the boards the API token can see.

use std::process::ExitCode;

use anyhow::{Context, Result};
use boardsync_core::{BoardGateway, BoardSummary, Config, ConfigEnv};
use clap::Args;
use console::style;

/// Command-line arguments for the boards command.
#[derive(Debug, Args)]
pub struct BoardsArgs {
    /// Maximum number of boards to list
    #[arg(long, default_value_t = 25)]
    pub limit: u32,

    /// Print the boards as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: &BoardsArgs, config: &Config, env: &ConfigEnv) -> Result<ExitCode> {
    let client = super::client(config, env)?;
    let boards = list(&client, args.limit).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&boards)?);
    } else {
        print_boards(&boards);
    }
    Ok(ExitCode::SUCCESS)
}

async fn list<G: BoardGateway>(gateway: &G, limit: u32) -> Result<Vec<BoardSummary>> {
    gateway
        .list_boards(limit.max(1))
        .await
        .context("failed to list boards")
}

fn print_boards(boards: &[BoardSummary]) {
    if boards.is_empty() {
        println!("No boards visible to this token.");
        return;
    }

    println!(
        "{:<16} {:<10} {:>7}  {}",
        style("BOARD ID").bold(),
        style("STATE").bold(),
        style("ITEMS").bold(),
        style("NAME").bold()
    );
    println!("{}", "-".repeat(72));
    for board in boards {
        let state = board.state.as_deref().unwrap_or("-");
        let items = board
            .items_count
            .map_or_else(|| "-".to_string(), |count| count.to_string());
        println!("{:<16} {state:<10} {items:>7}  {}", board.id, board.name);
    }
}
