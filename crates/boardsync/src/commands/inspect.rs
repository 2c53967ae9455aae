//! Show a board's columns and a sample of its items.
//!
//! Useful for finding column ids and type tags before writing a remap
//! table.

use std::process::ExitCode;

use anyhow::{Context, Result};
use boardsync_core::{
    BoardGateway, ColumnDefinition, Config, ConfigEnv, Item, sync::MAX_PAGE_LIMIT,
};
use clap::Args;
use console::style;

/// Command-line arguments for the inspect command.
#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Board to inspect
    pub board_id: String,

    /// Number of items to show
    #[arg(long, default_value_t = 5)]
    pub sample: usize,
}

/// What the command prints.
#[derive(Debug)]
struct BoardSnapshot {
    columns: Vec<ColumnDefinition>,
    items: Vec<Item>,
}

pub async fn run(args: &InspectArgs, config: &Config, env: &ConfigEnv) -> Result<ExitCode> {
    let client = super::client(config, env)?;
    let snapshot = snapshot(&client, &args.board_id, args.sample).await?;
    print_snapshot(&args.board_id, &snapshot);
    Ok(ExitCode::SUCCESS)
}

async fn snapshot<G: BoardGateway>(
    gateway: &G,
    board_id: &str,
    sample: usize,
) -> Result<BoardSnapshot> {
    let columns = gateway
        .fetch_schema(board_id)
        .await
        .with_context(|| format!("failed to fetch columns of board {board_id}"))?;

    let items = if sample == 0 {
        Vec::new()
    } else {
        let limit = u32::try_from(sample).unwrap_or(MAX_PAGE_LIMIT).min(MAX_PAGE_LIMIT);
        let page = gateway
            .fetch_items(board_id, limit)
            .await
            .with_context(|| format!("failed to fetch items of board {board_id}"))?;
        page.items.into_iter().take(sample).collect()
    };

    Ok(BoardSnapshot { columns, items })
}

fn print_snapshot(board_id: &str, snapshot: &BoardSnapshot) {
    println!(
        "{} {} column(s)",
        style(format!("Board {board_id}")).bold(),
        snapshot.columns.len()
    );
    println!(
        "{:<28} {:<16} {}",
        style("COLUMN ID").bold(),
        style("TYPE").bold(),
        style("TITLE").bold()
    );
    println!("{}", "-".repeat(72));
    for column in &snapshot.columns {
        let kind = column.column_type.to_string();
        println!("{:<28} {kind:<16} {}", column.id, column.title);
    }

    for item in &snapshot.items {
        println!(
            "\n{} {}",
            style(&item.name).cyan().bold(),
            style(format!("({})", item.id)).dim()
        );
        for value in &item.column_values {
            let text = value.display_text();
            let raw = value.raw_value();
            if text.is_empty() && raw.is_none() {
                continue;
            }
            println!(
                "  {:<26} {text}  {}",
                value.id,
                style(raw.unwrap_or_default()).dim()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use boardsync_core::{FieldType, InMemoryBoards};
    use serde_json::json;
    use wiremock::MockServer;

    use super::*;
    use crate::commands::{
        client,
        testing::{column_value, mock_setup, mount_columns, mount_items},
    };

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Item {id}"),
            column_values: Vec::new(),
        }
    }

    fn column(id: &str, column_type: FieldType) -> ColumnDefinition {
        ColumnDefinition {
            id: id.to_string(),
            title: id.to_uppercase(),
            column_type,
        }
    }

    #[tokio::test]
    async fn test_snapshot_limits_items_to_sample() {
        let boards = InMemoryBoards::new().with_board(
            "1",
            vec![column("status", FieldType::Status), column("date4", FieldType::Date)],
            (0..8).map(|n| item(&n.to_string())).collect(),
        );

        let snapshot = snapshot(&boards, "1", 3).await.unwrap();

        assert_eq!(snapshot.columns.len(), 2);
        assert_eq!(snapshot.items.len(), 3);
        assert_eq!(snapshot.items[0].id, "0");
    }

    #[tokio::test]
    async fn test_snapshot_with_zero_sample_skips_items() {
        let boards = InMemoryBoards::new().with_board("1", Vec::new(), vec![item("a")]);

        let snapshot = snapshot(&boards, "1", 0).await.unwrap();

        assert!(snapshot.items.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_unknown_board_names_it() {
        let boards = InMemoryBoards::new();

        let err = snapshot(&boards, "404", 5).await.unwrap_err();

        assert_eq!(err.to_string(), "failed to fetch columns of board 404");
    }

    #[tokio::test]
    async fn test_snapshot_over_http() {
        let server = MockServer::start().await;
        mount_columns(
            &server,
            "9",
            &json!([{ "id": "status", "title": "Status", "type": "color" }]),
        )
        .await;
        mount_items(
            &server,
            "9",
            &json!([{
                "id": "1",
                "name": "Alice",
                "column_values": [column_value("status", "color", "Done", "{\"index\":1}")]
            }]),
        )
        .await;
        let (config, env) = mock_setup(&server);
        let client = client(&config, &env).unwrap();

        let snapshot = snapshot(&client, "9", 5).await.unwrap();

        assert_eq!(snapshot.columns[0].column_type, FieldType::Status);
        assert_eq!(snapshot.items[0].column_text("status"), Some("Done"));
    }
}
