//! Audit the link column of a board.
//!
//! Lists every item with the source key it stores, and flags items with no
//! key and keys claimed by more than one item.

use std::process::ExitCode;

use anyhow::{Context, Result};
use boardsync_core::{
    BoardGateway, Config, ConfigEnv, ItemsPage, MatchTable,
    sync::{DEFAULT_LINK_COLUMN, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT},
};
use clap::Args;
use console::style;

/// Command-line arguments for the links command.
#[derive(Debug, Args)]
pub struct LinksArgs {
    /// Board to audit, usually the sync destination
    pub board_id: String,

    /// Column holding the link value (overrides `[sync].link_column`)
    #[arg(long)]
    pub link_column: Option<String>,
}

#[derive(Debug)]
struct LinkAudit {
    link_column: String,
    page: ItemsPage,
    table: MatchTable,
}

pub async fn run(args: &LinksArgs, config: &Config, env: &ConfigEnv) -> Result<ExitCode> {
    let client = super::client(config, env)?;
    let audit = audit(&client, args, config).await?;
    print_audit(&audit);
    Ok(ExitCode::SUCCESS)
}

async fn audit<G: BoardGateway>(gateway: &G, args: &LinksArgs, config: &Config) -> Result<LinkAudit> {
    let link_column = args
        .link_column
        .as_deref()
        .or(config.sync.link_column.as_deref())
        .unwrap_or(DEFAULT_LINK_COLUMN)
        .to_string();
    let page_limit = config
        .sync
        .page_limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);

    let page = gateway
        .fetch_items(&args.board_id, page_limit)
        .await
        .with_context(|| format!("failed to fetch items of board {}", args.board_id))?;
    let table = MatchTable::build(&page.items, &link_column);

    Ok(LinkAudit {
        link_column,
        page,
        table,
    })
}

fn print_audit(audit: &LinkAudit) {
    println!(
        "{:<16} {:<32} {}",
        style("ITEM ID").bold(),
        style("NAME").bold(),
        style(audit.link_column.to_uppercase()).bold()
    );
    println!("{}", "-".repeat(72));

    for item in &audit.page.items {
        let link = match item.column_text(&audit.link_column) {
            None => style("missing".to_string()).red(),
            Some(value) if audit.table.get(value) == Some(item.id.as_str()) => {
                style(value.to_string())
            }
            Some(value) => style(format!("{value} (duplicate)")).yellow(),
        };
        println!("{:<16} {:<32} {link}", item.id, item.name);
    }

    let linked = audit.table.len();
    let missing = audit.table.unlinked().len();
    let duplicates = audit.table.duplicates().len();
    println!(
        "\n{} item(s): {linked} linked, {missing} missing a link, {duplicates} duplicate(s)",
        audit.page.items.len()
    );
    if audit.page.is_truncated() {
        println!(
            "{} board has more items than one page; only the first {} were checked",
            style("!").yellow(),
            audit.page.items.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use boardsync_core::{ColumnValue, FieldType, InMemoryBoards, Item};

    use super::*;

    fn item(id: &str, link: Option<&str>) -> Item {
        Item {
            id: id.to_string(),
            name: format!("Item {id}"),
            column_values: link
                .map(|link| ColumnValue {
                    id: "origin".to_string(),
                    column_type: FieldType::Text,
                    text: Some(link.to_string()),
                    value: Some(format!("\"{link}\"")),
                })
                .into_iter()
                .collect(),
        }
    }

    fn args(link_column: Option<&str>) -> LinksArgs {
        LinksArgs {
            board_id: "222".to_string(),
            link_column: link_column.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_audit_counts_linked_missing_and_duplicates() {
        let boards = InMemoryBoards::new().with_board(
            "222",
            Vec::new(),
            vec![
                item("d1", Some("S1")),
                item("d2", None),
                item("d3", Some("S1")),
                item("d4", Some("S4")),
            ],
        );

        let found = audit(&boards, &args(Some("origin")), &Config::default())
            .await
            .unwrap();

        assert_eq!(found.link_column, "origin");
        assert_eq!(found.table.len(), 2);
        assert_eq!(found.table.unlinked(), ["d2".to_string()]);
        assert_eq!(found.table.duplicates()[0].dropped_item_id, "d3");
        assert!(!found.page.is_truncated());
    }

    #[tokio::test]
    async fn test_audit_link_column_falls_back_to_config_then_default() {
        let boards = InMemoryBoards::new().with_board("222", Vec::new(), vec![item("d1", Some("S1"))]);

        let mut config = Config::default();
        let found = audit(&boards, &args(None), &config).await.unwrap();
        assert_eq!(found.link_column, DEFAULT_LINK_COLUMN);
        assert!(found.table.is_empty());

        config.sync.link_column = Some("origin".to_string());
        let found = audit(&boards, &args(None), &config).await.unwrap();
        assert_eq!(found.link_column, "origin");
        assert_eq!(found.table.get("S1"), Some("d1"));
    }

    #[tokio::test]
    async fn test_audit_reports_truncated_board() {
        let boards = InMemoryBoards::new().with_board(
            "222",
            Vec::new(),
            (0..3).map(|n| item(&n.to_string(), None)).collect(),
        );
        let mut config = Config::default();
        config.sync.page_limit = Some(2);

        let found = audit(&boards, &args(None), &config).await.unwrap();

        assert!(found.page.is_truncated());
        assert_eq!(found.page.items.len(), 2);
    }
}
