//! In-process boards, used by tests and dry rehearsals of a sync.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::{BoardGateway, GatewayError, RemoteError};
use crate::model::{
    BoardSummary, ColumnDefinition, ColumnPayload, ColumnValue, FieldType, Item, ItemsPage,
};

/// A write recorded by [`InMemoryBoards`].
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create {
        board_id: String,
        item_id: String,
        name: String,
        values: ColumnPayload,
    },
    Update {
        board_id: String,
        item_id: String,
        values: ColumnPayload,
    },
}

#[derive(Debug, Default)]
struct Board {
    columns: Vec<ColumnDefinition>,
    items: Vec<Item>,
}

#[derive(Debug, Default)]
struct State {
    boards: HashMap<String, Board>,
    mutations: Vec<Mutation>,
    failing_items: HashSet<String>,
    next_id: u64,
}

/// [`BoardGateway`] backed by a map of boards held in memory.
///
/// Created items receive sequential ids (`"mem-1"`, `"mem-2"`, ...). Written
/// column values are stored back as [`ColumnValue`]s whose display text is
/// derived from the payload, so a later fetch sees what a real board would
/// render for simple values such as the link column.
#[derive(Debug, Default)]
pub struct InMemoryBoards {
    state: Mutex<State>,
}

impl InMemoryBoards {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a board with the given schema and items.
    #[must_use]
    pub fn with_board(
        self,
        board_id: impl Into<String>,
        columns: Vec<ColumnDefinition>,
        items: Vec<Item>,
    ) -> Self {
        self.lock()
            .boards
            .insert(board_id.into(), Board { columns, items });
        self
    }

    /// Makes every create or update for an item with this name (on create)
    /// or id (on update) fail with a remote error.
    #[must_use]
    pub fn failing_writes_for(self, name_or_id: impl Into<String>) -> Self {
        self.lock().failing_items.insert(name_or_id.into());
        self
    }

    /// Current items on a board, empty when the board is unknown.
    pub fn items(&self, board_id: &str) -> Vec<Item> {
        self.lock()
            .boards
            .get(board_id)
            .map(|board| board.items.clone())
            .unwrap_or_default()
    }

    /// Every successful write, in order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.lock().mutations.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn rejected(target: &str) -> GatewayError {
    GatewayError::Remote(vec![RemoteError::new(format!(
        "write rejected for {target}"
    ))])
}

fn render_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        JsonValue::Object(map) => ["label", "text", "date", "email", "url", "phone"]
            .iter()
            .find_map(|key| map.get(*key).and_then(JsonValue::as_str))
            .map_or_else(|| value.to_string(), str::to_string),
        other => other.to_string(),
    }
}

fn store_values(columns: &[ColumnDefinition], target: &mut Vec<ColumnValue>, values: &ColumnPayload) {
    for (column_id, value) in values {
        let column_type = columns
            .iter()
            .find(|column| &column.id == column_id)
            .map_or_else(FieldType::default, |column| column.column_type.clone());
        let stored = ColumnValue {
            id: column_id.clone(),
            column_type,
            text: Some(render_text(value)),
            value: Some(value.to_string()),
        };

        match target.iter_mut().find(|existing| &existing.id == column_id) {
            Some(existing) => *existing = stored,
            None => target.push(stored),
        }
    }
}

#[async_trait]
impl BoardGateway for InMemoryBoards {
    async fn list_boards(&self, limit: u32) -> Result<Vec<BoardSummary>, GatewayError> {
        let state = self.lock();
        let ordered: BTreeMap<&String, &Board> = state.boards.iter().collect();
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);

        Ok(ordered
            .into_iter()
            .take(limit)
            .map(|(id, board)| BoardSummary {
                id: id.clone(),
                name: format!("Board {id}"),
                state: Some("active".to_string()),
                items_count: u64::try_from(board.items.len()).ok(),
            })
            .collect())
    }

    async fn fetch_items(&self, board_id: &str, limit: u32) -> Result<ItemsPage, GatewayError> {
        let state = self.lock();
        let board = state
            .boards
            .get(board_id)
            .ok_or_else(|| GatewayError::BoardNotFound(board_id.to_string()))?;

        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let items: Vec<Item> = board.items.iter().take(limit).cloned().collect();
        let cursor = (board.items.len() > items.len()).then(|| format!("page-after-{}", items.len()));

        Ok(ItemsPage { cursor, items })
    }

    async fn fetch_schema(&self, board_id: &str) -> Result<Vec<ColumnDefinition>, GatewayError> {
        self.lock()
            .boards
            .get(board_id)
            .map(|board| board.columns.clone())
            .ok_or_else(|| GatewayError::BoardNotFound(board_id.to_string()))
    }

    async fn create_item(
        &self,
        board_id: &str,
        name: &str,
        values: &ColumnPayload,
    ) -> Result<String, GatewayError> {
        let mut state = self.lock();
        if state.failing_items.contains(name) {
            return Err(rejected(name));
        }

        let State { boards, next_id, .. } = &mut *state;
        let board = boards
            .get_mut(board_id)
            .ok_or_else(|| GatewayError::BoardNotFound(board_id.to_string()))?;
        *next_id += 1;
        let item_id = format!("mem-{next_id}");

        let mut column_values = Vec::new();
        store_values(&board.columns, &mut column_values, values);
        board.items.push(Item {
            id: item_id.clone(),
            name: name.to_string(),
            column_values,
        });

        state.mutations.push(Mutation::Create {
            board_id: board_id.to_string(),
            item_id: item_id.clone(),
            name: name.to_string(),
            values: values.clone(),
        });
        Ok(item_id)
    }

    async fn update_item(
        &self,
        board_id: &str,
        item_id: &str,
        values: &ColumnPayload,
    ) -> Result<(), GatewayError> {
        let mut state = self.lock();
        if state.failing_items.contains(item_id) {
            return Err(rejected(item_id));
        }

        let board = state
            .boards
            .get_mut(board_id)
            .ok_or_else(|| GatewayError::BoardNotFound(board_id.to_string()))?;
        let Board { columns, items } = board;
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| rejected(item_id))?;
        store_values(columns, &mut item.column_values, values);

        state.mutations.push(Mutation::Update {
            board_id: board_id.to_string(),
            item_id: item_id.to_string(),
            values: values.clone(),
        });
        Ok(())
    }
}
