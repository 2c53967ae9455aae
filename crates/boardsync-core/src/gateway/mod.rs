//! Outbound access to the boards service.
//!
//! [`BoardGateway`] is the seam the sync engine talks through. The
//! production implementation is [`MondayClient`], which speaks the
//! monday.com GraphQL API over HTTPS; [`InMemoryBoards`] keeps boards in
//! process memory for tests and rehearsals.
//!
//! Gateway calls are never retried here. Errors propagate to the caller,
//! which decides whether a failure is fatal for the run or only for one
//! item.

mod memory;
mod monday;

use std::fmt;

use async_trait::async_trait;
pub use memory::{InMemoryBoards, Mutation};
pub use monday::{DEFAULT_API_ENDPOINT, MondayClient};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::model::{BoardSummary, ColumnDefinition, ColumnPayload, ItemsPage};

/// One entry of the `errors` list in a GraphQL response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<JsonValue>,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            locations: None,
            path: None,
            extensions: None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

fn join_messages(errors: &[RemoteError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors returned by gateway calls.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// The request could not be sent or the response body could not be read.
    #[error("request to boards API failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success HTTP status.
    #[error("boards API returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response carried an `errors` list.
    #[error("boards API reported errors: {}", join_messages(.0))]
    Remote(Vec<RemoteError>),

    /// The `data` subtree did not have the expected shape.
    #[error("failed to decode boards API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response had neither `data` nor `errors`.
    #[error("boards API response contained no data")]
    MissingData,

    /// The queried board does not exist or is not visible to the token.
    #[error("board {0} not found")]
    BoardNotFound(String),
}

/// Operations the sync engine needs from the boards service.
///
/// Implementations must be `Send + Sync`; calls are issued one at a time.
#[async_trait]
pub trait BoardGateway: fmt::Debug + Send + Sync {
    /// Lists up to `limit` boards the caller can see.
    async fn list_boards(&self, limit: u32) -> Result<Vec<BoardSummary>, GatewayError>;

    /// Fetches a single page of at most `limit` items with their column
    /// values. Cursors are reported but not followed.
    async fn fetch_items(&self, board_id: &str, limit: u32) -> Result<ItemsPage, GatewayError>;

    /// Fetches the board's column definitions.
    async fn fetch_schema(&self, board_id: &str) -> Result<Vec<ColumnDefinition>, GatewayError>;

    /// Creates an item and returns its id.
    async fn create_item(
        &self,
        board_id: &str,
        name: &str,
        values: &ColumnPayload,
    ) -> Result<String, GatewayError>;

    /// Overwrites the given columns on an existing item.
    async fn update_item(
        &self,
        board_id: &str,
        item_id: &str,
        values: &ColumnPayload,
    ) -> Result<(), GatewayError>;
}
