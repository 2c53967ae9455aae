//! HTTP gateway for the monday.com GraphQL API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header::AUTHORIZATION};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value as JsonValue, json};
use tracing::{debug, instrument};

use super::{BoardGateway, GatewayError, RemoteError};
use crate::model::{BoardSummary, ColumnDefinition, ColumnPayload, ItemsPage};

pub const DEFAULT_API_ENDPOINT: &str = "https://api.monday.com/v2";

const BOARDS_QUERY: &str = "query ($limit: Int!) { boards(limit: $limit) { id name state items_count } }";

const ITEMS_QUERY: &str = "query ($boardId: [ID!], $limit: Int!) { boards(ids: $boardId) { \
     items_page(limit: $limit) { cursor items { id name column_values { id text value type } } } } }";

const SCHEMA_QUERY: &str =
    "query ($boardId: [ID!]) { boards(ids: $boardId) { columns { id title type } } }";

const CREATE_ITEM_MUTATION: &str = "mutation ($boardId: ID!, $itemName: String!, $columnValues: JSON!) { \
     create_item(board_id: $boardId, item_name: $itemName, column_values: $columnValues) { id } }";

const UPDATE_ITEM_MUTATION: &str = "mutation ($boardId: ID!, $itemId: ID!, $columnValues: JSON!) { \
     change_multiple_column_values(board_id: $boardId, item_id: $itemId, column_values: $columnValues) { id } }";

/// Raw response body. Besides the GraphQL `errors` list the service also
/// reports some failures (authentication, complexity budget) through the
/// top-level `error_message`/`error_code` pair.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<JsonValue>,
    #[serde(default)]
    errors: Option<Vec<RemoteError>>,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "B: Deserialize<'de>"))]
struct BoardsData<B> {
    #[serde(default)]
    boards: Vec<B>,
}

#[derive(Debug, Deserialize)]
struct BoardItems {
    items_page: ItemsPage,
}

#[derive(Debug, Deserialize)]
struct BoardColumns {
    #[serde(default)]
    columns: Vec<ColumnDefinition>,
}

#[derive(Debug, Deserialize)]
struct ItemRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct CreateItemData {
    create_item: ItemRef,
}

#[derive(Debug, Deserialize)]
struct UpdateItemData {
    change_multiple_column_values: ItemRef,
}

/// GraphQL client for the monday.com API.
pub struct MondayClient {
    http: Client,
    endpoint: String,
    token: String,
}

impl std::fmt::Debug for MondayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MondayClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl MondayClient {
    /// Creates a client for `endpoint` authenticating with `token`.
    ///
    /// The token is sent verbatim in the `Authorization` header, which is
    /// how the service expects personal API tokens.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`] if the HTTP client cannot be
    /// built.
    pub fn new(
        endpoint: &str,
        token: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, GatewayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            endpoint: normalize_endpoint(endpoint),
            token: token.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Executes a GraphQL document and decodes its `data` subtree.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::Transport`] on network failure
    /// - [`GatewayError::Remote`] when the body carries errors
    /// - [`GatewayError::Http`] on a non-success status without errors
    /// - [`GatewayError::MissingData`] / [`GatewayError::Decode`] when the
    ///   `data` subtree is absent or malformed
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: JsonValue,
    ) -> Result<T, GatewayError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header(AUTHORIZATION, self.token.as_str())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope = match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(GatewayError::Http {
                    status: status.as_u16(),
                    body,
                });
            }
            Err(err) => return Err(GatewayError::Decode(err)),
        };

        let Envelope {
            data,
            errors,
            error_message,
            error_code,
        } = envelope;

        if let Some(errors) = errors.filter(|errors| !errors.is_empty()) {
            return Err(GatewayError::Remote(errors));
        }
        if let Some(message) = error_message {
            let mut error = RemoteError::new(message);
            error.extensions = error_code.map(|code| json!({ "code": code }));
            return Err(GatewayError::Remote(vec![error]));
        }
        if !status.is_success() {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let data = data
            .filter(|data| !data.is_null())
            .ok_or(GatewayError::MissingData)?;
        Ok(serde_json::from_value(data)?)
    }

    async fn first_board<B: DeserializeOwned>(
        &self,
        query: &str,
        board_id: &str,
        variables: JsonValue,
    ) -> Result<B, GatewayError> {
        let data: BoardsData<B> = self.execute(query, variables).await?;
        data.boards
            .into_iter()
            .next()
            .ok_or_else(|| GatewayError::BoardNotFound(board_id.to_string()))
    }
}

#[async_trait]
impl BoardGateway for MondayClient {
    #[instrument(skip(self))]
    async fn list_boards(&self, limit: u32) -> Result<Vec<BoardSummary>, GatewayError> {
        let data: BoardsData<BoardSummary> =
            self.execute(BOARDS_QUERY, json!({ "limit": limit })).await?;

        debug!(count = data.boards.len(), "listed boards");
        Ok(data.boards)
    }

    #[instrument(skip(self))]
    async fn fetch_items(&self, board_id: &str, limit: u32) -> Result<ItemsPage, GatewayError> {
        let board: BoardItems = self
            .first_board(
                ITEMS_QUERY,
                board_id,
                json!({ "boardId": [board_id], "limit": limit }),
            )
            .await?;

        debug!(
            count = board.items_page.items.len(),
            truncated = board.items_page.is_truncated(),
            "fetched items"
        );
        Ok(board.items_page)
    }

    #[instrument(skip(self))]
    async fn fetch_schema(&self, board_id: &str) -> Result<Vec<ColumnDefinition>, GatewayError> {
        let board: BoardColumns = self
            .first_board(SCHEMA_QUERY, board_id, json!({ "boardId": [board_id] }))
            .await?;

        debug!(count = board.columns.len(), "fetched columns");
        Ok(board.columns)
    }

    #[instrument(skip(self, values), fields(columns = values.len()))]
    async fn create_item(
        &self,
        board_id: &str,
        name: &str,
        values: &ColumnPayload,
    ) -> Result<String, GatewayError> {
        let variables = json!({
            "boardId": board_id,
            "itemName": name,
            "columnValues": serde_json::to_string(values)?,
        });
        let data: CreateItemData = self.execute(CREATE_ITEM_MUTATION, variables).await?;
        Ok(data.create_item.id)
    }

    #[instrument(skip(self, values), fields(columns = values.len()))]
    async fn update_item(
        &self,
        board_id: &str,
        item_id: &str,
        values: &ColumnPayload,
    ) -> Result<(), GatewayError> {
        let variables = json!({
            "boardId": board_id,
            "itemId": item_id,
            "columnValues": serde_json::to_string(values)?,
        });
        let data: UpdateItemData = self.execute(UPDATE_ITEM_MUTATION, variables).await?;
        debug!(item_id = %data.change_multiple_column_values.id, "updated item");
        Ok(())
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_string()
}
