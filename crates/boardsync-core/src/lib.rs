//! One-way item sync between two monday.com boards.
//!
//! Items on a source board are copied to a destination board through the
//! GraphQL API. Each destination item stores its source item's key in a
//! link column, so repeated runs update the items they created earlier
//! instead of duplicating them.
//!
//! # Key Components
//!
//! - **Gateway**: [`BoardGateway`] is the seam to the API. [`MondayClient`]
//!   talks HTTP; [`InMemoryBoards`] keeps boards in memory for tests.
//! - **Translator**: [`Translator`] turns an item's column values into the
//!   write payload the API expects for each column type.
//! - **Matcher**: [`MatchTable`] maps link values back to destination items.
//! - **Orchestrator**: [`Syncer`] runs a pass and returns a [`SyncReport`].
//! - **Config**: [`Config`] loads `boardsync.toml` and builds
//!   [`SyncOptions`].
//!
//! # Example
//!
//! ```no_run
//! use boardsync_core::{MondayClient, SyncOptions, Syncer, DEFAULT_API_ENDPOINT};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = MondayClient::new(DEFAULT_API_ENDPOINT, "api-token", None)?;
//! let syncer = Syncer::new(client, SyncOptions::new("18269603341", "18399599376"));
//!
//! let report = syncer.run().await?;
//! println!("created {} updated {}", report.stats.created, report.stats.updated);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod gateway;
pub mod matcher;
pub mod model;
pub mod sync;
pub mod translate;

pub use config::{Config, ConfigEnv, ConfigError, LoadedConfig, SyncOverrides};
pub use gateway::{
    BoardGateway, DEFAULT_API_ENDPOINT, GatewayError, InMemoryBoards, MondayClient, RemoteError,
};
pub use matcher::{DuplicateLink, MatchTable};
pub use model::{
    BoardSummary, ColumnDefinition, ColumnPayload, ColumnValue, FieldType, Item, ItemsPage, Schema,
};
pub use sync::{
    RecordAction, RecordOutcome, SyncError, SyncOptions, SyncReport, SyncStats, Syncer,
};
pub use translate::{FieldSkip, RemapTable, TranslateError, Translation, Translator};
