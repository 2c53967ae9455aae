//! One-way sync of items from a source board to a destination board.
//!
//! A run is a single linear pass:
//!
//! 1. Fetch source items, destination items and the source schema. Any
//!    failure here aborts the run before anything is written.
//! 2. Build a [`MatchTable`] from the destination items' link column.
//! 3. For each source item, translate its column values, stamp the link
//!    column with the item's key, and either update the matched
//!    destination item or create a new one.
//!
//! A failed write only fails that item: it is logged, counted, and the run
//! moves on. Nothing is retried.

use std::fmt;

use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::{
    gateway::{BoardGateway, GatewayError},
    matcher::{DuplicateLink, MatchTable},
    model::{ColumnPayload, Item, Schema},
    translate::{FieldSkip, RemapTable, Translator},
};

pub const DEFAULT_LINK_COLUMN: &str = "source_item_id";
pub const DEFAULT_PAGE_LIMIT: u32 = 500;
/// Largest page the items query accepts.
pub const MAX_PAGE_LIMIT: u32 = 500;

/// Everything a run needs to know. Built by the caller; the engine never
/// consults the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub source_board: String,
    pub dest_board: String,
    /// Destination column holding the source item's key.
    pub link_column: String,
    /// Source column whose text is used as the key instead of the item id.
    pub source_key_column: Option<String>,
    pub remap: RemapTable,
    /// Items requested per board; boards larger than this are truncated.
    pub page_limit: u32,
    /// Only process the first N source items.
    pub limit: Option<usize>,
    /// Translate and match but do not write.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn new(source_board: impl Into<String>, dest_board: impl Into<String>) -> Self {
        Self {
            source_board: source_board.into(),
            dest_board: dest_board.into(),
            link_column: DEFAULT_LINK_COLUMN.to_string(),
            source_key_column: None,
            remap: RemapTable::new(),
            page_limit: DEFAULT_PAGE_LIMIT,
            limit: None,
            dry_run: false,
        }
    }

    #[must_use]
    pub fn link_column(mut self, column_id: impl Into<String>) -> Self {
        self.link_column = column_id.into();
        self
    }

    #[must_use]
    pub fn source_key_column(mut self, column_id: impl Into<String>) -> Self {
        self.source_key_column = Some(column_id.into());
        self
    }

    #[must_use]
    pub fn remap(mut self, remap: RemapTable) -> Self {
        self.remap = remap;
        self
    }

    #[must_use]
    pub fn page_limit(mut self, page_limit: u32) -> Self {
        self.page_limit = page_limit;
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Which bootstrap fetch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapStage {
    SourceItems,
    DestinationItems,
    SourceSchema,
}

impl fmt::Display for BootstrapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::SourceItems => "source items",
            Self::DestinationItems => "destination items",
            Self::SourceSchema => "source schema",
        })
    }
}

/// Errors that abort a whole run.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SyncError {
    #[error("failed to fetch {stage}: {source}")]
    Bootstrap {
        stage: BootstrapStage,
        #[source]
        source: GatewayError,
    },
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// What happened to one source item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecordAction {
    /// `dest_item_id` is `None` on a dry run.
    Created { dest_item_id: Option<String> },
    /// On a dry run, an item planned for creation earlier in the same run
    /// is named by [`planned_item_id`].
    Updated { dest_item_id: String },
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordOutcome {
    pub item_id: String,
    pub item_name: String,
    #[serde(flatten)]
    pub action: RecordAction,
}

/// Placeholder destination id for an item a dry run would have created.
pub fn planned_item_id(item: &Item) -> String {
    format!("planned:{}", item.id)
}

/// Full account of a run: counters plus the structured events behind them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub stats: SyncStats,
    pub dry_run: bool,
    pub records: Vec<RecordOutcome>,
    pub field_skips: Vec<FieldSkip>,
    pub duplicate_links: Vec<DuplicateLink>,
    /// The source board held more items than one page.
    pub source_truncated: bool,
    /// The destination board held more items than one page.
    pub dest_truncated: bool,
}

impl SyncReport {
    pub fn failures(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.records
            .iter()
            .filter(|record| matches!(record.action, RecordAction::Failed { .. }))
    }

    fn record(&mut self, item: &Item, action: RecordAction) {
        match &action {
            RecordAction::Created { .. } => self.stats.created += 1,
            RecordAction::Updated { .. } => self.stats.updated += 1,
            RecordAction::Skipped { .. } => self.stats.skipped += 1,
            RecordAction::Failed { .. } => self.stats.errors += 1,
        }
        self.records.push(RecordOutcome {
            item_id: item.id.clone(),
            item_name: item.name.clone(),
            action,
        });
    }
}

/// Drives sync runs against a [`BoardGateway`].
#[derive(Debug)]
pub struct Syncer<G> {
    gateway: G,
    options: SyncOptions,
}

impl<G: BoardGateway> Syncer<G> {
    pub fn new(gateway: G, options: SyncOptions) -> Self {
        Self { gateway, options }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Runs one full pass.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Bootstrap`] if fetching source items,
    /// destination items or the source schema fails. Failures while writing
    /// individual items are recorded in the report instead.
    #[instrument(skip(self), fields(
        source_board = %self.options.source_board,
        dest_board = %self.options.dest_board,
        dry_run = self.options.dry_run,
    ))]
    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        let options = &self.options;
        info!("starting sync");

        let source = self
            .gateway
            .fetch_items(&options.source_board, options.page_limit)
            .await
            .map_err(|source| SyncError::Bootstrap {
                stage: BootstrapStage::SourceItems,
                source,
            })?;
        let destination = self
            .gateway
            .fetch_items(&options.dest_board, options.page_limit)
            .await
            .map_err(|source| SyncError::Bootstrap {
                stage: BootstrapStage::DestinationItems,
                source,
            })?;
        let schema = Schema::new(
            self.gateway
                .fetch_schema(&options.source_board)
                .await
                .map_err(|source| SyncError::Bootstrap {
                    stage: BootstrapStage::SourceSchema,
                    source,
                })?,
        );

        info!(
            source_items = source.items.len(),
            dest_items = destination.items.len(),
            columns = schema.len(),
            "fetched boards"
        );

        let mut report = SyncReport {
            dry_run: options.dry_run,
            source_truncated: source.is_truncated(),
            dest_truncated: destination.is_truncated(),
            ..SyncReport::default()
        };
        if report.source_truncated {
            warn!(
                board_id = %options.source_board,
                page_limit = options.page_limit,
                "source board has more items than one page; the rest will not be synced"
            );
        }
        if report.dest_truncated {
            warn!(
                board_id = %options.dest_board,
                page_limit = options.page_limit,
                "destination board has more items than one page; unmatched items may be duplicated"
            );
        }

        let mut matches = MatchTable::build(&destination.items, &options.link_column);
        for duplicate in matches.duplicates() {
            warn!(
                link_value = %duplicate.link_value,
                kept_item_id = %duplicate.kept_item_id,
                dropped_item_id = %duplicate.dropped_item_id,
                "several destination items share a link value; keeping the first"
            );
        }
        report.duplicate_links = matches.duplicates().to_vec();
        info!(matched = matches.len(), "built match table");

        let translator = Translator::new(&schema, &options.remap);
        let limit = options.limit.unwrap_or(usize::MAX);

        for item in source.items.iter().take(limit) {
            let Some(key) = self.item_key(item) else {
                warn!(item_id = %item.id, item_name = %item.name, "item has no source key, skipping");
                report.record(
                    item,
                    RecordAction::Skipped {
                        reason: "source key column is empty".to_string(),
                    },
                );
                continue;
            };

            let translation = translator.translate(item);
            report.field_skips.extend(translation.skipped);
            let mut values = translation.values;
            values.insert(
                options.link_column.clone(),
                serde_json::Value::String(key.to_string()),
            );

            let action = match matches.get(key).map(str::to_string) {
                Some(dest_item_id) => self.update(item, dest_item_id, &values).await,
                None => {
                    let action = self.create(item, &values).await;
                    match &action {
                        RecordAction::Created {
                            dest_item_id: Some(dest_item_id),
                        } => matches.insert(key, dest_item_id.clone()),
                        RecordAction::Created { dest_item_id: None } => {
                            matches.insert(key, planned_item_id(item));
                        }
                        _ => {}
                    }
                    action
                }
            };
            report.record(item, action);
        }

        let stats = report.stats;
        info!(
            created = stats.created,
            updated = stats.updated,
            skipped = stats.skipped,
            errors = stats.errors,
            field_skips = report.field_skips.len(),
            "sync finished"
        );
        Ok(report)
    }

    /// The value stored in the link column for this item.
    fn item_key<'i>(&self, item: &'i Item) -> Option<&'i str> {
        match &self.options.source_key_column {
            Some(column) => item.column_text(column),
            None => Some(item.id.as_str()),
        }
    }

    async fn create(&self, item: &Item, values: &ColumnPayload) -> RecordAction {
        if self.options.dry_run {
            info!(item_id = %item.id, item_name = %item.name, "would create item");
            return RecordAction::Created { dest_item_id: None };
        }

        match self
            .gateway
            .create_item(&self.options.dest_board, &item.name, values)
            .await
        {
            Ok(dest_item_id) => {
                info!(item_id = %item.id, item_name = %item.name, %dest_item_id, "created item");
                RecordAction::Created {
                    dest_item_id: Some(dest_item_id),
                }
            }
            Err(err) => self.failed(item, &err),
        }
    }

    async fn update(&self, item: &Item, dest_item_id: String, values: &ColumnPayload) -> RecordAction {
        if self.options.dry_run {
            info!(item_id = %item.id, item_name = %item.name, %dest_item_id, "would update item");
            return RecordAction::Updated { dest_item_id };
        }

        match self
            .gateway
            .update_item(&self.options.dest_board, &dest_item_id, values)
            .await
        {
            Ok(()) => {
                info!(item_id = %item.id, item_name = %item.name, %dest_item_id, "updated item");
                RecordAction::Updated { dest_item_id }
            }
            Err(err) => self.failed(item, &err),
        }
    }

    fn failed(&self, item: &Item, err: &GatewayError) -> RecordAction {
        error!(
            item_id = %item.id,
            item_name = %item.name,
            dest_board = %self.options.dest_board,
            error = %err,
            "failed to write item"
        );
        RecordAction::Failed {
            error: err.to_string(),
        }
    }
}
