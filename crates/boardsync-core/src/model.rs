//! Board data model as returned by the monday.com GraphQL API.
//!
//! Items, their column values, and column definitions are deserialized
//! directly from the API's response shapes. Column types arrive as string
//! tags and are folded into the closed [`FieldType`] enum so that every
//! consumer has to handle each type explicitly.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Write payload for a single item: destination column id to column value.
///
/// Serialized to a JSON string and sent as the `column_values` argument of
/// the create and update mutations.
pub type ColumnPayload = serde_json::Map<String, JsonValue>;

/// Column types that are computed by the service and can never be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemColumn {
    Formula,
    AutoNumber,
    ItemId,
    CreationLog,
}

/// The type of a board column.
///
/// Unknown tags are preserved in [`FieldType::Other`] so diagnostics can
/// still name them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    Text,
    LongText,
    Status,
    Dropdown,
    Date,
    People,
    Numeric,
    Email,
    Phone,
    Link,
    Checkbox,
    Timeline,
    Location,
    File,
    System(SystemColumn),
    Other(String),
}

impl FieldType {
    /// Parses an API type tag. Both the current and the legacy spellings
    /// are accepted.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => Self::Text,
            "long_text" | "long-text" => Self::LongText,
            "status" | "color" => Self::Status,
            "dropdown" => Self::Dropdown,
            "date" => Self::Date,
            "people" | "multiple-person" => Self::People,
            "numbers" | "numeric" => Self::Numeric,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "link" => Self::Link,
            "checkbox" | "boolean" => Self::Checkbox,
            "timeline" | "timerange" => Self::Timeline,
            "location" => Self::Location,
            "file" => Self::File,
            "formula" => Self::System(SystemColumn::Formula),
            "auto_number" | "autonumber" => Self::System(SystemColumn::AutoNumber),
            "item_id" | "pulse-id" => Self::System(SystemColumn::ItemId),
            "creation_log" | "pulse-log" => Self::System(SystemColumn::CreationLog),
            other => Self::Other(other.to_string()),
        }
    }

    /// The canonical API tag for this type.
    pub fn tag(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::LongText => "long_text",
            Self::Status => "status",
            Self::Dropdown => "dropdown",
            Self::Date => "date",
            Self::People => "people",
            Self::Numeric => "numbers",
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Link => "link",
            Self::Checkbox => "checkbox",
            Self::Timeline => "timeline",
            Self::Location => "location",
            Self::File => "file",
            Self::System(SystemColumn::Formula) => "formula",
            Self::System(SystemColumn::AutoNumber) => "auto_number",
            Self::System(SystemColumn::ItemId) => "item_id",
            Self::System(SystemColumn::CreationLog) => "creation_log",
            Self::Other(tag) => tag,
        }
    }

    /// Whether values of this type are computed by the service.
    pub fn is_system_generated(&self) -> bool {
        matches!(self, Self::System(_))
    }

    /// Whether the tag was not recognised (or was missing altogether).
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Other(_))
    }
}

impl Default for FieldType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.tag().to_string()
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A column definition from a board's schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub column_type: FieldType,
}

/// A board's ordered column definitions, indexed by column id.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    columns: Vec<ColumnDefinition>,
    index: HashMap<String, usize>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        let index = columns
            .iter()
            .enumerate()
            .map(|(position, column)| (column.id.clone(), position))
            .collect();
        Self { columns, index }
    }

    pub fn get(&self, column_id: &str) -> Option<&ColumnDefinition> {
        self.index.get(column_id).map(|&position| &self.columns[position])
    }

    /// Column definitions in board order.
    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl From<Vec<ColumnDefinition>> for Schema {
    fn from(columns: Vec<ColumnDefinition>) -> Self {
        Self::new(columns)
    }
}

/// One column value attached to an item.
///
/// `text` is the service's rendered display text; `value` is the raw JSON
/// payload encoded as a string, or `None` when the column is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub id: String,
    #[serde(rename = "type", default)]
    pub column_type: FieldType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

impl ColumnValue {
    /// Display text, empty when the service returned none.
    pub fn display_text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// Raw JSON payload, or `None` when the column is unset.
    ///
    /// The API encodes an unset column either as a JSON `null` or as the
    /// literal string `"null"`; both map to `None`.
    pub fn raw_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .filter(|raw| !raw.trim().is_empty() && raw.trim() != "null")
    }
}

/// A board item (row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub column_values: Vec<ColumnValue>,
}

impl Item {
    pub fn column(&self, column_id: &str) -> Option<&ColumnValue> {
        self.column_values.iter().find(|value| value.id == column_id)
    }

    /// Trimmed display text of a column, `None` when absent or blank.
    pub fn column_text(&self, column_id: &str) -> Option<&str> {
        self.column(column_id)
            .map(|value| value.display_text().trim())
            .filter(|text| !text.is_empty())
    }
}

/// A board visible to the API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSummary {
    pub id: String,
    pub name: String,
    /// `active`, `archived` or `deleted`.
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub items_count: Option<u64>,
}

/// A single page of items from a board.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemsPage {
    /// Continuation cursor; present when the board holds more items than
    /// were returned.
    #[serde(default)]
    pub cursor: Option<String>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl ItemsPage {
    pub fn is_truncated(&self) -> bool {
        self.cursor.is_some()
    }
}
