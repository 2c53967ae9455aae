//! Column value translation.
//!
//! Items are read in the API's generic representation (display text plus a
//! JSON-encoded raw value) but written through mutations that expect a
//! type-specific payload per column. [`Translator`] converts one item's
//! column values into a [`ColumnPayload`] for the destination board,
//! renaming columns through a [`RemapTable`] where the two boards use
//! different column ids.
//!
//! Translation never fails as a whole. A column whose raw value cannot be
//! interpreted is left out and reported as a [`FieldSkip`]; unset and
//! system-generated columns are left out silently.
//!
//! | Type      | Payload                                   |
//! |-----------|-------------------------------------------|
//! | text      | display text                              |
//! | long text | `{"text": ...}`                           |
//! | status    | `{"label": <display text>}`               |
//! | dropdown  | `{"labels": [...]}` split on commas       |
//! | date      | `{"date": ..., "time"?: ...}`             |
//! | people    | `{"personsAndTeams": [...]}`              |
//! | numbers   | display text                              |
//! | email     | `{"email": ..., "text": ...}`             |
//! | phone     | `{"phone": ..., "countryShortName"?: ...}`|
//! | link      | `{"url": ..., "text": ...}`               |
//! | checkbox  | `{"checked": "true" \| "false"}`          |
//! | timeline  | `{"from": ..., "to": ...}`                |
//! | location  | `{"lat": ..., "lng": ..., "address": ...}`|
//! | file      | `{"files": [...]}`                        |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue, json};
use tracing::{debug, warn};

use crate::model::{ColumnPayload, ColumnValue, FieldType, Item, Schema};

/// Static source column id to destination column id mapping.
///
/// Columns without an entry keep their id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemapTable(BTreeMap<String, String>);

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, source: impl Into<String>, destination: impl Into<String>) -> Self {
        self.0.insert(source.into(), destination.into());
        self
    }

    /// Destination id for a source column.
    pub fn resolve<'a>(&'a self, source: &'a str) -> &'a str {
        self.0.get(source).map_or(source, String::as_str)
    }

    /// `(source, destination)` pairs in source id order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(source, destination)| (source.as_str(), destination.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>, D: Into<String>> FromIterator<(S, D)> for RemapTable {
    fn from_iter<I: IntoIterator<Item = (S, D)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(source, destination)| (source.into(), destination.into()))
                .collect(),
        )
    }
}

/// Why a column with a value could not be translated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TranslateError {
    /// The raw value is not valid JSON, or has the wrong JSON type.
    #[error("malformed value: {0}")]
    MalformedValue(String),

    /// A key the payload needs is absent from the raw value.
    #[error("raw value has no `{0}`")]
    MissingKey(&'static str),

    /// A location without both coordinates.
    #[error("location needs both lat and lng")]
    IncompleteLocation,
}

/// A column left out of an item's payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSkip {
    pub item_id: String,
    pub column_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_title: Option<String>,
    pub column_type: FieldType,
    pub reason: TranslateError,
}

/// Result of translating one item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Translation {
    /// Destination column id to write payload.
    pub values: ColumnPayload,
    /// Columns that had a value but were left out.
    pub skipped: Vec<FieldSkip>,
}

/// Converts items from the source board into destination write payloads.
#[derive(Debug, Clone, Copy)]
pub struct Translator<'a> {
    schema: &'a Schema,
    remap: &'a RemapTable,
}

impl<'a> Translator<'a> {
    /// `schema` is the source board's schema. It supplies the type of
    /// columns whose values arrive without a recognised type tag, and
    /// column titles for diagnostics.
    pub fn new(schema: &'a Schema, remap: &'a RemapTable) -> Self {
        Self { schema, remap }
    }

    pub fn translate(&self, item: &Item) -> Translation {
        let mut translation = Translation::default();

        for column in &item.column_values {
            let Some(raw) = column.raw_value() else {
                continue;
            };

            let field_type = self.field_type(column);
            if field_type.is_system_generated() {
                debug!(item_id = %item.id, column_id = %column.id, column_type = %field_type, "skipping system column");
                continue;
            }

            match payload_for(&field_type, column.display_text(), raw) {
                Ok(Some(payload)) => {
                    let destination = self.remap.resolve(&column.id);
                    translation.values.insert(destination.to_string(), payload);
                }
                Ok(None) => {}
                Err(reason) => {
                    let column_title = self.schema.get(&column.id).map(|c| c.title.clone());
                    warn!(
                        item_id = %item.id,
                        column_id = %column.id,
                        column_type = %field_type,
                        %reason,
                        "could not translate column, leaving it out"
                    );
                    translation.skipped.push(FieldSkip {
                        item_id: item.id.clone(),
                        column_id: column.id.clone(),
                        column_title,
                        column_type: field_type,
                        reason,
                    });
                }
            }
        }

        translation
    }

    fn field_type(&self, column: &ColumnValue) -> FieldType {
        if column.column_type.is_unknown()
            && let Some(definition) = self.schema.get(&column.id)
        {
            return definition.column_type.clone();
        }
        column.column_type.clone()
    }
}

/// Builds the write payload for one column. `Ok(None)` means there is
/// nothing worth writing.
fn payload_for(
    field_type: &FieldType,
    text: &str,
    raw: &str,
) -> Result<Option<JsonValue>, TranslateError> {
    let parsed: JsonValue =
        serde_json::from_str(raw).map_err(|err| TranslateError::MalformedValue(err.to_string()))?;
    if parsed.is_null() {
        return Ok(None);
    }

    let payload = match field_type {
        FieldType::Text => Some(json!(text)),
        FieldType::LongText => non_empty(text).map(|text| json!({ "text": text })),
        FieldType::Status => non_empty(text).map(|label| json!({ "label": label })),
        FieldType::Dropdown => {
            let labels = split_labels(text);
            (!labels.is_empty()).then(|| json!({ "labels": labels }))
        }
        FieldType::Date => {
            let mut payload = pick(&parsed, &["date"])?;
            copy_optional(&parsed, &mut payload, "time");
            Some(JsonValue::Object(payload))
        }
        FieldType::People => Some(JsonValue::Object(pick(&parsed, &["personsAndTeams"])?)),
        FieldType::Numeric | FieldType::Other(_) => non_empty(text).map(|text| json!(text)),
        FieldType::Email => {
            let mut payload = pick(&parsed, &["email"])?;
            payload.insert("text".to_string(), string_or_empty(&parsed, "text"));
            Some(JsonValue::Object(payload))
        }
        FieldType::Phone => {
            let mut payload = pick(&parsed, &["phone"])?;
            copy_optional(&parsed, &mut payload, "countryShortName");
            Some(JsonValue::Object(payload))
        }
        FieldType::Link => {
            let mut payload = pick(&parsed, &["url"])?;
            payload.insert("text".to_string(), string_or_empty(&parsed, "text"));
            Some(JsonValue::Object(payload))
        }
        FieldType::Checkbox => {
            let checked = checkbox_state(require(&parsed, "checked")?)?;
            Some(json!({ "checked": checked.to_string() }))
        }
        FieldType::Timeline => {
            let mut payload = pick(&parsed, &["from"])?;
            let to = parsed.get("to").cloned().unwrap_or(JsonValue::Null);
            payload.insert("to".to_string(), to);
            Some(JsonValue::Object(payload))
        }
        FieldType::Location => {
            let mut payload =
                pick(&parsed, &["lat", "lng"]).map_err(|_| TranslateError::IncompleteLocation)?;
            payload.insert("address".to_string(), string_or_empty(&parsed, "address"));
            Some(JsonValue::Object(payload))
        }
        FieldType::File => {
            let files = require(&parsed, "files")?;
            if !files.is_array() {
                return Err(TranslateError::MalformedValue(
                    "`files` is not a list".to_string(),
                ));
            }
            Some(json!({ "files": files }))
        }
        FieldType::System(_) => None,
    };

    Ok(payload)
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.trim().is_empty()).then_some(text)
}

fn split_labels(text: &str) -> Vec<&str> {
    text.split(',')
        .map(str::trim)
        .filter(|label| !label.is_empty())
        .collect()
}

fn require<'v>(parsed: &'v JsonValue, key: &'static str) -> Result<&'v JsonValue, TranslateError> {
    parsed
        .get(key)
        .filter(|value| !value.is_null())
        .ok_or(TranslateError::MissingKey(key))
}

/// Copies the required keys into a fresh payload object.
fn pick(parsed: &JsonValue, keys: &[&'static str]) -> Result<Map<String, JsonValue>, TranslateError> {
    keys.iter()
        .map(|&key| Ok((key.to_string(), require(parsed, key)?.clone())))
        .collect()
}

fn copy_optional(parsed: &JsonValue, payload: &mut Map<String, JsonValue>, key: &str) {
    if let Some(value) = parsed.get(key).filter(|value| !value.is_null()) {
        payload.insert(key.to_string(), value.clone());
    }
}

fn string_or_empty(parsed: &JsonValue, key: &str) -> JsonValue {
    parsed
        .get(key)
        .filter(|value| value.is_string())
        .cloned()
        .unwrap_or_else(|| JsonValue::String(String::new()))
}

fn checkbox_state(value: &JsonValue) -> Result<bool, TranslateError> {
    match value {
        JsonValue::Bool(checked) => Ok(*checked),
        JsonValue::String(text) => text
            .trim()
            .parse::<bool>()
            .map_err(|_| TranslateError::MalformedValue(format!("checked = {text:?}"))),
        other => Err(TranslateError::MalformedValue(format!("checked = {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColumnDefinition, SystemColumn};

    fn column(id: &str, tag: &str, text: &str, value: Option<&str>) -> ColumnValue {
        ColumnValue {
            id: id.to_string(),
            column_type: FieldType::from_tag(tag),
            text: Some(text.to_string()),
            value: value.map(str::to_string),
        }
    }

    fn item(columns: Vec<ColumnValue>) -> Item {
        Item {
            id: "S1".to_string(),
            name: "Alice".to_string(),
            column_values: columns,
        }
    }

    fn translate(columns: Vec<ColumnValue>) -> Translation {
        Translator::new(&Schema::default(), &RemapTable::new()).translate(&item(columns))
    }

    #[test]
    fn test_unset_columns_are_never_emitted() {
        let translation = translate(vec![
            column("text0", "text", "", None),
            column("status", "status", "", Some("null")),
            column("date4", "date", "", Some("")),
        ]);

        assert!(translation.values.is_empty());
        assert!(translation.skipped.is_empty());
    }

    #[test]
    fn test_system_columns_are_never_emitted() {
        let translation = translate(vec![
            column("formula", "formula", "42", Some("42")),
            column("auto", "auto_number", "7", Some("7")),
            column("pulse", "item_id", "123", Some("\"123\"")),
            column("log", "creation_log", "2024-01-01", Some("{\"created_at\":\"x\"}")),
        ]);

        assert!(translation.values.is_empty());
        assert!(translation.skipped.is_empty());
    }

    #[test]
    fn test_status_uses_display_label() {
        let translation = translate(vec![column(
            "status1",
            "status",
            "Done",
            Some(r#"{"index":1,"post_id":null}"#),
        )]);

        assert_eq!(translation.values["status1"], json!({ "label": "Done" }));
    }

    #[test]
    fn test_dropdown_splits_display_text_into_labels() {
        let translation = translate(vec![
            column("multi", "dropdown", "A, B", Some(r#"{"ids":[1,2]}"#)),
            column("single", "dropdown", "A", Some(r#"{"ids":[1]}"#)),
        ]);

        assert_eq!(translation.values["multi"], json!({ "labels": ["A", "B"] }));
        assert_eq!(translation.values["single"], json!({ "labels": ["A"] }));
    }

    #[test]
    fn test_text_and_numbers_use_display_text() {
        let translation = translate(vec![
            column("text0", "text", "hello", Some("\"hello\"")),
            column("numbers", "numbers", "12.5", Some("\"12.5\"")),
            column("long", "long_text", "line one", Some(r#"{"text":"line one"}"#)),
        ]);

        assert_eq!(translation.values["text0"], json!("hello"));
        assert_eq!(translation.values["numbers"], json!("12.5"));
        assert_eq!(translation.values["long"], json!({ "text": "line one" }));
    }

    #[test]
    fn test_structured_types_copy_their_keys() {
        let translation = translate(vec![
            column("date4", "date", "2024-05-01", Some(r#"{"date":"2024-05-01","changed_at":"x"}"#)),
            column(
                "people",
                "people",
                "Ann",
                Some(r#"{"personsAndTeams":[{"id":4,"kind":"person"}]}"#),
            ),
            column("email", "email", "a@b.c", Some(r#"{"email":"a@b.c","text":"Ann"}"#)),
            column("phone", "phone", "+1", Some(r#"{"phone":"15551234","countryShortName":"US"}"#)),
            column("link", "link", "site", Some(r#"{"url":"https://x.test"}"#)),
            column("timeline", "timeline", "", Some(r#"{"from":"2024-01-01","to":"2024-02-01"}"#)),
        ]);

        let values = &translation.values;
        assert_eq!(values["date4"], json!({ "date": "2024-05-01" }));
        assert_eq!(
            values["people"],
            json!({ "personsAndTeams": [{ "id": 4, "kind": "person" }] })
        );
        assert_eq!(values["email"], json!({ "email": "a@b.c", "text": "Ann" }));
        assert_eq!(
            values["phone"],
            json!({ "phone": "15551234", "countryShortName": "US" })
        );
        assert_eq!(values["link"], json!({ "url": "https://x.test", "text": "" }));
        assert_eq!(
            values["timeline"],
            json!({ "from": "2024-01-01", "to": "2024-02-01" })
        );
        assert!(translation.skipped.is_empty());
    }

    #[test]
    fn test_checkbox_accepts_bool_and_string() {
        let translation = translate(vec![
            column("check1", "checkbox", "v", Some(r#"{"checked":"true"}"#)),
            column("check2", "checkbox", "", Some(r#"{"checked":false}"#)),
        ]);

        assert_eq!(translation.values["check1"], json!({ "checked": "true" }));
        assert_eq!(translation.values["check2"], json!({ "checked": "false" }));
    }

    #[test]
    fn test_location_without_lng_is_omitted() {
        let translation = translate(vec![column(
            "location",
            "location",
            "Paris",
            Some(r#"{"lat":48.85,"address":"Paris"}"#),
        )]);

        assert!(translation.values.is_empty());
        assert_eq!(translation.skipped.len(), 1);
        assert_eq!(translation.skipped[0].reason, TranslateError::IncompleteLocation);
    }

    #[test]
    fn test_location_with_coordinates_is_emitted() {
        let translation = translate(vec![column(
            "location",
            "location",
            "Paris",
            Some(r#"{"lat":"48.85","lng":"2.35","address":"Paris"}"#),
        )]);

        assert_eq!(
            translation.values["location"],
            json!({ "lat": "48.85", "lng": "2.35", "address": "Paris" })
        );
    }

    #[test]
    fn test_files_pass_through_unchanged() {
        let raw = r#"{"files":[{"name":"a.pdf","assetId":9,"isImage":"false","fileType":"ASSET"}]}"#;
        let translation = translate(vec![column("file", "file", "a.pdf", Some(raw))]);

        assert_eq!(
            translation.values["file"],
            json!({ "files": [{ "name": "a.pdf", "assetId": 9, "isImage": "false", "fileType": "ASSET" }] })
        );
    }

    #[test]
    fn test_malformed_value_skips_only_that_column() {
        let translation = translate(vec![
            column("date4", "date", "2024-05-01", Some("{not json")),
            column("status", "status", "Done", Some(r#"{"index":1}"#)),
        ]);

        assert_eq!(translation.values.len(), 1);
        assert!(translation.values.contains_key("status"));
        assert_eq!(translation.skipped.len(), 1);
        assert_eq!(translation.skipped[0].column_id, "date4");
        assert!(matches!(
            translation.skipped[0].reason,
            TranslateError::MalformedValue(_)
        ));
    }

    #[test]
    fn test_missing_required_key_is_reported() {
        let translation = translate(vec![column("email", "email", "x", Some(r#"{"text":"x"}"#))]);

        assert!(translation.values.is_empty());
        assert_eq!(translation.skipped[0].reason, TranslateError::MissingKey("email"));
    }

    #[test]
    fn test_empty_display_text_is_skipped_silently() {
        let translation = translate(vec![
            column("status", "status", "", Some(r#"{"index":5}"#)),
            column("dropdown", "dropdown", " , ", Some(r#"{"ids":[]}"#)),
            column("numbers", "numbers", "", Some("\"\"")),
        ]);

        assert!(translation.values.is_empty());
        assert!(translation.skipped.is_empty());
    }

    #[test]
    fn test_remap_emits_destination_id_only() {
        let remap = RemapTable::new().with("status_src", "status_dst");
        let translation = Translator::new(&Schema::default(), &remap).translate(&item(vec![
            column("status_src", "status", "Done", Some("{}")),
            column("text0", "text", "kept", Some("\"kept\"")),
        ]));

        assert!(!translation.values.contains_key("status_src"));
        assert_eq!(translation.values["status_dst"], json!({ "label": "Done" }));
        assert_eq!(translation.values["text0"], json!("kept"));
    }

    #[test]
    fn test_remap_collision_last_column_wins() {
        let remap = RemapTable::new().with("a", "target").with("b", "target");
        let translation = Translator::new(&Schema::default(), &remap).translate(&item(vec![
            column("a", "text", "first", Some("\"first\"")),
            column("b", "text", "second", Some("\"second\"")),
        ]));

        assert_eq!(translation.values.len(), 1);
        assert_eq!(translation.values["target"], json!("second"));
    }

    #[test]
    fn test_schema_supplies_type_for_untyped_values() {
        let schema = Schema::new(vec![
            ColumnDefinition {
                id: "status".to_string(),
                title: "Stage".to_string(),
                column_type: FieldType::Status,
            },
            ColumnDefinition {
                id: "formula".to_string(),
                title: "Score".to_string(),
                column_type: FieldType::System(SystemColumn::Formula),
            },
        ]);
        let remap = RemapTable::new();
        let untyped = |id: &str, text: &str| ColumnValue {
            id: id.to_string(),
            column_type: FieldType::default(),
            text: Some(text.to_string()),
            value: Some("{}".to_string()),
        };

        let translation = Translator::new(&schema, &remap)
            .translate(&item(vec![untyped("status", "Stuck"), untyped("formula", "9")]));

        assert_eq!(translation.values.len(), 1);
        assert_eq!(translation.values["status"], json!({ "label": "Stuck" }));
    }

    #[test]
    fn test_skip_carries_schema_title() {
        let schema = Schema::new(vec![ColumnDefinition {
            id: "date4".to_string(),
            title: "Due".to_string(),
            column_type: FieldType::Date,
        }]);
        let remap = RemapTable::new();

        let translation = Translator::new(&schema, &remap)
            .translate(&item(vec![column("date4", "date", "", Some("[1,2"))]));

        assert_eq!(translation.skipped[0].column_title.as_deref(), Some("Due"));
        assert_eq!(translation.skipped[0].item_id, "S1");
    }

    #[test]
    fn test_remap_table_deserializes_from_toml_table() {
        let remap: RemapTable = toml::from_str("status_src = \"status_dst\"\n").unwrap();
        assert_eq!(remap.resolve("status_src"), "status_dst");
        assert_eq!(remap.resolve("other"), "other");
        assert_eq!(remap.len(), 1);
    }
}
