use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, ErrorKind};
use crate::store::Item;

/// Scalar types DynamoDB allows in a primary key
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum KeyAttribute {
    /// String
    S(String),
    /// Number, kept in its wire representation
    N(String),
    /// Binary
    B(Vec<u8>),
}

impl TryFrom<AttributeValue> for KeyAttribute {
    type Error = Error;

    fn try_from(value: AttributeValue) -> Result<Self, Self::Error> {
        match value {
            AttributeValue::S(s) => Ok(KeyAttribute::S(s)),
            AttributeValue::N(n) => Ok(KeyAttribute::N(n)),
            AttributeValue::B(b) => Ok(KeyAttribute::B(b.into_inner())),
            other => Err(Error::InvalidCursor(format!(
                "key attributes must be S, N or B, got {other:?}"
            ))),
        }
    }
}

impl From<KeyAttribute> for AttributeValue {
    fn from(value: KeyAttribute) -> Self {
        match value {
            KeyAttribute::S(s) => AttributeValue::S(s),
            KeyAttribute::N(n) => AttributeValue::N(n),
            KeyAttribute::B(b) => AttributeValue::B(Blob::new(b)),
        }
    }
}

/// Opaque continuation token for the pager
///
/// Holds the primary key of the last evaluated item. Serializes in the
/// DynamoDB JSON shape (`{"id": {"S": "a"}}`) so it can travel through an
/// orchestrator between invocations.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(BTreeMap<String, KeyAttribute>);

impl Cursor {
    /// Build a cursor from a `LastEvaluatedKey` map
    pub fn from_key(key: HashMap<String, AttributeValue>) -> Result<Self, Error> {
        key.into_iter()
            .map(|(name, value)| Ok((name, KeyAttribute::try_from(value)?)))
            .collect::<Result<BTreeMap<_, _>, Error>>()
            .map(Cursor)
    }

    /// The `ExclusiveStartKey` map for the next scan
    pub fn to_key(&self) -> HashMap<String, AttributeValue> {
        self.0
            .iter()
            .map(|(name, value)| (name.clone(), AttributeValue::from(value.clone())))
            .collect()
    }

    /// Key attribute by name
    pub fn get(&self, name: &str) -> Option<&KeyAttribute> {
        self.0.get(name)
    }

    /// Number of key attributes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the cursor carries no key attributes
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, KeyAttribute)> for Cursor {
    fn from_iter<I: IntoIterator<Item = (String, KeyAttribute)>>(iter: I) -> Self {
        Cursor(iter.into_iter().collect())
    }
}

/// Progress counters carried across invocations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    /// Items durably written to the target so far
    pub items_copied: u64,
    /// When the first invocation started
    pub started_at: DateTime<Utc>,
    /// Set once, when the migration reaches a terminal state
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Set once, true only for a completed migration
    #[serde(default)]
    pub succeeded: bool,
}

impl Progress {
    /// Fresh progress started at `started_at`
    pub fn started_at(started_at: DateTime<Utc>) -> Self {
        Self {
            items_copied: 0,
            started_at,
            finished_at: None,
            succeeded: false,
        }
    }

    /// True once `finished_at` has been stamped
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub(crate) fn record(&mut self, copied: usize) {
        self.items_copied += copied as u64;
    }

    pub(crate) fn reopen(&mut self) {
        self.finished_at = None;
        self.succeeded = false;
    }

    pub(crate) fn finish(&mut self, succeeded: bool) {
        if self.finished_at.is_none() {
            self.finished_at = Some(Utc::now());
            self.succeeded = succeeded;
        }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::started_at(Utc::now())
    }
}

/// One migration, as handed between invocations
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MigrationRequest {
    /// Table items are read from
    #[serde(rename = "sourceTableName", default)]
    pub source_table: String,
    /// Table items are written to
    #[serde(rename = "targetTableName", default)]
    pub target_table: String,
    /// Resume point, `None` means start from the beginning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// Accumulated counters
    #[serde(default)]
    pub progress: Progress,
}

impl MigrationRequest {
    /// A request that starts from the beginning of `source_table`
    pub fn new(source_table: impl Into<String>, target_table: impl Into<String>) -> Self {
        Self {
            source_table: source_table.into(),
            target_table: target_table.into(),
            cursor: None,
            progress: Progress::default(),
        }
    }

    /// Reject requests that must not reach the store
    pub fn validate(&self) -> Result<(), Error> {
        if self.source_table.trim().is_empty() || self.target_table.trim().is_empty() {
            return Err(Error::InvalidRequest(
                "source and target table names must not be empty".to_string(),
            ));
        }

        if self.source_table == self.target_table {
            return Err(Error::InvalidRequest(format!(
                "source and target table are both '{}'",
                self.source_table
            )));
        }

        if self.progress.is_finished() && self.progress.succeeded {
            return Err(Error::InvalidRequest(
                "migration has already completed".to_string(),
            ));
        }

        Ok(())
    }
}

/// Items read in one scan call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Items in scan order, possibly empty
    pub items: Vec<Item>,
    /// Resume point for the next page, `None` once the source is exhausted
    pub next_cursor: Option<Cursor>,
}

impl Page {
    /// True when no further page exists
    pub fn is_last(&self) -> bool {
        self.next_cursor.is_none()
    }
}

/// Items a bulk write did not apply, grouped by table
#[must_use = "rejected items must be retried or reported"]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RejectedBatch {
    tables: HashMap<String, Vec<Item>>,
}

impl RejectedBatch {
    /// An empty batch, meaning full success
    pub fn new() -> Self {
        Self::default()
    }

    /// Add rejected items for `table`
    pub fn extend(&mut self, table: impl Into<String>, items: impl IntoIterator<Item = Item>) {
        let entry = self.tables.entry(table.into()).or_default();
        entry.extend(items);
    }

    /// True when nothing is left to retry
    pub fn is_empty(&self) -> bool {
        self.tables.values().all(Vec::is_empty)
    }

    /// Total number of rejected items
    pub fn len(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Rejected items for one table
    pub fn items(&self, table: &str) -> &[Item] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every rejected item, regardless of table
    pub fn into_items(self) -> Vec<Item> {
        self.tables.into_values().flatten().collect()
    }
}

impl IntoIterator for RejectedBatch {
    type Item = (String, Vec<Item>);
    type IntoIter = std::collections::hash_map::IntoIter<String, Vec<Item>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}

impl From<HashMap<String, Vec<Item>>> for RejectedBatch {
    fn from(tables: HashMap<String, Vec<Item>>) -> Self {
        Self { tables }
    }
}

/// Failure details reported alongside a failed request
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureReport {
    /// Error classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// Items never applied to the target, in DynamoDB JSON
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unresolved_items: Vec<Value>,
}

impl From<&Error> for FailureReport {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            unresolved_items: error.unresolved_items().iter().map(item_to_json).collect(),
        }
    }
}

/// Invocation output: the request plus continuation flag and failure details
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationResponse {
    /// Request to resume with when `should_continue` is set
    #[serde(flatten)]
    pub request: MigrationRequest,
    /// The caller must re-invoke with `request` unchanged
    pub should_continue: bool,
    /// The continuation was passed on to another invocation, so the caller
    /// must not resume it
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub handed_off: bool,
    /// Present only for failed migrations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<FailureReport>,
}

/// Render an item in DynamoDB JSON for operator inspection
pub fn item_to_json(item: &Item) -> Value {
    let fields: Map<String, Value> = item
        .iter()
        .map(|(name, value)| (name.clone(), attribute_to_json(value)))
        .collect();
    Value::Object(fields)
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::S(s) => json!({ "S": s }),
        AttributeValue::N(n) => json!({ "N": n }),
        AttributeValue::B(b) => {
            let bytes: &[u8] = b.as_ref();
            json!({ "B": bytes })
        }
        AttributeValue::Bool(b) => json!({ "BOOL": b }),
        AttributeValue::Null(b) => json!({ "NULL": b }),
        AttributeValue::Ss(values) => json!({ "SS": values }),
        AttributeValue::Ns(values) => json!({ "NS": values }),
        AttributeValue::Bs(values) => {
            let values: Vec<&[u8]> = values.iter().map(|b| b.as_ref()).collect();
            json!({ "BS": values })
        }
        AttributeValue::L(values) => {
            json!({ "L": values.iter().map(attribute_to_json).collect::<Vec<_>>() })
        }
        AttributeValue::M(fields) => {
            let fields: Map<String, Value> = fields
                .iter()
                .map(|(name, value)| (name.clone(), attribute_to_json(value)))
                .collect();
            json!({ "M": fields })
        }
        other => json!({ "UNKNOWN": format!("{other:?}") }),
    }
}
