use parking_lot::Mutex;
use serde::Serialize;
use serde_dynamo::to_item;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::ops::Bound;

use crate::Error;
use crate::migration::{Cursor, KeyAttribute, RejectedBatch};
use crate::store::{Item, ScanPage, TableStore};

/// Primary key attribute names of a table
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeySchema {
    /// Partition (hash) key attribute
    pub partition_key: String,
    /// Optional sort (range) key attribute
    pub sort_key: Option<String>,
}

impl KeySchema {
    /// Schema with only a partition key
    pub fn partition(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: None,
        }
    }

    /// Schema with partition and sort key
    pub fn composite(partition_key: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            sort_key: Some(sort_key.into()),
        }
    }

    fn key_of(&self, item: &Item) -> Result<Cursor, Error> {
        let mut names = vec![self.partition_key.as_str()];
        names.extend(self.sort_key.as_deref());

        names
            .into_iter()
            .map(|name| -> Result<(String, KeyAttribute), Error> {
                let value = item.get(name).cloned().ok_or_else(|| {
                    Error::Store(format!("item is missing key attribute '{name}'"))
                })?;
                Ok((name.to_string(), KeyAttribute::try_from(value)?))
            })
            .collect()
    }
}

#[derive(Debug)]
struct Table {
    schema: KeySchema,
    items: BTreeMap<Cursor, Item>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    rejections: VecDeque<usize>,
    scan_failures: HashMap<usize, String>,
    write_failures: HashMap<usize, String>,
    scan_calls: usize,
    write_calls: usize,
}

/// In-process [`TableStore`] for tests and local dry runs
///
/// Tables are ordered by primary key, so scans are deterministic. Bulk
/// writes can be made to reject part of their input, and individual scan or
/// write calls can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Empty store without tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) an empty table
    pub fn create_table(&self, table: impl Into<String>, schema: KeySchema) {
        let _ = self.state.lock().tables.insert(
            table.into(),
            Table {
                schema,
                items: BTreeMap::new(),
            },
        );
    }

    /// Upsert raw items without going through the call counters
    pub fn insert(&self, table: &str, items: impl IntoIterator<Item = Item>) -> Result<(), Error> {
        let mut state = self.state.lock();
        let table = table_mut(&mut state, table)?;

        for item in items {
            let key = table.schema.key_of(&item)?;
            let _ = table.items.insert(key, item);
        }

        Ok(())
    }

    /// Serialize typed values with `serde_dynamo` and upsert them
    pub fn seed<T: Serialize>(
        &self,
        table: &str,
        values: impl IntoIterator<Item = T>,
    ) -> Result<(), Error> {
        let items = values
            .into_iter()
            .map(|value| to_item::<_, Item>(value).map_err(Error::from))
            .collect::<Result<Vec<_>, Error>>()?;

        self.insert(table, items)
    }

    /// Snapshot of a table in key order
    pub fn items(&self, table: &str) -> Vec<Item> {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|table| table.items.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of items in a table
    pub fn len(&self, table: &str) -> usize {
        self.state
            .lock()
            .tables
            .get(table)
            .map(|table| table.items.len())
            .unwrap_or_default()
    }

    /// Queue partial rejections: the n-th upcoming bulk write leaves
    /// `rounds[n]` of its items unprocessed
    pub fn reject_next_writes(&self, rounds: impl IntoIterator<Item = usize>) {
        self.state.lock().rejections.extend(rounds);
    }

    /// Make the scan call with this zero-based index fail
    pub fn fail_scan_call(&self, call: usize, message: impl Into<String>) {
        let _ = self.state.lock().scan_failures.insert(call, message.into());
    }

    /// Make the bulk write call with this zero-based index fail
    pub fn fail_write_call(&self, call: usize, message: impl Into<String>) {
        let _ = self.state.lock().write_failures.insert(call, message.into());
    }

    /// Scan calls made so far
    pub fn scan_calls(&self) -> usize {
        self.state.lock().scan_calls
    }

    /// Bulk write calls made so far
    pub fn write_calls(&self) -> usize {
        self.state.lock().write_calls
    }
}

fn table_mut<'a>(state: &'a mut State, table: &str) -> Result<&'a mut Table, Error> {
    state
        .tables
        .get_mut(table)
        .ok_or_else(|| Error::Store(format!("table '{table}' does not exist")))
}

impl TableStore for MemoryStore {
    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<&Cursor>,
        limit: usize,
        _consistent_read: bool,
    ) -> Result<ScanPage, Error> {
        let mut state = self.state.lock();
        let call = state.scan_calls;
        state.scan_calls += 1;

        if let Some(message) = state.scan_failures.remove(&call) {
            return Err(Error::Store(message));
        }

        let table = table_mut(&mut state, table)?;
        let lower = exclusive_start_key.map_or(Bound::Unbounded, Bound::Excluded);

        let items: Vec<Item> = table
            .items
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();

        // Like DynamoDB, a full page always carries a resume key, even when
        // nothing follows it.
        let last_evaluated_key = if limit > 0 && items.len() == limit {
            items
                .last()
                .map(|item| table.schema.key_of(item))
                .transpose()?
        } else {
            None
        };

        Ok(ScanPage {
            items,
            last_evaluated_key,
        })
    }

    async fn bulk_write(&self, table: &str, mut items: Vec<Item>) -> Result<RejectedBatch, Error> {
        let mut state = self.state.lock();
        let call = state.write_calls;
        state.write_calls += 1;

        if let Some(message) = state.write_failures.remove(&call) {
            return Err(Error::Store(message));
        }

        let rejected_count = state.rejections.pop_front().unwrap_or(0).min(items.len());
        let rejected_items = items.split_off(items.len() - rejected_count);

        let target = table_mut(&mut state, table)?;
        for item in items {
            let key = target.schema.key_of(&item)?;
            let _ = target.items.insert(key, item);
        }

        let mut rejected = RejectedBatch::new();
        if !rejected_items.is_empty() {
            rejected.extend(table, rejected_items);
        }

        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;

    fn item(id: &str, value: &str) -> Item {
        let mut item = HashMap::new();
        let _ = item.insert("id".to_string(), AttributeValue::S(id.to_string()));
        let _ = item.insert("value".to_string(), AttributeValue::S(value.to_string()));
        item
    }

    fn store_with(ids: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("source", KeySchema::partition("id"));
        store
            .insert("source", ids.iter().map(|id| item(id, "v")))
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_scan_pages_in_key_order() {
        let store = store_with(&["c", "a", "b"]);

        let first = store.scan("source", None, 2, true).await.unwrap();
        assert_eq!(first.items, vec![item("a", "v"), item("b", "v")]);
        let cursor = first.last_evaluated_key.unwrap();
        assert_eq!(cursor.get("id"), Some(&KeyAttribute::S("b".to_string())));

        let second = store.scan("source", Some(&cursor), 2, true).await.unwrap();
        assert_eq!(second.items, vec![item("c", "v")]);
        assert!(second.last_evaluated_key.is_none());
        assert_eq!(store.scan_calls(), 2);
    }

    #[tokio::test]
    async fn test_full_last_page_still_returns_key() {
        let store = store_with(&["a", "b"]);

        let page = store.scan("source", None, 2, true).await.unwrap();
        let cursor = page.last_evaluated_key.unwrap();

        let empty = store.scan("source", Some(&cursor), 2, true).await.unwrap();
        assert!(empty.items.is_empty());
        assert!(empty.last_evaluated_key.is_none());
    }

    #[tokio::test]
    async fn test_bulk_write_upserts_by_key() {
        let store = store_with(&[]);

        let rejected = store
            .bulk_write("source", vec![item("a", "1"), item("b", "1")])
            .await
            .unwrap();
        assert!(rejected.is_empty());

        let rejected = store
            .bulk_write("source", vec![item("a", "2")])
            .await
            .unwrap();
        assert!(rejected.is_empty());

        assert_eq!(store.items("source"), vec![item("a", "2"), item("b", "1")]);
        assert_eq!(store.write_calls(), 2);
    }

    #[tokio::test]
    async fn test_queued_rejections_leave_tail_unapplied() {
        let store = store_with(&[]);
        store.reject_next_writes([1]);

        let rejected = store
            .bulk_write("source", vec![item("a", "1"), item("b", "1")])
            .await
            .unwrap();

        assert_eq!(rejected.items("source"), &[item("b", "1")]);
        assert_eq!(store.len("source"), 1);
    }

    #[tokio::test]
    async fn test_injected_failures_fire_once() {
        let store = store_with(&["a"]);
        store.fail_scan_call(0, "throttled");
        store.fail_write_call(0, "unavailable");

        assert!(store.scan("source", None, 25, true).await.is_err());
        assert!(store.scan("source", None, 25, true).await.is_ok());
        assert!(store.bulk_write("source", vec![item("b", "1")]).await.is_err());
        assert!(store.bulk_write("source", vec![item("b", "1")]).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_key_attribute_is_rejected() {
        let store = store_with(&[]);
        let mut keyless = HashMap::new();
        let _ = keyless.insert("value".to_string(), AttributeValue::S("x".to_string()));

        assert!(store.insert("source", [keyless]).is_err());
        assert!(store.scan("missing", None, 25, true).await.is_err());
    }
}
