use tracing::warn;

use crate::Error;
use crate::migration::RejectedBatch;
use crate::migration::pager::MAX_PAGE_SIZE;
use crate::store::{Item, TableStore};

/// Applies one page to the target table as a single bulk put
#[derive(Debug)]
pub struct Writer<'a, S> {
    store: &'a S,
}

impl<'a, S: TableStore> Writer<'a, S> {
    /// Writer over `store`
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Upsert `items` into `table`, returning whatever the store did not apply
    ///
    /// The caller keeps batches within [`MAX_PAGE_SIZE`]; nothing is split
    /// here. Writing the same items twice overwrites them in place.
    pub async fn write_batch(&self, items: Vec<Item>, table: &str) -> Result<RejectedBatch, Error> {
        debug_assert!(
            items.len() <= MAX_PAGE_SIZE,
            "bulk write of {} items exceeds {MAX_PAGE_SIZE}",
            items.len()
        );

        if items.is_empty() {
            return Ok(RejectedBatch::new());
        }

        let submitted = items.len();
        let rejected = self
            .store
            .bulk_write(table, items)
            .await
            .map_err(|source| Error::Write {
                table: table.to_string(),
                source: Box::new(source),
            })?;

        if !rejected.is_empty() {
            warn!(
                table,
                submitted,
                rejected = rejected.len(),
                "bulk write left items unprocessed"
            );
        }

        Ok(rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{KeySchema, MemoryStore};
    use aws_sdk_dynamodb::types::AttributeValue;
    use std::collections::HashMap;

    fn item(id: usize) -> Item {
        let mut item = HashMap::new();
        let _ = item.insert("id".to_string(), AttributeValue::S(format!("{id:03}")));
        item
    }

    fn target() -> MemoryStore {
        let store = MemoryStore::new();
        store.create_table("target", KeySchema::partition("id"));
        store
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_call() {
        let store = target();
        let rejected = Writer::new(&store)
            .write_batch(Vec::new(), "target")
            .await
            .unwrap();

        assert!(rejected.is_empty());
        assert_eq!(store.write_calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_rejection_is_returned() {
        let store = target();
        store.reject_next_writes([3]);

        let items: Vec<Item> = (0..25).map(item).collect();
        let rejected = Writer::new(&store)
            .write_batch(items.clone(), "target")
            .await
            .unwrap();

        assert_eq!(rejected.len(), 3);
        assert_eq!(rejected.items("target"), &items[22..]);
        assert_eq!(store.len("target"), 22);
    }

    #[tokio::test]
    async fn test_rewriting_a_page_is_idempotent() {
        let store = target();
        let writer = Writer::new(&store);
        let items: Vec<Item> = (0..10).map(item).collect();

        assert!(writer.write_batch(items.clone(), "target").await.unwrap().is_empty());
        assert!(writer.write_batch(items, "target").await.unwrap().is_empty());

        assert_eq!(store.len("target"), 10);
    }

    #[tokio::test]
    async fn test_call_failure_becomes_write_error() {
        let store = target();
        store.fail_write_call(0, "service unavailable");

        let err = Writer::new(&store)
            .write_batch(vec![item(1)], "target")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Write { .. }));
        assert_eq!(store.len("target"), 0);
    }
}
