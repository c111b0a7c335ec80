/// Test helpers and fixtures for migration integration tests
///
/// This module provides common test utilities, fixtures, and helper functions
/// used across all integration tests.
pub mod fixtures;

pub use dynamo_migrate::setup;
pub use dynamo_migrate::store::{Item, KeySchema, MemoryStore, TableStore};
pub use serde::{Deserialize, Serialize};

// Re-export common fixtures
pub use fixtures::{Todo, todos};

use dynamo_migrate::DynamoStore;
use dynamo_migrate::migration::TimeBudget;
use rusty_ulid::Ulid;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;

/// Ensure DynamoDB client is initialized for tests
static TEST_INIT: OnceCell<()> = OnceCell::const_new();

/// Initialize DynamoDB client for tests (idempotent)
#[allow(dead_code)]
pub async fn init_test_client() {
    TEST_INIT
        .get_or_init(|| async {
            // Trigger auto-initialization
            let _ = dynamo_migrate::dynamodb_client().await;
        })
        .await;
}

/// Unique table name so runs never share data
#[allow(dead_code)]
pub fn unique_table_name(name: &str) -> String {
    format!("{name}_{}", Ulid::generate())
}

/// Create a table keyed by `owner` + `id`. Safe to call multiple times.
#[allow(dead_code)]
pub async fn setup_todo_table(name: &str) -> Result<(), dynamo_migrate::Error> {
    init_test_client().await;
    let _ = setup::table(name, &Todo::key_schema()).await?;
    Ok(())
}

/// In-memory source and target tables, the source holding `todos(count)`
#[allow(dead_code)]
pub fn memory_tables(count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    store.create_table("todo_old", Todo::key_schema());
    store.create_table("todo_new", Todo::key_schema());
    store.seed("todo_old", todos(count)).unwrap();
    store
}

/// Read a whole table through the store, in scan order
#[allow(dead_code)]
pub async fn scan_all<S: TableStore>(store: &S, table: &str) -> Vec<Item> {
    let mut items = Vec::new();
    let mut cursor = None;

    loop {
        let page = store.scan(table, cursor.as_ref(), 25, true).await.unwrap();
        items.extend(page.items);
        match page.last_evaluated_key {
            Some(next) => cursor = Some(next),
            None => return items,
        }
    }
}

/// Allows a fixed number of page reads per invocation, then reports the
/// budget as spent
#[derive(Debug)]
pub struct PageBudget {
    pages: AtomicUsize,
}

impl PageBudget {
    /// Budget for `pages` page reads
    #[allow(dead_code)]
    pub fn pages(pages: usize) -> Self {
        Self {
            pages: AtomicUsize::new(pages),
        }
    }
}

impl TimeBudget for PageBudget {
    fn remaining(&self) -> Duration {
        match self
            .pages
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(_) => Duration::from_secs(900),
            Err(_) => Duration::ZERO,
        }
    }
}

/// Store over the global test client
#[allow(dead_code)]
pub async fn dynamo_store() -> DynamoStore {
    init_test_client().await;
    DynamoStore::from_global().await
}
