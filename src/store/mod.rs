//! Storage collaborators consumed by the migration engine.
//!
//! The engine only needs two operations from a key-value store: a paged,
//! consistent `scan` and a `bulk_write` that may reject part of its input.
//! [`DynamoStore`] talks to DynamoDB; [`MemoryStore`] keeps tables in process
//! and can inject throttling and faults.

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::{KeySchema, MemoryStore};

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use std::future::Future;

use crate::Error;
use crate::migration::{Cursor, RejectedBatch};

/// One record, as a DynamoDB attribute map
pub type Item = HashMap<String, AttributeValue>;

/// Raw result of one scan call
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScanPage {
    /// Items in scan order
    pub items: Vec<Item>,
    /// Where the next scan resumes, `None` once the table is exhausted
    pub last_evaluated_key: Option<Cursor>,
}

/// Key-value store operations used by the pager and writer
pub trait TableStore: Send + Sync {
    /// Read up to `limit` items after `exclusive_start_key`
    fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<&Cursor>,
        limit: usize,
        consistent_read: bool,
    ) -> impl Future<Output = Result<ScanPage, Error>> + Send;

    /// Put every item, returning the ones the store did not apply
    fn bulk_write(
        &self,
        table: &str,
        items: Vec<Item>,
    ) -> impl Future<Output = Result<RejectedBatch, Error>> + Send;
}

