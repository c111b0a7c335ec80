//! The migration engine.
//!
//! One invocation pages through the source table, bulk-writes each page into
//! the target, re-submits whatever the target left unprocessed, and stops at
//! a page boundary once the time budget runs low. The returned
//! [`MigrationRequest`] is the whole checkpoint: handing it back to
//! [`Migrator::run`] resumes exactly where the previous invocation stopped.
//!
//! ```rust,no_run
//! use dynamo_migrate::migration::{MigrationOptions, MigrationRequest, Migrator, Unbounded};
//! use dynamo_migrate::store::DynamoStore;
//!
//! # async fn example() {
//! let store = DynamoStore::from_global().await;
//! let migrator = Migrator::new(&store, MigrationOptions::default());
//!
//! let outcome = migrator
//!     .run(MigrationRequest::new("orders_v1", "orders_v2"), &Unbounded)
//!     .await;
//! assert!(outcome.is_completed());
//! # }
//! ```

mod budget;
mod controller;
mod pager;
mod retrier;
mod types;
mod writer;

pub use budget::{InstantDeadline, TimeBudget, Unbounded, WallClockDeadline};
pub use controller::{MigrationOptions, Migrator, Outcome};
pub use pager::{MAX_PAGE_SIZE, Pager};
pub use retrier::{RetryConfig, RetryOutcome, Retrier};
pub use types::{
    Cursor, FailureReport, KeyAttribute, MigrationRequest, MigrationResponse, Page, Progress,
    RejectedBatch, item_to_json,
};
pub use writer::Writer;
