//! # DynamoDB Table Migration
//!
//! Copies every item from a source DynamoDB table into a target table under a
//! hard per-invocation time budget, with:
//! - Strongly consistent paging in batches of at most 25 items
//! - Idempotent bulk writes (overwrite by primary key)
//! - Exponential backoff for items a bulk write leaves unprocessed
//! - Checkpointing at page boundaries, so a follow-up invocation resumes
//!   exactly where the previous one stopped
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dynamo_migrate::migration::{InstantDeadline, MigrationOptions, MigrationRequest, Migrator};
//! use dynamo_migrate::store::DynamoStore;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     // Initialize the global DynamoDB client
//!     let config = aws_config::defaults(aws_config::BehaviorVersion::latest()).load().await;
//!     dynamo_migrate::init(&config).await;
//!
//!     let store = DynamoStore::from_global().await;
//!     let migrator = Migrator::new(&store, MigrationOptions::default());
//!
//!     // Keep resuming with a fresh 15 minute budget until done
//!     let outcome = migrator
//!         .drive(MigrationRequest::new("Todo-old", "Todo-new"), || {
//!             InstantDeadline::after(Duration::from_secs(900))
//!         })
//!         .await;
//!
//!     println!("{}", serde_json::to_string(&outcome.into_response()).unwrap());
//! }
//! ```
#![deny(
    warnings,
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    unused_allocation,
    unused_comparisons,
    unused_parens,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    deprecated,
    unknown_lints,
    unreachable_code,
    unused_mut
)]

mod error;
pub use error::{Error, ErrorKind};

/// Storage backends
pub mod store;

/// Pager, writer, retrier and checkpoint controller
pub mod migration;

/// Startup configuration
pub mod config;

/// Continuation hand-off between invocations
pub mod continuation;

/// Invocation entry point shared by hosts
pub mod handler;

/// Table setup utilities for testing
pub mod setup;

// Re-export main types for convenience
pub use crate::config::{ContinuationMode, MigrationConfig};
pub use handler::handle_invocation;
pub use migration::{MigrationRequest, MigrationResponse, Migrator, Outcome};
pub use store::{DynamoStore, MemoryStore, TableStore};

// Re-export aws-config types for configuration
pub use aws_config::{BehaviorVersion, Region, SdkConfig, defaults};

use aws_sdk_dynamodb::Client as DynamoDbClient;
use tokio::sync::OnceCell;

/// Global DynamoDB client instance
static GLOBAL_CLIENT: OnceCell<DynamoDbClient> = OnceCell::const_new();

/// Load the AWS config with default sensible settings
///
/// It configures:
/// - Adaptive retry mode with 3 max attempts
/// - Exponential backoff starting at 1 second
/// - Connect timeout: 3 seconds
/// - Read timeout: 20 seconds
/// - Operation timeout: 60 seconds
/// - LocalStack support via AWS_PROFILE=localstack
///
/// The SDK retry covers failed calls. Items a successful `BatchWriteItem`
/// leaves unprocessed are retried by the migration engine itself.
pub async fn aws_config_defaults() -> SdkConfig {
    use aws_types::sdk_config::{RetryConfig, TimeoutConfig};
    use std::time::Duration;

    let timeout_config = TimeoutConfig::builder()
        .connect_timeout(Duration::from_secs(3))
        .read_timeout(Duration::from_secs(20))
        .operation_timeout(Duration::from_secs(60))
        .build();

    let mut loader = defaults(BehaviorVersion::latest())
        .retry_config(
            RetryConfig::adaptive()
                .with_max_attempts(3)
                .with_initial_backoff(Duration::from_secs(1)),
        )
        .timeout_config(timeout_config);

    // Support LocalStack via AWS_PROFILE=localstack
    if std::env::var("AWS_PROFILE").unwrap_or_default() == "localstack" {
        loader = loader.endpoint_url("http://127.0.0.1:4566");
    }

    loader.load().await
}

/// Build a DynamoDB client, optionally pointed at a custom endpoint
///
/// The override only applies to DynamoDB, so other clients built from the
/// same `config` (Lambda, for self-invocation) keep the regular endpoint.
pub fn dynamodb_client_for(config: &SdkConfig, endpoint_url: Option<&str>) -> DynamoDbClient {
    let mut builder = aws_sdk_dynamodb::config::Builder::from(config);
    if let Some(endpoint_url) = endpoint_url {
        builder = builder.endpoint_url(endpoint_url);
    }
    DynamoDbClient::from_conf(builder.build())
}

/// Initialize the global DynamoDB client with a custom AWS config
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() {
///     let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
///         .region(aws_config::Region::new("us-west-2"))
///         .load()
///         .await;
///     dynamo_migrate::init(&config).await;
/// }
/// ```
pub async fn init(config: &SdkConfig) {
    let _ = GLOBAL_CLIENT
        .get_or_init(|| async { DynamoDbClient::new(config) })
        .await;
}

/// Initialize the global DynamoDB client with a custom client instance
///
/// Useful for testing or when you need fine-grained control over client configuration.
pub async fn init_with_client(client: DynamoDbClient) {
    let _ = GLOBAL_CLIENT.get_or_init(|| async { client }).await;
}

/// Get a reference to the global DynamoDB client
///
/// Automatically initializes the client with [`aws_config_defaults`] if not
/// already initialized. For custom configuration, call [`init`] or
/// [`init_with_client`] before using this function.
pub async fn dynamodb_client() -> &'static DynamoDbClient {
    GLOBAL_CLIENT
        .get_or_init(|| async {
            let config = aws_config_defaults().await;
            DynamoDbClient::new(&config)
        })
        .await
}
