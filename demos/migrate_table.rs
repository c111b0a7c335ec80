/// Example: Copy one DynamoDB table into another from a workstation
///
/// Drives the migration in process, giving every invocation a fresh
/// two-minute budget, and prints the final invocation output.
///
/// ```text
/// AWS_PROFILE=localstack cargo run --example migrate_table -- todo_old todo_new
/// ```
use std::time::Duration;

use dynamo_migrate::migration::{InstantDeadline, MigrationOptions};
use dynamo_migrate::{DynamoStore, MigrationRequest, Migrator};

#[tokio::main]
async fn main() -> Result<(), dynamo_migrate::Error> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let mut args = std::env::args().skip(1);
    let source = args.next().unwrap_or_else(|| "todo_old".to_string());
    let target = args.next().unwrap_or_else(|| "todo_new".to_string());

    let sdk_config = dynamo_migrate::aws_config_defaults().await;
    dynamo_migrate::init(&sdk_config).await;
    let store = DynamoStore::from_global().await;

    // Approximate, DynamoDB refreshes it every few hours
    let estimate = store
        .client()
        .describe_table()
        .table_name(&source)
        .send()
        .await
        .ok()
        .and_then(|output| output.table().and_then(|table| table.item_count()));
    println!("Migrating {source} -> {target} (~{} items)", estimate.unwrap_or(0));

    let migrator = Migrator::new(&store, MigrationOptions::default());
    let mut invocations = 0;

    let outcome = migrator
        .drive(MigrationRequest::new(&source, &target), || {
            invocations += 1;
            InstantDeadline::after(Duration::from_secs(120))
        })
        .await;

    println!("Finished after {invocations} invocation(s)");
    println!("{}", serde_json::to_string_pretty(&outcome.into_response())?);

    Ok(())
}
