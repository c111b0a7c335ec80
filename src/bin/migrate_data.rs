use dynamo_migrate::continuation::LambdaSelfInvoke;
use dynamo_migrate::migration::{MigrationRequest, MigrationResponse, Migrator, WallClockDeadline};
use dynamo_migrate::{ContinuationMode, DynamoStore, MigrationConfig};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use tracing_subscriber::EnvFilter;

struct Host {
    config: MigrationConfig,
    store: DynamoStore,
    lambda_client: aws_sdk_lambda::Client,
}

async fn handle_request(
    host: &Host,
    event: LambdaEvent<MigrationRequest>,
) -> Result<MigrationResponse, Error> {
    let (request, context) = event.into_parts();
    let budget = WallClockDeadline::from_epoch_millis(context.deadline);
    let migrator = Migrator::new(&host.store, host.config.options());

    let handoff = match host.config.continuation {
        ContinuationMode::Return => None,
        ContinuationMode::SelfInvoke => Some(LambdaSelfInvoke::new(
            host.lambda_client.clone(),
            context.invoked_function_arn,
        )),
    };

    let response = dynamo_migrate::handle_invocation(&migrator, request, &budget, &handoff).await?;
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_current_span(false)
        .without_time()
        .init();

    let config = MigrationConfig::from_env()?;
    let sdk_config = dynamo_migrate::aws_config_defaults().await;

    let dynamodb = dynamo_migrate::dynamodb_client_for(&sdk_config, config.endpoint_url.as_deref());
    dynamo_migrate::init_with_client(dynamodb).await;

    let host = Host {
        store: DynamoStore::from_global().await,
        lambda_client: aws_sdk_lambda::Client::new(&sdk_config),
        config,
    };
    let host = &host;

    lambda_runtime::run(service_fn(move |event: LambdaEvent<MigrationRequest>| async move {
        handle_request(host, event).await
    }))
    .await
}
