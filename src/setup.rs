use aws_sdk_dynamodb::operation::create_table::{CreateTableError, CreateTableOutput};
use aws_sdk_dynamodb::types::{
    AttributeDefinition, KeySchemaElement, KeyType, ProvisionedThroughput, ScalarAttributeType,
};

use crate::dynamodb_client;
use crate::error::Error;
use crate::store::KeySchema;

/// Create a table with string key attributes
///
/// Automatically initializes the DynamoDB client with defaults if not already initialized.
/// An existing table with the same name is left as is.
pub async fn table(name: &str, schema: &KeySchema) -> Result<CreateTableOutput, Error> {
    let client = dynamodb_client().await;

    let mut builder = client
        .create_table()
        .table_name(name)
        .key_schema(
            KeySchemaElement::builder()
                .attribute_name(&schema.partition_key)
                .key_type(KeyType::Hash)
                .build()?,
        )
        .attribute_definitions(
            AttributeDefinition::builder()
                .attribute_name(&schema.partition_key)
                .attribute_type(ScalarAttributeType::S)
                .build()?,
        )
        .provisioned_throughput(
            ProvisionedThroughput::builder()
                .read_capacity_units(10)
                .write_capacity_units(10)
                .build()?,
        );

    if let Some(sort_key) = &schema.sort_key {
        builder = builder
            .key_schema(
                KeySchemaElement::builder()
                    .attribute_name(sort_key)
                    .key_type(KeyType::Range)
                    .build()?,
            )
            .attribute_definitions(
                AttributeDefinition::builder()
                    .attribute_name(sort_key)
                    .attribute_type(ScalarAttributeType::S)
                    .build()?,
            );
    }

    // Ignore ResourceInUseException - table already exists
    match builder.send().await {
        Ok(output) => Ok(output),
        Err(e) => {
            if let Some(CreateTableError::ResourceInUseException(_)) = e.as_service_error() {
                return Ok(CreateTableOutput::builder().build());
            }
            Err(e.into())
        }
    }
}
