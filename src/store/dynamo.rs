use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::types::{PutRequest, ReturnConsumedCapacity, Select, WriteRequest};
use tracing::debug;

use crate::Error;
use crate::migration::{Cursor, RejectedBatch};
use crate::store::{Item, ScanPage, TableStore};

/// [`TableStore`] backed by DynamoDB `Scan` and `BatchWriteItem`
#[derive(Clone, Debug)]
pub struct DynamoStore {
    client: Client,
}

impl DynamoStore {
    /// Wrap an existing client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Store over the global client, initializing it with defaults if needed
    pub async fn from_global() -> Self {
        Self::new(crate::dynamodb_client().await.clone())
    }

    /// The underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl TableStore for DynamoStore {
    async fn scan(
        &self,
        table: &str,
        exclusive_start_key: Option<&Cursor>,
        limit: usize,
        consistent_read: bool,
    ) -> Result<ScanPage, Error> {
        let output = self
            .client
            .scan()
            .table_name(table)
            .select(Select::AllAttributes)
            .consistent_read(consistent_read)
            .limit(limit as i32)
            .set_exclusive_start_key(exclusive_start_key.map(Cursor::to_key))
            .send()
            .await?;

        debug!(
            table,
            count = output.count,
            scanned_count = output.scanned_count,
            "scan page received"
        );

        let last_evaluated_key = output
            .last_evaluated_key
            .filter(|key| !key.is_empty())
            .map(Cursor::from_key)
            .transpose()?;

        Ok(ScanPage {
            items: output.items.unwrap_or_default(),
            last_evaluated_key,
        })
    }

    async fn bulk_write(&self, table: &str, items: Vec<Item>) -> Result<RejectedBatch, Error> {
        if items.is_empty() {
            return Ok(RejectedBatch::new());
        }

        let mut write_ops: Vec<WriteRequest> = Vec::with_capacity(items.len());

        for item in items {
            let put_request = PutRequest::builder().set_item(Some(item)).build()?;

            write_ops.push(
                WriteRequest::builder()
                    .set_put_request(Some(put_request))
                    .build(),
            );
        }

        let output = self
            .client
            .batch_write_item()
            .request_items(table, write_ops)
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await?;

        if let Some(capacities) = output.consumed_capacity {
            let units: f64 = capacities.iter().filter_map(|c| c.capacity_units).sum();
            debug!(table, capacity_units = units, "bulk write consumed capacity");
        }

        let mut rejected = RejectedBatch::new();

        if let Some(unprocessed_items) = output.unprocessed_items {
            for (table_name, requests) in unprocessed_items {
                let items = requests
                    .into_iter()
                    .filter_map(|request| request.put_request)
                    .map(|put_request| put_request.item);
                rejected.extend(table_name, items);
            }
        }

        Ok(rejected)
    }
}
