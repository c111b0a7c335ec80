//! Hand-off of a continuation to the next invocation.

use aws_sdk_lambda::Client as LambdaClient;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::InvocationType;
use std::future::Future;
use tracing::info;

use crate::Error;
use crate::migration::MigrationRequest;

/// Schedules the invocation that resumes a `Continuing` migration
pub trait Handoff: Send + Sync {
    /// Arrange for `request` to be run again
    ///
    /// Returns `true` when the hand-off now owns the continuation, so the
    /// caller must not resume it as well.
    fn hand_off(&self, request: &MigrationRequest) -> impl Future<Output = Result<bool, Error>> + Send;
}

/// `None` leaves resumption to whoever invoked us; the continuation travels
/// back in the invocation output
impl<H: Handoff> Handoff for Option<H> {
    async fn hand_off(&self, request: &MigrationRequest) -> Result<bool, Error> {
        match self {
            Some(handoff) => handoff.hand_off(request).await,
            None => Ok(false),
        }
    }
}

/// Re-invokes a Lambda function asynchronously with the continuation as its
/// input
#[derive(Clone, Debug)]
pub struct LambdaSelfInvoke {
    client: LambdaClient,
    function_name: String,
}

impl LambdaSelfInvoke {
    /// Hand-off to `function_name`, normally the hosting function itself
    pub fn new(client: LambdaClient, function_name: impl Into<String>) -> Self {
        Self {
            client,
            function_name: function_name.into(),
        }
    }

    /// Function that receives the continuation
    pub fn function_name(&self) -> &str {
        &self.function_name
    }
}

impl Handoff for LambdaSelfInvoke {
    async fn hand_off(&self, request: &MigrationRequest) -> Result<bool, Error> {
        let payload = continuation_payload(request)?;

        let _ = self
            .client
            .invoke()
            .function_name(&self.function_name)
            .invocation_type(InvocationType::Event)
            .payload(Blob::new(payload))
            .send()
            .await?;

        info!(
            function_name = %self.function_name,
            source_table = %request.source_table,
            items_copied = request.progress.items_copied,
            "continuation handed off"
        );

        Ok(true)
    }
}

/// Invocation input that resumes `request`
pub fn continuation_payload(request: &MigrationRequest) -> Result<Vec<u8>, Error> {
    Ok(serde_json::to_vec(request)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::{Cursor, KeyAttribute};
    use serde_json::{Value, json};

    #[test]
    fn test_payload_is_a_valid_invocation_input() {
        let mut request = MigrationRequest::new("orders", "orders_v2");
        request.cursor = Some(
            [
                ("pk".to_string(), KeyAttribute::S("user#7".to_string())),
                ("sk".to_string(), KeyAttribute::N("42".to_string())),
            ]
            .into_iter()
            .collect::<Cursor>(),
        );
        request.progress.record(50);

        let payload = continuation_payload(&request).unwrap();
        let value: Value = serde_json::from_slice(&payload).unwrap();

        assert_eq!(value["sourceTableName"], "orders");
        assert_eq!(value["targetTableName"], "orders_v2");
        assert_eq!(
            value["cursor"],
            json!({ "pk": { "S": "user#7" }, "sk": { "N": "42" } })
        );
        assert_eq!(value["progress"]["itemsCopied"], 50);
        assert!(value["progress"].get("finishedAt").is_none());

        let resumed: MigrationRequest = serde_json::from_slice(&payload).unwrap();
        assert_eq!(resumed, request);
    }

    #[tokio::test]
    async fn test_no_handoff_returns_to_caller() {
        let request = MigrationRequest::new("a", "b");
        let handoff: Option<LambdaSelfInvoke> = None;
        assert!(!handoff.hand_off(&request).await.unwrap());
    }

    #[test]
    fn test_self_invoke_targets_the_given_function() {
        let config = aws_sdk_lambda::Config::builder()
            .behavior_version(aws_sdk_lambda::config::BehaviorVersion::latest())
            .region(aws_sdk_lambda::config::Region::new("us-east-1"))
            .build();
        let arn = "arn:aws:lambda:us-east-1:123456789012:function:migrate-data";

        let handoff = LambdaSelfInvoke::new(LambdaClient::from_conf(config), arn);

        assert_eq!(handoff.function_name(), arn);
    }
}
