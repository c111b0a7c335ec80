use aws_sdk_dynamodb::error::BuildError;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemError;
use aws_sdk_dynamodb::operation::create_table::CreateTableError;
use aws_sdk_dynamodb::operation::scan::ScanError;
use aws_sdk_lambda::operation::invoke::InvokeError;
use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_runtime_api::http::Response;
use ::config::ConfigError;
use serde::{Deserialize, Serialize};
use serde_dynamo::Error as SerdeDynamoError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use std::fmt;

use crate::store::Item;

type DynamoScanError = SdkError<ScanError, Response>;
type DynamoCreateTableError = SdkError<CreateTableError, Response>;
type DynamoBatchWriteItemError = SdkError<BatchWriteItemError, Response>;
type LambdaInvokeError = SdkError<InvokeError, Response>;

/// Migration engine error
#[derive(Debug)]
pub enum Error {
    /// The request was rejected before any I/O
    InvalidRequest(String),
    /// A continuation cursor held something other than key attributes
    InvalidCursor(String),
    /// Reading a page from the source table failed
    SourceRead {
        /// Source table name
        table: String,
        /// Underlying store error
        source: Box<Error>,
    },
    /// The bulk write call itself failed (not a partial rejection)
    Write {
        /// Target table name
        table: String,
        /// Underlying store error
        source: Box<Error>,
    },
    /// Rejected items were still unresolved after every retry round
    RetryExhausted {
        /// Target table name
        table: String,
        /// Retry rounds performed
        attempts: usize,
        /// Items the store never applied
        unresolved: Vec<Item>,
    },
    /// Storage backend failure outside the DynamoDB SDK
    Store(String),
    /// Serde DynamoDB serialization/deserialization error
    SerdeDynamo(SerdeDynamoError),
    /// JSON serialization error
    SerdeJson(SerdeJsonError),
    /// Configuration loading error
    Config(ConfigError),
    /// DynamoDB request builder error
    BuildError(BuildError),
    /// DynamoDB Scan operation error
    DynamoScanError(DynamoScanError),
    /// DynamoDB BatchWriteItem operation error
    DynamoBatchWriteItemError(DynamoBatchWriteItemError),
    /// DynamoDB CreateTable operation error
    DynamoCreateTableError(DynamoCreateTableError),
    /// Lambda Invoke operation error
    LambdaInvokeError(LambdaInvokeError),
}

/// Error classification reported to the invoker of a migration
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Identical or empty table names, finished input, bad configuration
    InvalidRequest,
    /// Page fetch failed
    SourceRead,
    /// Bulk write call failed
    Write,
    /// Partial rejection persisted past the retry budget
    RetryExhausted,
    /// Failure outside a migration run (table setup, continuation hand-off)
    Internal,
}

impl Error {
    /// Classify the error for the invocation output
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRequest(_) | Error::Config(_) => ErrorKind::InvalidRequest,
            Error::InvalidCursor(_) | Error::SourceRead { .. } | Error::DynamoScanError(_) => {
                ErrorKind::SourceRead
            }
            Error::Write { .. } | Error::DynamoBatchWriteItemError(_) => ErrorKind::Write,
            Error::RetryExhausted { .. } => ErrorKind::RetryExhausted,
            Error::Store(_)
            | Error::SerdeDynamo(_)
            | Error::SerdeJson(_)
            | Error::BuildError(_)
            | Error::DynamoCreateTableError(_)
            | Error::LambdaInvokeError(_) => ErrorKind::Internal,
        }
    }

    /// Check if rejected items were left unresolved after all retries
    pub fn is_retry_exhausted(&self) -> bool {
        matches!(self, Error::RetryExhausted { .. })
    }

    /// Check if the request was rejected before any store call
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }

    /// Items the store never applied, empty for every other error
    pub fn unresolved_items(&self) -> &[Item] {
        match self {
            Error::RetryExhausted { unresolved, .. } => unresolved.as_slice(),
            _ => &[],
        }
    }
}

macro_rules! impl_from_error {
    ($name:ident, $variant:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$variant(e)
            }
        }
    };
    ($name:ident) => {
        impl From<$name> for Error {
            fn from(e: $name) -> Self {
                Error::$name(e)
            }
        }
    };
}

impl_from_error!(SerdeDynamoError, SerdeDynamo);
impl_from_error!(SerdeJsonError, SerdeJson);
impl_from_error!(ConfigError, Config);
impl_from_error!(BuildError);
impl_from_error!(DynamoScanError);
impl_from_error!(DynamoCreateTableError);
impl_from_error!(DynamoBatchWriteItemError);
impl_from_error!(LambdaInvokeError);

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidRequest(msg) => write!(f, "invalid migration request: {msg}"),
            Error::InvalidCursor(msg) => write!(f, "invalid continuation cursor: {msg}"),
            Error::SourceRead { table, source } => {
                write!(f, "reading a page from '{table}' failed: {source}")
            }
            Error::Write { table, source } => {
                write!(f, "bulk write to '{table}' failed: {source}")
            }
            Error::RetryExhausted {
                table,
                attempts,
                unresolved,
            } => write!(
                f,
                "{} items still unprocessed by '{table}' after {attempts} retries",
                unresolved.len()
            ),
            Error::Store(msg) => write!(f, "store error: {msg}"),
            Error::SerdeDynamo(e) => write!(f, "DynamoDB serialization error: {e}"),
            Error::SerdeJson(e) => write!(f, "JSON serialization error: {e}"),
            Error::Config(e) => write!(f, "configuration error: {e}"),
            Error::BuildError(e) => write!(f, "DynamoDB request builder error: {e}"),
            Error::DynamoScanError(e) => write!(f, "DynamoDB Scan operation failed: {e}"),
            Error::DynamoBatchWriteItemError(e) => {
                write!(f, "DynamoDB BatchWriteItem operation failed: {e}")
            }
            Error::DynamoCreateTableError(e) => {
                write!(f, "DynamoDB CreateTable operation failed: {e}")
            }
            Error::LambdaInvokeError(e) => write!(f, "Lambda Invoke operation failed: {e}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::SourceRead { source, .. } | Error::Write { source, .. } => Some(&**source),
            Error::SerdeDynamo(e) => Some(e),
            Error::SerdeJson(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::BuildError(e) => Some(e),
            Error::DynamoScanError(e) => Some(e),
            Error::DynamoBatchWriteItemError(e) => Some(e),
            Error::DynamoCreateTableError(e) => Some(e),
            Error::LambdaInvokeError(e) => Some(e),
            _ => None,
        }
    }
}
