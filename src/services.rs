//! Contracts for the auxiliary REST operations: function invocation and relational queries.

use crate::storage::StorageError;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Errors raised by the auxiliary backends.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The backend section is missing from configuration.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    /// The function could not be invoked or reported an error.
    #[error("Function invocation failed: {0}")]
    Invocation(String),
    /// The statement could not be executed or its result decoded.
    #[error("Query failed: {0}")]
    Query(String),
    /// An object transfer failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Invokes serverless functions with a JSON payload.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    /// Invoke `function_name` synchronously and return its decoded response.
    async fn invoke(&self, function_name: &str, payload: &Value) -> Result<Value, ServiceError>;
}

/// Executes SQL statements against the configured database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run `sql` and return the records as JSON.
    async fn execute(&self, sql: &str) -> Result<Value, ServiceError>;
}

impl ServiceError {
    /// Stable tag naming the error kind, suitable for structured payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotConfigured(_) => "not_configured",
            Self::Invocation(_) => "invocation_error",
            Self::Query(_) => "query_error",
            Self::Storage(StorageError::NotFound { .. }) => "not_found",
            Self::Storage(StorageError::InvalidKey(_)) => "invalid_key",
            Self::Storage(StorageError::Transport(_)) => "storage_error",
            Self::Storage(StorageError::Io(_)) => "io_error",
        }
    }
}
