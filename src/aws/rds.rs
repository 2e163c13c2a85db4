//! RDS Data API implementation of [`QueryExecutor`].

use crate::config::RdsConfig;
use crate::services::{QueryExecutor, ServiceError};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_rdsdata::{Client, error::DisplayErrorContext, types::RecordsFormatType};
use serde_json::{Value, json};

/// Executes statements against an Aurora cluster through the Data API.
pub struct RdsQueryExecutor {
    client: Client,
    settings: RdsConfig,
}

impl RdsQueryExecutor {
    /// Build a client from shared SDK configuration and cluster coordinates.
    pub fn new(sdk: &SdkConfig, settings: RdsConfig) -> Self {
        Self {
            client: Client::new(sdk),
            settings,
        }
    }
}

#[async_trait]
impl QueryExecutor for RdsQueryExecutor {
    async fn execute(&self, sql: &str) -> Result<Value, ServiceError> {
        let output = self
            .client
            .execute_statement()
            .resource_arn(&self.settings.resource_arn)
            .secret_arn(&self.settings.secret_arn)
            .database(&self.settings.database_name)
            .sql(sql)
            .format_records_as(RecordsFormatType::Json)
            .send()
            .await
            .map_err(|error| ServiceError::Query(DisplayErrorContext(&error).to_string()))?;

        tracing::info!(
            database = %self.settings.database_name,
            records_updated = output.number_of_records_updated(),
            "Statement executed"
        );

        match output.formatted_records() {
            Some(records) => serde_json::from_str(records)
                .map_err(|error| ServiceError::Query(format!("malformed records: {error}"))),
            None => Ok(json!({
                "records_updated": output.number_of_records_updated(),
            })),
        }
    }
}
