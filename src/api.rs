//! HTTP surface for the document pipeline.
//!
//! Every route lives under `/aws`:
//!
//! - `POST /aws/upload-to-default-bucket` – Store a sample object in the default bucket.
//! - `POST /aws/download-from-default-bucket` – Download `{key}` to `{destinationPath}`.
//! - `POST /aws/download-folder-from-s3` – Download every object under `{key}` into
//!   `{destinationFolder}`.
//! - `POST /aws/process-id` – Run the extraction pipeline for `{id}` and return its summary.
//! - `POST /aws/invoke-default-lambda` – Invoke the configured `processData` function.
//! - `POST /aws/query-default-aurora` – Run the configured `rds.default_statement`.
//! - `GET /aws/config` – Return the active configuration with secrets redacted.
//! - `GET /aws/metrics` – Observe pipeline counters.
//!
//! Failures are reported as `{error, kind}` with a status derived from the kind. When
//! `server.legacy_error_responses` is set, every failure is instead HTTP 200 with a generic
//! `{error}` message per route.

use crate::config::Config;
use crate::metrics::MetricsSnapshot;
use crate::pipeline::{BatchRequest, PipelineApi, PipelineError};
use crate::services::{FunctionInvoker, QueryExecutor, ServiceError};
use crate::storage::{
    ObjectStore, StorageError,
    transfer::{download_object, download_prefix},
};
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::path::Path;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const SAMPLE_KEY: &str = "example-file.txt";
const SAMPLE_CONTENT: &str = "This is a sample file content for S3.";

const UPLOAD_FAILED: &str = "Failed to upload file to S3";
const DOWNLOAD_FAILED: &str = "Failed to download file from S3";
const FOLDER_DOWNLOAD_FAILED: &str = "Failed to download folder from S3";
const PROCESS_FAILED: &str = "Failed to process files for identifier";
const INVOKE_FAILED: &str = "Failed to invoke Lambda function";
const QUERY_FAILED: &str = "Failed to query Aurora database";

/// Shared handles injected into every handler.
pub struct AppState {
    /// Validated configuration.
    pub config: Arc<Config>,
    /// Extraction pipeline.
    pub pipeline: Arc<dyn PipelineApi>,
    /// Object store backing the transfer routes.
    pub storage: Arc<dyn ObjectStore>,
    /// Function invoker, absent when no function is configured.
    pub functions: Option<Arc<dyn FunctionInvoker>>,
    /// Query executor, absent when no database is configured.
    pub queries: Option<Arc<dyn QueryExecutor>>,
}

/// Build the HTTP router exposing the `/aws` surface.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/aws/upload-to-default-bucket", post(upload_to_default_bucket))
        .route("/aws/download-from-default-bucket", post(download_from_default_bucket))
        .route("/aws/download-folder-from-s3", post(download_folder))
        .route("/aws/process-id", post(process_id))
        .route("/aws/invoke-default-lambda", post(invoke_default_lambda))
        .route("/aws/query-default-aurora", post(query_default_aurora))
        .route("/aws/config", get(get_config))
        .route("/aws/metrics", get(get_metrics))
        .with_state(state)
}

/// Body returned by routes that only report what happened.
#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

/// Store a fixed sample object in the default bucket.
async fn upload_to_default_bucket(
    State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, AppError> {
    let bucket = &state.config.s3.default_bucket;
    state
        .storage
        .put(bucket, SAMPLE_KEY, SAMPLE_CONTENT.as_bytes().to_vec())
        .await
        .map_err(|error| AppError::storage(&state, UPLOAD_FAILED, error))?;
    Ok(Json(MessageResponse {
        message: format!("File '{SAMPLE_KEY}' uploaded to bucket '{bucket}' successfully"),
    }))
}

/// Request body for `POST /aws/download-from-default-bucket`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadRequest {
    /// Object key in the default bucket.
    key: String,
    /// Local file path to write.
    destination_path: String,
}

/// Download one object to a local path.
async fn download_from_default_bucket(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let bytes = download_object(
        state.storage.as_ref(),
        &state.config.s3.default_bucket,
        &request.key,
        Path::new(&request.destination_path),
    )
    .await
    .map_err(|error| AppError::storage(&state, DOWNLOAD_FAILED, error))?;
    Ok(Json(MessageResponse {
        message: format!(
            "File '{}' downloaded to '{}' successfully ({bytes} bytes)",
            request.key, request.destination_path
        ),
    }))
}

/// Request body for `POST /aws/download-folder-from-s3`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadFolderRequest {
    /// Key prefix naming the remote folder.
    key: String,
    /// Local directory receiving the files.
    destination_folder: String,
}

/// Download every object under a prefix into a local folder.
async fn download_folder(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DownloadFolderRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let files = download_prefix(
        state.storage.as_ref(),
        &state.config.s3.default_bucket,
        &request.key,
        Path::new(&request.destination_folder),
    )
    .await
    .map_err(|error| AppError::storage(&state, FOLDER_DOWNLOAD_FAILED, error))?;
    Ok(Json(MessageResponse {
        message: format!(
            "Folder '{}' downloaded to '{}' successfully ({files} files)",
            request.key, request.destination_folder
        ),
    }))
}

/// Request body for `POST /aws/process-id`.
#[derive(Deserialize)]
struct ProcessRequest {
    /// Identifier whose `<id>/` folder is processed.
    id: String,
}

/// Success response for `POST /aws/process-id`.
#[derive(Serialize)]
struct ProcessResponse {
    message: String,
    summary: String,
}

/// Run the extraction pipeline for one identifier.
async fn process_id(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessResponse>, AppError> {
    let batch = BatchRequest::for_identifier(&request.id)
        .map_err(|error| AppError::pipeline(&state, PROCESS_FAILED, error))?;
    let outcome = state
        .pipeline
        .process(batch)
        .await
        .map_err(|error| AppError::pipeline(&state, PROCESS_FAILED, error))?;
    Ok(Json(ProcessResponse {
        message: format!("Files for '{}' processed successfully", outcome.identifier),
        summary: outcome.summary,
    }))
}

/// Success response for the function and query routes.
#[derive(Serialize)]
struct ResultResponse {
    message: String,
    result: Value,
}

/// Invoke the configured `processData` function with a test payload.
async fn invoke_default_lambda(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResultResponse>, AppError> {
    let fail = |error: ServiceError| AppError::service(&state, INVOKE_FAILED, error);
    let (Some(invoker), Some(lambda)) = (state.functions.as_ref(), state.config.lambda.as_ref())
    else {
        return Err(fail(ServiceError::NotConfigured("lambda")));
    };

    let function_name = &lambda.functions.process_data;
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(|error| fail(ServiceError::Invocation(format!("invalid timestamp: {error}"))))?;
    let payload = json!({ "action": "test-action", "timestamp": timestamp });

    let result = invoker.invoke(function_name, &payload).await.map_err(fail)?;
    Ok(Json(ResultResponse {
        message: format!("Lambda function '{function_name}' invoked successfully"),
        result,
    }))
}

/// Execute the configured default statement; the request body is ignored.
async fn query_default_aurora(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResultResponse>, AppError> {
    let fail = |error: ServiceError| AppError::service(&state, QUERY_FAILED, error);
    let (Some(executor), Some(rds)) = (state.queries.as_ref(), state.config.rds.as_ref()) else {
        return Err(fail(ServiceError::NotConfigured("rds")));
    };

    let result = executor.execute(&rds.default_statement).await.map_err(fail)?;
    Ok(Json(ResultResponse {
        message: "Aurora query executed successfully".into(),
        result,
    }))
}

/// Response body for `GET /aws/config`.
#[derive(Serialize)]
struct ConfigResponse {
    message: &'static str,
    config: Config,
}

/// Return the active configuration with credentials and secret ARNs masked.
async fn get_config(State(state): State<Arc<AppState>>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        message: "AWS Configuration loaded successfully",
        config: state.config.redacted(),
    })
}

/// Return pipeline counters.
async fn get_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsSnapshot> {
    Json(state.pipeline.metrics_snapshot())
}

/// Failure reported by a handler, rendered according to the configured error mode.
struct AppError {
    status: StatusCode,
    kind: &'static str,
    detail: String,
    route_message: &'static str,
    legacy: bool,
}

impl AppError {
    fn pipeline(state: &AppState, route_message: &'static str, error: PipelineError) -> Self {
        let status = match &error {
            PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PipelineError::NotFound { .. } => StatusCode::NOT_FOUND,
            PipelineError::JobTimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            PipelineError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            PipelineError::Storage(_)
            | PipelineError::Job(_)
            | PipelineError::JobFailed { .. }
            | PipelineError::Summarization(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(state, route_message, status, error.kind(), error.to_string())
    }

    fn service(state: &AppState, route_message: &'static str, error: ServiceError) -> Self {
        let status = match &error {
            ServiceError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
            ServiceError::Storage(StorageError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Storage(StorageError::InvalidKey(_)) => StatusCode::BAD_REQUEST,
            ServiceError::Storage(StorageError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Storage(StorageError::Transport(_))
            | ServiceError::Invocation(_)
            | ServiceError::Query(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(state, route_message, status, error.kind(), error.to_string())
    }

    fn storage(state: &AppState, route_message: &'static str, error: StorageError) -> Self {
        Self::service(state, route_message, ServiceError::Storage(error))
    }

    fn new(
        state: &AppState,
        route_message: &'static str,
        status: StatusCode,
        kind: &'static str,
        detail: String,
    ) -> Self {
        tracing::error!(kind, status = status.as_u16(), error = %detail, "{route_message}");
        Self {
            status,
            kind,
            detail,
            route_message,
            legacy: state.config.server.legacy_error_responses,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.legacy {
            return (StatusCode::OK, Json(json!({ "error": self.route_message }))).into_response();
        }
        (
            self.status,
            Json(json!({ "error": self.detail, "kind": self.kind })),
        )
            .into_response()
    }
}
