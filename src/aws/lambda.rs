//! Lambda implementation of [`FunctionInvoker`].

use crate::services::{FunctionInvoker, ServiceError};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_lambda::{Client, error::DisplayErrorContext, primitives::Blob};
use serde_json::Value;

/// Synchronous (request/response) Lambda invoker.
pub struct LambdaInvoker {
    client: Client,
}

impl LambdaInvoker {
    /// Build a client from shared SDK configuration.
    pub fn new(sdk: &SdkConfig) -> Self {
        Self {
            client: Client::new(sdk),
        }
    }
}

/// Decode a function response; non-JSON bodies come back as a string.
fn decode_payload(bytes: Option<&[u8]>) -> Value {
    match bytes {
        None | Some([]) => Value::Null,
        Some(bytes) => serde_json::from_slice(bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
    }
}

#[async_trait]
impl FunctionInvoker for LambdaInvoker {
    async fn invoke(&self, function_name: &str, payload: &Value) -> Result<Value, ServiceError> {
        let body = serde_json::to_vec(payload)
            .map_err(|error| ServiceError::Invocation(format!("invalid payload: {error}")))?;

        let output = self
            .client
            .invoke()
            .function_name(function_name)
            .payload(Blob::new(body))
            .send()
            .await
            .map_err(|error| {
                ServiceError::Invocation(format!("{function_name}: {}", DisplayErrorContext(&error)))
            })?;

        let response = decode_payload(output.payload().map(|blob| blob.as_ref()));
        if let Some(kind) = output.function_error() {
            return Err(ServiceError::Invocation(format!(
                "{function_name} reported {kind}: {response}"
            )));
        }

        tracing::info!(function = function_name, status = output.status_code(), "Function invoked");
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_json_text_and_empty_payloads() {
        assert_eq!(
            decode_payload(Some(br#"{"ok":true}"#)),
            json!({ "ok": true })
        );
        assert_eq!(decode_payload(Some(b"plain")), json!("plain"));
        assert_eq!(decode_payload(Some(b"")), Value::Null);
        assert_eq!(decode_payload(None), Value::Null);
    }
}
