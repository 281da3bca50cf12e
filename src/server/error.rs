use crate::config::ConfigurationError;
use crate::pipeline::PipelineError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

const GENERIC_UPSTREAM_MESSAGE: &str = "model request failed";

/// Every failure a route can report; rendered as `{ "error": ..., "debug"?: ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{0}")]
    Input(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<Value>,
}

impl ApiError {
    pub fn input(message: impl Into<String>) -> Self {
        ApiError::Input(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Pipeline(PipelineError::Upstream(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Pipeline(PipelineError::NoImage { .. })
            | ApiError::Pipeline(PipelineError::Validation(_)) => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(self) -> ErrorBody {
        match self {
            ApiError::Pipeline(PipelineError::Upstream(err)) => ErrorBody {
                error: if err.message.trim().is_empty() {
                    GENERIC_UPSTREAM_MESSAGE.to_string()
                } else {
                    err.message
                },
                debug: None,
            },
            ApiError::Pipeline(PipelineError::NoImage { envelope }) => ErrorBody {
                error: "no image found in the model reply".to_string(),
                debug: Some(json!({ "message": envelope })),
            },
            ApiError::Pipeline(PipelineError::Validation(failure)) => ErrorBody {
                error: "could not produce a furnishing list in the expected format".to_string(),
                debug: serde_json::to_value(&*failure).ok(),
            },
            other => ErrorBody {
                error: other.to_string(),
                debug: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::furnish::ValidationIssue;
    use crate::llm::UpstreamError;
    use crate::pipeline::RepairFailure;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ConfigurationError::MissingApiKey).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::input("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::from(PipelineError::Upstream(UpstreamError::new(Some(503), "down"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(PipelineError::NoImage { envelope: Value::Null }).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_upstream_without_message_uses_generic_text() {
        let body = ApiError::from(PipelineError::Upstream(UpstreamError::new(None, " "))).body();
        assert_eq!(body.error, GENERIC_UPSTREAM_MESSAGE);
        assert!(body.debug.is_none());
    }

    #[test]
    fn test_validation_body_carries_diagnostics() {
        let failure = RepairFailure {
            issues: vec![ValidationIssue::root("expected at least 1 item")],
            raw_text: "first".to_string(),
            repaired_text: "[]".to_string(),
        };
        let body = ApiError::from(PipelineError::Validation(Box::new(failure))).body();
        let debug = body.debug.expect("expected debug payload");
        assert_eq!(debug["rawText"], "first");
        assert_eq!(debug["repairedText"], "[]");
        assert_eq!(debug["issues"][0]["message"], "expected at least 1 item");
    }
}
