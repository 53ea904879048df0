//! API error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::pipeline::{AnalysisError, IngestionError};
use crate::session::SessionError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Verbatim model output, for malformed answers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("API configuration error")]
    NotConfigured,
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<IngestionError> for ApiError {
    fn from(err: IngestionError) -> Self {
        ApiError::Analysis(AnalysisError::Ingestion(err))
    }
}

impl ApiError {
    /// Status, code and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            ApiError::NotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONFIG_ERROR",
                self.to_string(),
            ),
            ApiError::Analysis(err) => {
                let status = match err {
                    AnalysisError::Ingestion(
                        IngestionError::TooLarge { .. } | IngestionError::DimensionsTooLarge { .. },
                    ) => StatusCode::PAYLOAD_TOO_LARGE,
                    AnalysisError::Ingestion(
                        IngestionError::UnsupportedType(_) | IngestionError::UnrecognizedContent,
                    ) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    AnalysisError::Ingestion(_) => StatusCode::BAD_REQUEST,
                    AnalysisError::Service(_)
                    | AnalysisError::EmptyResponse
                    | AnalysisError::MalformedResponse { .. } => StatusCode::BAD_GATEWAY,
                    AnalysisError::Unexpected(detail) => {
                        tracing::error!(detail, "Unexpected analysis failure");
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            err.code(),
                            "An internal error occurred".to_string(),
                        );
                    }
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Session(SessionError::AnalysisInProgress) => (
                StatusCode::CONFLICT,
                "ANALYSIS_IN_PROGRESS",
                self.to_string(),
            ),
            ApiError::Session(SessionError::NoImage) => {
                (StatusCode::BAD_REQUEST, "NO_IMAGE", self.to_string())
            }
            ApiError::Session(SessionError::LockPoisoned) => {
                tracing::error!("Session store lock poisoned");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone())
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.parts().0
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let raw = match &self {
            ApiError::Analysis(err) => err.raw_output().map(str::to_string),
            _ => None,
        };
        let body = ErrorBody {
            error: ErrorDetail { code, message, raw },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ServiceError;
    use axum::body::to_bytes;

    async fn json_of(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn not_configured_returns_503() {
        let (status, json) = json_of(ApiError::NotConfigured).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"]["code"], "CONFIG_ERROR");
        assert_eq!(json["error"]["message"], "API configuration error");
    }

    #[tokio::test]
    async fn ingestion_statuses() {
        assert_eq!(
            ApiError::from(IngestionError::TooLarge { max: 1 }).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(IngestionError::DimensionsTooLarge {
                width: 20_000,
                height: 20_000
            })
            .status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from(IngestionError::UnsupportedType("image/gif".into())).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        let (status, json) = json_of(IngestionError::Decode("eof".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"], "INGESTION_ERROR");
    }

    #[tokio::test]
    async fn malformed_response_carries_raw_text() {
        let err = AnalysisError::MalformedResponse {
            reason: "invalid JSON".into(),
            raw: "{\"presence\": \"yes\",".into(),
        };
        let (status, json) = json_of(err.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "MALFORMED_RESPONSE");
        assert_eq!(json["error"]["raw"], "{\"presence\": \"yes\",");
    }

    #[tokio::test]
    async fn raw_omitted_for_other_errors() {
        let (status, json) = json_of(AnalysisError::EmptyResponse.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["message"], "No response received");
        assert!(json["error"].get("raw").is_none());
    }

    #[tokio::test]
    async fn service_error_returns_502() {
        let (status, json) = json_of(AnalysisError::Service(ServiceError::Timeout).into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"]["code"], "SERVICE_ERROR");
    }

    #[tokio::test]
    async fn in_progress_returns_409() {
        let (status, json) = json_of(SessionError::AnalysisInProgress.into()).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"], "ANALYSIS_IN_PROGRESS");
    }

    #[tokio::test]
    async fn unexpected_hides_details() {
        let (status, json) =
            json_of(AnalysisError::Unexpected("worker panicked".into()).into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "UNEXPECTED");
        assert_eq!(json["error"]["message"], "An internal error occurred");
    }
}
