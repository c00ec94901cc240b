use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use riskdesk_core::error::PipelineError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("missing x-user-id header")]
    Unauthenticated,

    /// 503 - a backing service is not configured in this deployment.
    #[error("{0} unavailable")]
    Unavailable(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Pipeline(PipelineError::invalid(msg))
    }

    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            Self::Pipeline(err) => {
                let status = match err {
                    PipelineError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    PipelineError::NotFound(_) => StatusCode::NOT_FOUND,
                    PipelineError::DataUnavailable { .. } => StatusCode::BAD_GATEWAY,
                    PipelineError::ReportWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
                };
                // Upstream and storage causes stay in the logs.
                let message = match err {
                    PipelineError::InvalidRequest(msg) => msg.clone(),
                    PipelineError::NotFound(name) => format!("{name} not found"),
                    PipelineError::DataUnavailable { symbol, .. } => {
                        format!("market data unavailable for {symbol}")
                    }
                    PipelineError::ReportWriteFailed { .. } => "failed to generate report".to_string(),
                };
                (status, err.kind(), message)
            }
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                self.to_string(),
            ),
            Self::Unavailable(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "unavailable",
                self.to_string(),
            ),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error".to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = self.parts();

        if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            let err = match self {
                Self::Internal(err) => err,
                other => anyhow::Error::new(other),
            };
            sentry_anyhow::capture_anyhow(&err);
            tracing::error!(%status, error = %format!("{err:#}"), "request failed");
        } else {
            tracing::debug!(%status, error, %message, "request rejected");
        }

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
