//! HTTP error mapping: client-input faults to 400, computation faults to
//! 500, both with a `{"detail": ...}` body.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use lyrio_ai::PredictError;

pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        if err.is_client_fault() {
            return Self {
                status: StatusCode::BAD_REQUEST,
                detail: "Empty text".to_string(),
            };
        }

        error!(%err, "prediction failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct Detail {
            detail: String,
        }

        (self.status, Json(Detail { detail: self.detail })).into_response()
    }
}
