use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use curriculum_algo::RecommendError;
use serde::Serialize;

use crate::services::mastery::TrackerError;
use crate::services::recommendation::RecommendServiceError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::server(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }

    /// Server-side failure; `message` is logged, never sent to the client.
    fn server(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: false,
        }
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            tracing::error!(code = %self.code, error = %self.message, "request failed");
            INTERNAL_MESSAGE.to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<TrackerError> for AppError {
    fn from(err: TrackerError) -> Self {
        match &err {
            TrackerError::InvalidSubmission(message) => Self::validation(message.clone()),
            TrackerError::UnmappedCourse { .. } => {
                Self::operational(StatusCode::BAD_REQUEST, "UNMAPPED_COURSE", err.to_string())
            }
            TrackerError::Persistence(_) => {
                Self::server(StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR", err.to_string())
            }
        }
    }
}

impl From<RecommendServiceError> for AppError {
    fn from(err: RecommendServiceError) -> Self {
        let code = match &err {
            RecommendServiceError::Recommend(RecommendError::Data(_)) => "DATA_ERROR",
            RecommendServiceError::Recommend(RecommendError::Model(_)) => "MODEL_ERROR",
            RecommendServiceError::Task(_) => "INTERNAL_ERROR",
        };
        Self::server(StatusCode::INTERNAL_SERVER_ERROR, code, err.to_string())
    }
}

pub fn json_error(
    status: StatusCode,
    code: impl Into<String>,
    message: impl Into<String>,
) -> AppError {
    AppError {
        status,
        code: code.into(),
        message: message.into(),
        is_operational: true,
    }
}
