use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use margarita_core::{BookingError, ErrorKind, Field};
use serde_json::json;

use crate::credentials::CredentialError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

fn booking_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Network => StatusCode::BAD_GATEWAY,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let technical = self.to_string();
        let (status, msg, code, field) = match &self {
            AppError::Booking(err) => (
                booking_status(err.kind()),
                err.user_message(),
                err.kind().as_str(),
                err.field().map(|f| f.as_str()),
            ),
            AppError::Credentials(err) => (err.status(), err.user_message(), err.code(), None),
            AppError::MalformedBody(_) => {
                let err = BookingError::validation(Field::Body, technical.clone());
                (
                    StatusCode::BAD_REQUEST,
                    err.user_message(),
                    ErrorKind::Validation.as_str(),
                    Some(Field::Body.as_str()),
                )
            }
            AppError::Anyhow(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Por favor hable con el administrador",
                ErrorKind::Storage.as_str(),
                None,
            ),
        };

        // Internal detail stays in the logs.
        let error = if status.is_server_error() {
            tracing::error!(status = status.as_u16(), kind = code, "Request failed: {}", technical);
            code.to_owned()
        } else {
            tracing::debug!(status = status.as_u16(), kind = code, "Request rejected: {}", technical);
            technical
        };

        let body = Json(json!({
            "ok": false,
            "msg": msg,
            "error": error,
            "kind": code,
            "field": field,
        }));

        (status, body).into_response()
    }
}
