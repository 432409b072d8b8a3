use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("missing form field '{0}'")]
    MissingField(&'static str),

    #[error("invalid form field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("could not decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("detector task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::MissingField(_)
            | ServerError::InvalidField { .. }
            | ServerError::Image(_) => StatusCode::BAD_REQUEST,
            ServerError::Multipart(e) => e.status(),
            ServerError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
