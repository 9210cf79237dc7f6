use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::scan::ScanError;
use crate::state::LibraryError;
use crate::upload::UploadError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Photo not found")]
    NotFound,

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Malformed upload: {0}")]
    Multipart(#[from] MultipartError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("Background task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Multipart(e) => e.status(),
            AppError::Upload(UploadError::UnsupportedType(_)) => StatusCode::BAD_REQUEST,
            AppError::Upload(UploadError::CloudBackend) => StatusCode::NOT_IMPLEMENTED,
            AppError::Library(_)
            | AppError::Scan(_)
            | AppError::Upload(_)
            | AppError::Join(_)
            | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED {
            tracing::error!(error = %self, "Request failed");
            return (status, "Internal server error").into_response();
        }

        (status, self.to_string()).into_response()
    }
}
