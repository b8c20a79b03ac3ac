use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Structural problems with an upload. Any of these is fatal to that upload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please upload a CSV file (.csv); '{file_name}' is not a CSV file")]
    WrongFileType { file_name: String },

    #[error("File size of {size} bytes exceeds the limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },

    #[error("CSV data is empty: no data rows found after the header")]
    EmptyFile,

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("No data uploaded")]
    NoDataset,

    #[error("File processing error: {0}")]
    FileProcessingError(String),

    #[error("Download error: {0}")]
    DownloadError(String),

    #[error("DataFrame error: {0}")]
    DataFrameError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<polars::prelude::PolarsError> for AppError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        AppError::DataFrameError(err.to_string())
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::FileProcessingError(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(ValidationError::WrongFileType { .. }) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Validation(ValidationError::FileTooLarge { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            AppError::Validation(ValidationError::EmptyFile) => StatusCode::BAD_REQUEST,
            AppError::Validation(ValidationError::MissingColumns(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NoDataset => StatusCode::NOT_FOUND,
            AppError::FileProcessingError(_) => StatusCode::BAD_REQUEST,
            AppError::DownloadError(_) => StatusCode::BAD_GATEWAY,
            AppError::DataFrameError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}
