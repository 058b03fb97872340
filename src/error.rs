use thiserror::Error;

/// Crate-wide error type
///
/// Variants fall into three groups: input-format problems with an upload
/// (reported as 400), lookups that fail (404/409), and failures of the
/// remote spreadsheet or the local configuration (reported as 500).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Unsupported file type: {0}. Upload a .csv, .xls or .xlsx file")]
    UnsupportedFile(String),

    #[error("No data rows found in file")]
    EmptyFile,

    #[error("Could not detect booking source from file headers")]
    UnknownSource { headers: Vec<String> },

    #[error("Guest not found: {0}")]
    NotFound(String),

    #[error("Guest already exists: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Spreadsheet API error: {0}")]
    Upstream(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    #[error("XLSX export error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True for errors caused by the caller's input rather than by the server
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::BadRequest(_)
                | AppError::UnsupportedFile(_)
                | AppError::EmptyFile
                | AppError::UnknownSource { .. }
                | AppError::NotFound(_)
                | AppError::Conflict(_)
                | AppError::Csv(_)
                | AppError::Workbook(_)
        )
    }
}

#[cfg(feature = "web")]
mod http {
    use super::AppError;
    use axum::{
        Json,
        http::StatusCode,
        response::{IntoResponse, Response},
    };
    use serde_json::json;

    /// Number of headers echoed back when the source cannot be detected
    const ECHOED_HEADERS: usize = 10;

    impl AppError {
        pub fn status_code(&self) -> StatusCode {
            match self {
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::Conflict(_) => StatusCode::CONFLICT,
                err if err.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AppError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                log::error!("request failed: {}", self);
            }

            let body = match &self {
                AppError::UnknownSource { headers } => json!({
                    "success": false,
                    "error": self.to_string(),
                    "detectedHeaders": headers.iter().take(ECHOED_HEADERS).collect::<Vec<_>>(),
                }),
                _ => json!({
                    "success": false,
                    "error": self.to_string(),
                }),
            };

            (status, Json(body)).into_response()
        }
    }
}
