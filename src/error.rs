#[cfg(feature = "web")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// User-facing detail returned when the image URL cannot be fetched or decoded.
pub const INVALID_IMAGE_DETAIL: &str = "URL을 입력해주세요.";

/// User-facing detail returned when no location names survive filtering.
pub const NO_CANDIDATES_DETAIL: &str = "지역을 입력해주세요.";

const INTERNAL_DETAIL: &str = "요청을 처리하는 중 오류가 발생했습니다.";

/// Main error type for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The image URL could not be fetched or the body is not a decodable image
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Every location entry was blank
    #[error("No location candidates")]
    NoCandidates,

    /// Invalid input parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The translation backend failed or returned nothing usable
    #[error("Translation error: {0}")]
    Translation(String),

    /// The scorer failed or returned a malformed score vector
    #[error("Scoring error: {0}")]
    Scoring(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image processing errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Internal server errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Standard error response format
#[derive(Serialize)]
#[derive(Debug)]
pub struct ErrorResponse {
    /// Error code (HTTP status code)
    pub code: u16,
    /// Human-readable detail safe to show to end users
    pub detail: String,
}

impl AppError {
    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidImage(_) | Self::NoCandidates | Self::InvalidInput(_)
        )
    }

    #[cfg(feature = "web")]
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// The message shown to the caller. Server-side causes stay in the log.
    pub fn detail(&self) -> String {
        match self {
            Self::InvalidImage(_) => INVALID_IMAGE_DETAIL.to_string(),
            Self::NoCandidates => NO_CANDIDATES_DETAIL.to_string(),
            Self::InvalidInput(msg) => msg.clone(),
            _ => INTERNAL_DETAIL.to_string(),
        }
    }

    /// Convert the error to a JSON response
    pub fn to_json(&self) -> ErrorResponse {
        #[cfg(feature = "web")]
        let code = self.status_code().as_u16();
        #[cfg(not(feature = "web"))]
        let code = if self.is_client_error() { 400u16 } else { 500u16 };

        ErrorResponse {
            code,
            detail: self.detail(),
        }
    }
}

#[cfg(feature = "web")]
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            log::info!("Rejected request: {}", self);
        } else {
            log::error!("Request failed: {}", self);
        }

        let status = self.status_code();
        let response = self.to_json();

        (status, Json(response)).into_response()
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Task join error: {}", err))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Extension trait for working with Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: std::fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| AppError::Internal(format!("{}: {}", context, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors_use_fixed_details() {
        let err = AppError::InvalidImage("connection refused".to_string());
        assert!(err.is_client_error());
        assert_eq!(err.to_json().code, 400);
        assert_eq!(err.to_json().detail, INVALID_IMAGE_DETAIL);

        let err = AppError::NoCandidates;
        assert_eq!(err.to_json().code, 400);
        assert_eq!(err.to_json().detail, NO_CANDIDATES_DETAIL);
    }

    #[test]
    fn test_server_errors_hide_cause() {
        let err = AppError::Translation("quota exceeded for key abc".to_string());
        assert!(!err.is_client_error());

        let body = err.to_json();
        assert_eq!(body.code, 500);
        assert!(!body.detail.contains("abc"));
    }

    #[test]
    fn test_result_ext_context() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let err = res.context("loading model").unwrap_err();
        assert_eq!(err.to_string(), "Internal server error: loading model: boom");
    }
}
