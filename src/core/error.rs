use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// # Example
///
/// ```no_run
/// use meemee::core::error::AppError;
///
/// fn handle_error(err: AppError) {
///     log::error!("Error: {}", err);
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("Database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV export and import errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Generation or payment backend rejected a request
    #[error("Backend error: {0}")]
    Backend(String),

    /// Quota deduction would make the balance negative
    #[error("Insufficient quota for user {0}")]
    InsufficientQuota(i64),

    /// Requested record does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Backend(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Backend(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_converts_to_backend_error() {
        let err: AppError = "gateway timeout".into();
        assert!(matches!(err, AppError::Backend(ref m) if m == "gateway timeout"));
        assert_eq!(err.to_string(), "Backend error: gateway timeout");
    }

    #[test]
    fn test_insufficient_quota_display() {
        assert_eq!(
            AppError::InsufficientQuota(42).to_string(),
            "Insufficient quota for user 42"
        );
    }
}
