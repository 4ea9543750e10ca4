//! Service error types

use forecast_engine::ForecastError;
use serde::Serialize;
use thiserror::Error;

/// Error type for every service operation
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Download error: {message}")]
    Download {
        /// HTTP status of the failed response, when one was received
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Forecasting error: {0}")]
    Forecasting(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(field: &str, reason: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub fn download(status: Option<u16>, message: impl Into<String>) -> Self {
        ServiceError::Download {
            status,
            message: message.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Validation { .. } => "VALIDATION_ERROR",
            ServiceError::Download { .. } => "DOWNLOAD_ERROR",
            ServiceError::MalformedInput(_) => "MALFORMED_INPUT",
            ServiceError::Forecasting(_) => "FORECASTING_ERROR",
            ServiceError::Generation(_) => "GENERATION_ERROR",
            ServiceError::Timeout(_) => "TIMEOUT",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Config(_) => "CONFIG_ERROR",
            ServiceError::Io(_) => "IO_ERROR",
            ServiceError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the caller can fix the failure by changing the request
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            ServiceError::Validation { .. }
                | ServiceError::MalformedInput(_)
                | ServiceError::NotFound(_)
        )
    }
}

impl From<ForecastError> for ServiceError {
    fn from(err: ForecastError) -> Self {
        match err {
            ForecastError::ValidationError(reason) => ServiceError::validation("request", reason),
            ForecastError::InvalidParameter { field, reason } => {
                ServiceError::Validation { field, reason }
            }
            ForecastError::MalformedInput(_)
            | ForecastError::MissingColumn(_)
            | ForecastError::CsvError(_) => ServiceError::MalformedInput(err.to_string()),
            ForecastError::ForecastingError(msg) => ServiceError::Forecasting(msg),
            ForecastError::InvariantViolation(_) | ForecastError::RenderError(_) => {
                ServiceError::Internal(err.to_string())
            }
            ForecastError::IoError(e) => ServiceError::Io(e),
        }
    }
}

/// Serializable error body for callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&ServiceError> for ErrorResponse {
    fn from(err: &ServiceError) -> Self {
        let field = match err {
            ServiceError::Validation { field, .. } => Some(field.clone()),
            _ => None,
        };
        ErrorResponse {
            code: err.code().to_string(),
            message: err.to_string(),
            field,
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_carries_field() {
        let err = ServiceError::validation("horizon", "must be positive");
        let response = ErrorResponse::from(&err);
        assert_eq!(response.code, "VALIDATION_ERROR");
        assert_eq!(response.field.as_deref(), Some("horizon"));
        assert_eq!(response.message, "Validation error: horizon: must be positive");
    }

    #[test]
    fn test_fault_classes() {
        assert!(!ServiceError::download(Some(404), "missing").is_client_fault());
        assert!(!ServiceError::download(None, "connection reset").is_client_fault());
        assert!(ServiceError::validation("horizon", "x").is_client_fault());
        assert!(ServiceError::NotFound("x".to_string()).is_client_fault());
        assert!(!ServiceError::Timeout("x".to_string()).is_client_fault());
        assert!(!ServiceError::Forecasting("x".to_string()).is_client_fault());
    }

    #[test]
    fn test_engine_errors_map_to_service_classes() {
        let err: ServiceError = ForecastError::MissingColumn("sales".to_string()).into();
        assert!(matches!(err, ServiceError::MalformedInput(_)));

        let err: ServiceError = ForecastError::ForecastingError("singular".to_string()).into();
        assert!(matches!(err, ServiceError::Forecasting(ref m) if m == "singular"));

        let err: ServiceError = ForecastError::invalid_parameter("horizon", "too small").into();
        assert!(matches!(err, ServiceError::Validation { ref field, .. } if field == "horizon"));
    }
}
