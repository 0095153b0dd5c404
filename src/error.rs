use thiserror::Error;

/// Input rejected before any request is sent to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("PIN must be exactly 4 digits (got {0})")]
    PinLength(usize),
    #[error("PIN must contain digits only")]
    PinNotNumeric,
    #[error("Image is {size} bytes, the limit is {max} bytes")]
    ImageTooLarge { size: u64, max: u64 },
    #[error("Unsupported image type: {0}")]
    UnsupportedImageType(String),
    #[error("Required count must be at least 1")]
    InvalidRequiredCount,
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("This week's missions are not all complete yet")]
    WeekIncomplete,
    #[error("Badge {0} is not one of the weekly choices")]
    NotAWeeklyChoice(String),
    #[error("Mission {0} is not on today's list")]
    NotInToday(String),
}

/// Typed Application Errors
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("Failed to decode backend response: {0}")]
    Decode(String),
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Not configured: {0}")]
    NotConfigured(&'static str),
}

impl AppError {
    /// Short message suitable for a toast. Validation errors are shown as-is,
    /// everything else collapses to a generic failure.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::NotConfigured(what) => format!("Setup incomplete: {what}"),
            _ => "Something went wrong, please try again.".to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::Decode(err.to_string())
        } else {
            AppError::Network(err.to_string())
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_shown_verbatim() {
        let err = AppError::from(ValidationError::PinLength(3));
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "PIN must be exactly 4 digits (got 3)");
    }

    #[test]
    fn test_remote_errors_get_generic_message() {
        let err = AppError::Backend {
            status: 500,
            message: "boom".to_string(),
        };
        assert_eq!(err.user_message(), "Something went wrong, please try again.");
        assert!(err.to_string().contains("500"));

        let err = AppError::Network("connection refused".to_string());
        assert!(!err.is_validation());
        assert_eq!(err.user_message(), "Something went wrong, please try again.");
    }
}
