//! Error handling for earfx
//!
//! Every fallible operation in the crate returns [`EarfxError`]. Errors are
//! raised synchronously to the caller before any state is touched.

use thiserror::Error;

/// Result type alias for earfx operations
pub type Result<T> = std::result::Result<T, EarfxError>;

/// Main error type for earfx operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EarfxError {
    // Signal shape errors
    #[error("Invalid signal shape: {reason}")]
    InvalidShape { reason: String },

    #[error("Signal too short: requested {requested} samples, signal has {available}")]
    SignalTooShort { requested: usize, available: usize },

    // Parameter errors
    #[error("Unknown parameter '{param}' (allowed: {allowed})")]
    UnknownParameter { param: String, allowed: String },

    #[error("Invalid value for '{param}': {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    #[error("Wrong value type for '{param}': expected {expected}, got {actual}")]
    ParameterType {
        param: String,
        expected: &'static str,
        actual: &'static str,
    },

    // Filter design errors
    #[error("Filter design failed: {reason}")]
    FilterDesign { reason: String },

    // Configuration errors
    #[error("Configuration error: {reason}")]
    Config { reason: String },
}

impl EarfxError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EarfxError::InvalidShape { .. } => "INVALID_SHAPE",
            EarfxError::SignalTooShort { .. } => "SIGNAL_TOO_SHORT",
            EarfxError::UnknownParameter { .. } => "UNKNOWN_PARAMETER",
            EarfxError::InvalidParameter { .. } => "INVALID_PARAMETER",
            EarfxError::ParameterType { .. } => "PARAMETER_TYPE",
            EarfxError::FilterDesign { .. } => "FILTER_DESIGN",
            EarfxError::Config { .. } => "CONFIG",
        }
    }

    /// Shorthand for an out-of-domain numeric parameter
    pub(crate) fn invalid(param: &str, value: impl ToString, expected: &str) -> Self {
        EarfxError::InvalidParameter {
            param: param.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        }
    }
}

impl From<serde_json::Error> for EarfxError {
    fn from(err: serde_json::Error) -> Self {
        EarfxError::Config {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = EarfxError::UnknownParameter {
            param: "cutof".to_string(),
            allowed: "\"cutoff\", \"order\"".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");

        let err = EarfxError::FilterDesign {
            reason: "order must be at least 1".to_string(),
        };
        assert_eq!(err.error_code(), "FILTER_DESIGN");
    }

    #[test]
    fn test_error_messages() {
        let err = EarfxError::invalid("pos", f64::NAN, "a finite number");
        assert_eq!(
            err.to_string(),
            "Invalid value for 'pos': NaN (expected a finite number)"
        );

        let err = EarfxError::SignalTooShort {
            requested: 1024,
            available: 10,
        };
        assert!(err.to_string().contains("1024"));
    }

    #[test]
    fn test_json_error_maps_to_config() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: EarfxError = json_err.into();
        assert_eq!(err.error_code(), "CONFIG");
    }
}
