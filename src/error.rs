//! Error types for the pension system

use thiserror::Error;

/// Result type alias using `PensionError`.
pub type Result<T> = std::result::Result<T, PensionError>;

/// Errors that can occur across the engine, currency core, and registry.
#[derive(Debug, Error)]
pub enum PensionError {
    /// Malformed currency amount input.
    #[error("Cannot parse amount: {0}")]
    ParseError(String),

    /// Currency code outside the supported set. Carries a suggestion when a
    /// near-miss (edit distance 1) exists.
    #[error("Unknown currency '{code}'{}", suggestion.as_ref().map(|s| format!(" (did you mean '{}'?)", s)).unwrap_or_default())]
    UnknownCurrency {
        code: String,
        suggestion: Option<String>,
    },

    /// Country code not registered. Carries the registered codes for the
    /// diagnostic message.
    #[error("Unknown country code '{code}', available: {}", available.join(", "))]
    UnknownCountry {
        code: String,
        available: Vec<String>,
    },

    /// Violated Person / SalaryProfile / EconomicFactors invariant.
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    /// A calculator is already registered under this code.
    #[error("Calculator already registered for country code '{0}'")]
    DuplicateRegistration(String),

    /// Transient rate-fetch failure. Always recovered by the fallback chain,
    /// never surfaced to the caller of `convert`.
    #[error("Rate fetch failed: {0}")]
    FetchError(String),

    /// A per-year constant was requested beyond the extrapolation horizon.
    #[error("No constants for year {year}, nearest year present is {nearest}")]
    ConfigError { year: i32, nearest: i32 },
}

impl PensionError {
    /// Process exit code for the CLI: 2 for parse failures, 3 for unknown
    /// country codes, 4 for anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            PensionError::ParseError(_) | PensionError::UnknownCurrency { .. } => 2,
            PensionError::UnknownCountry { .. } => 3,
            _ => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(PensionError::ParseError("x".into()).exit_code(), 2);
        assert_eq!(
            PensionError::UnknownCountry {
                code: "XX".into(),
                available: vec!["CN".into()]
            }
            .exit_code(),
            3
        );
        assert_eq!(
            PensionError::ConfigError { year: 2300, nearest: 2030 }.exit_code(),
            4
        );
    }

    #[test]
    fn test_unknown_currency_message() {
        let err = PensionError::UnknownCurrency {
            code: "USE".into(),
            suggestion: Some("USD".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("USE"));
        assert!(msg.contains("USD"));
    }
}
