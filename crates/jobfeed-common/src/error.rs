//! Error types shared across jobfeed crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised by the shared utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CommonError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Read an optional environment variable, treating empty values as unset.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Read and parse an optional environment variable.
///
/// Returns `Ok(None)` when the variable is unset and a configuration error
/// when it is set but cannot be parsed.
pub fn parse_env_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_var(name) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CommonError::config(format!("{}={:?}: {}", name, raw, e))),
        None => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_parse_env_var_unset() {
        let parsed: Option<u64> = parse_env_var("JOBFEED_TEST_UNSET_VARIABLE").unwrap();
        assert_eq!(parsed, None);
    }

    #[test]
    #[serial]
    fn test_parse_env_var_invalid() {
        std::env::set_var("JOBFEED_TEST_BAD_NUMBER", "twelve");
        let parsed: Result<Option<u64>> = parse_env_var("JOBFEED_TEST_BAD_NUMBER");
        std::env::remove_var("JOBFEED_TEST_BAD_NUMBER");

        let err = parsed.unwrap_err();
        assert!(err.to_string().contains("JOBFEED_TEST_BAD_NUMBER"));
    }

    #[test]
    #[serial]
    fn test_parse_env_var_valid() {
        std::env::set_var("JOBFEED_TEST_GOOD_NUMBER", " 42 ");
        let parsed: Option<u64> = parse_env_var("JOBFEED_TEST_GOOD_NUMBER").unwrap();
        std::env::remove_var("JOBFEED_TEST_GOOD_NUMBER");

        assert_eq!(parsed, Some(42));
    }
}
