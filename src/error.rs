//! Error types for ethwrap

use thiserror::Error;

/// Underlying cause of a failed chain query
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for account, query and assembly operations
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("{operation} returned no result")]
    NoResult { operation: String },

    #[error("Timeout after {secs}s waiting for {operation}")]
    Timeout { operation: String, secs: u64 },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("ABI error: {0}")]
    Abi(String),
}

impl WalletError {
    /// Wrap a failed chain query, keeping the cause as the error source
    pub fn transport(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        WalletError::Transport {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Check if rerunning the same command could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            WalletError::Transport { .. } | WalletError::Timeout { .. }
        )
    }
}

/// Result type for ethwrap operations
pub type WalletResult<T> = Result<T, WalletError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn transport_error_keeps_operation_and_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = WalletError::transport("eth_getCode", io);

        assert_eq!(err.to_string(), "eth_getCode failed: refused");
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("refused"));
        assert!(err.is_retryable());
    }

    #[test]
    fn only_node_failures_are_retryable() {
        assert!(!WalletError::Config("gas".into()).is_retryable());
        assert!(!WalletError::Validation("negative".into()).is_retryable());

        let empty = WalletError::NoResult {
            operation: "eth_getBlockByNumber".into(),
        };
        assert!(!empty.is_retryable());

        let slow = WalletError::Timeout {
            operation: "eth_gasPrice".into(),
            secs: 5,
        };
        assert!(slow.is_retryable());
    }
}
