//! Adapter error types.
//!
//! All adapter subsystems surface errors through [`AdapterError`].  Tools
//! that have a user-facing failure message (for example "Error fetching
//! events: ...") return it as a normal result instead; these variants are
//! for failures the protocol layer should flag as errors.

use daybook_auth::AuthEngineError;

/// Unified error type for Daybook adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// The requested tool does not exist on this adapter.
    #[error("tool not found: `{tool_name}` on adapter `{adapter_id}`")]
    ToolNotFound {
        adapter_id: String,
        tool_name: String,
    },

    /// No resource or resource template matches the URI.
    #[error("resource not found: `{uri}` on adapter `{adapter_id}`")]
    ResourceNotFound { adapter_id: String, uri: String },

    /// The parameters supplied to a tool are invalid.
    #[error("invalid parameters for tool `{tool_name}`: {reason}")]
    InvalidParams { tool_name: String, reason: String },

    /// A tool invocation failed.
    #[error("execution failed for tool `{tool_name}`: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    /// Credentials could not be loaded, refreshed or obtained.
    #[error("authentication failed for adapter `{adapter_id}`: {source}")]
    AuthFailed {
        adapter_id: String,
        #[source]
        source: AuthEngineError,
    },

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// An operation exceeded its time limit.
    #[error("timeout after {seconds}s: {reason}")]
    Timeout { seconds: u64, reason: String },

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_not_found_display() {
        let err = AdapterError::ToolNotFound {
            adapter_id: "oura".into(),
            tool_name: "nope".into(),
        };
        assert_eq!(err.to_string(), "tool not found: `nope` on adapter `oura`");
    }

    #[test]
    fn auth_failed_wraps_source() {
        let err = AdapterError::AuthFailed {
            adapter_id: "gmail".into(),
            source: AuthEngineError::TokenExpired {
                provider: "google".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "authentication failed for adapter `gmail`: token expired for provider google"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
