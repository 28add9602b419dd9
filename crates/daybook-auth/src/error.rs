//! Error types for the auth crate.
//!
//! All credential operations surface errors through [`AuthEngineError`].
//! Each variant carries enough context for callers to decide whether the
//! failure is a configuration problem, a rejected grant, or a transport
//! issue.

/// Unified error type for Daybook credential handling.
#[derive(Debug, thiserror::Error)]
pub enum AuthEngineError {
    /// The access token has expired and no refresh token is available.
    #[error("token expired for provider {provider}")]
    TokenExpired {
        /// The provider whose token expired.
        provider: String,
    },

    /// The authorization code exchange or refresh grant was rejected by the
    /// authorization server.
    #[error("invalid grant: {reason}")]
    InvalidGrant {
        /// HTTP status of the token endpoint response.
        status: u16,
        /// Explanation from the authorization server.
        reason: String,
        /// The raw response body.
        body: String,
    },

    /// An HTTP request to the authorization server failed.
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// A credential file is missing, unreadable, or malformed.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The overall authentication flow failed for a non-specific reason.
    #[error("authentication flow failed: {reason}")]
    FlowFailed {
        /// Details about why the flow failed.
        reason: String,
    },

    /// The local callback server timed out waiting for the redirect.
    #[error("callback timed out after {timeout_secs} seconds")]
    CallbackTimeout {
        /// How many seconds we waited before giving up.
        timeout_secs: u64,
    },

    /// JSON serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error (token files, the callback TCP listener).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing error.
    #[error("url parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, AuthEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_token_expired() {
        let err = AuthEngineError::TokenExpired {
            provider: "google".to_string(),
        };
        assert_eq!(err.to_string(), "token expired for provider google");
    }

    #[test]
    fn error_display_invalid_grant() {
        let err = AuthEngineError::InvalidGrant {
            status: 400,
            reason: "Token has been expired or revoked.".to_string(),
            body: String::new(),
        };
        assert_eq!(
            err.to_string(),
            "invalid grant: Token has been expired or revoked."
        );
    }

    #[test]
    fn error_display_callback_timeout() {
        let err = AuthEngineError::CallbackTimeout { timeout_secs: 300 };
        assert_eq!(err.to_string(), "callback timed out after 300 seconds");
    }

    #[test]
    fn error_display_invalid_config() {
        let err = AuthEngineError::InvalidConfig {
            reason: "missing key `ACCESS_TOKEN`".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration: missing key `ACCESS_TOKEN`"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AuthEngineError>();
    }
}
