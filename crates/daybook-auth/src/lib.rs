//! Credential handling for Daybook adapters.
//!
//! Every adapter needs a bearer token before it can call its API.  This
//! crate covers the two ways those tokens come about:
//!
//! - **OAuth 2.0 authorization code flow** (PKCE optional) with a loopback
//!   callback server, for Google and Oura.
//! - **Static token files**, for providers that hand out a fixed key.
//!
//! Google user tokens are persisted in the same `token.json` layout that
//! Google's client libraries use and are refreshed in place.
//!
//! # Architecture
//!
//! ```text
//! TokenSource (trait)
//! ├── StaticToken         (fixed secret)
//! └── GoogleCredentials   (token file → refresh → consent → persist)
//!     ├── OAuthFlow       (authorization code + PKCE)
//!     ├── CallbackServer  (local HTTP listener)
//!     └── files           (client secrets, authorized user, static tokens)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use daybook_auth::{GoogleCredentials, TokenSource};
//!
//! # async fn example() -> daybook_auth::Result<()> {
//! let creds = GoogleCredentials::new(
//!     "token.json",
//!     "credentials.json",
//!     vec!["https://www.googleapis.com/auth/calendar.readonly".to_string()],
//! );
//! let token = creds.access_token().await?;
//! println!("access token: {token}");
//! # Ok(())
//! # }
//! ```

pub mod callback;
pub mod error;
pub mod files;
pub mod oauth;
pub mod source;

pub use callback::CallbackServer;
pub use error::{AuthEngineError, Result};
pub use files::{AuthorizedUser, ClientSecrets, StaticTokenFile};
pub use oauth::{OAuthConfig, OAuthFlow, OAuthTokens};
pub use source::{ConsentOptions, CredentialStatus, GoogleCredentials, StaticToken, TokenSource};
