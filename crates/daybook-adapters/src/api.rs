//! Shared JSON-over-HTTPS plumbing for the REST adapters.
//!
//! Every adapter does the same thing per call: attach a bearer token, send
//! one request, and decode the JSON body.  [`ApiClient`] owns that, and
//! [`ApiError`] carries failures in a form that formats cleanly into the
//! friendly tool messages.

use daybook_auth::{AuthEngineError, TokenSource};
use serde_json::Value;
use tracing::debug;
use url::Url;

/// User agent sent with every API request.
const USER_AGENT: &str = concat!("daybook/", env!("CARGO_PKG_VERSION"));

/// Failures from a single API call.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// No bearer token could be obtained.
    #[error("{0}")]
    Token(#[from] AuthEngineError),

    /// The body was not the JSON we expected.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The configured base URL cannot carry the request path.
    #[error("invalid API URL: {0}")]
    Url(String),
}

/// A thin wrapper over `reqwest::Client` bound to one API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self::with_client(client, base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build an endpoint URL by appending path segments to the base URL.
    /// Each segment is percent-encoded, so ids containing `@` or `/` are
    /// safe.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&self.base_url).map_err(|e| ApiError::Url(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET` an endpoint with a bearer token from `tokens`.
    pub async fn get(
        &self,
        url: Url,
        query: &[(&str, String)],
        tokens: &dyn TokenSource,
    ) -> Result<Value, ApiError> {
        let token = tokens.access_token().await?;
        debug!(url = %url, "GET");
        let request = self.client.get(url).bearer_auth(token).query(query);
        send(request).await
    }

    /// `POST` a JSON body (or nothing) to an endpoint.
    pub async fn post(
        &self,
        url: Url,
        body: Option<&Value>,
        tokens: &dyn TokenSource,
    ) -> Result<Value, ApiError> {
        let token = tokens.access_token().await?;
        debug!(url = %url, "POST");
        let mut request = self.client.post(url).bearer_auth(token);
        request = match body {
            Some(body) => request.json(body),
            None => request.header(reqwest::header::CONTENT_LENGTH, 0),
        };
        send(request).await
    }
}

/// Send a request and decode its JSON body.  An empty body decodes to
/// `Value::Null`.
pub async fn send(request: reqwest::RequestBuilder) -> Result<Value, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Pull a readable message out of an error body.  Google wraps it as
/// `{"error": {"message": ...}}`; other APIs use `detail` or `message`.
fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return body.trim().to_string();
    };
    value
        .pointer("/error/message")
        .or_else(|| value.get("detail"))
        .or_else(|| value.get("message"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string())
}

/// Render a JSON value the way the agent sees it in prose: strings bare,
/// `null` as `None`, everything else in its JSON form.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(true)) => "True".to_string(),
        Some(Value::Bool(false)) => "False".to_string(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_encodes_segments() {
        let api = ApiClient::new("https://www.googleapis.com/calendar/v3/");
        let url = api
            .endpoint(&["calendars", "abc@group.calendar.google.com", "events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/abc@group.calendar.google.com/events"
        );

        let url = api.endpoint(&["calendars", "a/b", "events"]).unwrap();
        assert!(url.as_str().ends_with("/calendars/a%2Fb/events"));
    }

    #[test]
    fn endpoint_on_bare_host() {
        let api = ApiClient::new("http://127.0.0.1:9000");
        let url = api.endpoint(&["v2", "usercollection", "daily_sleep"]).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/v2/usercollection/daily_sleep");
    }

    #[test]
    fn endpoint_rejects_unparsable_base() {
        let api = ApiClient::new("not a url");
        assert!(matches!(api.endpoint(&["x"]), Err(ApiError::Url(_))));
    }

    #[test]
    fn error_message_reads_google_shape() {
        let body = r#"{"error": {"code": 404, "message": "Not Found"}}"#;
        assert_eq!(error_message(body), "Not Found");
    }

    #[test]
    fn error_message_reads_detail_and_plain_text() {
        assert_eq!(error_message(r#"{"detail": "Unauthorized"}"#), "Unauthorized");
        assert_eq!(error_message("bad gateway\n"), "bad gateway");
    }

    #[test]
    fn status_error_display() {
        let err = ApiError::Status {
            status: 401,
            message: "Invalid Credentials".into(),
        };
        assert_eq!(err.to_string(), "HTTP 401: Invalid Credentials");
    }

    #[test]
    fn display_value_matches_prose_rendering() {
        assert_eq!(display_value(None), "None");
        assert_eq!(display_value(Some(&Value::Null)), "None");
        assert_eq!(display_value(Some(&json!("Ahri"))), "Ahri");
        assert_eq!(display_value(Some(&json!(12))), "12");
        assert_eq!(display_value(Some(&json!(true))), "True");
    }
}
