//! Local HTTP callback server for the OAuth redirect.
//!
//! After the user approves access in the browser, the authorization server
//! redirects to `http://127.0.0.1:<port>/?code=xxx&state=yyy`.  This module
//! binds that loopback port, waits for the redirect, answers it with a small
//! HTML page and hands the code and state back to the caller.
//!
//! The listener is bound before the authorization URL is built so that a
//! port of `0` can be resolved to the real ephemeral port and embedded in
//! the redirect URI.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::error::{AuthEngineError, Result};

/// The HTML page returned to the browser after a successful callback.
const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Authorization Successful</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            height: 100vh;
            margin: 0;
            background: #f5f5f5;
            color: #333;
        }
        .card {
            text-align: center;
            padding: 3rem;
            background: white;
            border-radius: 12px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.08);
        }
        h1 { color: #22c55e; margin-bottom: 0.5rem; }
        p { color: #666; }
    </style>
</head>
<body>
    <div class="card">
        <h1>Authorization Successful</h1>
        <p>The authentication flow has completed. You may close this window.</p>
    </div>
</body>
</html>"#;

/// Outcome of inspecting one inbound request.
#[derive(Debug, PartialEq, Eq)]
enum CallbackRequest {
    /// The redirect carrying `code` and `state`.
    Authorized { code: String, state: String },
    /// Some other request (favicon, a stray probe); answer 404 and keep
    /// waiting.
    Unrelated,
}

/// A loopback HTTP listener that waits for a single OAuth redirect.
pub struct CallbackServer {
    listener: TcpListener,
}

impl CallbackServer {
    /// Bind `127.0.0.1:{port}`.  Port `0` asks the OS for a free port; use
    /// [`CallbackServer::port`] to learn which one was chosen.
    ///
    /// # Errors
    ///
    /// Returns [`AuthEngineError::Io`] if the port cannot be bound.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        Ok(Self { listener })
    }

    /// The port the listener is actually bound to.
    pub fn port(&self) -> Result<u16> {
        Ok(self.listener.local_addr()?.port())
    }

    /// The redirect URI to register in the authorization request.  It
    /// names the bound IPv4 address, since `localhost` may resolve to `::1`.
    pub fn redirect_uri(&self) -> Result<String> {
        Ok(format!("http://127.0.0.1:{}/", self.port()?))
    }

    /// Wait for the OAuth redirect and return the `(code, state)` pair.
    ///
    /// # Errors
    ///
    /// - [`AuthEngineError::CallbackTimeout`] if `timeout_secs` elapse
    ///   before the redirect arrives.
    /// - [`AuthEngineError::FlowFailed`] if the authorization server
    ///   redirected with an `error` parameter or omitted `code`/`state`.
    pub async fn wait(self, timeout_secs: u64) -> Result<(String, String)> {
        let addr = self.listener.local_addr()?;
        tracing::info!(addr = %addr, "callback server listening for OAuth redirect");

        let timeout = tokio::time::Duration::from_secs(timeout_secs);
        match tokio::time::timeout(timeout, self.accept_redirect()).await {
            Ok(inner) => inner,
            Err(_) => Err(AuthEngineError::CallbackTimeout { timeout_secs }),
        }
    }

    /// Accept connections until one of them is the redirect.
    async fn accept_redirect(&self) -> Result<(String, String)> {
        loop {
            let (mut stream, peer) = self.listener.accept().await?;
            tracing::debug!(peer = %peer, "accepted callback connection");

            // OAuth redirects are small GET requests.
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await?;
            let request = String::from_utf8_lossy(&buf[..n]);

            match Self::parse_callback_request(&request) {
                Ok(CallbackRequest::Authorized { code, state }) => {
                    Self::respond(&mut stream, "200 OK", "text/html; charset=utf-8", SUCCESS_HTML)
                        .await?;
                    tracing::info!("callback received, authorization code extracted");
                    return Ok((code, state));
                }
                Ok(CallbackRequest::Unrelated) => {
                    Self::respond(&mut stream, "404 Not Found", "text/plain", "not found").await?;
                }
                Err(e) => {
                    let body = e.to_string();
                    Self::respond(&mut stream, "400 Bad Request", "text/plain", &body).await?;
                    return Err(e);
                }
            }
        }
    }

    async fn respond(
        stream: &mut TcpStream,
        status: &str,
        content_type: &str,
        body: &str,
    ) -> Result<()> {
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len(),
        );
        stream.write_all(response.as_bytes()).await?;
        stream.flush().await?;
        Ok(())
    }

    /// Parse the first line of an HTTP request.
    ///
    /// Expected format: `GET /?code=xxx&state=yyy HTTP/1.1`.  Requests with
    /// no query string are [`CallbackRequest::Unrelated`].
    fn parse_callback_request(request: &str) -> Result<CallbackRequest> {
        let request_line = request
            .lines()
            .next()
            .ok_or_else(|| AuthEngineError::FlowFailed {
                reason: "empty HTTP request".to_string(),
            })?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            return Err(AuthEngineError::FlowFailed {
                reason: format!("malformed HTTP request line: {request_line}"),
            });
        }

        let Some((_, query)) = parts[1].split_once('?') else {
            return Ok(CallbackRequest::Unrelated);
        };

        let mut code: Option<String> = None;
        let mut state: Option<String> = None;

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => {
                    return Err(AuthEngineError::FlowFailed {
                        reason: format!("authorization server returned error: {value}"),
                    });
                }
                _ => {}
            }
        }

        let code = code.ok_or_else(|| AuthEngineError::FlowFailed {
            reason: "callback missing 'code' parameter".to_string(),
        })?;

        let state = state.ok_or_else(|| AuthEngineError::FlowFailed {
            reason: "callback missing 'state' parameter".to_string(),
        })?;

        Ok(CallbackRequest::Authorized { code, state })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
