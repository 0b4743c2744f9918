//! HTTP utilities for REST API calls

use crate::error::{CliError, CliResult};
use anyhow::Context;
use reqwest::{Client, Method};
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

pub const HEADER_REQUEST_ID: &str = "x-request-id";

/// Sanitize response body for logging
/// Truncates long responses and drops control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| c.is_control(), "")
}

/// A fully described HTTP request. Used both to send and to print in
/// dry-run mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestDescription {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub query: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl RequestDescription {
    pub fn new(method: Method, url: String) -> Self {
        Self {
            method: method.as_str().to_string(),
            url,
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: &[(String, String)]) -> Self {
        self.query = query.to_vec();
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// URL including the encoded query string
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let mut url = match url::Url::parse(&self.url) {
            Ok(url) => url,
            Err(_) => return self.url.clone(),
        };
        url.query_pairs_mut().extend_pairs(self.query.iter());
        url.to_string()
    }
}

impl fmt::Display for RequestDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.full_url())?;
        if let Some(body) = &self.body {
            let pretty = serde_json::to_string_pretty(body).map_err(|_| fmt::Error)?;
            write!(f, "\n{}", pretty)?;
        }
        Ok(())
    }
}

/// HTTP client wrapper for REST API calls
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(verify_tls: bool) -> CliResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("cloudctl/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Send a request and parse the JSON response. Non-2xx statuses become
    /// [`CliError::RestError`] with the server's message.
    pub async fn send(
        &self,
        request: &RequestDescription,
        token: Option<&str>,
        request_id: &str,
    ) -> CliResult<Value> {
        tracing::debug!("{} {}", request.method, request.full_url());

        let method = Method::from_bytes(request.method.as_bytes())
            .with_context(|| format!("Invalid HTTP method {}", request.method))?;
        let mut builder = self
            .client
            .request(method, &request.url)
            .header(HEADER_REQUEST_ID, request_id);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&body));
            return Err(rest_error(status.as_u16(), status.canonical_reason(), &body));
        }

        // Handle empty response
        if body.trim().is_empty() {
            return Ok(Value::Object(Default::default()));
        }

        Ok(serde_json::from_str(&body).context("Failed to parse response JSON")?)
    }
}

/// Build a RestError from a failed response, keeping the server's own message
pub fn rest_error(status: u16, reason: Option<&str>, body: &str) -> CliError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let message = parsed
        .as_ref()
        .and_then(server_message)
        .or_else(|| reason.map(str::to_string))
        .unwrap_or_else(|| "Request failed".to_string());
    CliError::RestError {
        status,
        message,
        body: parsed,
    }
}

/// Pull the human readable message out of an error body
fn server_message(body: &Value) -> Option<String> {
    for key in ["msg", "message"] {
        if let Some(msg) = body.get(key).and_then(|v| v.as_str()) {
            return Some(msg.to_string());
        }
    }
    match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        _ => None,
    }
}
