//! HTTP transport seam
//!
//! Managers build an [`HttpRequest`] and hand it to a [`Transport`]. The
//! production implementation is [`HttpTransport`] (blocking reqwest); tests
//! plug in an in-memory server.

use std::time::Duration;

use http::header::{AsHeaderName, HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
pub use http::{Method, StatusCode};
use jrnl_core::config::ServerConfig;
use url::Url;

/// Request/response bodies longer than this are cut in error dumps
pub const DUMP_BODY_LIMIT: usize = 1024;

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    /// Header value as text; `None` when absent or not visible ASCII.
    pub fn header_value<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    /// JSON response with the matching content type.
    pub fn json(status: StatusCode, body: &serde_json::Value) -> Self {
        Self::new(status)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(body.to_string())
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header_value<K: AsHeaderName>(&self, name: K) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Whether the body is declared as `application/json`. Media types
    /// compare case-insensitively and parameters such as `charset` are ignored.
    pub fn is_json(&self) -> bool {
        has_media_type(&self.headers, &mime::APPLICATION_JSON)
    }
}

fn has_media_type(headers: &HeaderMap, expected: &mime::Mime) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<mime::Mime>().ok())
        .is_some_and(|m| m.essence_str().eq_ignore_ascii_case(expected.essence_str()))
}

/// The request never produced an HTTP response (DNS, connect, TLS, timeout).
#[derive(Debug, thiserror::Error)]
#[error("transport error: {0}")]
pub struct TransportError(pub String);

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking reqwest transport
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn from_config(config: &ServerConfig) -> Result<Self, TransportError> {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError(format!("building HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .map_err(|e| TransportError(format!("reading response body: {e}")))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Human-readable request/response trace for error reports.
///
/// `Authorization` and other sensitive header values are replaced, form
/// bodies (they carry the password) are withheld, and long bodies are
/// truncated.
pub fn dump(request: &HttpRequest, response: &HttpResponse) -> String {
    let mut out = format!("{} {}\n", request.method, request.url);
    write_headers(&mut out, &request.headers);
    if let Some(body) = &request.body {
        if has_media_type(&request.headers, &mime::APPLICATION_WWW_FORM_URLENCODED) {
            out.push_str("<form body redacted>\n");
        } else {
            out.push_str(&truncate_body(body));
            out.push('\n');
        }
    }

    out.push_str(&format!("\nHTTP {}\n", response.status));
    write_headers(&mut out, &response.headers);
    out.push_str(&truncate_body(&response.body));
    out
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let shown = if name == AUTHORIZATION || value.is_sensitive() {
            "<redacted>"
        } else {
            value.to_str().unwrap_or("<binary>")
        };
        out.push_str(&format!("{name}: {shown}\n"));
    }
}

fn truncate_body(body: &[u8]) -> String {
    if body.len() <= DUMP_BODY_LIMIT {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!(
            "{}... ({} bytes total)",
            String::from_utf8_lossy(&body[..DUMP_BODY_LIMIT]),
            body.len()
        )
    }
}
