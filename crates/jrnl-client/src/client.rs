use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{classify, ApiError};
use http::header::{HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::Method;

use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Authenticated handle on one server, shared by all managers.
pub struct ApiClient {
    remote: Url,
    transport: Arc<dyn Transport>,
    token: Option<SecretString>,
}

impl ApiClient {
    /// `remote` is the server root; a trailing `/` is added if missing so
    /// API paths resolve beneath it.
    pub fn new(remote: &Url, transport: Arc<dyn Transport>) -> Self {
        let mut remote = remote.clone();
        if !remote.path().ends_with('/') {
            let path = format!("{}/", remote.path());
            remote.set_path(&path);
        }
        Self {
            remote,
            transport,
            token: None,
        }
    }

    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }

    pub fn set_token(&mut self, token: Option<SecretString>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Resolve a relative API path such as `api/v1/journals/`.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.remote.join(path)?)
    }

    /// Send a request, turning transport failures and non-2xx statuses into
    /// [`ApiError`]s.
    pub fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let mut request = request.header(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(token) = &self.token {
            let mut value = HeaderValue::from_str(&format!("Token {}", token.expose_secret()))?;
            value.set_sensitive(true);
            request = request.header(AUTHORIZATION, value);
        }

        tracing::debug!(method = %request.method, url = %request.url, "request");
        let response = match self.transport.execute(&request) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "transport failure");
                return Err(e.into());
            }
        };
        tracing::debug!(status = response.status.as_u16(), url = %request.url, "response");

        if response.is_success() {
            Ok(response)
        } else {
            Err(classify(&request, &response))
        }
    }

    pub fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.send(HttpRequest::new(Method::GET, url))?;
        Ok(serde_json::from_slice(&response.body)?)
    }

    pub fn post_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.send(json_request(Method::POST, url, body)?)
    }

    pub fn put_json<B: Serialize + ?Sized>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<HttpResponse, ApiError> {
        self.send(json_request(Method::PUT, url, body)?)
    }

    pub fn delete(&self, url: Url) -> Result<HttpResponse, ApiError> {
        self.send(HttpRequest::new(Method::DELETE, url))
    }
}

fn json_request<B: Serialize + ?Sized>(
    method: Method,
    url: Url,
    body: &B,
) -> Result<HttpRequest, ApiError> {
    Ok(HttpRequest::new(method, url)
        .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .body(serde_json::to_vec(body)?))
}

/// Append one path segment (percent-encoded) plus a trailing slash.
pub(crate) fn join_segment(base: &Url, segment: &str) -> Result<Url, ApiError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
        .pop_if_empty()
        .push(segment)
        .push("");
    Ok(url)
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("remote", &self.remote.as_str())
            .field("authenticated", &self.token.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;
    use std::sync::Mutex;

    /// Records requests and answers each with a fixed response
    #[derive(Default)]
    struct Recorder {
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(HttpResponse::json(
                http::StatusCode::OK,
                &serde_json::json!({"ok": true}),
            ))
        }
    }

    #[test]
    fn test_remote_gets_trailing_slash() {
        let client = ApiClient::new(
            &Url::parse("https://journal.example.com/sync").unwrap(),
            Arc::new(Recorder::default()),
        );
        assert_eq!(client.base_url().as_str(), "https://journal.example.com/sync/");
        assert_eq!(
            client.url("api/v1/journals/").unwrap().as_str(),
            "https://journal.example.com/sync/api/v1/journals/"
        );
    }

    #[test]
    fn test_token_header() {
        let recorder = Arc::new(Recorder::default());
        let client = ApiClient::new(
            &Url::parse("https://journal.example.com/").unwrap(),
            recorder.clone(),
        )
        .with_token(SecretString::from("abc123"));

        let url = client.url("api/v1/journals/").unwrap();
        let _: serde_json::Value = client.get_json(url).unwrap();

        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests[0].header_value("authorization"), Some("Token abc123"));
        assert_eq!(requests[0].header_value("accept"), Some("application/json"));
        assert!(requests[0].headers[AUTHORIZATION].is_sensitive());
    }

    #[test]
    fn test_token_with_control_characters_is_rejected() {
        let recorder = Arc::new(Recorder::default());
        let client = ApiClient::new(
            &Url::parse("https://journal.example.com/").unwrap(),
            recorder.clone(),
        )
        .with_token(SecretString::from("abc\r\nX-Injected: 1"));

        let err = client.delete(client.url("api/logout/").unwrap()).unwrap_err();
        assert!(matches!(err, ApiError::Header(_)));
        assert!(recorder.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_no_token_no_header() {
        let recorder = Arc::new(Recorder::default());
        let client = ApiClient::new(
            &Url::parse("https://journal.example.com/").unwrap(),
            recorder.clone(),
        );
        client.delete(client.url("api/logout/").unwrap()).unwrap();
        let requests = recorder.requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::DELETE);
        assert!(requests[0].header_value("authorization").is_none());
    }

    #[test]
    fn test_join_segment_encodes() {
        let base = Url::parse("https://journal.example.com/api/v1/journals/abc/members/").unwrap();
        let url = join_segment(&base, "bob@example.com").unwrap();
        assert_eq!(
            url.as_str(),
            "https://journal.example.com/api/v1/journals/abc/members/bob@example.com/"
        );
        let url = join_segment(&base, "a/b?c").unwrap();
        assert_eq!(
            url.as_str(),
            "https://journal.example.com/api/v1/journals/abc/members/a%2Fb%3Fc/"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ApiClient::new(
            &Url::parse("https://journal.example.com/").unwrap(),
            Arc::new(Recorder::default()),
        )
        .with_token(SecretString::from("abc123"));
        let text = format!("{client:?}");
        assert!(!text.contains("abc123"));
        assert!(text.contains("authenticated: true"));
    }
}
