use secrecy::{ExposeSecret, SecretString};

use crate::client::ApiClient;
use crate::error::ApiError;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};

use crate::transport::HttpRequest;
use crate::wire::TokenJson;

const TOKEN_PATH: &str = "api-token-auth/";
const LOGOUT_PATH: &str = "api/logout/";

/// Exchanges credentials for an API token and revokes it again.
pub struct Authenticator<'a> {
    client: &'a ApiClient,
}

impl<'a> Authenticator<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Log in with the account password. Bad credentials surface as
    /// [`ApiError::Unauthorized`].
    pub fn get_auth_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SecretString, ApiError> {
        let form = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("username", username)
            .append_pair("password", password.expose_secret())
            .finish();
        let request = HttpRequest::new(Method::POST, self.client.url(TOKEN_PATH)?)
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(form.into_bytes());

        let response = match self.client.send(request) {
            Ok(response) => response,
            Err(ApiError::Http { status, detail, .. }) if status == StatusCode::BAD_REQUEST => {
                tracing::warn!(username, "login rejected");
                return Err(ApiError::Unauthorized { detail });
            }
            Err(e) => return Err(e),
        };

        let token: TokenJson = serde_json::from_slice(&response.body)?;
        tracing::info!(username, "logged in");
        Ok(SecretString::from(token.token))
    }

    /// Revoke the client's current token on the server.
    pub fn invalidate_auth_token(&self) -> Result<(), ApiError> {
        let request = HttpRequest::new(Method::POST, self.client.url(LOGOUT_PATH)?);
        self.client.send(request)?;
        tracing::info!("auth token invalidated");
        Ok(())
    }
}
