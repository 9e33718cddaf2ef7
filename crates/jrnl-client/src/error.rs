use jrnl_crypto::CryptoError;
use serde::Deserialize;

use http::header::RETRY_AFTER;
use http::StatusCode;

use crate::transport::{dump, HttpRequest, HttpResponse, TransportError};

/// Every failure a protocol call can surface
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad gateway: {detail}")]
    BadGateway { detail: String },

    /// `retry_after` is in seconds; 0 when the server gave no hint or the
    /// request never reached it.
    #[error("service unavailable (retry after {retry_after}s): {detail}")]
    ServiceUnavailable { retry_after: u64, detail: String },

    #[error("unauthorized: {detail}")]
    Unauthorized { detail: String },

    #[error("conflict: {detail}")]
    Conflict { detail: String },

    #[error("user account is inactive: {detail}")]
    UserInactive { detail: String },

    #[error("associate not allowed: {detail}")]
    AssociateNotAllowed { detail: String },

    /// The journal owner's account is inactive, so the journal is read-only.
    #[error("journal is read-only: {detail}")]
    ReadOnly { detail: String },

    #[error("HTTP {status} ({code}): {detail}")]
    Http {
        status: StatusCode,
        code: String,
        detail: String,
        dump: String,
    },

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("base64 error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// A header value (usually the stored token) is not valid in HTTP.
    #[error("invalid header value: {0}")]
    Header(#[from] http::header::InvalidHeaderValue),
}

impl ApiError {
    /// Worth retrying later without changing the request.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::BadGateway { .. } | ApiError::ServiceUnavailable { .. }
        )
    }

    /// HTTP status behind this error, where one applies.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::BadGateway { .. } => Some(StatusCode::BAD_GATEWAY),
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::Conflict { .. } => Some(StatusCode::CONFLICT),
            ApiError::UserInactive { .. }
            | ApiError::AssociateNotAllowed { .. }
            | ApiError::ReadOnly { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::ServiceUnavailable { .. } => Some(StatusCode::SERVICE_UNAVAILABLE),
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Crypto(_)
            | ApiError::Json(_)
            | ApiError::Url(_)
            | ApiError::Base64(_)
            | ApiError::Header(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::Http { status, .. } if *status == StatusCode::NOT_FOUND)
    }
}

impl From<TransportError> for ApiError {
    fn from(e: TransportError) -> Self {
        ApiError::ServiceUnavailable {
            retry_after: 0,
            detail: e.0,
        }
    }
}

/// Server error body
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

pub(crate) const NON_JSON_DETAIL: &str = "got a non-JSON response";
pub(crate) const NON_JSON_CODE: &str = "got_non_json";

/// Map a non-2xx response onto the error taxonomy.
pub(crate) fn classify(request: &HttpRequest, response: &HttpResponse) -> ApiError {
    let (detail, code) = parse_error_body(response);

    match response.status {
        StatusCode::BAD_GATEWAY => ApiError::BadGateway { detail },
        StatusCode::SERVICE_UNAVAILABLE => ApiError::ServiceUnavailable {
            retry_after: response
                .header_value(RETRY_AFTER)
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            detail,
        },
        StatusCode::UNAUTHORIZED => ApiError::Unauthorized { detail },
        StatusCode::CONFLICT => ApiError::Conflict { detail },
        StatusCode::FORBIDDEN if code == "service_inactive" => ApiError::UserInactive { detail },
        StatusCode::FORBIDDEN if code == "associate_not_allowed" => {
            ApiError::AssociateNotAllowed { detail }
        }
        StatusCode::FORBIDDEN if code == "journal_owner_inactive" => ApiError::ReadOnly { detail },
        status => ApiError::Http {
            status,
            code,
            detail,
            dump: dump(request, response),
        },
    }
}

fn parse_error_body(response: &HttpResponse) -> (String, String) {
    if response.is_json() {
        if let Ok(body) = serde_json::from_slice::<ErrorBody>(&response.body) {
            return (
                body.detail.unwrap_or_default(),
                body.code.unwrap_or_default(),
            );
        }
    }
    (NON_JSON_DETAIL.to_string(), NON_JSON_CODE.to_string())
}
