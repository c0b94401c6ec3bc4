use serde_json::Value;
use session_core::error::AppError;
use thiserror::Error;

/// `code` the API puts in a 401 body when the access token has expired.
pub const TOKEN_EXPIRED_CODE: &str = "token.expired";

/// Errors surfaced by API clients.
///
/// `Clone` so the outcome of a single refresh can be handed to every waiter.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Request failed ({status}){}", code_suffix(.code))]
    Http {
        status: u16,
        code: Option<String>,
        body: Value,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// Unauthorized without the expired signal while rendering on the
    /// server; the page guard turns it into a sign-in redirect.
    #[error("Invalid auth token")]
    InvalidAuthToken,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(#[source] Box<ApiError>),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|code| format!(": {}", code))
        .unwrap_or_default()
}

impl ApiError {
    /// Structured error for a non-2xx response. `code` is read from the body.
    pub fn from_response(status: u16, body: Value) -> Self {
        let code = body
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);

        ApiError::Http { status, code, body }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_token_expired(&self) -> bool {
        matches!(
            self,
            ApiError::Http { status: 401, code: Some(code), .. } if code == TOKEN_EXPIRED_CODE
        )
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Http { status: 400, .. } => AppError::BadRequest(anyhow::Error::new(err)),
            ApiError::Http { status: 401, .. }
            | ApiError::InvalidAuthToken
            | ApiError::RefreshFailed(_) => AppError::Unauthorized(anyhow::Error::new(err)),
            ApiError::Http { status: 403, .. } => AppError::Forbidden(anyhow::Error::new(err)),
            ApiError::Http { status, ref body, .. } => AppError::Upstream {
                status,
                message: body
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("no message")
                    .to_string(),
            },
            ApiError::Network(message) => AppError::BadGateway(message),
            ApiError::Decode(_) => AppError::InternalError(anyhow::Error::new(err)),
        }
    }
}
