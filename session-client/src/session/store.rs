use super::cookies::{CookieOptions, CookieStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Cookie holding the access token.
pub const TOKEN_COOKIE: &str = "nextauth.token";
/// Cookie holding the refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "nextauth.refreshToken";
/// 30 days.
pub const SESSION_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30);
pub const SESSION_COOKIE_PATH: &str = "/";

/// Access/refresh token pair as returned by `/sessions` and `/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "token")]
    pub access_token: String,
    #[serde(rename = "refreshToken")]
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }
}

/// Token pair persistence on top of a [`CookieStore`].
///
/// Which cookie store backs it is the caller's context: the ambient browser
/// store, or the cookies of one server-rendered request.
#[derive(Clone)]
pub struct SessionStore {
    cookies: Arc<dyn CookieStore>,
}

impl SessionStore {
    pub fn new(cookies: Arc<dyn CookieStore>) -> Self {
        Self { cookies }
    }

    pub fn access_token(&self) -> Option<String> {
        self.cookies.get(TOKEN_COOKIE).filter(|token| !token.is_empty())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.cookies
            .get(REFRESH_TOKEN_COOKIE)
            .filter(|token| !token.is_empty())
    }

    /// Both tokens, or `None` unless both are present.
    pub fn read(&self) -> Option<TokenPair> {
        let mut values = self
            .cookies
            .get_many(&[TOKEN_COOKIE, REFRESH_TOKEN_COOKIE])
            .into_iter()
            .map(|value| value.filter(|v| !v.is_empty()));

        match (values.next().flatten(), values.next().flatten()) {
            (Some(access_token), Some(refresh_token)) => Some(TokenPair {
                access_token,
                refresh_token,
            }),
            _ => None,
        }
    }

    /// Replaces both tokens with a 30-day max-age on `/`.
    pub fn write(&self, pair: &TokenPair) {
        self.cookies.set_many(
            &[
                (TOKEN_COOKIE, pair.access_token.as_str()),
                (REFRESH_TOKEN_COOKIE, pair.refresh_token.as_str()),
            ],
            &CookieOptions {
                max_age: SESSION_MAX_AGE,
                path: SESSION_COOKIE_PATH.to_string(),
            },
        );
    }

    /// Removes both tokens. Safe when nothing is stored.
    pub fn clear(&self) {
        self.cookies
            .destroy_many(&[TOKEN_COOKIE, REFRESH_TOKEN_COOKIE], SESSION_COOKIE_PATH);
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.access_token().is_some())
            .finish()
    }
}
