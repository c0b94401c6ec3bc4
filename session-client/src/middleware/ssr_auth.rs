//! Guard for server-rendered pages.
//!
//! Redirects visitors without a token to sign-in, checks permissions
//! against the token's claims, and turns an invalid token reported by the
//! page into a cleared session plus a redirect.

use crate::api::ApiError;
use crate::auth::{decode_user, evaluate, PermissionRequirement};
use crate::session::navigation::{DASHBOARD_PATH, SIGN_IN_PATH};
use crate::session::request::RequestContext;
use axum::http::{header::LOCATION, StatusCode};
use axum::response::{IntoResponse, Response};
use session_core::error::AppError;
use std::future::Future;
use tracing::{info, warn};

/// Where the page sends the visitor instead of rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRedirect {
    pub destination: String,
    pub permanent: bool,
}

impl PageRedirect {
    pub fn temporary(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            permanent: false,
        }
    }
}

impl IntoResponse for PageRedirect {
    fn into_response(self) -> Response {
        let status = if self.permanent {
            StatusCode::PERMANENT_REDIRECT
        } else {
            StatusCode::TEMPORARY_REDIRECT
        };
        (status, [(LOCATION, self.destination)]).into_response()
    }
}

/// Outcome of rendering a page: its props, or a redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageResult<P> {
    Props(P),
    Redirect(PageRedirect),
}

impl<P> PageResult<P> {
    pub fn redirect_to(destination: impl Into<String>) -> Self {
        PageResult::Redirect(PageRedirect::temporary(destination))
    }
}

impl<P: IntoResponse> IntoResponse for PageResult<P> {
    fn into_response(self) -> Response {
        match self {
            PageResult::Props(props) => props.into_response(),
            PageResult::Redirect(redirect) => redirect.into_response(),
        }
    }
}

/// A page handler wrapped by [`with_ssr_auth`].
pub struct GuardedPage<H> {
    handler: H,
    requirement: Option<PermissionRequirement>,
}

/// Wraps a page handler so it only runs for visitors with a session that
/// satisfies `requirement` (any session when `None`).
pub fn with_ssr_auth<H>(handler: H, requirement: Option<PermissionRequirement>) -> GuardedPage<H> {
    GuardedPage {
        handler,
        requirement,
    }
}

impl<H> GuardedPage<H> {
    pub async fn render<P, Fut>(&self, context: &RequestContext) -> Result<PageResult<P>, ApiError>
    where
        H: Fn(RequestContext) -> Fut,
        Fut: Future<Output = Result<PageResult<P>, ApiError>>,
    {
        let store = context.session_store();

        let Some(token) = store.access_token() else {
            info!("No session, redirecting to sign in");
            return Ok(PageResult::redirect_to(SIGN_IN_PATH));
        };

        if let Some(requirement) = &self.requirement {
            let user = match decode_user(&token) {
                Ok(user) => user,
                Err(err) => {
                    warn!(error = %err, "Session token could not be decoded");
                    store.clear();
                    return Ok(PageResult::redirect_to(SIGN_IN_PATH));
                }
            };

            if !evaluate(&user, requirement) {
                info!(user = %user.email, "Insufficient permissions, redirecting");
                return Ok(PageResult::redirect_to(DASHBOARD_PATH));
            }
        }

        match (self.handler)(context.clone()).await {
            Err(ApiError::InvalidAuthToken) => {
                warn!("Invalid session token, clearing cookies");
                store.clear();
                Ok(PageResult::redirect_to(SIGN_IN_PATH))
            }
            result => result,
        }
    }

    /// Renders the page and attaches the context's cookie changes.
    ///
    /// Cookies are attached to error responses too: a refresh that succeeded
    /// before the page failed has already rotated the token pair.
    pub async fn respond<P, Fut>(&self, context: &RequestContext) -> Response
    where
        H: Fn(RequestContext) -> Fut,
        Fut: Future<Output = Result<PageResult<P>, ApiError>>,
        P: IntoResponse,
    {
        match self.render(context).await {
            Ok(page) => (context.cookie_jar(), page).into_response(),
            Err(err) => {
                warn!(error = %err, "Page failed to render");
                (context.cookie_jar(), AppError::from(err)).into_response()
            }
        }
    }
}
