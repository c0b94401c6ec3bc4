use super::cookies::{CookieStore, RequestCookies};
use super::store::SessionStore;
use crate::api::RefreshCoordinator;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;
use std::sync::{Arc, OnceLock};

/// Per-request context of a server-rendered page.
///
/// Clones share the same cookies and refresh coordinator, so changes made by
/// any API client built for the context end up in the response.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    cookies: Arc<RequestCookies>,
    coordinator: Arc<OnceLock<Arc<RefreshCoordinator>>>,
}

impl RequestContext {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            cookies: Arc::new(RequestCookies::from_headers(headers)),
            coordinator: Arc::default(),
        }
    }

    /// The coordinator for this request, created by `init` on first use.
    pub(crate) fn coordinator_or_init(
        &self,
        init: impl FnOnce() -> Arc<RefreshCoordinator>,
    ) -> Arc<RefreshCoordinator> {
        self.coordinator.get_or_init(init).clone()
    }

    pub fn cookies(&self) -> Arc<dyn CookieStore> {
        self.cookies.clone()
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.cookies())
    }

    /// Cookie changes to attach to the response.
    pub fn cookie_jar(&self) -> CookieJar {
        self.cookies.jar()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}
