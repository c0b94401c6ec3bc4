use super::error::ApiError;
use super::refresh::{AuthFailureStrategy, RefreshCoordinator};
use super::transport::{bearer_header, ApiRequest, ApiResponse, Transport};
use crate::session::cookies::CookieStore;
use crate::session::request::RequestContext;
use crate::session::store::SessionStore;
use http::{header::AUTHORIZATION, HeaderMap};
use serde::de::DeserializeOwned;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Headers added to every request that does not set them itself.
#[derive(Debug, Default)]
pub struct DefaultHeaders {
    headers: RwLock<HeaderMap>,
}

impl DefaultHeaders {
    pub fn set_bearer(&self, token: &str) -> Result<(), ApiError> {
        let value = bearer_header(token)?;
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AUTHORIZATION, value);
        Ok(())
    }

    pub fn clear_bearer(&self) {
        self.headers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(AUTHORIZATION);
    }

    pub fn bearer(&self) -> Option<String> {
        self.headers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::to_string)
    }

    /// Copies defaults into `request`; headers it already has win.
    pub fn apply(&self, request: &mut ApiRequest) {
        let defaults = self.headers.read().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in defaults.iter() {
            if !request.headers.contains_key(name) {
                request.headers.insert(name.clone(), value.clone());
            }
        }
    }
}

/// Request executor bound to a session.
///
/// Responses pass through the session's [`RefreshCoordinator`]: expired
/// tokens are refreshed once and the request replayed, other 401s go to the
/// auth-failure strategy, everything else is returned as is.
#[derive(Clone, Debug)]
pub struct ApiClient {
    coordinator: Arc<RefreshCoordinator>,
}

impl ApiClient {
    pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    pub fn store(&self) -> &SessionStore {
        self.coordinator.store()
    }

    /// Sets the default `Authorization: Bearer` header for later requests.
    pub fn set_authorization(&self, token: &str) -> Result<(), ApiError> {
        self.coordinator.defaults().set_bearer(token)
    }

    pub fn clear_authorization(&self) {
        self.coordinator.defaults().clear_bearer();
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(ApiRequest::get(path)).await?.json()
    }

    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        self.coordinator.defaults().apply(&mut request);
        let mut replayed = false;
        let mut caught_up = false;

        loop {
            let error = match self.coordinator.transport().execute(&request).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            if !request.recover_auth || !error.is_unauthorized() {
                return Err(error);
            }
            if !error.is_token_expired() {
                return Err(self.coordinator.reject_invalid_token(error));
            }
            if replayed {
                // Still expired right after a refresh; another refresh would loop.
                warn!(path = %request.path, "Token still expired after refresh");
                return Err(error);
            }

            // Sent with a token that a finished refresh has already replaced.
            if !caught_up {
                if let Some(current) = self.coordinator.defaults().bearer() {
                    if request.bearer() != Some(current.as_str()) {
                        debug!(path = %request.path, "Replaying with the current token");
                        request.set_bearer(&current)?;
                        caught_up = true;
                        continue;
                    }
                }
            }

            let token = self.coordinator.wait_for_refresh().await?;
            request.set_bearer(&token)?;
            replayed = true;
        }
    }
}

/// Builds [`ApiClient`]s bound to the current tokens.
///
/// Without a request context, clients belong to the ambient session and share
/// one coordinator. With a context, clients share that request's coordinator,
/// created on first build over the request's cookies with the declarative
/// failure strategy. Separate requests never share refresh state.
pub struct ClientFactory {
    transport: Arc<dyn Transport>,
    session: Arc<RefreshCoordinator>,
}

impl ClientFactory {
    pub fn new(
        transport: Arc<dyn Transport>,
        ambient_cookies: Arc<dyn CookieStore>,
        strategy: AuthFailureStrategy,
    ) -> Self {
        let session = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            SessionStore::new(ambient_cookies),
            strategy,
        ));

        Self { transport, session }
    }

    pub fn build(&self, context: Option<&RequestContext>) -> ApiClient {
        let coordinator = match context {
            Some(context) => context.coordinator_or_init(|| {
                Arc::new(RefreshCoordinator::new(
                    self.transport.clone(),
                    context.session_store(),
                    AuthFailureStrategy::Declarative,
                ))
            }),
            None => self.session.clone(),
        };

        match coordinator.store().access_token() {
            Some(token) => {
                if let Err(err) = coordinator.defaults().set_bearer(&token) {
                    warn!(error = %err, "Stored access token is not a valid header value");
                    coordinator.defaults().clear_bearer();
                }
            }
            None => coordinator.defaults().clear_bearer(),
        }

        ApiClient::new(coordinator)
    }
}
