//! Single-flight access token refresh.
//!
//! Every request that fails with an expired token queues a waiter. The first
//! one to find the coordinator idle also starts the `/refresh` call; the rest
//! only wait. When the call settles the new pair is persisted, the default
//! `Authorization` header is updated and the waiters are completed in the
//! order they were queued, all with the same outcome.

use super::client::DefaultHeaders;
use super::error::ApiError;
use super::transport::{ApiRequest, Transport};
use crate::session::navigation::{Navigator, SIGN_IN_PATH};
use crate::session::store::{SessionStore, TokenPair};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{info, warn};

pub const REFRESH_PATH: &str = "/refresh";

/// New access token, or the reason the refresh failed.
pub type RefreshOutcome = Result<String, ApiError>;

type Waiter = Box<dyn FnOnce(RefreshOutcome) + Send>;

#[derive(Default)]
struct RefreshState {
    is_refreshing: bool,
    queue: VecDeque<Waiter>,
}

/// What to do with a 401 that is not an expired token.
#[derive(Clone)]
pub enum AuthFailureStrategy {
    /// Browser session: clear the tokens, navigate to sign-in, and hand the
    /// original error back to the caller.
    Interactive(Arc<dyn Navigator>),
    /// Server render: nothing can navigate yet, so return
    /// [`ApiError::InvalidAuthToken`] and let the page guard redirect.
    Declarative,
}

impl std::fmt::Debug for AuthFailureStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailureStrategy::Interactive(_) => f.write_str("Interactive"),
            AuthFailureStrategy::Declarative => f.write_str("Declarative"),
        }
    }
}

/// Owns the refresh state of one logical session.
pub struct RefreshCoordinator {
    transport: Arc<dyn Transport>,
    store: SessionStore,
    strategy: AuthFailureStrategy,
    defaults: DefaultHeaders,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new(
        transport: Arc<dyn Transport>,
        store: SessionStore,
        strategy: AuthFailureStrategy,
    ) -> Self {
        Self {
            transport,
            store,
            strategy,
            defaults: DefaultHeaders::default(),
            state: Mutex::new(RefreshState::default()),
        }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn defaults(&self) -> &DefaultHeaders {
        &self.defaults
    }

    pub async fn is_refreshing(&self) -> bool {
        self.state.lock().await.is_refreshing
    }

    /// Number of waiters queued behind the in-flight refresh.
    pub async fn pending_waiters(&self) -> usize {
        self.state.lock().await.queue.len()
    }

    /// Queues `waiter` and starts a refresh unless one is already in flight.
    ///
    /// The waiter runs exactly once, after the refresh settles, in FIFO order
    /// relative to the other waiters of the same refresh.
    pub async fn enqueue<F>(self: &Arc<Self>, waiter: F)
    where
        F: FnOnce(RefreshOutcome) + Send + 'static,
    {
        let start_refresh = {
            let mut state = self.state.lock().await;
            state.queue.push_back(Box::new(waiter));
            !std::mem::replace(&mut state.is_refreshing, true)
        };

        if start_refresh {
            let coordinator = Arc::clone(self);
            // Runs detached so a caller that stops waiting cannot leave the
            // state stuck in refreshing.
            tokio::spawn(async move { coordinator.run_refresh().await });
        }
    }

    /// Waits for the in-flight (or a new) refresh and returns its outcome.
    pub async fn wait_for_refresh(self: &Arc<Self>) -> RefreshOutcome {
        let (tx, rx) = oneshot::channel();
        self.enqueue(move |outcome| {
            // The receiver is gone if the caller was dropped; nothing to do.
            let _ = tx.send(outcome);
        })
        .await;

        rx.await.unwrap_or_else(|_| {
            Err(ApiError::RefreshFailed(Box::new(ApiError::Network(
                "Refresh task ended without settling".to_string(),
            ))))
        })
    }

    async fn run_refresh(&self) {
        info!("Access token expired, refreshing");

        let outcome = match self.request_token_pair().await {
            Ok(pair) => self.adopt(pair),
            Err(err) => Err(err),
        };

        let waiters = {
            let mut state = self.state.lock().await;
            state.is_refreshing = false;
            std::mem::take(&mut state.queue)
        };

        let outcome = outcome.map_err(|err| ApiError::RefreshFailed(Box::new(err)));
        match &outcome {
            Ok(_) => info!(waiters = waiters.len(), "Token refresh succeeded"),
            Err(err) => warn!(waiters = waiters.len(), error = %err, "Token refresh failed"),
        }

        for waiter in waiters {
            waiter(outcome.clone());
        }
    }

    async fn request_token_pair(&self) -> Result<TokenPair, ApiError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            warn!("No refresh token stored, cannot refresh");
            return Err(ApiError::InvalidAuthToken);
        };

        // Sent with the current (expired) Authorization header: the API reads
        // the user from it.
        let mut request = ApiRequest::post(REFRESH_PATH, json!({ "refreshToken": refresh_token }));
        self.defaults.apply(&mut request);

        self.transport.execute(&request).await?.json::<TokenPair>()
    }

    /// Persists a refreshed pair and makes it the default for later requests.
    fn adopt(&self, pair: TokenPair) -> RefreshOutcome {
        self.defaults.set_bearer(&pair.access_token)?;
        self.store.write(&pair);
        Ok(pair.access_token)
    }

    /// Applies the auth-failure strategy to a 401 that is not an expired
    /// token and returns the error the caller should see.
    pub fn reject_invalid_token(&self, error: ApiError) -> ApiError {
        match &self.strategy {
            AuthFailureStrategy::Interactive(navigator) => {
                warn!(error = %error, "Auth token rejected, signing out");
                self.store.clear();
                self.defaults.clear_bearer();
                navigator.push(SIGN_IN_PATH);
                error
            }
            AuthFailureStrategy::Declarative => {
                warn!(error = %error, "Auth token rejected during server render");
                ApiError::InvalidAuthToken
            }
        }
    }
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("store", &self.store)
            .field("strategy", &self.strategy)
            .finish_non_exhaustive()
    }
}
