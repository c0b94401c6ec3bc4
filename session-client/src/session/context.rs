use super::navigation::{Navigator, DASHBOARD_PATH, SIGN_IN_PATH};
use super::store::{SessionStore, TokenPair};
use crate::api::{ApiClient, ApiError, ApiRequest};
use crate::auth::{evaluate, PermissionRequirement};
use crate::models::{Credentials, User};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

pub const ME_PATH: &str = "/me";
pub const SESSIONS_PATH: &str = "/sessions";

#[derive(Debug, Deserialize)]
struct SessionResponse {
    #[serde(flatten)]
    tokens: TokenPair,
    #[serde(default)]
    permissions: BTreeSet<String>,
    #[serde(default)]
    roles: BTreeSet<String>,
}

/// Authentication state of a browser session.
pub struct SessionContext {
    client: ApiClient,
    navigator: Arc<dyn Navigator>,
    user: watch::Sender<Option<User>>,
}

impl SessionContext {
    pub fn new(client: ApiClient, navigator: Arc<dyn Navigator>) -> Self {
        let (user, _) = watch::channel(None);
        Self {
            client,
            navigator,
            user,
        }
    }

    fn store(&self) -> &SessionStore {
        self.client.store()
    }

    /// Restores the user from a stored token; signs out if the API rejects it.
    pub async fn mount(&self) {
        if self.store().access_token().is_none() {
            return;
        }

        match self.client.get::<User>(ME_PATH).await {
            Ok(user) => {
                info!(user = %user.email, "Session restored");
                self.user.send_replace(Some(user));
            }
            Err(err) => {
                warn!(error = %err, "Failed to restore session");
                self.sign_out();
            }
        }
    }

    pub async fn sign_in(&self, credentials: Credentials) -> Result<(), ApiError> {
        let response = self.create_session(&credentials).await.map_err(|err| {
            error!(user = %credentials.email, error = %err, "Sign in failed");
            err
        })?;

        self.store().write(&response.tokens);

        let user = User::new(credentials.email)
            .with_permissions(response.permissions)
            .with_roles(response.roles);
        info!(user = %user.email, "Signed in");
        self.user.send_replace(Some(user));

        self.navigator.push(DASHBOARD_PATH);
        Ok(())
    }

    /// Exchanges credentials for a token pair and makes it the default.
    ///
    /// A 401 here means wrong credentials, not a stale session, so it skips
    /// token refresh and the auth-failure strategy.
    async fn create_session(&self, credentials: &Credentials) -> Result<SessionResponse, ApiError> {
        let request = ApiRequest::post(SESSIONS_PATH, credentials.to_body()).without_auth_recovery();
        let response: SessionResponse = self.client.send(request).await?.json()?;
        self.client.set_authorization(&response.tokens.access_token)?;
        Ok(response)
    }

    pub fn sign_out(&self) {
        self.store().clear();
        self.client.clear_authorization();
        if self.user.send_replace(None).is_some() {
            info!("Signed out");
        }
        self.navigator.push(SIGN_IN_PATH);
    }

    pub fn user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    /// Whether the signed-in user satisfies `requirement`.
    pub fn can(&self, requirement: &PermissionRequirement) -> bool {
        self.user
            .borrow()
            .as_ref()
            .is_some_and(|user| evaluate(user, requirement))
    }
}
