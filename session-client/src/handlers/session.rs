use super::app::IndexTemplate;
use crate::api::ApiError;
use crate::models::Credentials;
use crate::session::{HistoryNavigator, RequestContext, SessionContext, DASHBOARD_PATH, SIGN_IN_PATH};
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Form,
};
use std::sync::Arc;

fn session_for(state: &AppState, context: &RequestContext) -> (SessionContext, Arc<HistoryNavigator>) {
    let navigator = Arc::new(HistoryNavigator::new());
    let session = SessionContext::new(state.clients.build(Some(context)), navigator.clone());
    (session, navigator)
}

/// Sign-in form post. Tokens land in the response cookies.
pub async fn sign_in(
    State(state): State<AppState>,
    context: RequestContext,
    Form(credentials): Form<Credentials>,
) -> Response {
    let (session, navigator) = session_for(&state, &context);

    match session.sign_in(credentials).await {
        Ok(()) => {
            let destination = navigator.current().unwrap_or_else(|| DASHBOARD_PATH.to_string());
            (context.cookie_jar(), Redirect::to(&destination)).into_response()
        }
        Err(err) => {
            let status = match err {
                ApiError::Network(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::UNAUTHORIZED,
            };
            let page = IndexTemplate {
                error: Some("Could not sign in with these credentials.".to_string()),
            };
            (status, page).into_response()
        }
    }
}

pub async fn sign_out(State(state): State<AppState>, context: RequestContext) -> Response {
    let (session, _) = session_for(&state, &context);
    session.sign_out();
    (context.cookie_jar(), Redirect::to(SIGN_IN_PATH)).into_response()
}
