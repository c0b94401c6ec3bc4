#![allow(dead_code)]

use axum::Router;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{json, Value};
use session_client::api::ReqwestTransport;
use session_client::config::ApiSettings;
use session_client::startup::{build_router, server_client_factory};
use session_client::AppState;
use std::sync::Arc;
use wiremock::ResponseTemplate;

pub fn api_settings(base_url: &str) -> ApiSettings {
    ApiSettings {
        base_url: base_url.to_string(),
        timeout_secs: 5,
    }
}

pub fn transport(base_url: &str) -> Arc<ReqwestTransport> {
    Arc::new(ReqwestTransport::new(&api_settings(base_url)).expect("transport"))
}

pub fn app(base_url: &str) -> Router {
    let clients = Arc::new(server_client_factory(transport(base_url)));
    build_router(AppState::new(clients))
}

/// Unsigned JWT-shaped token carrying `claims`.
pub fn token(claims: Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub fn session_cookie(access_token: &str, refresh_token: &str) -> String {
    format!(
        "nextauth.token={}; nextauth.refreshToken={}",
        access_token, refresh_token
    )
}

pub fn expired() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "error": true,
        "code": "token.expired",
        "message": "Token expired.",
    }))
}

pub fn invalid() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({
        "error": true,
        "code": "token.invalid",
        "message": "Invalid token.",
    }))
}

pub fn token_pair(access_token: &str, refresh_token: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "token": access_token,
        "refreshToken": refresh_token,
    }))
}
