//! Test doubles shared by unit tests.

use crate::api::{ApiError, ApiRequest, ApiResponse, RefreshCoordinator, Transport, REFRESH_PATH};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use http::HeaderMap;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

type Handler = Box<dyn Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync>;

/// Transport answering from a closure and recording every request.
///
/// A gated transport holds each `/refresh` call until
/// [`ScriptedTransport::release_refresh`] is called.
pub struct ScriptedTransport {
    handler: Handler,
    gate: Option<Semaphore>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            gate: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn gated<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> Result<ApiResponse, ApiError> + Send + Sync + 'static,
    {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new(handler)
        }
    }

    /// Lets one held (or the next) `/refresh` call through.
    pub fn release_refresh(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|request| request.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());

        if request.path == REFRESH_PATH {
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
        }

        (self.handler)(request)
    }
}

pub fn ok_json(body: Value) -> Result<ApiResponse, ApiError> {
    Ok(ApiResponse {
        status: 200,
        headers: HeaderMap::new(),
        body,
    })
}

pub fn unauthorized(code: &str) -> ApiError {
    ApiError::from_response(401, json!({ "error": true, "code": code, "message": "Unauthorized" }))
}

pub fn expired() -> ApiError {
    unauthorized("token.expired")
}

/// Unsigned JWT-shaped token carrying `claims`.
pub fn encode_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{}.{}.signature", header, payload)
}

pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

/// Waits until `count` callers are queued behind the in-flight refresh.
pub async fn wait_for_waiters(coordinator: &Arc<RefreshCoordinator>, count: usize) {
    for _ in 0..500 {
        if coordinator.pending_waiters().await >= count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("{} waiters never queued", count);
}
