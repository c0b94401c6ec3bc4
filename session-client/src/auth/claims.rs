use crate::api::ApiError;
use crate::models::User;
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::collections::BTreeSet;

/// Claims carried in the access token payload.
///
/// The API signs `{ permissions, roles }` with the email as subject; some
/// issuers also add an explicit `email` claim.
#[derive(Debug, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: BTreeSet<String>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

/// Decode JWT claims without validation.
///
/// The signature is NOT checked. Claims only drive UX gating; the API
/// enforces access on every call with the same token.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ApiError> {
    let parts: Vec<&str> = token.split('.').collect();

    if parts.len() != 3 {
        return Err(ApiError::Decode("Invalid JWT format".to_string()));
    }

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|e| ApiError::Decode(format!("Failed to decode JWT payload: {}", e)))?;

    serde_json::from_slice(&payload)
        .map_err(|e| ApiError::Decode(format!("Failed to parse JWT claims: {}", e)))
}

/// Decodes the token and builds the [`User`] it describes.
pub fn decode_user(token: &str) -> Result<User, ApiError> {
    let claims = decode_claims(token)?;

    Ok(User {
        email: claims.email.or(claims.sub).unwrap_or_default(),
        permissions: claims.permissions,
        roles: claims.roles,
    })
}
