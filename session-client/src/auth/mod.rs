pub mod claims;
pub mod permissions;

pub use claims::{decode_claims, decode_user, TokenClaims};
pub use permissions::{evaluate, PermissionRequirement};
