pub mod client;
pub mod error;
pub mod refresh;
pub mod transport;

pub use client::{ApiClient, ClientFactory, DefaultHeaders};
pub use error::{ApiError, TOKEN_EXPIRED_CODE};
pub use refresh::{AuthFailureStrategy, RefreshCoordinator, RefreshOutcome, REFRESH_PATH};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
