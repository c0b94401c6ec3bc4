pub mod context;
pub mod cookies;
pub mod navigation;
pub mod request;
pub mod store;

pub use context::SessionContext;
pub use cookies::{CookieOptions, CookieStore, MemoryCookieStore, RequestCookies};
pub use navigation::{HistoryNavigator, Navigator, DASHBOARD_PATH, SIGN_IN_PATH};
pub use request::RequestContext;
pub use store::{SessionStore, TokenPair, REFRESH_TOKEN_COOKIE, TOKEN_COOKIE};
