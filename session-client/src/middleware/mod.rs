pub mod ssr_auth;

pub use ssr_auth::{with_ssr_auth, GuardedPage, PageRedirect, PageResult};
