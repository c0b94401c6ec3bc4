//! Key-value cookie stores with expiry.
//!
//! [`MemoryCookieStore`] is the ambient store of a browser session.
//! [`RequestCookies`] is scoped to one server-rendered request: it is seeded
//! from the `Cookie` header and collects changes as `Set-Cookie` headers.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Attributes applied when a cookie is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub max_age: Duration,
    pub path: String,
}

/// Minimal cookie storage contract: get, set with expiry, destroy.
///
/// `set_many` / `destroy_many` change several cookies as one step;
/// implementations override them to hold a single lock.
pub trait CookieStore: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;

    fn set(&self, name: &str, value: &str, options: &CookieOptions);

    /// Removes the cookie; absent cookies are ignored.
    fn destroy(&self, name: &str, path: &str);

    fn get_many(&self, names: &[&str]) -> Vec<Option<String>> {
        names.iter().map(|name| self.get(name)).collect()
    }

    fn set_many(&self, entries: &[(&str, &str)], options: &CookieOptions) {
        for (name, value) in entries {
            self.set(name, value, options);
        }
    }

    fn destroy_many(&self, names: &[&str], path: &str) {
        for name in names {
            self.destroy(name, path);
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCookie {
    value: String,
    expires_at: Instant,
}

/// In-process cookie store whose entries expire after their max-age.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    entries: Mutex<HashMap<String, StoredCookie>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, StoredCookie>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn live_value(entries: &mut HashMap<String, StoredCookie>, name: &str) -> Option<String> {
        let expired = match entries.get(name) {
            Some(cookie) if cookie.expires_at > Instant::now() => {
                return Some(cookie.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(name);
        }
        None
    }
}

impl CookieStore for MemoryCookieStore {
    fn get(&self, name: &str) -> Option<String> {
        Self::live_value(&mut self.entries(), name)
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        self.set_many(&[(name, value)], options);
    }

    fn destroy(&self, name: &str, path: &str) {
        self.destroy_many(&[name], path);
    }

    fn get_many(&self, names: &[&str]) -> Vec<Option<String>> {
        let mut entries = self.entries();
        names
            .iter()
            .map(|name| Self::live_value(&mut entries, name))
            .collect()
    }

    fn set_many(&self, values: &[(&str, &str)], options: &CookieOptions) {
        let expires_at = Instant::now() + options.max_age;
        let mut entries = self.entries();
        for (name, value) in values {
            entries.insert(
                name.to_string(),
                StoredCookie {
                    value: value.to_string(),
                    expires_at,
                },
            );
        }
    }

    fn destroy_many(&self, names: &[&str], _path: &str) {
        let mut entries = self.entries();
        for name in names {
            entries.remove(*name);
        }
    }
}

/// Cookies of a single server-rendered request.
#[derive(Debug, Default)]
pub struct RequestCookies {
    jar: Mutex<CookieJar>,
}

impl RequestCookies {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            jar: Mutex::new(CookieJar::from_headers(headers)),
        }
    }

    /// Snapshot of the jar; as a response part it emits one `Set-Cookie` per
    /// change made during the request.
    pub fn jar(&self) -> CookieJar {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, CookieJar> {
        self.jar.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CookieStore for RequestCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.lock().get(name).map(|cookie| cookie.value().to_string())
    }

    fn set(&self, name: &str, value: &str, options: &CookieOptions) {
        self.set_many(&[(name, value)], options);
    }

    fn destroy(&self, name: &str, path: &str) {
        self.destroy_many(&[name], path);
    }

    fn get_many(&self, names: &[&str]) -> Vec<Option<String>> {
        let jar = self.lock();
        names
            .iter()
            .map(|name| jar.get(name).map(|cookie| cookie.value().to_string()))
            .collect()
    }

    fn set_many(&self, entries: &[(&str, &str)], options: &CookieOptions) {
        let max_age = time::Duration::seconds(
            i64::try_from(options.max_age.as_secs()).unwrap_or(i64::MAX),
        );
        let mut jar = self.lock();
        for (name, value) in entries {
            let cookie = Cookie::build((name.to_string(), value.to_string()))
                .path(options.path.clone())
                .max_age(max_age)
                .build();
            *jar = jar.clone().add(cookie);
        }
    }

    fn destroy_many(&self, names: &[&str], path: &str) {
        let mut jar = self.lock();
        for name in names {
            let removal = Cookie::build((name.to_string(), String::new()))
                .path(path.to_string())
                .build();
            *jar = jar.clone().remove(removal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::response::IntoResponse;

    fn options(max_age: Duration) -> CookieOptions {
        CookieOptions {
            max_age,
            path: "/".to_string(),
        }
    }

    #[test]
    fn test_memory_store_round_trip_and_destroy() {
        let store = MemoryCookieStore::new();
        store.set("a", "1", &options(Duration::from_secs(60)));
        assert_eq!(store.get("a").as_deref(), Some("1"));

        store.destroy("a", "/");
        store.destroy("a", "/");
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_memory_store_expires_entries() {
        let store = MemoryCookieStore::new();
        store.set("a", "1", &options(Duration::ZERO));
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn test_request_cookies_read_incoming_header() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "a=1; b=2".parse().unwrap());
        let cookies = RequestCookies::from_headers(&headers);

        assert_eq!(
            cookies.get_many(&["a", "b", "c"]),
            vec![Some("1".to_string()), Some("2".to_string()), None]
        );
    }

    #[test]
    fn test_request_cookies_emit_set_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, "old=1".parse().unwrap());
        let cookies = RequestCookies::from_headers(&headers);

        cookies.set("fresh", "2", &options(Duration::from_secs(2_592_000)));
        cookies.destroy("old", "/");
        assert_eq!(cookies.get("fresh").as_deref(), Some("2"));
        assert_eq!(cookies.get("old"), None);

        let response = (cookies.jar(), "ok").into_response();
        let set_cookies: Vec<String> = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect();

        assert!(set_cookies
            .iter()
            .any(|c| c.starts_with("fresh=2") && c.contains("Max-Age=2592000") && c.contains("Path=/")));
        assert!(set_cookies.iter().any(|c| c.starts_with("old=")));
    }
}
