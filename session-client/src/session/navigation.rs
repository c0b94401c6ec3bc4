use std::sync::{Mutex, PoisonError};

/// Public landing page, also where sign-in happens.
pub const SIGN_IN_PATH: &str = "/";
/// Landing page for authenticated users.
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Client-side navigation ("router push").
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str);
}

/// Navigator that only records where it was sent.
#[derive(Debug, Default)]
pub struct HistoryNavigator {
    entries: Mutex<Vec<String>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.history().last().cloned()
    }

    pub fn history(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Navigator for HistoryNavigator {
    fn push(&self, path: &str) {
        tracing::debug!(path = %path, "Navigating");
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(path.to_string());
    }
}
