//! Redirect and navigation seams.
//!
//! In a browser these would be `window.location` assignments and router
//! pushes. Here they are traits so tests and headless contexts can record or
//! ignore them.

use std::sync::{Arc, Mutex};

/// In-app routes the client navigates to after a write.
pub struct Route;

impl Route {
    pub const COLLECTION: &'static str = "/collection";
    pub const HOME: &'static str = "/";
}

/// Receives the two globally handled HTTP statuses.
pub trait AuthHandler: Send + Sync {
    /// 401: send the user to the login page.
    fn on_unauthenticated(&self, login_url: &str);

    /// 403: send the user to the membership upgrade page.
    fn on_forbidden(&self, upgrade_url: &str);
}

/// Default handler: logs the redirect and does nothing else.
#[derive(Clone, Default)]
pub struct LogAuthHandler;

impl AuthHandler for LogAuthHandler {
    fn on_unauthenticated(&self, login_url: &str) {
        warn!("Unauthenticated, redirecting to {}", login_url);
    }

    fn on_forbidden(&self, upgrade_url: &str) {
        warn!("Membership required, redirecting to {}", upgrade_url);
    }
}

/// Moves the user between in-app views.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Default navigator: logs the route.
#[derive(Clone, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &str) {
        info!("Navigating to {}", route);
    }
}

/// Records every redirect and navigation, in order.
///
/// Useful in tests and for server-rendered contexts that forward the target.
#[derive(Clone, Default)]
pub struct RecordingNavigator {
    visits: Arc<Mutex<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every target seen so far.
    pub fn visits(&self) -> Vec<String> {
        self.visits
            .lock()
            .map(|v| v.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn record(&self, target: &str) {
        match self.visits.lock() {
            Ok(mut v) => v.push(target.to_string()),
            Err(poisoned) => poisoned.into_inner().push(target.to_string()),
        }
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.record(route);
    }
}

impl AuthHandler for RecordingNavigator {
    fn on_unauthenticated(&self, login_url: &str) {
        self.record(login_url);
    }

    fn on_forbidden(&self, upgrade_url: &str) {
        self.record(upgrade_url);
    }
}
