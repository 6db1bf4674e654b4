//! Navigation collaborator
//!
//! Stores never render anything; when a repository is renamed they ask the
//! host to move to the new route through this trait.

use crate::app_log;
use crate::logger::LogLevel;
use std::sync::Mutex;

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Logs the route and does nothing else
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn navigate(&self, route: &str) {
        app_log!(LogLevel::Debug, "Navigation requested to {}", route);
    }
}

/// Captures every requested route, in order
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> Vec<String> {
        self.routes.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn last_route(&self) -> Option<String> {
        self.routes.lock().ok().and_then(|r| r.last().cloned())
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route.to_string());
        }
    }
}
