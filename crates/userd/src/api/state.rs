//! Application state shared across handlers.

use std::path::PathBuf;
use std::time::Instant;

use crate::user::UserService;

/// Static metadata reported by `/status`.
#[derive(Clone, Debug)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// User service.
    pub users: UserService,
    /// Service metadata.
    pub info: ServiceInfo,
    /// Directory served for paths no route matches, if any.
    pub static_dir: Option<PathBuf>,
    /// When the process started serving; `/health` reports uptime from it.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new application state.
    pub fn new(users: UserService) -> Self {
        Self {
            users,
            info: ServiceInfo::default(),
            static_dir: None,
            started_at: Instant::now(),
        }
    }

    /// Serve static files from `dir` for unmatched paths.
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }
}
