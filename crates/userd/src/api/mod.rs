//! HTTP API module.
//!
//! Provides the REST endpoints for user records plus the home page, health
//! and status endpoints.

mod error;
mod extract;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use extract::Payload;
pub use routes::{create_router, finish_router, routes};
pub use state::{AppState, ServiceInfo};
