//! User management module.
//!
//! Provides the in-memory user store, with id assignment, email uniqueness
//! and soft deletion, and the service the HTTP layer calls into.

mod error;
mod models;
mod service;
mod store;

pub use error::{UserError, UserResult};
pub use models::{CreateUserRequest, SeedUser, UpdateUserRequest, User, UserStats};
pub use service::UserService;
pub use store::UserStore;
