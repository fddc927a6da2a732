//! userd library
//!
//! An in-memory user records service: the user store with its id, uniqueness
//! and soft-deletion rules, the axum API in front of it, and configuration.

pub mod api;
pub mod settings;
pub mod user;
