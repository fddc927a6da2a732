use thiserror::Error;

/// Errors returned by user store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UserError {
    #[error("Name and email are required")]
    Validation,

    #[error("Email already exists")]
    Conflict { email: String },

    #[error("User not found")]
    NotFound { id: u64 },
}

pub type UserResult<T> = Result<T, UserError>;
