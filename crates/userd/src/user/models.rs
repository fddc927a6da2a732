//! User data models.

use serde::{Deserialize, Serialize};

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned identifier, never reused.
    pub id: u64,
    /// Display name, trimmed.
    pub name: String,
    /// Email address, trimmed and lowercased.
    pub email: String,
    /// `false` once the user has been soft-deleted.
    pub active: bool,
}

/// Request body for creating a user.
///
/// Both fields are optional at the wire level so that a missing field is
/// reported as a validation error rather than a body rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl CreateUserRequest {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// A user entry from configuration, loaded into the store at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
}

impl SeedUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }

    /// The two users the service starts with when nothing else is configured.
    pub fn defaults() -> Vec<SeedUser> {
        vec![
            SeedUser::new("John Doe", "john@example.com"),
            SeedUser::new("Jane Smith", "jane@example.com"),
        ]
    }
}

/// User counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub active: usize,
    pub total: usize,
}

/// Trim surrounding whitespace from a name.
pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_string()
}

/// Trim and lowercase an email so comparisons ignore case and padding.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalize an optional field, dropping it if nothing is left after trimming.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  John@Example.COM "), "john@example.com");
        assert_eq!(normalize_email("a@b.c"), "a@b.c");
    }

    #[test]
    fn test_normalize_name_keeps_case() {
        assert_eq!(normalize_name("  Jane Smith\t"), "Jane Smith");
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("x")), Some("x"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_user_serializes_flat() {
        let user = User {
            id: 7,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            active: true,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": 7,
                "name": "Ada",
                "email": "ada@example.com",
                "active": true
            })
        );
    }
}
