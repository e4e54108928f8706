use serde::{Deserialize, Serialize};
use std::fmt;

use crate::id::UserId;

/// Role of a user. Exactly one per user, fixed for the duration of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full control, including deletion.
    Owner,
    /// Manages tasks but cannot delete them.
    Admin,
    /// Read-only access.
    Viewer,
    /// Any role string this client does not know; treated as read-only.
    #[serde(other)]
    Unrecognized,
}

impl Role {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Viewer => "viewer",
            Self::Unrecognized => "unrecognized",
        }
    }

    /// Parse a role, mapping unknown values to [`Role::Unrecognized`].
    #[must_use]
    pub fn parse_lenient(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "owner" => Self::Owner,
            "admin" => Self::Admin,
            "viewer" => Self::Viewer,
            _ => Self::Unrecognized,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier.
    pub id: UserId,
    /// Display name.
    #[serde(alias = "username")]
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Assigned role.
    pub role: Role,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_roles_deserialize_as_unrecognized() {
        let json = r#"{"id":"9","name":"Eve","email":"eve@example.com","role":"superuser"}"#;
        let user: User = serde_json::from_str(json).unwrap_or_else(|err| panic!("parse: {err}"));
        assert_eq!(user.role, Role::Unrecognized);
    }

    #[test]
    fn known_roles_round_trip() {
        for role in [Role::Owner, Role::Admin, Role::Viewer] {
            let json = serde_json::to_string(&role).unwrap_or_else(|err| panic!("serialize: {err}"));
            assert_eq!(json, format!("\"{}\"", role.as_str()));
            assert_eq!(Role::parse_lenient(role.as_str()), role);
        }
        assert_eq!(Role::parse_lenient("ADMIN"), Role::Admin);
        assert_eq!(Role::parse_lenient("root"), Role::Unrecognized);
    }
}
