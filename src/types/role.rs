use std::fmt;

use serde::{Deserialize, Serialize};

/// Role of an account. Every protected route checks the caller's role
/// against an allow-list of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
    Owner,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Owner];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
            Role::Owner => "OWNER",
        }
    }

    /// Parses the wire representation (`ADMIN`, `USER`, `OWNER`).
    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "ADMIN" => Some(Role::Admin),
            "USER" => Some(Role::User),
            "OWNER" => Some(Role::Owner),
            _ => None,
        }
    }

    /// Returns true if this role appears in the allow-list.
    #[must_use]
    pub fn is_allowed(self, allowed: &[Role]) -> bool {
        allowed.contains(&self)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
