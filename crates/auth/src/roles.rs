use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role name carried in a token's `roles` claim.
///
/// Only the administrator role grants anything (catalog writes and editing
/// other authors' recipes). Names are compared case-insensitively; anything
/// else is carried through to `/whoami` untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

impl Role {
    pub const ADMIN: Role = Role(Cow::Borrowed("admin"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0.trim().eq_ignore_ascii_case(Self::ADMIN.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_matches_regardless_of_case() {
        assert!(Role::ADMIN.is_admin());
        assert!(Role::new("Admin").is_admin());
        assert!(!Role::new("administrator").is_admin());
    }

    #[test]
    fn roles_deserialize_from_plain_strings() {
        let roles: Vec<Role> = serde_json::from_str(r#"["admin","editor"]"#).unwrap();
        assert_eq!(roles[1].as_str(), "editor");
        assert!(roles[0].is_admin());
    }
}
