use larder_core::UserId;

use crate::{JwtClaims, Role};

/// Authenticated caller, derived from validated claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: UserId,
    pub roles: Vec<Role>,
}

impl Principal {
    pub fn new(user_id: UserId, roles: Vec<Role>) -> Self {
        Self { user_id, roles }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(Role::is_admin)
    }
}

impl From<JwtClaims> for Principal {
    fn from(claims: JwtClaims) -> Self {
        Self::new(claims.sub, claims.roles)
    }
}
