use thiserror::Error;

use larder_core::UserId;

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: only the author or an administrator may {0}")]
    NotAuthor(&'static str),

    #[error("forbidden: administrator role required")]
    AdminRequired,
}

/// Recipe mutation policy: the author, or anyone holding the `admin` role.
///
/// - No IO
/// - No panics
pub fn authorize_author_or_admin(
    principal: &Principal,
    author: UserId,
    action: &'static str,
) -> Result<(), AuthzError> {
    if principal.user_id == author || principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::NotAuthor(action))
    }
}

/// Catalog mutation policy (tags, ingredients).
pub fn require_admin(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn user(id: i64) -> Principal {
        Principal::new(UserId::new(id), vec![])
    }

    fn admin(id: i64) -> Principal {
        Principal::new(UserId::new(id), vec![Role::ADMIN])
    }

    #[test]
    fn author_may_mutate_own_recipe() {
        assert!(authorize_author_or_admin(&user(1), UserId::new(1), "update").is_ok());
    }

    #[test]
    fn stranger_is_forbidden() {
        assert_eq!(
            authorize_author_or_admin(&user(2), UserId::new(1), "delete"),
            Err(AuthzError::NotAuthor("delete"))
        );
    }

    #[test]
    fn admin_overrides_authorship() {
        assert!(authorize_author_or_admin(&admin(9), UserId::new(1), "delete").is_ok());
        assert!(require_admin(&admin(9)).is_ok());
        assert_eq!(require_admin(&user(1)), Err(AuthzError::AdminRequired));
    }

    #[test]
    fn unrelated_roles_grant_nothing() {
        let p = Principal::new(UserId::new(3), vec![Role::new("editor")]);
        assert!(require_admin(&p).is_err());
    }
}
