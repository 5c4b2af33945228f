use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, Entity, UserId, validate};

pub const USERNAME_MAX: usize = 150;
pub const NAME_MAX: usize = 150;

/// Reserved because `/users/me` addresses the caller's own profile.
const RESERVED_USERNAME: &str = "me";

/// Public user profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct UserDraft {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserDraft {
    pub fn validate(self) -> DomainResult<NewUser> {
        Ok(NewUser {
            email: validate::email("email", &self.email)?,
            username: username(&self.username)?,
            first_name: validate::bounded_text("first_name", &self.first_name, NAME_MAX)?,
            last_name: validate::bounded_text("last_name", &self.last_name, NAME_MAX)?,
        })
    }
}

/// Partial profile update.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl ProfilePatch {
    pub fn validate(self) -> DomainResult<ProfileChanges> {
        Ok(ProfileChanges {
            email: self.email.map(|e| validate::email("email", &e)).transpose()?,
            username: self.username.map(|u| username(&u)).transpose()?,
            first_name: self
                .first_name
                .map(|n| validate::bounded_text("first_name", &n, NAME_MAX))
                .transpose()?,
            last_name: self
                .last_name
                .map(|n| validate::bounded_text("last_name", &n, NAME_MAX))
                .transpose()?,
        })
    }
}

impl ProfileChanges {
    pub fn apply(&self, current: &User) -> User {
        User {
            id: current.id,
            email: self.email.clone().unwrap_or_else(|| current.email.clone()),
            username: self.username.clone().unwrap_or_else(|| current.username.clone()),
            first_name: self
                .first_name
                .clone()
                .unwrap_or_else(|| current.first_name.clone()),
            last_name: self
                .last_name
                .clone()
                .unwrap_or_else(|| current.last_name.clone()),
        }
    }
}

fn username(raw: &str) -> DomainResult<String> {
    let value = validate::bounded_text("username", raw, USERNAME_MAX)?;
    validate::username("username", &value)?;
    if value.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(DomainError::invalid_field(
            "username",
            format!("\"{value}\" cannot be used as a username"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(username: &str) -> UserDraft {
        UserDraft {
            email: "anna@example.com".to_string(),
            username: username.to_string(),
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
        }
    }

    #[test]
    fn registration_accepts_valid_profile() {
        let user = draft("anna_p").validate().unwrap();
        assert_eq!(user.username, "anna_p");
        assert_eq!(user.email, "anna@example.com");
    }

    #[test]
    fn reserved_username_is_rejected() {
        assert_eq!(draft("me").validate().unwrap_err().field(), Some("username"));
        assert_eq!(draft("ME").validate().unwrap_err().field(), Some("username"));
    }

    #[test]
    fn username_pattern_is_enforced() {
        assert_eq!(draft("anna p").validate().unwrap_err().field(), Some("username"));
    }

    #[test]
    fn patch_overlays_only_given_fields() {
        let current = User {
            id: UserId::new(1),
            email: "anna@example.com".to_string(),
            username: "anna".to_string(),
            first_name: "Anna".to_string(),
            last_name: "Petrova".to_string(),
        };
        let changes = ProfilePatch {
            last_name: Some("Ivanova".to_string()),
            ..ProfilePatch::default()
        }
        .validate()
        .unwrap();
        let updated = changes.apply(&current);
        assert_eq!(updated.last_name, "Ivanova");
        assert_eq!(updated.username, "anna");
    }
}
