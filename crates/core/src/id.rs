//! Strongly-typed identifiers used across the domain.
//!
//! Every persisted record is identified by a positive numeric key assigned by
//! the store.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Identifier of a registered user (recipe author, subscriber, cart owner).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

/// Identifier of a recipe.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(i64);

/// Identifier of a catalog ingredient.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(i64);

/// Identifier of a tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(i64);

macro_rules! impl_numeric_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = i64::from_str(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                if value < 1 {
                    return Err(DomainError::invalid_id(format!(
                        "{}: must be positive, got {}",
                        $name, value
                    )));
                }
                Ok(Self(value))
            }
        }
    };
}

impl_numeric_id!(UserId, "UserId");
impl_numeric_id!(RecipeId, "RecipeId");
impl_numeric_id!(IngredientId, "IngredientId");
impl_numeric_id!(TagId, "TagId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positive_ids() {
        let id: RecipeId = "42".parse().unwrap();
        assert_eq!(id.get(), 42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn rejects_non_numeric_and_non_positive_ids() {
        assert!(matches!("abc".parse::<UserId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("0".parse::<TagId>(), Err(DomainError::InvalidId(_))));
        assert!(matches!("-3".parse::<IngredientId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&UserId::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
