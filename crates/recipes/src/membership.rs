//! Membership records: favorites, shopping cart and author subscriptions.
//!
//! All three are unique pairs. Adding an existing pair is a conflict and
//! removing an absent pair is a not-found; neither silently succeeds.

use std::fmt;

use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, UserId};

/// The two (user, recipe) membership relations.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipKind {
    Favorite,
    ShoppingCart,
}

impl MembershipKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Favorite => "favorites",
            Self::ShoppingCart => "shopping cart",
        }
    }

    pub fn already_present(self) -> DomainError {
        DomainError::conflict(format!("recipe is already in {}", self.label()))
    }

    pub fn absent(self) -> DomainError {
        DomainError::not_found(format!("recipe in {}", self.label()))
    }
}

impl fmt::Display for MembershipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A (subscriber, author) pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    subscriber: UserId,
    author: UserId,
}

impl Subscription {
    pub fn new(subscriber: UserId, author: UserId) -> DomainResult<Self> {
        if subscriber == author {
            return Err(DomainError::validation("cannot subscribe to yourself"));
        }
        Ok(Self { subscriber, author })
    }

    pub fn subscriber(&self) -> UserId {
        self.subscriber
    }

    pub fn author(&self) -> UserId {
        self.author
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_subscription_is_rejected() {
        let me = UserId::new(7);
        assert!(matches!(
            Subscription::new(me, me),
            Err(DomainError::Validation(_))
        ));
        let sub = Subscription::new(me, UserId::new(8)).unwrap();
        assert_eq!(sub.author(), UserId::new(8));
    }

    #[test]
    fn membership_errors_carry_the_right_variant() {
        assert!(matches!(
            MembershipKind::ShoppingCart.already_present(),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            MembershipKind::Favorite.absent(),
            DomainError::NotFound(_)
        ));
    }
}
