use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use larder_core::UserId;

use crate::Role;

/// JWT claims model (transport-agnostic).
///
/// This is the minimal set of claims the API expects once a token has been
/// decoded and its signature verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject: the numeric id of the registered user.
    pub sub: UserId,

    #[serde(default)]
    pub roles: Vec<Role>,

    pub issued_at: DateTime<Utc>,

    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("malformed or forged token: {0}")]
    Malformed(String),
}

/// Validate the claim time window.
///
/// Signature verification happens in [`crate::jwt`]; this only checks the
/// decoded claims against `now`.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.expires_at <= claims.issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.expires_at {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn claims(issued: DateTime<Utc>, ttl_minutes: i64) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(1),
            roles: vec![],
            issued_at: issued,
            expires_at: issued + Duration::minutes(ttl_minutes),
        }
    }

    #[test]
    fn time_window_is_enforced() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims(now, 10), now), Ok(()));
        assert_eq!(
            validate_claims(&claims(now - Duration::minutes(20), 10), now),
            Err(TokenValidationError::Expired)
        );
        assert_eq!(
            validate_claims(&claims(now + Duration::minutes(1), 10), now),
            Err(TokenValidationError::NotYetValid)
        );
        assert_eq!(
            validate_claims(&claims(now, 0), now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn roles_default_to_empty() {
        let json = r#"{"sub":5,"issued_at":"2026-01-01T00:00:00Z","expires_at":"2026-01-01T01:00:00Z"}"#;
        let parsed: JwtClaims = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.sub, UserId::new(5));
        assert!(parsed.roles.is_empty());
    }
}
