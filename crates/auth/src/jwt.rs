//! HS256 bearer-token verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use crate::{JwtClaims, TokenValidationError, validate_claims};

/// Verifies a raw bearer token and returns its claims.
pub trait JwtValidator: Send + Sync {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError>;
}

pub struct Hs256JwtValidator {
    key: DecodingKey,
    validation: Validation,
}

impl Hs256JwtValidator {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry lives in `expires_at` (RFC 3339), checked by `validate_claims`.
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        Self {
            key: DecodingKey::from_secret(secret.as_ref()),
            validation,
        }
    }
}

impl JwtValidator for Hs256JwtValidator {
    fn validate(&self, token: &str, now: DateTime<Utc>) -> Result<JwtClaims, TokenValidationError> {
        let data = decode::<JwtClaims>(token, &self.key, &self.validation).map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            TokenValidationError::Malformed(e.to_string())
        })?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use larder_core::UserId;

    use crate::Role;

    fn mint(secret: &str, claims: &JwtClaims) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(now: DateTime<Utc>) -> JwtClaims {
        JwtClaims {
            sub: UserId::new(42),
            roles: vec![Role::ADMIN],
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn accepts_token_signed_with_same_secret() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        let decoded = Hs256JwtValidator::new("s3cret").validate(&token, now).unwrap();
        assert_eq!(decoded.sub, UserId::new(42));
        assert_eq!(decoded.roles, vec![Role::ADMIN]);
    }

    #[test]
    fn rejects_wrong_secret_and_garbage() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now));
        let validator = Hs256JwtValidator::new("other");
        assert!(matches!(
            validator.validate(&token, now),
            Err(TokenValidationError::Malformed(_))
        ));
        assert!(validator.validate("not.a.jwt", now).is_err());
    }

    #[test]
    fn rejects_expired_token() {
        let now = Utc::now();
        let token = mint("s3cret", &claims(now - Duration::hours(1)));
        assert_eq!(
            Hs256JwtValidator::new("s3cret").validate(&token, now),
            Err(TokenValidationError::Expired)
        );
    }
}
