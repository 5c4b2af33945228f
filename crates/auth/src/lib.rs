//! `larder-auth` — bearer-token authentication and recipe authorization.
//!
//! Decoupled from HTTP and storage: the API layer extracts the token, this
//! crate turns it into a [`Principal`] and answers policy questions.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod roles;

pub use authorize::{AuthzError, authorize_author_or_admin, require_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use principal::Principal;
pub use roles::Role;
