use larder_auth::Principal;
use larder_core::UserId;

use crate::app::errors::ApiError;

/// Who is making the request. Inserted by the auth middleware on every route;
/// anonymous callers get `Viewer(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Viewer(Option<Principal>);

impl Viewer {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn authenticated(principal: Principal) -> Self {
        Self(Some(principal))
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.0.as_ref().map(|p| p.user_id)
    }

    /// The principal, or 401 for anonymous callers.
    pub fn require(&self) -> Result<&Principal, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthenticated)
    }
}
