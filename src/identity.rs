use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;
use uuid::Uuid;

use crate::errors::ApiError;

/// The authenticated user, inserted into request extensions by the host's
/// authentication middleware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
}

/// Who is making the request, if anyone.
///
/// Extraction never fails; the user is only required once an auditable view
/// model has to be stamped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Identity {
    user: Option<CurrentUser>,
}

impl Identity {
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { user: None }
    }

    #[must_use]
    pub const fn user(id: Uuid) -> Self {
        Self {
            user: Some(CurrentUser { id }),
        }
    }

    #[must_use]
    pub const fn current_user(&self) -> Option<CurrentUser> {
        self.user
    }

    /// The authenticated user's id.
    ///
    /// # Errors
    /// Returns `ApiError::Unauthorized` when nobody is signed in.
    pub fn user_id(&self) -> Result<Uuid, ApiError> {
        self.user
            .map(|user| user.id)
            .ok_or_else(|| ApiError::unauthorized("Authentication is required to modify records"))
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            user: parts.extensions.get::<CurrentUser>().copied(),
        })
    }
}
