use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::identity::Identity;

/// View models that record who created and last modified a row.
pub trait Auditable {
    fn set_created_by(&mut self, user: Uuid);
    fn set_created_on(&mut self, at: DateTime<Utc>);
    fn set_modified_by(&mut self, user: Uuid);
    fn set_modified_on(&mut self, at: DateTime<Utc>);
}

/// Stamp a view model about to be inserted: created and modified fields get
/// the same user and the same instant.
///
/// A view model without audit fields is left alone and the identity is not
/// consulted.
///
/// # Errors
/// Returns `ApiError::Unauthorized` when the view model is auditable and no
/// user is signed in.
pub fn stamp_insert(
    target: Option<&mut dyn Auditable>,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let Some(target) = target else {
        return Ok(());
    };
    let user = identity.user_id()?;
    target.set_created_by(user);
    target.set_created_on(now);
    target.set_modified_by(user);
    target.set_modified_on(now);
    Ok(())
}

/// Stamp a view model about to be updated. Only the modified fields change.
///
/// # Errors
/// Returns `ApiError::Unauthorized` when the view model is auditable and no
/// user is signed in.
pub fn stamp_update(
    target: Option<&mut dyn Auditable>,
    identity: &Identity,
    now: DateTime<Utc>,
) -> Result<(), ApiError> {
    let Some(target) = target else {
        return Ok(());
    };
    let user = identity.user_id()?;
    target.set_modified_by(user);
    target.set_modified_on(now);
    Ok(())
}
