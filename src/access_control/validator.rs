//! Grant validation
//!
//! Pure checks run before any mutation. None of these touch storage.

use crate::access_control::role::Role;
use crate::access_control::types::{GrantTarget, Principal, PrincipalKind};
use crate::error::GrantError;

/// Default upper bound on ids per principal kind in one batch request
pub const DEFAULT_MAX_BATCH_SIZE: usize = 25;

/// Require exactly one of user or group on a grant target
pub fn shape_check(target: &GrantTarget) -> Result<Principal, GrantError> {
    match (target.user_id, target.group_id) {
        (Some(user), None) => Ok(Principal::User(user)),
        (None, Some(group)) => Ok(Principal::Group(group)),
        (None, None) => Err(GrantError::neither_principal()),
        (Some(_), Some(_)) => Err(GrantError::both_principals()),
    }
}

/// Reject a page role that outranks the principal's highest space role.
///
/// A principal without any space role is not capped.
pub fn escalation_check(requested: Role, space_role: Option<Role>) -> Result<(), GrantError> {
    match space_role {
        Some(cap) if requested.exceeds(Some(cap)) => {
            Err(GrantError::RoleEscalation { requested, cap })
        }
        _ => Ok(()),
    }
}

/// Bound the number of ids of one principal kind in a batch
pub fn batch_size_check(kind: PrincipalKind, len: usize, max: usize) -> Result<(), GrantError> {
    if len > max {
        return Err(GrantError::BatchTooLarge { kind, len, max });
    }
    Ok(())
}
