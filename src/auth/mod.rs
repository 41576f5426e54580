//! Authentication and authorization module
//!
//! [`AuthUser`] identifies the caller; [`SpaceAbility`] decides whether the
//! caller may read or manage page permissions in a space.

pub mod ability;
pub mod identity;

pub use ability::{RoleAbility, SharedSpaceAbility, SpaceAbility, SpaceAction, SpaceSubject};
pub use identity::{AuthUser, USER_ID_HEADER};
