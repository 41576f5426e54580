//! Access control module
//!
//! Page-level authorization: who may see a page and with what role.
//!
//! ## Model
//!
//! A page grant binds exactly one principal (a user or a group) to a page
//! with a [`Role`]. Roles are totally ordered:
//!
//! ```text
//! reader < writer < admin
//! ```
//!
//! A user's effective role on a page is the highest role among their direct
//! grant and the grants of every group they belong to.
//!
//! A grant can never exceed the role its principal holds in the page's
//! space. The [`validator`] functions hold that rule and the grant-shape
//! rules; the services in [`crate::service`] apply them.

pub mod resolver;
pub mod role;
pub mod types;
pub mod validator;

pub use resolver::AccessResolver;
pub use role::{Role, UnknownRole};
pub use types::{
    GrantTarget, GroupId, NewPagePermission, PageId, PagePermission, PageRef, PermissionId,
    Principal, PrincipalKind, SpaceId, UserId, WorkspaceId,
};
pub use validator::{DEFAULT_MAX_BATCH_SIZE, batch_size_check, escalation_check, shape_check};
