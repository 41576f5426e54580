//! Grant pipelines
//!
//! [`GrantService`] creates, updates, removes and lists single grants.
//! [`BatchGrantService`] grants one role to many principals in one call.
//! Both depend only on the [`PermissionStore`](crate::store::PermissionStore)
//! and the [`directory`](crate::directory) collaborators handed to them.

pub mod batch;
pub mod grant;

pub use batch::{BatchEntry, BatchGrantService, BatchOutcome, BatchStatus};
pub use grant::GrantService;

use crate::access_control::{PageId, PageRef, Principal, Role, SpaceId};
use crate::directory::{PageDirectory, SpaceMembership};
use crate::error::{DirectoryError, GrantError, GrantResult};
use tracing::debug;

/// Resolve a page or fail with [`GrantError::PageNotFound`]
pub(crate) async fn require_page(
    pages: &dyn PageDirectory,
    page_id: PageId,
) -> GrantResult<PageRef> {
    pages
        .find_page(page_id)
        .await?
        .ok_or(GrantError::PageNotFound)
}

/// The space role that caps what `principal` may be granted.
///
/// Users take the highest of their direct and group-derived space roles;
/// groups take the role of their own space membership.
pub(crate) async fn space_role_cap(
    spaces: &dyn SpaceMembership,
    principal: Principal,
    space_id: SpaceId,
) -> Result<Option<Role>, DirectoryError> {
    let cap = match principal {
        Principal::User(user_id) => spaces.highest_user_space_role(user_id, space_id).await?,
        Principal::Group(group_id) => spaces.group_space_role(group_id, space_id).await?,
    };
    debug!(
        principal = %principal,
        space = %space_id,
        cap = cap.map(Role::as_str).unwrap_or("none"),
        "Space role cap resolved"
    );
    Ok(cap)
}
