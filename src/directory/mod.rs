//! External collaborators
//!
//! The permission engine consumes pages and space memberships but never owns
//! them. These traits are the seam: [`SqliteDirectory`] reads the host's
//! tables, [`InMemoryDirectory`] is a substitutable fake.

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryDirectory;
pub use sqlite::{SqliteDirectory, ensure_host_schema};

use crate::access_control::{GroupId, PageId, PageRef, Role, SpaceId, UserId};
use crate::error::DirectoryError;
// async_trait required for dyn-compatibility with Arc<dyn PageDirectory>
use async_trait::async_trait;
use std::sync::Arc;

/// Page lookup
#[async_trait]
pub trait PageDirectory: Send + Sync {
    /// Resolve a page, `None` if it does not exist
    async fn find_page(&self, page_id: PageId) -> Result<Option<PageRef>, DirectoryError>;
}

/// Space-level role lookup
#[async_trait]
pub trait SpaceMembership: Send + Sync {
    /// Every role the user holds in the space, directly or through groups
    async fn user_space_roles(
        &self,
        user_id: UserId,
        space_id: SpaceId,
    ) -> Result<Vec<Role>, DirectoryError>;

    /// The role attached to the group's own membership of the space
    async fn group_space_role(
        &self,
        group_id: GroupId,
        space_id: SpaceId,
    ) -> Result<Option<Role>, DirectoryError>;

    /// Highest role the user holds in the space
    async fn highest_user_space_role(
        &self,
        user_id: UserId,
        space_id: SpaceId,
    ) -> Result<Option<Role>, DirectoryError> {
        Ok(Role::highest(self.user_space_roles(user_id, space_id).await?))
    }
}

pub type SharedPageDirectory = Arc<dyn PageDirectory>;
pub type SharedSpaceMembership = Arc<dyn SpaceMembership>;
