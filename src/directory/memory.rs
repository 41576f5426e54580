//! In-memory directory
//!
//! Holds pages and space memberships in maps. Used by tests and by embedders
//! that resolve these from somewhere other than SQL.

use crate::access_control::{GroupId, PageId, PageRef, Role, SpaceId, UserId};
use crate::directory::{PageDirectory, SpaceMembership};
use crate::error::DirectoryError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Inner {
    pages: HashMap<PageId, PageRef>,
    user_roles: HashMap<(UserId, SpaceId), Vec<Role>>,
    group_roles: HashMap<(GroupId, SpaceId), Role>,
}

/// Directory backed by in-process maps
#[derive(Default)]
pub struct InMemoryDirectory {
    inner: RwLock<Inner>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, page: PageRef) {
        self.write().pages.insert(page.id, page);
    }

    pub fn remove_page(&self, page_id: PageId) {
        self.write().pages.remove(&page_id);
    }

    /// Record one more space role for a user
    pub fn add_user_role(&self, user_id: UserId, space_id: SpaceId, role: Role) {
        self.write()
            .user_roles
            .entry((user_id, space_id))
            .or_default()
            .push(role);
    }

    pub fn set_group_role(&self, group_id: GroupId, space_id: SpaceId, role: Role) {
        self.write().group_roles.insert((group_id, space_id), role);
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl PageDirectory for InMemoryDirectory {
    async fn find_page(&self, page_id: PageId) -> Result<Option<PageRef>, DirectoryError> {
        Ok(self.read().pages.get(&page_id).copied())
    }
}

#[async_trait]
impl SpaceMembership for InMemoryDirectory {
    async fn user_space_roles(
        &self,
        user_id: UserId,
        space_id: SpaceId,
    ) -> Result<Vec<Role>, DirectoryError> {
        Ok(self
            .read()
            .user_roles
            .get(&(user_id, space_id))
            .cloned()
            .unwrap_or_default())
    }

    async fn group_space_role(
        &self,
        group_id: GroupId,
        space_id: SpaceId,
    ) -> Result<Option<Role>, DirectoryError> {
        Ok(self.read().group_roles.get(&(group_id, space_id)).copied())
    }
}
