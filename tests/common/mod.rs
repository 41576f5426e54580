//! Shared fixtures for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use pagewarden::access_control::{
    AccessResolver, GroupId, NewPagePermission, PageId, PagePermission, PageRef, PermissionId,
    Role, SpaceId, UserId, WorkspaceId,
};
use pagewarden::auth::RoleAbility;
use pagewarden::config::DatabaseConfig;
use pagewarden::directory::{SqliteDirectory, ensure_host_schema};
use pagewarden::error::StoreResult;
use pagewarden::server::AppState;
use pagewarden::service::{BatchGrantService, GrantService};
use pagewarden::store::sqlite::connect;
use pagewarden::store::{
    PagePermissionListing, Paginated, Pagination, PermissionStore, SharedPermissionStore,
    SqlitePermissionStore,
};
use sqlx::sqlite::SqlitePool;
use std::collections::HashSet;
use std::sync::Arc;

pub const MAX_BATCH: usize = 25;

/// An in-memory database with every table created and the services wired
pub struct Harness {
    pub pool: SqlitePool,
    pub store: SharedPermissionStore,
    pub directory: Arc<SqliteDirectory>,
}

impl Harness {
    pub async fn new() -> Self {
        let pool = connect(&DatabaseConfig::in_memory()).await.unwrap();
        ensure_host_schema(&pool).await.unwrap();
        let store = SqlitePermissionStore::new(pool.clone());
        store.init_schema().await.unwrap();

        Self {
            directory: Arc::new(SqliteDirectory::new(pool.clone())),
            store: Arc::new(store),
            pool,
        }
    }

    pub fn grants(&self) -> GrantService {
        self.grants_over(self.store.clone())
    }

    /// Grant service over a substitute store
    pub fn grants_over(&self, store: SharedPermissionStore) -> GrantService {
        GrantService::new(self.directory.clone(), self.directory.clone(), store)
    }

    pub fn batch(&self) -> BatchGrantService {
        self.batch_over(self.store.clone())
    }

    pub fn batch_over(&self, store: SharedPermissionStore) -> BatchGrantService {
        BatchGrantService::new(
            self.directory.clone(),
            self.directory.clone(),
            store,
            MAX_BATCH,
        )
    }

    pub fn resolver(&self) -> AccessResolver {
        AccessResolver::new(self.store.clone())
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.directory.clone(),
            self.directory.clone(),
            self.store.clone(),
            Arc::new(RoleAbility::new(self.directory.clone())),
            MAX_BATCH,
        )
    }

    /// A page in a fresh space and workspace
    pub async fn page(&self) -> PageRef {
        self.page_in(SpaceId::generate()).await
    }

    pub async fn page_in(&self, space_id: SpaceId) -> PageRef {
        let page = PageRef {
            id: PageId::generate(),
            space_id,
            workspace_id: WorkspaceId::generate(),
        };
        sqlx::query("INSERT INTO pages (id, space_id, workspace_id) VALUES (?1, ?2, ?3)")
            .bind(page.id.to_string())
            .bind(page.space_id.to_string())
            .bind(page.workspace_id.to_string())
            .execute(&self.pool)
            .await
            .unwrap();
        page
    }

    pub async fn user(&self, name: &str) -> UserId {
        let id = UserId::generate();
        sqlx::query("INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)")
            .bind(id.to_string())
            .bind(name)
            .bind(format!("{name}@example.com"))
            .execute(&self.pool)
            .await
            .unwrap();
        id
    }

    pub async fn users(&self, count: usize) -> Vec<UserId> {
        let mut ids = Vec::with_capacity(count);
        for i in 0..count {
            ids.push(self.user(&format!("user{i}")).await);
        }
        ids
    }

    pub async fn group(&self, name: &str) -> GroupId {
        let id = GroupId::generate();
        sqlx::query(r#"INSERT INTO "groups" (id, name) VALUES (?1, ?2)"#)
            .bind(id.to_string())
            .bind(name)
            .execute(&self.pool)
            .await
            .unwrap();
        id
    }

    pub async fn add_to_group(&self, group_id: GroupId, user_id: UserId) {
        sqlx::query("INSERT INTO group_users (group_id, user_id) VALUES (?1, ?2)")
            .bind(group_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn space_role(&self, user_id: UserId, space_id: SpaceId, role: Role) {
        sqlx::query("INSERT INTO space_members (space_id, user_id, role) VALUES (?1, ?2, ?3)")
            .bind(space_id.to_string())
            .bind(user_id.to_string())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .unwrap();
    }

    pub async fn group_space_role(&self, group_id: GroupId, space_id: SpaceId, role: Role) {
        sqlx::query("INSERT INTO space_members (space_id, group_id, role) VALUES (?1, ?2, ?3)")
            .bind(space_id.to_string())
            .bind(group_id.to_string())
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .unwrap();
    }
}

/// Store whose lookups never find anything.
///
/// Simulates a concurrent writer that inserts between a caller's existence
/// check and its insert.
pub struct BlindStore(pub SharedPermissionStore);

#[async_trait]
impl PermissionStore for BlindStore {
    async fn find_by_id(&self, id: PermissionId) -> StoreResult<Option<PagePermission>> {
        self.0.find_by_id(id).await
    }

    async fn find_by_page_and_user(
        &self,
        _: PageId,
        _: UserId,
    ) -> StoreResult<Option<PagePermission>> {
        Ok(None)
    }

    async fn find_by_page_and_group(
        &self,
        _: PageId,
        _: GroupId,
    ) -> StoreResult<Option<PagePermission>> {
        Ok(None)
    }

    async fn existing_user_ids(&self, _: PageId, _: &[UserId]) -> StoreResult<HashSet<UserId>> {
        Ok(HashSet::new())
    }

    async fn existing_group_ids(&self, _: PageId, _: &[GroupId]) -> StoreResult<HashSet<GroupId>> {
        Ok(HashSet::new())
    }

    async fn insert(&self, grant: NewPagePermission) -> StoreResult<PagePermission> {
        self.0.insert(grant).await
    }

    async fn insert_many(&self, grants: &[NewPagePermission]) -> StoreResult<Vec<bool>> {
        self.0.insert_many(grants).await
    }

    async fn update_role(&self, id: PermissionId, role: Role) -> StoreResult<Option<PagePermission>> {
        self.0.update_role(id, role).await
    }

    async fn delete(&self, id: PermissionId) -> StoreResult<bool> {
        self.0.delete(id).await
    }

    async fn list_for_page(
        &self,
        page_id: PageId,
        pagination: Pagination,
    ) -> StoreResult<Paginated<PagePermissionListing>> {
        self.0.list_for_page(page_id, pagination).await
    }

    async fn user_page_roles(&self, user_id: UserId, page_id: PageId) -> StoreResult<Vec<Role>> {
        self.0.user_page_roles(user_id, page_id).await
    }

    async fn delete_for_page(&self, page_id: PageId) -> StoreResult<u64> {
        self.0.delete_for_page(page_id).await
    }

    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        self.0.delete_for_user(user_id).await
    }

    async fn delete_for_group(&self, group_id: GroupId) -> StoreResult<u64> {
        self.0.delete_for_group(group_id).await
    }
}
