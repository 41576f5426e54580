//! Page permission request handlers
//!
//! Every handler resolves the caller, runs the space ability gate for the
//! page's space, then hands off to the grant services.

use crate::access_control::{
    AccessResolver, GrantTarget, GroupId, PageId, PagePermission, PageRef, PermissionId, Role,
    UserId,
};
use crate::auth::{AuthUser, RoleAbility, SharedSpaceAbility, SpaceAction, SpaceSubject};
use crate::config::GrantsConfig;
use crate::directory::{
    SharedPageDirectory, SharedSpaceMembership, SqliteDirectory, ensure_host_schema,
};
use crate::error::http_mapper::HttpError;
use crate::error::{AppError, GrantError, StoreError};
use crate::service::{BatchGrantService, BatchOutcome, GrantService};
use crate::store::{
    PagePermissionListing, Paginated, Pagination, SharedPermissionStore, SqlitePermissionStore,
};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Shared state for request handlers
#[derive(Clone)]
pub struct AppState {
    pub grants: GrantService,
    pub batch: BatchGrantService,
    pub resolver: AccessResolver,
    pub pages: SharedPageDirectory,
    pub store: SharedPermissionStore,
    pub ability: SharedSpaceAbility,
}

impl AppState {
    /// Wire the services over explicit collaborators
    pub fn new(
        pages: SharedPageDirectory,
        spaces: SharedSpaceMembership,
        store: SharedPermissionStore,
        ability: SharedSpaceAbility,
        max_batch_size: usize,
    ) -> Self {
        Self {
            grants: GrantService::new(pages.clone(), spaces.clone(), store.clone()),
            batch: BatchGrantService::new(pages.clone(), spaces, store.clone(), max_batch_size),
            resolver: AccessResolver::new(store.clone()),
            pages,
            store,
            ability,
        }
    }

    /// Wire everything over one SQLite pool, creating missing tables
    pub async fn from_pool(pool: SqlitePool, grants: &GrantsConfig) -> Result<Self, AppError> {
        ensure_host_schema(&pool).await.map_err(StoreError::from)?;
        let store = SqlitePermissionStore::new(pool.clone());
        store.init_schema().await?;

        let directory = Arc::new(SqliteDirectory::new(pool));
        Ok(Self::new(
            directory.clone(),
            directory.clone(),
            Arc::new(store),
            Arc::new(RoleAbility::new(directory)),
            grants.max_batch_size,
        ))
    }

    /// Resolve the page and check the caller may act on its space
    async fn gate_page(
        &self,
        user: AuthUser,
        page_id: PageId,
        action: SpaceAction,
    ) -> Result<PageRef, HttpError> {
        let page = self
            .pages
            .find_page(page_id)
            .await?
            .ok_or(GrantError::PageNotFound)?;
        self.ability
            .authorize(user.0, page.space_id, action, SpaceSubject::PagePermission)
            .await?;
        Ok(page)
    }

    /// Resolve a grant's page and check the caller may manage it
    async fn gate_permission(
        &self,
        user: AuthUser,
        permission_id: PermissionId,
    ) -> Result<PagePermission, HttpError> {
        let permission = self
            .store
            .find_by_id(permission_id)
            .await?
            .ok_or(GrantError::PermissionNotFound)?;
        self.gate_page(user, permission.page_id, SpaceAction::Manage)
            .await?;
        Ok(permission)
    }
}

/// JSON body extractor whose rejection uses the API error shape
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = HttpError;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRequest {
    pub page_id: PageId,
    #[serde(flatten)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest {
    pub page_id: PageId,
    pub role: Role,
    #[serde(flatten)]
    pub target: GrantTarget,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBatchRequest {
    pub page_id: PageId,
    pub role: Role,
    /// `null` and absent both mean no users
    #[serde(default)]
    pub user_ids: Option<Vec<UserId>>,
    #[serde(default)]
    pub group_ids: Option<Vec<GroupId>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRequest {
    pub permission_id: PermissionId,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveRequest {
    pub permission_id: PermissionId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessRequest {
    pub page_id: PageId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessResponse {
    pub page_id: PageId,
    pub user_id: UserId,
    pub has_access: bool,
    pub role: Option<Role>,
}

/// Build the API router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/page-permissions", post(list_permissions))
        .route("/page-permissions/add", post(add_permission))
        .route("/page-permissions/add-batch", post(add_permissions_batch))
        .route("/page-permissions/update", post(update_permission))
        .route("/page-permissions/remove", post(remove_permission))
        .route("/page-permissions/access", post(page_access))
        .with_state(Arc::new(state))
}

type AppStateRef = State<Arc<AppState>>;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[instrument(skip_all, fields(page = %req.page_id))]
async fn list_permissions(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<ListRequest>,
) -> Result<Json<Paginated<PagePermissionListing>>, HttpError> {
    let page = state.gate_page(user, req.page_id, SpaceAction::Read).await?;
    let listing = state.grants.list_grants(page.id, req.pagination).await?;
    debug!(count = listing.items.len(), "Listed page permissions");
    Ok(Json(listing))
}

#[instrument(skip_all, fields(page = %req.page_id, role = %req.role))]
async fn add_permission(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<AddRequest>,
) -> Result<Json<PagePermission>, HttpError> {
    let page = state
        .gate_page(user, req.page_id, SpaceAction::Manage)
        .await?;
    let grant = state
        .grants
        .grant(page.id, req.role, req.target, user.0)
        .await?;
    Ok(Json(grant))
}

#[instrument(skip_all, fields(page = %req.page_id, role = %req.role))]
async fn add_permissions_batch(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<AddBatchRequest>,
) -> Result<Json<BatchOutcome>, HttpError> {
    let page = state
        .gate_page(user, req.page_id, SpaceAction::Manage)
        .await?;
    let user_ids = req.user_ids.unwrap_or_default();
    let group_ids = req.group_ids.unwrap_or_default();
    let outcome = state
        .batch
        .grant_batch(page.id, req.role, &user_ids, &group_ids, user.0)
        .await?;
    Ok(Json(outcome))
}

#[instrument(skip_all, fields(permission = %req.permission_id, role = %req.role))]
async fn update_permission(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateRequest>,
) -> Result<Json<PagePermission>, HttpError> {
    state.gate_permission(user, req.permission_id).await?;
    let updated = state.grants.update_role(req.permission_id, req.role).await?;
    Ok(Json(updated))
}

#[instrument(skip_all, fields(permission = %req.permission_id))]
async fn remove_permission(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<RemoveRequest>,
) -> Result<Json<Value>, HttpError> {
    state.gate_permission(user, req.permission_id).await?;
    state.grants.remove(req.permission_id).await?;
    Ok(Json(json!({})))
}

/// The caller's own effective access to a page
#[instrument(skip_all, fields(page = %req.page_id))]
async fn page_access(
    State(state): AppStateRef,
    user: AuthUser,
    ApiJson(req): ApiJson<AccessRequest>,
) -> Result<Json<AccessResponse>, HttpError> {
    let page = state
        .pages
        .find_page(req.page_id)
        .await?
        .ok_or(GrantError::PageNotFound)?;
    let role = state.resolver.highest_role(user.0, page.id).await?;
    Ok(Json(AccessResponse {
        page_id: page.id,
        user_id: user.0,
        has_access: role.is_some(),
        role,
    }))
}
