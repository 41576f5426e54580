//! SQLite-backed permission store
//!
//! Ids are stored as hyphenated UUID text and timestamps as RFC 3339 UTC text
//! with microsecond precision, so lexical order equals chronological order.

use crate::access_control::{
    GroupId, NewPagePermission, PageId, PagePermission, PermissionId, Principal, Role, UserId,
};
use crate::config::DatabaseConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{
    PagePermissionListing, Paginated, Pagination, PermissionStore, PrincipalSummary,
};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{QueryBuilder, Row};
use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, trace};

const TABLE: &str = "page_permissions";

const BASE_COLUMNS: &str = "id, page_id, user_id, group_id, role, added_by_id, workspace_id, \
                            created_at, updated_at, deleted_at";

const INSERT_SQL: &str = "INSERT INTO page_permissions \
     (id, page_id, user_id, group_id, role, added_by_id, workspace_id, created_at, updated_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)";

/// Open a connection pool for the configured database.
///
/// In-memory databases live only as long as their connection, so they are
/// pinned to a single connection that never expires.
pub async fn connect(config: &DatabaseConfig) -> StoreResult<SqlitePool> {
    let in_memory = config.is_in_memory();
    let options = SqliteConnectOptions::from_str(&config.url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));
    let options = if in_memory {
        options
    } else {
        options.journal_mode(SqliteJournalMode::Wal)
    };

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
    } else {
        SqlitePoolOptions::new().max_connections(config.max_connections)
    };

    debug!(url = %config.url, in_memory, "Connecting to database");
    Ok(pool_options.connect_with(options).await?)
}

/// Current time at the precision the store keeps
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: &str, value: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(TABLE, format!("{column}: {e}")))
}

fn parse_id<T>(column: &str, value: &str) -> StoreResult<T>
where
    T: FromStr<Err = uuid::Error>,
{
    value
        .parse()
        .map_err(|e| StoreError::corrupt(TABLE, format!("{column}: {e}")))
}

fn parse_optional_id<T>(column: &str, value: Option<String>) -> StoreResult<Option<T>>
where
    T: FromStr<Err = uuid::Error>,
{
    value.map(|v| parse_id(column, &v)).transpose()
}

fn parse_role(value: &str) -> StoreResult<Role> {
    Role::try_parse(value).ok_or_else(|| StoreError::corrupt(TABLE, format!("role: '{value}'")))
}

fn parse_principal(
    user_id: Option<UserId>,
    group_id: Option<GroupId>,
) -> StoreResult<Principal> {
    match (user_id, group_id) {
        (Some(user), None) => Ok(Principal::User(user)),
        (None, Some(group)) => Ok(Principal::Group(group)),
        _ => Err(StoreError::corrupt(
            TABLE,
            "row must reference exactly one of user_id or group_id",
        )),
    }
}

/// Translate constraint rejections into their store-level kinds
fn map_write_error(error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return StoreError::Conflict {
                constraint: db
                    .constraint()
                    .map(str::to_string)
                    .unwrap_or_else(|| db.message().to_string()),
            };
        }
        if db.is_check_violation() {
            return StoreError::ConstraintViolation(db.message().to_string());
        }
    }
    StoreError::Database(error)
}

fn insert_statement(
    id: PermissionId,
    grant: &NewPagePermission,
    timestamp: &str,
) -> Query<'static, Sqlite, SqliteArguments<'static>> {
    sqlx::query(INSERT_SQL)
        .bind(id.to_string())
        .bind(grant.page_id.to_string())
        .bind(grant.principal.user_id().map(|id| id.to_string()))
        .bind(grant.principal.group_id().map(|id| id.to_string()))
        .bind(grant.role.as_str())
        .bind(grant.added_by_id.to_string())
        .bind(grant.workspace_id.to_string())
        .bind(timestamp.to_string())
}

/// Permission store over a SQLite pool
#[derive(Clone)]
pub struct SqlitePermissionStore {
    pool: SqlitePool,
}

impl SqlitePermissionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the grant table and its indexes if they are missing
    pub async fn init_schema(&self) -> StoreResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS page_permissions (
                id TEXT PRIMARY KEY NOT NULL,
                page_id TEXT NOT NULL,
                user_id TEXT,
                group_id TEXT,
                role TEXT NOT NULL CHECK (role IN ('reader', 'writer', 'admin')),
                added_by_id TEXT,
                workspace_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                deleted_at TEXT,
                CONSTRAINT page_permissions_either_user_id_or_group_id_check CHECK (
                    (user_id IS NOT NULL AND group_id IS NULL)
                    OR (user_id IS NULL AND group_id IS NOT NULL)
                )
            )",
        )
        .execute(&self.pool)
        .await?;

        for statement in [
            "CREATE UNIQUE INDEX IF NOT EXISTS page_permissions_page_id_user_id_unique
                ON page_permissions (page_id, user_id) WHERE deleted_at IS NULL",
            "CREATE UNIQUE INDEX IF NOT EXISTS page_permissions_page_id_group_id_unique
                ON page_permissions (page_id, group_id) WHERE deleted_at IS NULL",
            "CREATE INDEX IF NOT EXISTS page_permissions_listing_idx
                ON page_permissions (page_id, created_at, id)",
            "CREATE INDEX IF NOT EXISTS page_permissions_user_id_idx
                ON page_permissions (user_id)",
            "CREATE INDEX IF NOT EXISTS page_permissions_group_id_idx
                ON page_permissions (group_id)",
        ] {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    fn row_to_permission(row: &SqliteRow) -> StoreResult<PagePermission> {
        let id: String = row.try_get("id")?;
        let page_id: String = row.try_get("page_id")?;
        let user_id: Option<String> = row.try_get("user_id")?;
        let group_id: Option<String> = row.try_get("group_id")?;
        let role: String = row.try_get("role")?;
        let added_by_id: Option<String> = row.try_get("added_by_id")?;
        let workspace_id: String = row.try_get("workspace_id")?;
        let created_at: String = row.try_get("created_at")?;
        let updated_at: String = row.try_get("updated_at")?;
        let deleted_at: Option<String> = row.try_get("deleted_at")?;

        Ok(PagePermission {
            id: parse_id("id", &id)?,
            page_id: parse_id("page_id", &page_id)?,
            principal: parse_principal(
                parse_optional_id("user_id", user_id)?,
                parse_optional_id("group_id", group_id)?,
            )?,
            role: parse_role(&role)?,
            added_by_id: parse_optional_id("added_by_id", added_by_id)?,
            workspace_id: parse_id("workspace_id", &workspace_id)?,
            created_at: parse_timestamp("created_at", &created_at)?,
            updated_at: parse_timestamp("updated_at", &updated_at)?,
            deleted_at: deleted_at
                .map(|ts| parse_timestamp("deleted_at", &ts))
                .transpose()?,
        })
    }

    fn row_to_listing(row: &SqliteRow) -> StoreResult<PagePermissionListing> {
        let id: String = row.try_get("id")?;
        let role: String = row.try_get("role")?;
        let created_at: String = row.try_get("created_at")?;
        let user_id: Option<String> = row.try_get("user_id")?;
        let group_id: Option<String> = row.try_get("group_id")?;

        let principal = match parse_principal(
            parse_optional_id("user_id", user_id)?,
            parse_optional_id("group_id", group_id)?,
        )? {
            Principal::User(id) => PrincipalSummary::User {
                id,
                name: row.try_get("user_name")?,
                email: row.try_get("user_email")?,
                avatar_url: row.try_get("user_avatar_url")?,
            },
            Principal::Group(id) => PrincipalSummary::Group {
                id,
                name: row.try_get("group_name")?,
                is_default: row
                    .try_get::<Option<bool>, _>("group_is_default")?
                    .unwrap_or(false),
            },
        };

        Ok(PagePermissionListing {
            id: parse_id("id", &id)?,
            role: parse_role(&role)?,
            created_at: parse_timestamp("created_at", &created_at)?,
            principal,
        })
    }

    async fn find_one(&self, sql: &str, binds: [String; 2]) -> StoreResult<Option<PagePermission>> {
        let [first, second] = binds;
        let row = sqlx::query(sql)
            .bind(first)
            .bind(second)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_permission).transpose()
    }

    async fn existing_ids(
        &self,
        column: &'static str,
        page_id: PageId,
        ids: Vec<String>,
    ) -> StoreResult<Vec<String>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = QueryBuilder::<Sqlite>::new("SELECT ");
        query.push(column);
        query.push(" FROM page_permissions WHERE deleted_at IS NULL AND page_id = ");
        query.push_bind(page_id.to_string());
        query.push(" AND ");
        query.push(column);
        query.push(" IN (");
        let mut separated = query.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(column).map_err(StoreError::from))
            .collect()
    }

    async fn delete_where(&self, column: &'static str, id: String) -> StoreResult<u64> {
        let sql = format!("DELETE FROM page_permissions WHERE {column} = ?1");
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl PermissionStore for SqlitePermissionStore {
    async fn find_by_id(&self, id: PermissionId) -> StoreResult<Option<PagePermission>> {
        let sql = format!(
            "SELECT {BASE_COLUMNS} FROM page_permissions WHERE id = ?1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_permission).transpose()
    }

    async fn find_by_page_and_user(
        &self,
        page_id: PageId,
        user_id: UserId,
    ) -> StoreResult<Option<PagePermission>> {
        let sql = format!(
            "SELECT {BASE_COLUMNS} FROM page_permissions \
             WHERE page_id = ?1 AND user_id = ?2 AND deleted_at IS NULL"
        );
        self.find_one(&sql, [page_id.to_string(), user_id.to_string()])
            .await
    }

    async fn find_by_page_and_group(
        &self,
        page_id: PageId,
        group_id: GroupId,
    ) -> StoreResult<Option<PagePermission>> {
        let sql = format!(
            "SELECT {BASE_COLUMNS} FROM page_permissions \
             WHERE page_id = ?1 AND group_id = ?2 AND deleted_at IS NULL"
        );
        self.find_one(&sql, [page_id.to_string(), group_id.to_string()])
            .await
    }

    async fn existing_user_ids(
        &self,
        page_id: PageId,
        user_ids: &[UserId],
    ) -> StoreResult<HashSet<UserId>> {
        let ids = user_ids.iter().map(ToString::to_string).collect();
        self.existing_ids("user_id", page_id, ids)
            .await?
            .iter()
            .map(|id| parse_id("user_id", id))
            .collect()
    }

    async fn existing_group_ids(
        &self,
        page_id: PageId,
        group_ids: &[GroupId],
    ) -> StoreResult<HashSet<GroupId>> {
        let ids = group_ids.iter().map(ToString::to_string).collect();
        self.existing_ids("group_id", page_id, ids)
            .await?
            .iter()
            .map(|id| parse_id("group_id", id))
            .collect()
    }

    async fn insert(&self, grant: NewPagePermission) -> StoreResult<PagePermission> {
        let id = PermissionId::generate();
        let created_at = now();

        insert_statement(id, &grant, &format_timestamp(&created_at))
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;

        trace!(permission = %id, page = %grant.page_id, principal = %grant.principal, "Inserted grant");

        Ok(PagePermission {
            id,
            page_id: grant.page_id,
            principal: grant.principal,
            role: grant.role,
            added_by_id: Some(grant.added_by_id),
            workspace_id: grant.workspace_id,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        })
    }

    async fn insert_many(&self, grants: &[NewPagePermission]) -> StoreResult<Vec<bool>> {
        if grants.is_empty() {
            return Ok(Vec::new());
        }

        let timestamp = format_timestamp(&now());
        let mut tx = self.pool.begin().await?;
        let mut inserted = Vec::with_capacity(grants.len());

        for grant in grants {
            let result = insert_statement(PermissionId::generate(), grant, &timestamp)
                .execute(&mut *tx)
                .await;
            match result.map_err(map_write_error) {
                Ok(_) => inserted.push(true),
                Err(StoreError::Conflict { constraint }) => {
                    debug!(principal = %grant.principal, %constraint, "Skipping conflicting grant");
                    inserted.push(false);
                }
                Err(other) => return Err(other),
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_role(
        &self,
        id: PermissionId,
        role: Role,
    ) -> StoreResult<Option<PagePermission>> {
        let sql = format!(
            "UPDATE page_permissions SET role = ?1, updated_at = ?2 \
             WHERE id = ?3 AND deleted_at IS NULL RETURNING {BASE_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(role.as_str())
            .bind(format_timestamp(&now()))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;
        row.as_ref().map(Self::row_to_permission).transpose()
    }

    async fn delete(&self, id: PermissionId) -> StoreResult<bool> {
        Ok(self.delete_where("id", id.to_string()).await? > 0)
    }

    async fn list_for_page(
        &self,
        page_id: PageId,
        pagination: Pagination,
    ) -> StoreResult<Paginated<PagePermissionListing>> {
        let pagination = pagination.normalized();
        let rows = sqlx::query(
            r#"SELECT p.id, p.role, p.created_at,
                      p.user_id, u.name AS user_name, u.email AS user_email,
                      u.avatar_url AS user_avatar_url,
                      p.group_id, g.name AS group_name, g.is_default AS group_is_default
               FROM page_permissions p
               LEFT JOIN users u ON u.id = p.user_id
               LEFT JOIN "groups" g ON g.id = p.group_id
               WHERE p.page_id = ?1 AND p.deleted_at IS NULL
               ORDER BY p.created_at ASC, p.id ASC
               LIMIT ?2 OFFSET ?3"#,
        )
        .bind(page_id.to_string())
        .bind(i64::from(pagination.limit) + 1)
        .bind(pagination.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let listings = rows
            .iter()
            .map(Self::row_to_listing)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(pagination.paginate(listings))
    }

    async fn user_page_roles(&self, user_id: UserId, page_id: PageId) -> StoreResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT role FROM page_permissions
             WHERE user_id = ?1 AND page_id = ?2 AND deleted_at IS NULL
             UNION ALL
             SELECT p.role FROM page_permissions p
             INNER JOIN group_users gu ON gu.group_id = p.group_id
             WHERE gu.user_id = ?1 AND p.page_id = ?2 AND p.deleted_at IS NULL",
        )
        .bind(user_id.to_string())
        .bind(page_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| parse_role(&row.try_get::<String, _>("role")?))
            .collect()
    }

    async fn delete_for_page(&self, page_id: PageId) -> StoreResult<u64> {
        self.delete_where("page_id", page_id.to_string()).await
    }

    async fn delete_for_user(&self, user_id: UserId) -> StoreResult<u64> {
        self.delete_where("user_id", user_id.to_string()).await
    }

    async fn delete_for_group(&self, group_id: GroupId) -> StoreResult<u64> {
        self.delete_where("group_id", group_id.to_string()).await
    }
}
