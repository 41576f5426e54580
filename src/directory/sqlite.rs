//! Read-only directory over the host application's tables
//!
//! The host owns `pages`, `users`, `groups`, `group_users` and
//! `space_members`. This module only reads them; [`ensure_host_schema`]
//! exists so a standalone deployment and the tests have something to read.

use crate::access_control::{GroupId, PageId, PageRef, Role, SpaceId, UserId};
use crate::directory::{PageDirectory, SpaceMembership};
use crate::error::DirectoryError;
use async_trait::async_trait;
use sqlx::Row;
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;

/// Create the host tables the engine reads, if they are missing
pub async fn ensure_host_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in [
        "CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY NOT NULL,
            space_id TEXT NOT NULL,
            workspace_id TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            email TEXT,
            avatar_url TEXT
        )",
        r#"CREATE TABLE IF NOT EXISTS "groups" (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            is_default INTEGER NOT NULL DEFAULT 0
        )"#,
        "CREATE TABLE IF NOT EXISTS group_users (
            group_id TEXT NOT NULL,
            user_id TEXT NOT NULL,
            PRIMARY KEY (group_id, user_id)
        )",
        "CREATE INDEX IF NOT EXISTS group_users_user_id_idx ON group_users (user_id)",
        "CREATE TABLE IF NOT EXISTS space_members (
            space_id TEXT NOT NULL,
            user_id TEXT,
            group_id TEXT,
            role TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS space_members_space_id_idx ON space_members (space_id)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

fn parse_column<T>(table: &'static str, column: &str, value: &str) -> Result<T, DirectoryError>
where
    T: FromStr<Err = uuid::Error>,
{
    value
        .parse()
        .map_err(|e| DirectoryError::corrupt(table, format!("{column}: {e}")))
}

fn parse_role(table: &'static str, value: &str) -> Result<Role, DirectoryError> {
    Role::try_parse(value)
        .ok_or_else(|| DirectoryError::corrupt(table, format!("role: '{value}'")))
}

/// Directory reading pages and space memberships from SQLite
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageDirectory for SqliteDirectory {
    async fn find_page(&self, page_id: PageId) -> Result<Option<PageRef>, DirectoryError> {
        let row = sqlx::query("SELECT id, space_id, workspace_id FROM pages WHERE id = ?1")
            .bind(page_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let space_id: String = row.try_get("space_id")?;
        let workspace_id: String = row.try_get("workspace_id")?;

        Ok(Some(PageRef {
            id: parse_column("pages", "id", &id)?,
            space_id: parse_column("pages", "space_id", &space_id)?,
            workspace_id: parse_column("pages", "workspace_id", &workspace_id)?,
        }))
    }
}

#[async_trait]
impl SpaceMembership for SqliteDirectory {
    async fn user_space_roles(
        &self,
        user_id: UserId,
        space_id: SpaceId,
    ) -> Result<Vec<Role>, DirectoryError> {
        let rows = sqlx::query(
            "SELECT role FROM space_members WHERE space_id = ?1 AND user_id = ?2
             UNION ALL
             SELECT sm.role FROM space_members sm
             INNER JOIN group_users gu ON gu.group_id = sm.group_id
             WHERE sm.space_id = ?1 AND gu.user_id = ?2",
        )
        .bind(space_id.to_string())
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| parse_role("space_members", &row.try_get::<String, _>("role")?))
            .collect()
    }

    async fn group_space_role(
        &self,
        group_id: GroupId,
        space_id: SpaceId,
    ) -> Result<Option<Role>, DirectoryError> {
        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM space_members WHERE space_id = ?1 AND group_id = ?2 LIMIT 1",
        )
        .bind(space_id.to_string())
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        role.map(|r| parse_role("space_members", &r)).transpose()
    }
}
