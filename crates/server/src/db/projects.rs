//! Repository for the `projects` collection and its denormalized counters.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::{
    first_row,
    models::{Project, ProjectStatus, ProjectWithOwner},
};

const COLUMNS: &str = "id, project_name, project_description, project_status, \
                       project_start_date, project_end_date, progress, tasks, team_size, \
                       created_by, created_at, updated_at";

const OWNER_JOIN: &str = "SELECT p.id, p.project_name, p.project_description, p.project_status, \
                          p.project_start_date, p.project_end_date, p.progress, p.tasks, \
                          p.team_size, p.created_by, p.created_at, p.updated_at, \
                          u.full_name AS owner_name, u.email AS owner_email \
                          FROM projects p LEFT JOIN users u ON u.id = p.created_by";

#[derive(Debug)]
pub struct NewProject<'a> {
    pub project_name: &'a str,
    pub project_description: &'a str,
    pub project_status: ProjectStatus,
    pub project_start_date: DateTime<Utc>,
    pub project_end_date: DateTime<Utc>,
    pub created_by: &'a str,
}

/// Partial update. Only `Some` fields are written.
#[derive(Debug, Default)]
pub struct ProjectPatch {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_status: Option<ProjectStatus>,
    pub project_start_date: Option<DateTime<Utc>>,
    pub project_end_date: Option<DateTime<Utc>>,
}

/// Minimal projection for selection lists.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectName {
    pub id: String,
    pub project_name: String,
}

pub struct ProjectRepo;

impl ProjectRepo {
    pub async fn create(pool: &SqlitePool, input: &NewProject<'_>) -> Result<Project, sqlx::Error> {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO projects (id, project_name, project_description, project_status,
                                   project_start_date, project_end_date, progress, tasks,
                                   team_size, created_by, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, 0, 0, 0, ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(input.project_name)
            .bind(input.project_description)
            .bind(input.project_status)
            .bind(input.project_start_date)
            .bind(input.project_end_date)
            .bind(input.created_by)
            .bind(now)
            .bind(now)
            .fetch_all(pool)
            .await
            .and_then(|rows| first_row(rows).ok_or(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Project>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = ?");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_with_owner(
        pool: &SqlitePool,
        id: &str,
    ) -> Result<Option<ProjectWithOwner>, sqlx::Error> {
        let query = format!("{OWNER_JOIN} WHERE p.id = ?");
        sqlx::query_as::<_, ProjectWithOwner>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// A project only if `owner_id` created it.
    pub async fn find_owned(
        pool: &SqlitePool,
        id: &str,
        owner_id: &str,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = ? AND created_by = ?");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .bind(owner_id)
            .fetch_optional(pool)
            .await
    }

    /// Projects created by `owner_id`, newest first.
    pub async fn list_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM projects WHERE created_by = ? ORDER BY created_at DESC"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_names_by_owner(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<ProjectName>, sqlx::Error> {
        sqlx::query_as::<_, ProjectName>(
            "SELECT id, project_name FROM projects WHERE created_by = ?
             ORDER BY project_name COLLATE NOCASE ASC",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects ORDER BY created_at DESC");
        sqlx::query_as::<_, Project>(&query).fetch_all(pool).await
    }

    /// Every project with its owner, newest first. `search` matches name or
    /// description case-insensitively.
    pub async fn search_with_owner(
        pool: &SqlitePool,
        status: Option<ProjectStatus>,
        search: Option<&str>,
    ) -> Result<Vec<ProjectWithOwner>, sqlx::Error> {
        let query = format!(
            "{OWNER_JOIN}
             WHERE (?1 IS NULL OR p.project_status = ?1)
               AND (?2 IS NULL
                    OR p.project_name LIKE '%' || ?2 || '%'
                    OR p.project_description LIKE '%' || ?2 || '%')
             ORDER BY p.created_at DESC"
        );
        sqlx::query_as::<_, ProjectWithOwner>(&query)
            .bind(status)
            .bind(search)
            .fetch_all(pool)
            .await
    }

    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        patch: &ProjectPatch,
    ) -> Result<Option<Project>, sqlx::Error> {
        let query = format!(
            "UPDATE projects SET
                project_name = COALESCE(?, project_name),
                project_description = COALESCE(?, project_description),
                project_status = COALESCE(?, project_status),
                project_start_date = COALESCE(?, project_start_date),
                project_end_date = COALESCE(?, project_end_date),
                updated_at = ?
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(&patch.project_name)
            .bind(&patch.project_description)
            .bind(patch.project_status)
            .bind(patch.project_start_date)
            .bind(patch.project_end_date)
            .bind(Utc::now())
            .bind(id)
            .fetch_all(pool)
            .await
            .map(first_row)
    }

    /// Returns `true` if a row was removed. Tasks under the project are left alone.
    pub async fn delete(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_tasks<'e, E>(executor: E, id: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE projects SET tasks = tasks + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Never drops below zero.
    pub async fn decrement_tasks<'e, E>(executor: E, id: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE projects SET tasks = MAX(tasks - 1, 0), updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn increment_team_size<'e, E>(executor: E, id: &str) -> Result<(), sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query("UPDATE projects SET team_size = team_size + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn set_progress(pool: &SqlitePool, id: &str, progress: i64) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE projects SET progress = ?, updated_at = ? WHERE id = ?")
            .bind(progress)
            .bind(Utc::now())
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
