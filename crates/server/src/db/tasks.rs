//! Repository for the `tasks` collection.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::{
    first_row,
    models::{Task, TaskPriority, TaskStatus, TaskWithRefs},
};

const COLUMNS: &str = "id, title, description, project_id, status, priority, assigned_to, \
                       created_by, notes, due_date, created_at, updated_at";

const REFS_SELECT: &str = "SELECT t.id, t.title, t.description, t.project_id, t.status, \
                           t.priority, t.assigned_to, t.created_by, t.notes, t.due_date, \
                           t.created_at, t.updated_at, \
                           p.project_name AS project_name, \
                           p.project_description AS project_description, \
                           a.full_name AS assignee_name, a.email AS assignee_email, \
                           c.full_name AS creator_name, c.email AS creator_email \
                           FROM tasks t \
                           LEFT JOIN projects p ON p.id = t.project_id \
                           LEFT JOIN users a ON a.id = t.assigned_to \
                           LEFT JOIN users c ON c.id = t.created_by";

#[derive(Debug)]
pub struct NewTask<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub project_id: &'a str,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: DateTime<Utc>,
    pub created_by: &'a str,
}

/// Partial update. Only `Some` fields are written.
#[derive(Debug, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
}

pub struct TaskRepo;

impl TaskRepo {
    pub async fn create<'e, E>(executor: E, input: &NewTask<'_>) -> Result<Task, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let now = Utc::now();
        let query = format!(
            "INSERT INTO tasks (id, title, description, project_id, status, priority,
                                assigned_to, created_by, notes, due_date, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, NULL, ?, '', ?, ?, ?)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(input.title)
            .bind(input.description)
            .bind(input.project_id)
            .bind(input.status)
            .bind(input.priority)
            .bind(input.created_by)
            .bind(input.due_date)
            .bind(now)
            .bind(now)
            .fetch_all(executor)
            .await
            .and_then(|rows| first_row(rows).ok_or(sqlx::Error::RowNotFound))
    }

    pub async fn find_by_id<'e, E>(executor: E, id: &str) -> Result<Option<Task>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let query = format!("SELECT {COLUMNS} FROM tasks WHERE id = ?");
        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_with_refs(
        pool: &SqlitePool,
        id: &str,
    ) -> Result<Option<TaskWithRefs>, sqlx::Error> {
        let query = format!("{REFS_SELECT} WHERE t.id = ?");
        sqlx::query_as::<_, TaskWithRefs>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Tasks created by `creator_id`, newest first.
    pub async fn list_by_creator(
        pool: &SqlitePool,
        creator_id: &str,
    ) -> Result<Vec<TaskWithRefs>, sqlx::Error> {
        let query = format!("{REFS_SELECT} WHERE t.created_by = ? ORDER BY t.created_at DESC");
        sqlx::query_as::<_, TaskWithRefs>(&query)
            .bind(creator_id)
            .fetch_all(pool)
            .await
    }

    /// Tasks assigned to `assignee_id`, newest first.
    pub async fn list_by_assignee(
        pool: &SqlitePool,
        assignee_id: &str,
    ) -> Result<Vec<TaskWithRefs>, sqlx::Error> {
        let query = format!("{REFS_SELECT} WHERE t.assigned_to = ? ORDER BY t.created_at DESC");
        sqlx::query_as::<_, TaskWithRefs>(&query)
            .bind(assignee_id)
            .fetch_all(pool)
            .await
    }

    /// Tasks under any project owned by `owner_id`, in creation order.
    pub async fn list_for_owner_projects(
        pool: &SqlitePool,
        owner_id: &str,
    ) -> Result<Vec<TaskWithRefs>, sqlx::Error> {
        let query = format!(
            "{REFS_SELECT}
             WHERE t.project_id IN (SELECT id FROM projects WHERE created_by = ?)
             ORDER BY t.created_at ASC"
        );
        sqlx::query_as::<_, TaskWithRefs>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_by_project<'e, E>(
        executor: E,
        project_id: &str,
    ) -> Result<Vec<Task>, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let query =
            format!("SELECT {COLUMNS} FROM tasks WHERE project_id = ? ORDER BY created_at ASC");
        sqlx::query_as::<_, Task>(&query)
            .bind(project_id)
            .fetch_all(executor)
            .await
    }

    pub async fn list_all(pool: &SqlitePool) -> Result<Vec<Task>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM tasks ORDER BY created_at DESC");
        sqlx::query_as::<_, Task>(&query).fetch_all(pool).await
    }

    /// Returns `None` if no row with the given `id` exists.
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        patch: &TaskPatch,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET
                title = COALESCE(?, title),
                description = COALESCE(?, description),
                status = COALESCE(?, status),
                priority = COALESCE(?, priority),
                notes = COALESCE(?, notes),
                due_date = COALESCE(?, due_date),
                updated_at = ?
             WHERE id = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(&patch.title)
            .bind(&patch.description)
            .bind(patch.status)
            .bind(patch.priority)
            .bind(&patch.notes)
            .bind(patch.due_date)
            .bind(Utc::now())
            .bind(id)
            .fetch_all(pool)
            .await
            .map(first_row)
    }

    /// Status (and optionally notes) update scoped to the task's assignee.
    ///
    /// Returns `None` if the task does not exist or is assigned to someone else.
    pub async fn update_status_for_assignee(
        pool: &SqlitePool,
        id: &str,
        assignee_id: &str,
        status: TaskStatus,
        notes: Option<&str>,
    ) -> Result<Option<Task>, sqlx::Error> {
        let query = format!(
            "UPDATE tasks SET status = ?, notes = COALESCE(?, notes), updated_at = ?
             WHERE id = ? AND assigned_to = ?
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Task>(&query)
            .bind(status)
            .bind(notes)
            .bind(Utc::now())
            .bind(id)
            .bind(assignee_id)
            .fetch_all(pool)
            .await
            .map(first_row)
    }

    /// Sets the assignee only while the task has none.
    ///
    /// Returns `false` when the task is already assigned (or does not exist).
    pub async fn assign_if_unassigned<'e, E>(
        executor: E,
        id: &str,
        user_id: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "UPDATE tasks SET assigned_to = ?, updated_at = ?
             WHERE id = ? AND assigned_to IS NULL",
        )
        .bind(user_id)
        .bind(Utc::now())
        .bind(id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn clear_assignee(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE tasks SET assigned_to = NULL, updated_at = ? WHERE id = ?")
                .bind(Utc::now())
                .bind(id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete<'e, E>(executor: E, id: &str) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
