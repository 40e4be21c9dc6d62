//! Keeps `Project::progress` derived from the project's current task set.

use sqlx::SqlitePool;

use crate::db::{
    models::{Task, TaskStatus},
    ProjectRepo, TaskRepo,
};
use crate::services::stats::percentage;

/// Share of resolved tasks, rounded to a whole percent. Empty sets are 0.
pub fn compute_progress(tasks: &[Task]) -> i64 {
    let resolved = tasks
        .iter()
        .filter(|t| t.status == TaskStatus::Resolved)
        .count();
    percentage(resolved, tasks.len())
}

/// Whether a status change moves a task into or out of `resolved`.
pub fn crosses_resolved(old: TaskStatus, new: TaskStatus) -> bool {
    old != new && (old == TaskStatus::Resolved || new == TaskStatus::Resolved)
}

/// Recomputes and stores the project's progress from scratch.
///
/// Best effort: failures are logged and never reach the caller.
pub async fn recalculate(pool: &SqlitePool, project_id: &str) {
    if let Err(err) = try_recalculate(pool, project_id).await {
        tracing::warn!(project_id, error = %err, "Failed to update project progress");
    }
}

async fn try_recalculate(pool: &SqlitePool, project_id: &str) -> Result<(), sqlx::Error> {
    let tasks = TaskRepo::list_by_project(pool, project_id).await?;
    let progress = compute_progress(&tasks);
    ProjectRepo::set_progress(pool, project_id, progress).await?;
    tracing::debug!(project_id, progress, total = tasks.len(), "Project progress updated");
    Ok(())
}
