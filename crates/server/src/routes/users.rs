//! The assignee's side of the task lifecycle, for accounts with role `user`.

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{TaskPriority, TaskStatus, TaskWithRefs},
        TaskRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    policy::{self, Action, Resource},
    routes::tasks::{task_view, TaskResponse, TaskView},
    services::{
        progress,
        stats::{AssigneeStats, TaskStatusCounts},
    },
    validation::{self, present},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(my_tasks))
        .route("/tasks/:id/status", put(update_task_status))
        .route("/dashboard", get(dashboard))
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Which slice of the caller's tasks a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    All,
    /// Open or in progress.
    Active,
    /// Resolved.
    Completed,
}

#[derive(Debug, Serialize)]
pub struct FilterEcho {
    pub status: String,
    pub priority: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct MyTasksResponse {
    pub success: bool,
    pub statistics: AssigneeStats,
    pub filters: FilterEcho,
    pub count: usize,
    pub data: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedTask {
    #[serde(flatten)]
    pub task: TaskView,
    pub completed_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub success: bool,
    pub statistics: AssigneeStats,
    pub my_tasks: Vec<TaskView>,
    pub completed_tasks: Vec<CompletedTask>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// `None` stands for "all".
fn parse_filter<T, F>(value: Option<&str>, parse: F) -> Result<Option<T>>
where
    F: FnOnce(&str) -> Result<T>,
{
    match value {
        None | Some("all") => Ok(None),
        Some(v) => parse(v).map(Some),
    }
}

fn matches_kind(kind: TaskKind, status: TaskStatus) -> bool {
    match kind {
        TaskKind::All => true,
        TaskKind::Active => matches!(status, TaskStatus::Open | TaskStatus::InProgress),
        TaskKind::Completed => status == TaskStatus::Resolved,
    }
}

async fn my_tasks(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<TaskFilter>,
) -> Result<Json<MyTasksResponse>> {
    policy::require(&user, Resource::Task, Action::OwnAssignments)?;

    let status = parse_filter(present(&filter.status), validation::parse_enum::<TaskStatus>)?;
    let priority = parse_filter(
        present(&filter.priority),
        validation::parse_enum::<TaskPriority>,
    )?;
    let kind = match present(&filter.kind) {
        None | Some("all") => TaskKind::All,
        Some("active") => TaskKind::Active,
        Some("completed") => TaskKind::Completed,
        Some(other) => {
            return Err(AppError::Validation(format!(
                "'{other}' is not a valid task type"
            )))
        }
    };

    let tasks = TaskRepo::list_by_assignee(&state.db.pool, &user.id).await?;
    let statistics: AssigneeStats = TaskStatusCounts::of_refs(&tasks).into();

    // A task type overrides the status filter.
    let data: Vec<TaskView> = tasks
        .into_iter()
        .filter(|row| match kind {
            TaskKind::All => status.map_or(true, |s| row.task.status == s),
            _ => matches_kind(kind, row.task.status),
        })
        .filter(|row| priority.map_or(true, |p| row.task.priority == p))
        .map(TaskView::from)
        .collect();

    let echo = |v: &Option<String>| present(v).unwrap_or("all").to_string();

    Ok(Json(MyTasksResponse {
        success: true,
        statistics,
        filters: FilterEcho {
            status: echo(&filter.status),
            priority: echo(&filter.priority),
            kind: echo(&filter.kind),
        },
        count: data.len(),
        data,
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>> {
    policy::require(&user, Resource::Task, Action::OwnAssignments)?;

    let tasks = TaskRepo::list_by_assignee(&state.db.pool, &user.id).await?;
    let statistics: AssigneeStats = TaskStatusCounts::of_refs(&tasks).into();

    let (completed, pending): (Vec<TaskWithRefs>, Vec<TaskWithRefs>) = tasks
        .into_iter()
        .partition(|row| row.task.status == TaskStatus::Resolved);

    Ok(Json(DashboardResponse {
        success: true,
        statistics,
        my_tasks: pending.into_iter().map(TaskView::from).collect(),
        completed_tasks: completed
            .into_iter()
            .map(|row| {
                let completed_date = row.task.updated_at;
                CompletedTask {
                    task: row.into(),
                    completed_date,
                }
            })
            .collect(),
    }))
}

async fn update_task_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<StatusUpdateRequest>, AppError>,
) -> Result<Json<TaskResponse>> {
    policy::require(&user, Resource::Task, Action::OwnAssignments)?;

    let Some(status) = present(&body.status) else {
        return Err(AppError::Validation("Please provide status".to_string()));
    };
    let status = validation::parse_enum::<TaskStatus>(status)?;

    let not_yours = || AppError::NotFound("Task not found or not assigned to you".to_string());

    let current = TaskRepo::find_by_id(&state.db.pool, &id)
        .await?
        .filter(|t| t.assigned_to.as_deref() == Some(user.id.as_str()))
        .ok_or_else(not_yours)?;

    let task = TaskRepo::update_status_for_assignee(
        &state.db.pool,
        &current.id,
        &user.id,
        status,
        body.notes.as_deref(),
    )
    .await?
    .ok_or_else(not_yours)?;

    if progress::crosses_resolved(current.status, task.status) {
        progress::recalculate(&state.db.pool, &task.project_id).await;
    }

    tracing::info!(task_id = %task.id, user_id = %user.id, status = %task.status, "Task status updated");

    Ok(Json(TaskResponse {
        success: true,
        data: task_view(&state, &task.id).await?,
    }))
}
