use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{Task, TaskPriority, TaskStatus, TaskWithRefs},
        tasks::{NewTask, TaskPatch},
        ProjectRepo, TaskRepo, UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    policy::{self, Action, Resource},
    services::{
        progress,
        stats::{TaskListStats, TaskStatusCounts},
    },
    validation::{self, present},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/:id/assign", put(assign_task))
        .route("/:id/unassign", put(unassign_task))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub due_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRef {
    pub id: String,
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_description: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

impl UserRef {
    fn resolve(id: Option<String>, name: Option<String>, email: Option<String>) -> Option<Self> {
        match (id, name, email) {
            (Some(id), Some(full_name), Some(email)) => Some(Self {
                id,
                full_name,
                email,
            }),
            _ => None,
        }
    }
}

/// A task with its project, assignee and creator ids expanded. References to
/// records that no longer exist render as `null`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub id: String,
    pub title: String,
    pub description: String,
    pub project: Option<ProjectRef>,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub assigned_to: Option<UserRef>,
    pub created_by: Option<UserRef>,
    pub notes: String,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskWithRefs> for TaskView {
    fn from(row: TaskWithRefs) -> Self {
        let t = row.task;
        Self {
            project: row.project_name.map(|project_name| ProjectRef {
                id: t.project_id,
                project_name,
                project_description: row.project_description,
            }),
            assigned_to: UserRef::resolve(t.assigned_to, row.assignee_name, row.assignee_email),
            created_by: UserRef::resolve(Some(t.created_by), row.creator_name, row.creator_email),
            id: t.id,
            title: t.title,
            description: t.description,
            status: t.status,
            priority: t.priority,
            notes: t.notes,
            due_date: t.due_date,
            created_at: t.created_at,
            updated_at: t.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub success: bool,
    pub data: TaskView,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub success: bool,
    pub statistics: TaskListStats,
    pub data: Vec<TaskView>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

/// Loads a task and applies the creator-or-admin gate.
async fn load_accessible_task(state: &AppState, user: &AuthUser, id: &str) -> Result<Task> {
    let task = TaskRepo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    policy::ensure_owner_or_admin(user, &task.created_by, Resource::Task)?;
    Ok(task)
}

/// Re-reads a task with its references for the response body.
pub(crate) async fn task_view(state: &AppState, id: &str) -> Result<TaskView> {
    TaskRepo::find_with_refs(&state.db.pool, id)
        .await?
        .map(TaskView::from)
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

async fn create_task(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<CreateTaskRequest>, AppError>,
) -> Result<(StatusCode, Json<TaskResponse>)> {
    policy::require(&user, Resource::Task, Action::Create)?;

    let (
        Some(title),
        Some(description),
        Some(project_id),
        Some(status),
        Some(priority),
        Some(due),
    ) = (
        present(&body.title),
        present(&body.description),
        present(&body.project),
        present(&body.status),
        present(&body.priority),
        present(&body.due_date),
    )
    else {
        return Err(AppError::Validation(
            "Please provide all required fields including due date".to_string(),
        ));
    };

    let status = validation::parse_enum::<TaskStatus>(status)?;
    let priority = validation::parse_enum::<TaskPriority>(priority)?;
    let due_date = validation::parse_date(due, "dueDate")?;

    let project = ProjectRepo::find_by_id(&state.db.pool, project_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    policy::ensure_owner_or_admin(&user, &project.created_by, Resource::Project)?;

    let mut tx = state.db.pool.begin().await?;
    let task = TaskRepo::create(
        &mut *tx,
        &NewTask {
            title,
            description,
            project_id: &project.id,
            status,
            priority,
            due_date,
            created_by: &user.id,
        },
    )
    .await?;
    ProjectRepo::increment_tasks(&mut *tx, &project.id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task.id, project_id = %project.id, user_id = %user.id, "Task created");

    Ok((
        StatusCode::CREATED,
        Json(TaskResponse {
            success: true,
            data: task_view(&state, &task.id).await?,
        }),
    ))
}

async fn list_tasks(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TaskListResponse>> {
    policy::require(&user, Resource::Task, Action::List)?;

    let tasks = TaskRepo::list_by_creator(&state.db.pool, &user.id).await?;

    Ok(Json(TaskListResponse {
        success: true,
        statistics: TaskStatusCounts::of_refs(&tasks).into(),
        data: tasks.into_iter().map(TaskView::from).collect(),
    }))
}

async fn get_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>> {
    policy::require(&user, Resource::Task, Action::Read)?;

    let row = TaskRepo::find_with_refs(&state.db.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;
    policy::ensure_owner_or_admin(&user, &row.task.created_by, Resource::Task)?;

    Ok(Json(TaskResponse {
        success: true,
        data: row.into(),
    }))
}

async fn update_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateTaskRequest>, AppError>,
) -> Result<Json<TaskResponse>> {
    policy::require(&user, Resource::Task, Action::Update)?;
    let current = load_accessible_task(&state, &user, &id).await?;

    let patch = TaskPatch {
        title: validation::non_blank(&body.title, "title")?,
        description: validation::non_blank(&body.description, "description")?,
        status: body
            .status
            .as_deref()
            .map(validation::parse_enum::<TaskStatus>)
            .transpose()?,
        priority: body
            .priority
            .as_deref()
            .map(validation::parse_enum::<TaskPriority>)
            .transpose()?,
        notes: body.notes,
        due_date: body
            .due_date
            .as_deref()
            .map(|d| validation::parse_date(d, "dueDate"))
            .transpose()?,
    };

    let task = TaskRepo::update(&state.db.pool, &id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))?;

    if progress::crosses_resolved(current.status, task.status) {
        progress::recalculate(&state.db.pool, &task.project_id).await;
    }

    tracing::info!(task_id = %task.id, user_id = %user.id, status = %task.status, "Task updated");

    Ok(Json(TaskResponse {
        success: true,
        data: task_view(&state, &task.id).await?,
    }))
}

async fn delete_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    policy::require(&user, Resource::Task, Action::Delete)?;
    let task = load_accessible_task(&state, &user, &id).await?;

    let mut tx = state.db.pool.begin().await?;
    if !TaskRepo::delete(&mut *tx, &task.id).await? {
        return Err(AppError::NotFound("Task not found".to_string()));
    }
    ProjectRepo::decrement_tasks(&mut *tx, &task.project_id).await?;
    tx.commit().await?;

    progress::recalculate(&state.db.pool, &task.project_id).await;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Task deleted successfully".to_string(),
    }))
}

async fn assign_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<AssignRequest>, AppError>,
) -> Result<Json<TaskResponse>> {
    policy::require(&user, Resource::Task, Action::Assign)?;

    let Some(assignee_id) = present(&body.user_id) else {
        return Err(AppError::Validation("Please provide user ID".to_string()));
    };

    let task = load_accessible_task(&state, &user, &id).await?;
    if task.assigned_to.is_some() {
        return Err(AppError::AlreadyAssigned);
    }
    let assignee = UserRepo::find_by_id(&state.db.pool, assignee_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    // The conditional update also catches a concurrent assignment.
    let mut tx = state.db.pool.begin().await?;
    if !TaskRepo::assign_if_unassigned(&mut *tx, &task.id, &assignee.id).await? {
        return Err(AppError::AlreadyAssigned);
    }
    ProjectRepo::increment_team_size(&mut *tx, &task.project_id).await?;
    tx.commit().await?;

    tracing::info!(task_id = %task.id, assignee_id = %assignee.id, user_id = %user.id, "Task assigned");

    Ok(Json(TaskResponse {
        success: true,
        data: task_view(&state, &task.id).await?,
    }))
}

/// Clears the assignee so the task can be handed to someone else.
async fn unassign_task(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<TaskResponse>> {
    policy::require(&user, Resource::Task, Action::Assign)?;
    let task = load_accessible_task(&state, &user, &id).await?;

    TaskRepo::clear_assignee(&state.db.pool, &task.id).await?;

    tracing::info!(task_id = %task.id, user_id = %user.id, "Task unassigned");

    Ok(Json(TaskResponse {
        success: true,
        data: task_view(&state, &task.id).await?,
    }))
}
