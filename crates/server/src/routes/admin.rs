use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{ProjectStatus, ProjectWithOwner, Role, User, UserStatus},
        ProjectRepo, TaskRepo, UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    policy::{self, Action, Resource},
    services::stats::{AdminDashboardStats, DateWindow, SystemAnalytics},
    validation::{self, present},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route("/users/:id", axum::routing::delete(delete_user))
        .route("/users/:id/suspend", put(suspend_user))
        .route("/users/:id/activate", put(activate_user))
        .route("/projects", get(list_projects))
        .route("/analytics", get(system_analytics))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserSummary {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub statistics: AdminDashboardStats,
    pub users: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<UserSummary>,
}

#[derive(Debug, Serialize)]
pub struct UserActionResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UserSummary>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectFilter {
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manager {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProjectEntry {
    pub id: String,
    pub project_name: String,
    pub project_description: String,
    pub project_status: ProjectStatus,
    pub manager: Option<Manager>,
    pub tasks: i64,
    pub team_size: i64,
    pub progress: i64,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectWithOwner> for AdminProjectEntry {
    fn from(row: ProjectWithOwner) -> Self {
        let manager = match (row.owner_name, row.owner_email) {
            (Some(full_name), Some(email)) => Some(Manager {
                id: row.project.created_by.clone(),
                full_name,
                email,
            }),
            _ => None,
        };
        let p = row.project;
        Self {
            id: p.id,
            project_name: p.project_name,
            project_description: p.project_description,
            project_status: p.project_status,
            manager,
            tasks: p.tasks,
            team_size: p.team_size,
            progress: p.progress,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminProjectListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<AdminProjectEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub success: bool,
    pub date_range: DateRange,
    #[serde(flatten)]
    pub analytics: SystemAnalytics,
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>> {
    policy::require(&user, Resource::Report, Action::SystemReport)?;

    let users = UserRepo::list_all(&state.db.pool).await?;
    let projects = ProjectRepo::list_all(&state.db.pool).await?;
    let tasks = TaskRepo::list_all(&state.db.pool).await?;
    let staff = UserRepo::list_staff(&state.db.pool).await?;

    Ok(Json(DashboardResponse {
        success: true,
        statistics: AdminDashboardStats::of(&users, &projects, &tasks),
        users: staff.into_iter().map(UserSummary::from).collect(),
    }))
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserListResponse>> {
    policy::require(&user, Resource::User, Action::Manage)?;

    let users: Vec<UserSummary> = UserRepo::list_staff(&state.db.pool)
        .await?
        .into_iter()
        .map(UserSummary::from)
        .collect();

    Ok(Json(UserListResponse {
        success: true,
        count: users.len(),
        data: users,
    }))
}

/// Loads the target account and rejects self-targeting and admin targets.
async fn load_manageable_target(
    state: &AppState,
    acting: &AuthUser,
    target_id: &str,
    verb: &str,
) -> Result<User> {
    let target = UserRepo::find_by_id(&state.db.pool, target_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    if target.id == acting.id {
        return Err(AppError::SelfActionForbidden(format!(
            "You cannot {verb} yourself"
        )));
    }
    if target.role == Role::Admin {
        return Err(AppError::PrivilegedTargetForbidden(format!(
            "Cannot {verb} admin users"
        )));
    }
    Ok(target)
}

async fn suspend_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserActionResponse>> {
    policy::require(&user, Resource::User, Action::Manage)?;
    let target = load_manageable_target(&state, &user, &id, "suspend").await?;

    let updated = UserRepo::set_status(&state.db.pool, &target.id, UserStatus::Suspended)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, by = %user.id, "User suspended");

    Ok(Json(UserActionResponse {
        success: true,
        message: "User suspended successfully".to_string(),
        data: Some(updated.into()),
    }))
}

// No self/admin-target guard here, unlike suspend and delete.
async fn activate_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserActionResponse>> {
    policy::require(&user, Resource::User, Action::Manage)?;

    let updated = UserRepo::set_status(&state.db.pool, &id, UserStatus::Active)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %updated.id, by = %user.id, "User activated");

    Ok(Json(UserActionResponse {
        success: true,
        message: "User activated successfully".to_string(),
        data: Some(updated.into()),
    }))
}

async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserActionResponse>> {
    policy::require(&user, Resource::User, Action::Manage)?;
    let target = load_manageable_target(&state, &user, &id, "delete").await?;

    if !UserRepo::delete(&state.db.pool, &target.id).await? {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    tracing::info!(user_id = %target.id, by = %user.id, "User deleted");

    Ok(Json(UserActionResponse {
        success: true,
        message: "User deleted successfully".to_string(),
        data: None,
    }))
}

async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
    Query(filter): Query<ProjectFilter>,
) -> Result<Json<AdminProjectListResponse>> {
    policy::require(&user, Resource::Report, Action::SystemReport)?;

    let status = match present(&filter.status) {
        Some("all") | None => None,
        Some(status) => Some(validation::parse_enum::<ProjectStatus>(status)?),
    };
    let search = present(&filter.search);

    let projects: Vec<AdminProjectEntry> =
        ProjectRepo::search_with_owner(&state.db.pool, status, search)
            .await?
            .into_iter()
            .map(AdminProjectEntry::from)
            .collect();

    Ok(Json(AdminProjectListResponse {
        success: true,
        count: projects.len(),
        data: projects,
    }))
}

async fn system_analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>> {
    policy::require(&user, Resource::Report, Action::SystemReport)?;

    // The window only applies when both bounds are supplied.
    let window = match (present(&query.start_date), present(&query.end_date)) {
        (Some(start), Some(end)) => Some(DateWindow {
            start: validation::parse_date(start, "startDate")?,
            end: validation::parse_date(end, "endDate")?,
        }),
        _ => None,
    };

    let users = UserRepo::list_all(&state.db.pool).await?;
    let projects = ProjectRepo::list_all(&state.db.pool).await?;
    let tasks = TaskRepo::list_all(&state.db.pool).await?;

    Ok(Json(AnalyticsResponse {
        success: true,
        date_range: DateRange {
            start_date: query.start_date,
            end_date: query.end_date,
        },
        analytics: SystemAnalytics::of(&users, &projects, &tasks, window),
    }))
}
