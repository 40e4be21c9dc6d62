use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{Project, ProjectStatus},
        projects::{NewProject, ProjectName, ProjectPatch},
        ProjectRepo, TaskRepo,
    },
    error::{AppError, Result},
    middleware::auth::AuthUser,
    policy::{self, Action, Resource},
    services::stats::{
        team_performance, MemberPerformance, OwnedProjectStats, OwnerAnalytics,
        OwnerDashboardStats,
    },
    validation::{self, present},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/list", get(list_project_names))
        .route("/dashboard", get(dashboard))
        .route("/team-performance", get(get_team_performance))
        .route("/analytics", get(analytics))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_status: Option<String>,
    pub project_start_date: Option<String>,
    pub project_end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    pub project_name: Option<String>,
    pub project_description: Option<String>,
    pub project_status: Option<String>,
    pub project_start_date: Option<String>,
    pub project_end_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectResponse {
    pub success: bool,
    pub data: Project,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub success: bool,
    pub statistics: OwnedProjectStats,
    pub data: Vec<Project>,
}

#[derive(Debug, Serialize)]
pub struct ProjectNamesResponse {
    pub success: bool,
    pub data: Vec<ProjectName>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: Project,
    pub owner: Option<Owner>,
}

#[derive(Debug, Serialize)]
pub struct ProjectDetailResponse {
    pub success: bool,
    pub data: ProjectDetail,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub project_name: String,
    pub project_status: ProjectStatus,
    pub progress: i64,
    pub tasks: i64,
    pub team_size: i64,
}

impl From<Project> for ProjectSummary {
    fn from(p: Project) -> Self {
        Self {
            id: p.id,
            project_name: p.project_name,
            project_status: p.project_status,
            progress: p.progress,
            tasks: p.tasks,
            team_size: p.team_size,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub success: bool,
    pub statistics: OwnerDashboardStats,
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Serialize)]
pub struct TeamPerformanceResponse {
    pub success: bool,
    pub data: Vec<MemberPerformance>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsResponse {
    pub success: bool,
    pub project_filter: &'static str,
    #[serde(flatten)]
    pub analytics: OwnerAnalytics,
}

/// Loads a project and applies the owner-or-admin gate.
async fn load_accessible_project(state: &AppState, user: &AuthUser, id: &str) -> Result<Project> {
    let project = ProjectRepo::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    policy::ensure_owner_or_admin(user, &project.created_by, Resource::Project)?;
    Ok(project)
}

async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<CreateProjectRequest>, AppError>,
) -> Result<(StatusCode, Json<ProjectResponse>)> {
    policy::require(&user, Resource::Project, Action::Create)?;

    let (Some(name), Some(description), Some(status), Some(start), Some(end)) = (
        present(&body.project_name),
        present(&body.project_description),
        present(&body.project_status),
        present(&body.project_start_date),
        present(&body.project_end_date),
    ) else {
        return Err(AppError::Validation(
            "Please provide all required fields".to_string(),
        ));
    };

    let project_status = validation::parse_enum::<ProjectStatus>(status)?;
    let project_start_date = validation::parse_date(start, "projectStartDate")?;
    let project_end_date = validation::parse_date(end, "projectEndDate")?;
    validation::ensure_end_after_start(project_start_date, project_end_date)?;

    let project = ProjectRepo::create(
        &state.db.pool,
        &NewProject {
            project_name: name,
            project_description: description,
            project_status,
            project_start_date,
            project_end_date,
            created_by: &user.id,
        },
    )
    .await?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project created");

    Ok((
        StatusCode::CREATED,
        Json(ProjectResponse {
            success: true,
            data: project,
        }),
    ))
}

async fn list_projects(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProjectListResponse>> {
    policy::require(&user, Resource::Project, Action::List)?;

    let projects = ProjectRepo::list_by_owner(&state.db.pool, &user.id).await?;

    Ok(Json(ProjectListResponse {
        success: true,
        statistics: OwnedProjectStats::of(&projects),
        data: projects,
    }))
}

async fn list_project_names(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ProjectNamesResponse>> {
    policy::require(&user, Resource::Project, Action::List)?;

    let projects = ProjectRepo::list_names_by_owner(&state.db.pool, &user.id).await?;

    Ok(Json(ProjectNamesResponse {
        success: true,
        data: projects,
    }))
}

async fn get_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetailResponse>> {
    policy::require(&user, Resource::Project, Action::Read)?;

    let row = ProjectRepo::find_with_owner(&state.db.pool, &id)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
    policy::ensure_owner_or_admin(&user, &row.project.created_by, Resource::Project)?;

    let owner = match (row.owner_name, row.owner_email) {
        (Some(full_name), Some(email)) => Some(Owner {
            id: row.project.created_by.clone(),
            full_name,
            email,
        }),
        _ => None,
    };

    Ok(Json(ProjectDetailResponse {
        success: true,
        data: ProjectDetail {
            project: row.project,
            owner,
        },
    }))
}

async fn update_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<UpdateProjectRequest>, AppError>,
) -> Result<Json<ProjectResponse>> {
    policy::require(&user, Resource::Project, Action::Update)?;
    let current = load_accessible_project(&state, &user, &id).await?;

    let patch = ProjectPatch {
        project_name: validation::non_blank(&body.project_name, "projectName")?,
        project_description: validation::non_blank(
            &body.project_description,
            "projectDescription",
        )?,
        project_status: body
            .project_status
            .as_deref()
            .map(validation::parse_enum::<ProjectStatus>)
            .transpose()?,
        project_start_date: body
            .project_start_date
            .as_deref()
            .map(|d| validation::parse_date(d, "projectStartDate"))
            .transpose()?,
        project_end_date: body
            .project_end_date
            .as_deref()
            .map(|d| validation::parse_date(d, "projectEndDate"))
            .transpose()?,
    };

    if patch.project_start_date.is_some() || patch.project_end_date.is_some() {
        validation::ensure_end_after_start(
            patch.project_start_date.unwrap_or(current.project_start_date),
            patch.project_end_date.unwrap_or(current.project_end_date),
        )?;
    }

    let project = ProjectRepo::update(&state.db.pool, &id, &patch)
        .await?
        .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project updated");

    Ok(Json(ProjectResponse {
        success: true,
        data: project,
    }))
}

async fn delete_project(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    policy::require(&user, Resource::Project, Action::Delete)?;
    let project = load_accessible_project(&state, &user, &id).await?;

    // Tasks referencing the project are left in place.
    if !ProjectRepo::delete(&state.db.pool, &project.id).await? {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    tracing::info!(project_id = %project.id, user_id = %user.id, "Project deleted");

    Ok(Json(MessageResponse {
        success: true,
        message: "Project deleted successfully".to_string(),
    }))
}

async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<DashboardResponse>> {
    policy::require(&user, Resource::Report, Action::OwnerReport)?;

    let projects = ProjectRepo::list_by_owner(&state.db.pool, &user.id).await?;
    let tasks: Vec<_> = TaskRepo::list_for_owner_projects(&state.db.pool, &user.id)
        .await?
        .into_iter()
        .map(|row| row.task)
        .collect();

    Ok(Json(DashboardResponse {
        success: true,
        statistics: OwnerDashboardStats::of(&projects, &tasks),
        projects: projects.into_iter().map(ProjectSummary::from).collect(),
    }))
}

async fn get_team_performance(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<TeamPerformanceResponse>> {
    policy::require(&user, Resource::Report, Action::OwnerReport)?;

    let tasks = TaskRepo::list_for_owner_projects(&state.db.pool, &user.id).await?;

    Ok(Json(TeamPerformanceResponse {
        success: true,
        data: team_performance(&tasks),
    }))
}

async fn analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsResponse>> {
    policy::require(&user, Resource::Report, Action::OwnerReport)?;

    let (projects, tasks, project_filter) = match present(&query.project_id) {
        Some(project_id) => {
            let project = ProjectRepo::find_owned(&state.db.pool, project_id, &user.id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(
                        "Project not found or you do not have access to it".to_string(),
                    )
                })?;
            let tasks = TaskRepo::list_by_project(&state.db.pool, &project.id).await?;
            (vec![project], tasks, "single")
        }
        None => {
            let projects = ProjectRepo::list_by_owner(&state.db.pool, &user.id).await?;
            let tasks = TaskRepo::list_for_owner_projects(&state.db.pool, &user.id)
                .await?
                .into_iter()
                .map(|row| row.task)
                .collect();
            (projects, tasks, "all")
        }
    };

    Ok(Json(AnalyticsResponse {
        success: true,
        project_filter,
        analytics: OwnerAnalytics::of(&projects, &tasks),
    }))
}
