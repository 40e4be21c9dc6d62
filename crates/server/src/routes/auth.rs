use axum::{
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};

use crate::{
    db::{
        models::{Role, User, UserStatus},
        users::NewUser,
        UserRepo,
    },
    error::{AppError, Result},
    middleware::auth::{auth_middleware, AuthUser},
    policy::{self, Action, Resource},
    services::credentials::{create_token, hash_password, verify_password},
    validation::{self, present, MIN_PASSWORD_LENGTH},
    AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/users", get(list_assignable_users))
        .route_layer(axum_middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<UserStatus>,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOption {
    pub id: String,
    pub full_name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct UserOptionsResponse {
    pub success: bool,
    pub data: Vec<UserOption>,
}

impl From<User> for UserOption {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
        }
    }
}

async fn register(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<RegisterRequest>, AppError>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    let (Some(full_name), Some(email), Some(password)) = (
        present(&body.full_name),
        present(&body.email),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation(
            "Please provide full name, email and password".to_string(),
        ));
    };

    let email = validation::normalize_email(email);
    if !validation::is_valid_email(&email) {
        return Err(AppError::Validation("Please add a valid email".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    let role = match present(&body.role) {
        Some(role) => validation::parse_enum::<Role>(role)?,
        None => Role::User,
    };

    if UserRepo::email_exists(&state.db.pool, &email).await? {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(password)?;
    let user = UserRepo::create(
        &state.db.pool,
        &NewUser {
            full_name,
            email: &email,
            password_hash: &password_hash,
            role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    let token = create_token(
        &user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_days,
    )?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            status: None,
            token,
        }),
    ))
}

async fn login(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<Json<AuthResponse>> {
    let (Some(email), Some(password)) = (present(&body.email), body.password.as_deref()) else {
        return Err(AppError::InvalidCredentials);
    };

    let user = UserRepo::find_by_email(&state.db.pool, &validation::normalize_email(email))
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Suspension is reported before the password is checked.
    if user.status == UserStatus::Suspended {
        return Err(AppError::Forbidden(
            "Your account has been suspended by the admin".to_string(),
        ));
    }

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "User logged in");

    let token = create_token(
        &user.id,
        &state.config.jwt_secret,
        state.config.jwt_expiry_days,
    )?;

    Ok(Json(AuthResponse {
        success: true,
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
        status: Some(user.status),
        token,
    }))
}

/// Regular users, alphabetical, for task-assignment pickers.
async fn list_assignable_users(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<UserOptionsResponse>> {
    policy::require(&user, Resource::User, Action::ListAssignable)?;

    let users = UserRepo::list_by_role_by_name(&state.db.pool, Role::User).await?;

    Ok(Json(UserOptionsResponse {
        success: true,
        data: users.into_iter().map(UserOption::from).collect(),
    }))
}
