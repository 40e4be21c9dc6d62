use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{
    db::{
        models::{Role, UserStatus},
        UserRepo,
    },
    error::{AppError, Result},
    services::credentials::verify_token,
    AppState,
};

/// The caller behind a verified bearer token, loaded fresh from the store.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub full_name: String,
    pub email: String,
    pub role: Role,
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthenticated("Not authorized, no token".to_string()))?;

    let claims = verify_token(token, &state.config.jwt_secret)?;

    let user = UserRepo::find_by_id(&state.db.pool, &claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Not authorized, user not found".to_string()))?;

    if user.status == UserStatus::Suspended {
        return Err(AppError::Forbidden(
            "Your account has been suspended by the admin".to_string(),
        ));
    }

    request.extensions_mut().insert(AuthUser {
        id: user.id,
        full_name: user.full_name,
        email: user.email,
        role: user.role,
    });

    Ok(next.run(request).await)
}

// Extractor for getting the authenticated user from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated("Not authorized".to_string()))
    }
}
