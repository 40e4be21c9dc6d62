pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod services;
pub mod validation;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
}

/// Builds the full HTTP application around `state`.
pub fn app(state: AppState) -> Router {
    // Build protected routes (require authentication)
    let protected_routes = Router::new()
        .nest("/admin", routes::admin::router())
        .nest("/projects", routes::projects::router())
        .nest("/tasks", routes::tasks::router())
        .nest("/users", routes::users::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Auth carries its own mix of public and protected routes
    let api_router = Router::new()
        .nest("/auth", routes::auth::router(state.clone()))
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
