#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::ServiceExt;

use taskforge_server::{app, config::Config, db::Database, AppState};

pub const PASSWORD: &str = "secret123";

/// A fresh application over its own on-disk SQLite database.
pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    _dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite:{}?mode=rwc", dir.path().join("test.db").display());

    let db = Database::connect(&url).await.expect("connect");
    db.run_migrations().await.expect("migrations");

    let config = Config {
        port: 0,
        database_url: url,
        jwt_secret: "test-secret".to_string(),
        jwt_expiry_days: 1,
    };
    let pool = db.pool.clone();

    TestApp {
        router: app(AppState { db, config }),
        pool,
        _dir: dir,
    }
}

/// A registered account and its bearer token.
pub struct Account {
    pub id: String,
    pub token: String,
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");

        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        (status, body_json(response.into_body()).await)
    }

    pub async fn get_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, None, Some(body)).await
    }

    pub async fn post_json_auth(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put_json_auth(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn put_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(token), None).await
    }

    pub async fn delete_auth(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Registers `name` with the given role and a fixed password.
    pub async fn register(&self, name: &str, role: &str) -> Account {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                json!({
                    "fullName": name,
                    "email": format!("{}@example.com", name.to_lowercase()),
                    "password": PASSWORD,
                    "role": role,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {name}: {body}");
        Account {
            id: body["id"].as_str().expect("id").to_string(),
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Creates a project running from 2024-01-01 to 2024-06-01 and returns its id.
    pub async fn create_project(&self, token: &str, name: &str) -> String {
        let (status, body) = self
            .post_json_auth(
                "/api/projects",
                token,
                json!({
                    "projectName": name,
                    "projectDescription": format!("{name} description"),
                    "projectStatus": "active",
                    "projectStartDate": "2024-01-01",
                    "projectEndDate": "2024-06-01",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project: {body}");
        body["data"]["id"].as_str().expect("project id").to_string()
    }

    pub async fn create_task(&self, token: &str, project_id: &str, title: &str, status: &str) -> String {
        let (code, body) = self
            .post_json_auth(
                "/api/tasks",
                token,
                json!({
                    "title": title,
                    "description": format!("{title} description"),
                    "project": project_id,
                    "status": status,
                    "priority": "medium",
                    "dueDate": "2024-03-01",
                }),
            )
            .await;
        assert_eq!(code, StatusCode::CREATED, "create task: {body}");
        body["data"]["id"].as_str().expect("task id").to_string()
    }

    pub async fn project(&self, token: &str, project_id: &str) -> Value {
        let (status, body) = self
            .get_auth(&format!("/api/projects/{project_id}"), token)
            .await;
        assert_eq!(status, StatusCode::OK, "get project: {body}");
        body["data"].clone()
    }
}

/// Parses a response body as JSON, or `Value::Null` when it is not JSON.
pub async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.expect("body").to_bytes();
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}
