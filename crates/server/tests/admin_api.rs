//! Account management and system-wide reporting.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use taskforge_server::db::UserRepo;

use common::{spawn_app, PASSWORD};

#[tokio::test]
async fn admin_routes_are_admin_only() {
    let app = spawn_app().await;
    let moderator = app.register("Mod", "moderator").await;
    let user = app.register("Sam", "user").await;

    for uri in ["/api/admin/dashboard", "/api/admin/users", "/api/admin/analytics"] {
        let (status, body) = app.get_auth(uri, &moderator.token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
        assert_eq!(
            body["message"],
            "User role moderator is not authorized to access this route"
        );
        let (status, _) = app.get_auth(uri, &user.token).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }
}

#[tokio::test]
async fn suspend_and_activate_round_trip() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let user = app.register("Sam", "user").await;

    let (status, body) = app
        .put_auth(&format!("/api/admin/users/{}/suspend", user.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "User suspended successfully");
    assert_eq!(body["data"]["status"], "suspended");

    let (status, body) = app
        .put_auth(&format!("/api/admin/users/{}/activate", user.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");

    let (status, _) = app.get_auth("/api/users/tasks", &user.token).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admins_cannot_suspend_or_delete_themselves_or_other_admins() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let other = app.register("Second", "admin").await;

    let (status, body) = app
        .put_auth(&format!("/api/admin/users/{}/suspend", admin.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot suspend yourself");

    let (status, body) = app
        .delete_auth(&format!("/api/admin/users/{}", admin.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "You cannot delete yourself");

    let (status, body) = app
        .put_auth(&format!("/api/admin/users/{}/suspend", other.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot suspend admin users");

    let (status, body) = app
        .delete_auth(&format!("/api/admin/users/{}", other.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cannot delete admin users");
}

#[tokio::test]
async fn activate_has_no_self_guard() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;

    let (status, body) = app
        .put_auth(&format!("/api/admin/users/{}/activate", admin.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");
}

#[tokio::test]
async fn unknown_targets_are_404() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;

    for uri in [
        "/api/admin/users/missing/suspend",
        "/api/admin/users/missing/activate",
    ] {
        let (status, body) = app.put_auth(uri, &admin.token).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
        assert_eq!(body["message"], "User not found");
    }
    let (status, _) = app
        .delete_auth("/api/admin/users/missing", &admin.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn user_list_excludes_admins() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    app.register("Mod", "moderator").await;
    app.register("Sam", "user").await;

    let (status, body) = app.get_auth("/api/admin/users", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    let roles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["role"].as_str().unwrap())
        .collect();
    assert!(!roles.contains(&"admin"));
}

#[tokio::test]
async fn dashboard_counts_everything() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let moderator = app.register("Mod", "moderator").await;
    let user = app.register("Sam", "user").await;

    let project = app.create_project(&moderator.token, "Apollo").await;
    app.create_task(&moderator.token, &project, "One", "open").await;
    app.create_task(&moderator.token, &project, "Two", "resolved").await;

    app.put_auth(&format!("/api/admin/users/{}/suspend", user.id), &admin.token)
        .await;

    let (status, body) = app.get_auth("/api/admin/dashboard", &admin.token).await;
    assert_eq!(status, StatusCode::OK);
    let stats = &body["statistics"];
    assert_eq!(stats["totalUsers"], 3);
    assert_eq!(stats["activeUsers"], 2);
    assert_eq!(stats["totalProjects"], 1);
    assert_eq!(stats["activeProjects"], 1);
    assert_eq!(stats["totalTasks"], 2);
    assert_eq!(stats["openTasks"], 1);
    assert_eq!(stats["inProgressTasks"], 0);
    assert_eq!(stats["resolvedTasks"], 1);
    assert_eq!(body["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn project_listing_filters_and_searches() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let moderator = app.register("Mod", "moderator").await;

    app.create_project(&moderator.token, "Apollo").await;
    app.create_project(&moderator.token, "Gemini").await;

    let (status, body) = app
        .get_auth("/api/admin/projects?search=apol", &admin.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["projectName"], "Apollo");
    assert_eq!(body["data"][0]["manager"]["fullName"], "Mod");

    let (_, body) = app
        .get_auth("/api/admin/projects?status=all", &admin.token)
        .await;
    assert_eq!(body["count"], 2);

    let (_, body) = app
        .get_auth("/api/admin/projects?status=pending", &admin.token)
        .await;
    assert_eq!(body["count"], 0);

    let (status, _) = app
        .get_auth("/api/admin/projects?status=bogus", &admin.token)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn deleted_owner_leaves_manager_null() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let moderator = app.register("Mod", "moderator").await;
    app.create_project(&moderator.token, "Apollo").await;

    app.delete_auth(&format!("/api/admin/users/{}", moderator.id), &admin.token)
        .await;

    let (_, body) = app.get_auth("/api/admin/projects", &admin.token).await;
    assert_eq!(body["count"], 1);
    assert!(body["data"][0]["manager"].is_null());
}

#[tokio::test]
async fn system_analytics_shapes_and_percentages() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let moderator = app.register("Mod", "moderator").await;
    app.register("Sam", "user").await;
    app.register("Kim", "user").await;

    let project = app.create_project(&moderator.token, "Apollo").await;
    app.create_task(&moderator.token, &project, "One", "resolved").await;
    app.create_task(&moderator.token, &project, "Two", "open").await;
    app.create_task(&moderator.token, &project, "Three", "in-progress").await;

    let (status, body) = app.get_auth("/api/admin/analytics", &admin.token).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(body["statistics"]["totalUsers"], 4);
    assert_eq!(body["statistics"]["totalTasks"], 3);
    assert_eq!(body["statistics"]["completionRate"], 33);
    assert_eq!(body["usersByRole"]["user"]["count"], 2);
    assert_eq!(body["usersByRole"]["user"]["percentage"], 50);
    assert_eq!(body["usersByRole"]["admin"]["percentage"], 25);
    assert_eq!(body["projectsByStatus"]["active"]["count"], 1);
    assert_eq!(body["projectsByStatus"]["active"]["percentage"], 100);
    assert_eq!(body["projectsByStatus"]["onHold"]["count"], 0);
    assert_eq!(body["tasksByStatus"]["in-progress"], 1);
    assert_eq!(body["tasksByPriority"]["medium"], 3);
    assert!(body["dateRange"]["startDate"].is_null());
}

#[tokio::test]
async fn analytics_window_needs_both_bounds() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    app.register("Sam", "user").await;

    // A window in the past excludes everything created now.
    let (status, body) = app
        .get_auth(
            "/api/admin/analytics?startDate=2000-01-01&endDate=2000-12-31",
            &admin.token,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statistics"]["totalUsers"], 0);
    assert_eq!(body["dateRange"]["startDate"], "2000-01-01");

    // A lone bound is ignored.
    let (_, body) = app
        .get_auth("/api/admin/analytics?startDate=2000-01-01", &admin.token)
        .await;
    assert_eq!(body["statistics"]["totalUsers"], 2);
}

#[tokio::test]
async fn status_changes_are_seen_by_the_next_login() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let user = app.register("Sam", "user").await;
    let credentials = json!({ "email": "sam@example.com", "password": PASSWORD });

    for round in 0..20 {
        let (status, _) = app
            .put_auth(&format!("/api/admin/users/{}/suspend", user.id), &admin.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = app.post_json("/api/auth/login", credentials.clone()).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "round {round}");

        let (status, _) = app
            .put_auth(&format!("/api/admin/users/{}/activate", user.id), &admin.token)
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = app.post_json("/api/auth/login", credentials.clone()).await;
        assert_eq!(status, StatusCode::OK, "round {round}: {body}");
    }
}

#[tokio::test]
async fn deleting_a_user_twice_reports_the_second_miss() {
    let app = spawn_app().await;
    let admin = app.register("Root", "admin").await;
    let user = app.register("Sam", "user").await;

    assert!(UserRepo::delete(&app.pool, &user.id).await.unwrap());
    assert!(!UserRepo::delete(&app.pool, &user.id).await.unwrap());

    let (status, body) = app
        .delete_auth(&format!("/api/admin/users/{}", user.id), &admin.token)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}
