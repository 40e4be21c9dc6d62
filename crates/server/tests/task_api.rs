//! Task lifecycle: counters, progress recalculation and single assignment.

mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::spawn_app;

#[tokio::test]
async fn progress_follows_resolving_transitions_only() {
    let app = spawn_app().await;
    let moderator = app.register("Mod", "moderator").await;
    let project = app.create_project(&moderator.token, "Apollo").await;

    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["progress"], 0);

    let t1 = app.create_task(&moderator.token, &project, "T1", "open").await;
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["tasks"], 1);

    let (status, _) = app
        .put_json_auth(
            &format!("/api/tasks/{t1}"),
            &moderator.token,
            json!({ "status": "resolved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["progress"], 100);

    // Creation never recomputes progress.
    app.create_task(&moderator.token, &project, "T2", "open").await;
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["tasks"], 2);
    assert_eq!(p["progress"], 100);

    let (status, body) = app
        .delete_auth(&format!("/api/tasks/{t1}"), &moderator.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["tasks"], 1);
    assert_eq!(p["progress"], 0);
}

#[tokio::test]
async fn progress_rounds_to_whole_percent() {
    let app = spawn_app().await;
    let moderator = app.register("Mod", "moderator").await;
    let project = app.create_project(&moderator.token, "Apollo").await;

    app.create_task(&moderator.token, &project, "A", "open").await;
    app.create_task(&moderator.token, &project, "B", "open").await;
    let c = app.create_task(&moderator.token, &project, "C", "open").await;

    app.put_json_auth(
        &format!("/api/tasks/{c}"),
        &moderator.token,
        json!({ "status": "resolved" }),
    )
    .await;
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["progress"], 33);

    // Leaving resolved recomputes too.
    app.put_json_auth(
        &format!("/api/tasks/{c}"),
        &moderator.token,
        json!({ "status": "in-progress" }),
    )
    .await;
    let p = app.project(&moderator.token, &project).await;
    assert_eq!(p["progress"], 0);
}

#[tokio::test]
async fn create_validates_and_checks_project_ownership() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let stranger = app.register("Stranger", "moderator").await;
    let admin = app.register("Root", "admin").await;
    let project = app.create_project(&owner.token, "Apollo").await;

    let (status, body) = app
        .post_json_auth(
            "/api/tasks",
            &owner.token,
            json!({ "title": "T", "description": "D", "project": project }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Please provide all required fields including due date"
    );

    let task = json!({
        "title": "T",
        "description": "D",
        "project": "no-such-project",
        "status": "open",
        "priority": "high",
        "dueDate": "2024-03-01",
    });
    let (status, _) = app
        .post_json_auth("/api/tasks", &owner.token, task.clone())
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let mut task = task;
    task["project"] = json!(project);
    let (status, _) = app
        .post_json_auth("/api/tasks", &stranger.token, task.clone())
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post_json_auth("/api/tasks", &admin.token, task).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["priority"], "high");
    assert_eq!(body["data"]["project"]["projectName"], "Apollo");
    assert_eq!(body["data"]["createdBy"]["fullName"], "Root");
    assert!(body["data"]["assignedTo"].is_null());

    let p = app.project(&owner.token, &project).await;
    assert_eq!(p["tasks"], 1);
}

#[tokio::test]
async fn regular_users_cannot_create_tasks() {
    let app = spawn_app().await;
    let user = app.register("Sam", "user").await;

    let (status, _) = app
        .post_json_auth(
            "/api/tasks",
            &user.token,
            json!({
                "title": "T",
                "description": "D",
                "project": "p",
                "status": "open",
                "priority": "low",
                "dueDate": "2024-03-01",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn list_returns_created_tasks_with_statistics() {
    let app = spawn_app().await;
    let moderator = app.register("Mod", "moderator").await;
    let other = app.register("Other", "moderator").await;
    let project = app.create_project(&moderator.token, "Apollo").await;
    let other_project = app.create_project(&other.token, "Gemini").await;

    app.create_task(&moderator.token, &project, "A", "open").await;
    app.create_task(&moderator.token, &project, "B", "in-progress").await;
    app.create_task(&moderator.token, &project, "C", "resolved").await;
    app.create_task(&other.token, &other_project, "X", "open").await;

    let (status, body) = app.get_auth("/api/tasks", &moderator.token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["statistics"]["totalTasks"], 3);
    assert_eq!(body["statistics"]["openTasks"], 1);
    assert_eq!(body["statistics"]["inProgressTasks"], 1);
    assert_eq!(body["statistics"]["resolvedTasks"], 1);
    assert_eq!(body["data"][0]["title"], "C");
}

#[tokio::test]
async fn read_update_and_delete_are_creator_or_admin_only() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let stranger = app.register("Stranger", "moderator").await;
    let admin = app.register("Root", "admin").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let task = app.create_task(&owner.token, &project, "T", "open").await;
    let uri = format!("/api/tasks/{task}");

    let (status, body) = app.get_auth(&uri, &stranger.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Not authorized to access this task");

    let (status, _) = app
        .put_json_auth(&uri, &stranger.token, json!({ "title": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete_auth(&uri, &stranger.token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put_json_auth(
            &uri,
            &admin.token,
            json!({ "title": "Renamed", "notes": "checked", "priority": "urgent" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Renamed");
    assert_eq!(body["data"]["notes"], "checked");
    assert_eq!(body["data"]["priority"], "urgent");
    assert_eq!(body["data"]["status"], "open");

    let (status, _) = app.get_auth("/api/tasks/missing", &owner.token).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_rejects_invalid_values() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let task = app.create_task(&owner.token, &project, "T", "open").await;
    let uri = format!("/api/tasks/{task}");

    for body in [
        json!({ "status": "done" }),
        json!({ "priority": "critical" }),
        json!({ "dueDate": "someday" }),
        json!({ "title": "" }),
    ] {
        let (status, _) = app.put_json_auth(&uri, &owner.token, body.clone()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn assignment_is_single_until_unassigned() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let first = app.register("First", "user").await;
    let second = app.register("Second", "user").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let task = app.create_task(&owner.token, &project, "T", "open").await;
    let assign = format!("/api/tasks/{task}/assign");

    let (status, body) = app
        .put_json_auth(&assign, &owner.token, json!({ "userId": first.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assignedTo"]["fullName"], "First");

    let (status, body) = app
        .put_json_auth(&assign, &owner.token, json!({ "userId": second.id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "This task has already been assigned to a user. Please unassign first before reassigning."
    );

    let (status, body) = app
        .put_auth(&format!("/api/tasks/{task}/unassign"), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["assignedTo"].is_null());

    let (status, body) = app
        .put_json_auth(&assign, &owner.token, json!({ "userId": second.id }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["assignedTo"]["fullName"], "Second");

    // Every successful assignment counts; unassigning does not subtract.
    let p = app.project(&owner.token, &project).await;
    assert_eq!(p["teamSize"], 2);
}

#[tokio::test]
async fn assign_checks_input_and_target() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let stranger = app.register("Stranger", "moderator").await;
    let worker = app.register("Worker", "user").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let task = app.create_task(&owner.token, &project, "T", "open").await;
    let assign = format!("/api/tasks/{task}/assign");

    let (status, body) = app.put_json_auth(&assign, &owner.token, json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide user ID");

    let (status, _) = app
        .put_json_auth(&assign, &stranger.token, json!({ "userId": worker.id }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .put_json_auth(&assign, &owner.token, json!({ "userId": "ghost" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, _) = app
        .put_json_auth(
            "/api/tasks/missing/assign",
            &owner.token,
            json!({ "userId": worker.id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let p = app.project(&owner.token, &project).await;
    assert_eq!(p["teamSize"], 0);
}

#[tokio::test]
async fn deleting_tasks_never_drives_the_counter_negative() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let task = app.create_task(&owner.token, &project, "T", "resolved").await;

    sqlx::query("UPDATE projects SET tasks = 0 WHERE id = ?")
        .bind(&project)
        .execute(&app.pool)
        .await
        .unwrap();

    let (status, _) = app
        .delete_auth(&format!("/api/tasks/{task}"), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);

    let p = app.project(&owner.token, &project).await;
    assert_eq!(p["tasks"], 0);
    assert_eq!(p["progress"], 0);
}

#[tokio::test]
async fn resolving_a_lone_task_always_reads_back_full_progress() {
    let app = spawn_app().await;
    let moderator = app.register("Mod", "moderator").await;

    for i in 0..30 {
        let project = app
            .create_project(&moderator.token, &format!("Project {i}"))
            .await;
        let task = app.create_task(&moderator.token, &project, "Only", "open").await;

        let (status, _) = app
            .put_json_auth(
                &format!("/api/tasks/{task}"),
                &moderator.token,
                json!({ "status": "resolved" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let p = app.project(&moderator.token, &project).await;
        assert_eq!(p["progress"], 100, "project {i}");
    }
}

#[tokio::test]
async fn failed_progress_recalculation_does_not_fail_the_request() {
    let app = spawn_app().await;
    let owner = app.register("Owner", "moderator").await;
    let worker = app.register("Worker", "user").await;
    let project = app.create_project(&owner.token, "Apollo").await;
    let first = app.create_task(&owner.token, &project, "First", "open").await;
    let second = app.create_task(&owner.token, &project, "Second", "open").await;

    sqlx::query(
        "CREATE TRIGGER freeze_progress BEFORE UPDATE OF progress ON projects
         BEGIN SELECT RAISE(ABORT, 'progress is frozen'); END",
    )
    .execute(&app.pool)
    .await
    .unwrap();

    let (status, body) = app
        .put_json_auth(
            &format!("/api/tasks/{first}"),
            &owner.token,
            json!({ "status": "resolved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");

    app.put_json_auth(
        &format!("/api/tasks/{second}/assign"),
        &owner.token,
        json!({ "userId": worker.id }),
    )
    .await;
    let (status, body) = app
        .put_json_auth(
            &format!("/api/users/tasks/{second}/status"),
            &worker.token,
            json!({ "status": "resolved" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "resolved");

    let (status, body) = app
        .delete_auth(&format!("/api/tasks/{first}"), &owner.token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");

    // The counter moved with the delete; progress stayed where it was.
    let p = app.project(&owner.token, &project).await;
    assert_eq!(p["tasks"], 1);
    assert_eq!(p["progress"], 0);
}
