use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tower::ServiceExt;

use taskflow::api::router;
use taskflow::auth::JwtService;
use taskflow::config::AppConfig;
use taskflow::state::AppState;

async fn test_app() -> Router {
    let pool = SqlitePool::connect("sqlite://:memory:")
        .await
        .expect("Failed to create test db");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let state = AppState {
        db: pool,
        jwt: JwtService::new("test-secret", 3600),
    };
    let config = AppConfig {
        database_url: "sqlite://:memory:".to_string(),
        port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_ttl_secs: 3600,
        production: false,
        static_dir: String::new(),
    };
    router(state, &config)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Registers a user and returns their bearer token.
async fn register(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Test User", "email": email, "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

async fn create_task(app: &Router, token: &str, body: Value) -> Value {
    let (status, task) = send(app, "POST", "/api/tasks", Some(token), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {task}");
    task
}

#[tokio::test]
async fn health_check() {
    let app = test_app().await;
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_returns_token_and_profile() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "Ada@Example.com", "password": "hunter2"})),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["user"]["name"], "Ada");
    // Emails are stored lowercased.
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("passwordHash").is_none());
    assert!(body["user"].get("password_hash").is_none());
}

#[tokio::test]
async fn register_rejects_invalid_payloads() {
    let app = test_app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "", "email": "not-an-email", "password": "123"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert!(body["errors"]["name"].as_str().is_some());
    assert!(body["errors"]["email"].as_str().is_some());
    assert!(body["errors"]["password"].as_str().is_some());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = test_app().await;
    register(&app, "ada@example.com").await;

    let (status, _) = send(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({"name": "Ada", "email": "ada@example.com", "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_flow() {
    let app = test_app().await;
    register(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());

    // Wrong password and unknown email get the same generic message.
    let (status, wrong_pw) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "ada@example.com", "password": "wrong"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, unknown) = send(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({"email": "nobody@example.com", "password": "hunter2"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_pw["message"], unknown["message"]);
}

#[tokio::test]
async fn task_routes_require_a_valid_token() {
    let app = test_app().await;

    let (status, _) = send(&app, "GET", "/api/tasks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/api/tasks", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // A token signed with a different secret is rejected too.
    let forged = JwtService::new("other-secret", 3600).issue("user-1").unwrap();
    let (status, _) = send(&app, "GET", "/api/tasks", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_complete_a_task() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let task = create_task(
        &app,
        &token,
        json!({"title": "Buy milk", "description": "2% milk, 1 gallon"}),
    )
    .await;
    assert_eq!(task["status"], "pending");
    assert_eq!(task["priority"], "medium");
    assert_eq!(task["isCompleted"], false);
    assert_eq!(task["tags"], json!([]));
    assert!(task["dueDate"].is_null());
    assert!(task["completedAt"].is_null());

    let id = task["id"].as_str().unwrap();
    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&token),
        Some(json!({"status": "completed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["isCompleted"], true);
    assert!(updated["completedAt"].as_str().is_some());
}

#[tokio::test]
async fn create_rejects_invalid_bodies_with_field_errors() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/tasks",
        Some(&token),
        Some(json!({"description": "no title", "status": "done"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["title"].as_str().is_some());
    assert!(body["errors"]["status"].as_str().is_some());
}

#[tokio::test]
async fn tasks_are_scoped_to_their_owner() {
    let app = test_app().await;
    let alice = register(&app, "alice@example.com").await;
    let bob = register(&app, "bob@example.com").await;

    let task = create_task(&app, &alice, json!({"title": "Secret", "description": "Alice's"})).await;
    let id = task["id"].as_str().unwrap();
    let uri = format!("/api/tasks/{id}");

    let (status, _) = send(&app, "GET", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) =
        send(&app, "PUT", &uri, Some(&bob), Some(json!({"title": "Stolen"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Bob's list is empty; Alice still sees her task untouched.
    let (_, list) = send(&app, "GET", "/api/tasks", Some(&bob), None).await;
    assert_eq!(list.as_array().unwrap().len(), 0);
    let (status, task) = send(&app, "GET", &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(task["title"], "Secret");
}

#[tokio::test]
async fn delete_returns_204_then_404() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let task = create_task(&app, &token, json!({"title": "Gone soon", "description": "d"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_update_advances_updated_at_only() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let task = create_task(&app, &token, json!({"title": "Stable", "description": "d"})).await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, updated) = send(&app, "PATCH", &uri, Some(&token), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], task["title"]);
    assert_eq!(updated["status"], task["status"]);
    assert_eq!(updated["createdAt"], task["createdAt"]);
    assert!(updated["updatedAt"].as_str().unwrap() > task["updatedAt"].as_str().unwrap());
}

#[tokio::test]
async fn list_supports_filters_and_sorting() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    create_task(&app, &token, json!({"title": "a", "description": "d", "priority": "urgent"}))
        .await;
    create_task(&app, &token, json!({"title": "b", "description": "d", "priority": "low"})).await;
    create_task(
        &app,
        &token,
        json!({"title": "c", "description": "d", "status": "in-progress"}),
    )
    .await;

    let (status, list) =
        send(&app, "GET", "/api/tasks?status=in-progress", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap().clone();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "c");

    let (status, list) = send(&app, "GET", "/api/tasks?sort=-priority", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<_> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(titles, vec!["a", "c", "b"]);

    let (status, body) = send(&app, "GET", "/api/tasks?sort=nope", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["sort"].as_str().is_some());
}

#[tokio::test]
async fn terminal_tasks_reject_status_changes() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let task = create_task(
        &app,
        &token,
        json!({"title": "Done", "description": "d", "status": "completed"}),
    )
    .await;
    let uri = format!("/api/tasks/{}", task["id"].as_str().unwrap());

    let (status, body) = send(
        &app,
        "PATCH",
        &uri,
        Some(&token),
        Some(json!({"status": "pending"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errors"]["status"].as_str().is_some());
}

#[tokio::test]
async fn profile_returns_the_authenticated_user() {
    let app = test_app().await;
    let token = register(&app, "ada@example.com").await;

    let (status, profile) = send(&app, "GET", "/api/profile", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["email"], "ada@example.com");
    assert_eq!(profile["name"], "Test User");
    assert!(profile["id"].as_str().is_some());
    assert!(profile.get("passwordHash").is_none());

    let (status, _) = send(&app, "GET", "/api/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
