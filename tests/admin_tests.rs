// tests/admin_tests.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use quiz_backend::{
    auth::LocalAuthProvider,
    config::Config,
    routes,
    state::AppState,
    store::{DocumentStore, MemoryStore},
};
use serde_json::{Value, json};
use tower::ServiceExt;

/// Builds the router in-process; requests go through `oneshot`.
async fn build_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let config = Config::from_lookup(|key| match key {
        "JWT_SECRET" => Some("admin_test_secret".to_string()),
        "ADMIN_EMAILS" => Some("admin@example.com".to_string()),
        _ => None,
    })
    .expect("Invalid test config");

    let auth = Arc::new(LocalAuthProvider::new(store.clone()));
    let state = AppState::new(store.clone(), auth, config)
        .await
        .expect("Failed to build state");

    (routes::create_router(state), store)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

/// Signs up and returns `(token, uid)`.
async fn sign_up(app: &Router, email: &str, name: &str) -> (String, String) {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/auth/signup",
        None,
        Some(json!({"email": email, "password": "password123", "displayName": name})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        body["token"].as_str().unwrap().to_string(),
        body["user"]["uid"].as_str().unwrap().to_string(),
    )
}

fn slots() -> Vec<Value> {
    (0..10)
        .map(|i| {
            json!({
                "question": format!("Question {}?", i + 1),
                "options": ["Paris", "Rome", "Oslo", "Bern"],
                "answer": "Oslo",
            })
        })
        .collect()
}

#[tokio::test]
async fn non_admins_are_forbidden() {
    let (app, _) = build_app().await;
    let (token, _) = sign_up(&app, "ada@example.com", "Ada").await;

    let (status, _) = call(&app, Method::GET, "/api/admin/users", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, Method::GET, "/api/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn save_then_load_round_trips() {
    let (app, _) = build_app().await;
    let (token, _) = sign_up(&app, "admin@example.com", "Root").await;

    let (status, _) = call(
        &app,
        Method::PUT,
        "/api/admin/content/Geography/label1",
        Some(&token),
        Some(json!({"slots": slots()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(
        &app,
        Method::GET,
        "/api/admin/content/Geography/label1",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["slots"], Value::Array(slots()));
}

#[tokio::test]
async fn row_five_with_three_options_is_rejected_without_saving() {
    let (app, store) = build_app().await;
    let (token, _) = sign_up(&app, "admin@example.com", "Root").await;

    let mut batch = slots();
    batch[4]["options"] = json!(["Paris", "Rome", "Oslo"]);

    let (status, body) = call(
        &app,
        Method::PUT,
        "/api/admin/content/Geography/label1",
        Some(&token),
        Some(json!({"slots": batch})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Row 5"));

    let stored = store
        .get("categories/Geography/labels/label1")
        .await
        .unwrap();
    assert_eq!(stored, None);
}

#[tokio::test]
async fn blank_slots_load_for_new_labels() {
    let (app, _) = build_app().await;
    let (token, _) = sign_up(&app, "admin@example.com", "Root").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/admin/content/Science/labels",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["label"], "label1");
    assert_eq!(body["slots"].as_array().unwrap().len(), 10);
    assert_eq!(body["slots"][0]["options"], json!(["", "", "", ""]));
}

#[tokio::test]
async fn users_are_listed_and_deleted() {
    let (app, store) = build_app().await;
    let (token, admin_uid) = sign_up(&app, "admin@example.com", "Root").await;
    let (_, ada) = sign_up(&app, "ada@example.com", "Ada").await;
    let (_, bob) = sign_up(&app, "bob@example.com", "Bob").await;

    // The roster follows the store asynchronously.
    let mut listed = Value::Null;
    for _ in 0..100 {
        let (status, body) = call(&app, Method::GET, "/api/admin/users?sort=name", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        if body["summary"]["totalUsers"] == 3 {
            listed = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let names: Vec<&str> = listed["users"]
        .as_array()
        .expect("roster never filled")
        .iter()
        .map(|u| u["displayName"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Ada", "Bob", "Root"]);

    let (status, body) = call(&app, Method::GET, "/api/admin/users?search=BOB", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().unwrap().len(), 1);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/admin/users/{}", admin_uid),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/api/admin/users/{}", ada),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(store.get(&format!("users/{}", ada)).await.unwrap(), None);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/admin/users/bulk-delete",
        Some(&token),
        Some(json!({"uids": [bob.clone(), "missing-user", admin_uid]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], json!([bob]));
    assert_eq!(body["failed"].as_array().unwrap().len(), 2);

    // A deleted account can no longer sign in.
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/auth/signin",
        None,
        Some(json!({"email": "ada@example.com", "password": "password123"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
