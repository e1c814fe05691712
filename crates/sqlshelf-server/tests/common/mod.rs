//! Common test utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rusqlite::Connection;
use sqlshelf_server::{config::Config, routes, state::AppState};
use sqlshelf_types::Reply;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Build the API router over a throwaway storage root.
pub fn create_test_app() -> (Router, Arc<AppState>, TempDir) {
    create_test_app_with(|_| {})
}

pub fn create_test_app_with(tweak: impl FnOnce(&mut Config)) -> (Router, Arc<AppState>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        storage_root: temp_dir.path().join("user_databases"),
        ..Config::default()
    };
    tweak(&mut config);

    let state = Arc::new(AppState::new(config).expect("Failed to create AppState"));
    let app = Router::new()
        .nest("/api", routes::api())
        .with_state(state.clone());

    (app, state, temp_dir)
}

/// Create a SQLite file from `sql` in scratch space and return its bytes.
pub fn database_bytes(dir: &TempDir, sql: &str) -> Vec<u8> {
    let path = dir.path().join(format!("scratch-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(sql).unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    bytes
}

pub const SHOP_SQL: &str = r#"
    CREATE TABLE orders (id INTEGER PRIMARY KEY, item TEXT NOT NULL, total REAL);
    INSERT INTO orders (item, total) VALUES ('lamp', 12.5), ('desk', 80), ('pen', 1.25);
    CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT);
"#;

pub async fn upload(app: &Router, user: &str, name: &str, bytes: Vec<u8>) -> (StatusCode, Reply) {
    let request = Request::builder()
        .method("PUT")
        .uri(format!("/api/users/{user}/files/{name}"))
        .header("Content-Type", "application/octet-stream")
        .body(Body::from(bytes))
        .unwrap();
    send(app, request).await
}

pub async fn message(app: &Router, user: &str, text: &str) -> (StatusCode, Reply) {
    let body = serde_json::json!({ "text": text });
    let request = Request::builder()
        .method("POST")
        .uri(format!("/api/users/{user}/messages"))
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();
    send(app, request).await
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Reply) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let reply: Reply = serde_json::from_slice(&body)
        .unwrap_or_else(|e| panic!("Failed to parse reply {:?}: {}", body, e));
    (status, reply)
}
