#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use db::DBService;
use serde_json::Value;
use server::{AppState, config::ServerConfig, routes};
use tempfile::TempDir;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret";

pub struct TestContext {
    pub state: AppState,
    pub app: Router,
    pub token: String,
    _dir: TempDir,
}

pub fn test_config(database_url: String) -> ServerConfig {
    ServerConfig {
        database_url,
        host: "127.0.0.1".to_string(),
        port: 0,
        admin_jwt_secret: SECRET.to_string(),
        db_max_connections: 4,
        operation_timeout: Duration::from_secs(10),
        cors_allowed_origins: Vec::new(),
    }
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("reviews.db").display());
        let config = test_config(url);
        let db = DBService::new(&config.database_url, config.db_max_connections)
            .await
            .unwrap();
        let state = AppState::new(db, config);
        let app = routes::router(state.clone());
        let token = utils::jwt::create_token(SECRET, "admin", 3600).unwrap();

        Self {
            state,
            app,
            token,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    /// Authenticated JSON request with a bearer token.
    pub async fn admin(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token));
        self.send(with_json(builder, body)).await
    }

    /// Same as [`admin`](Self::admin) but without credentials.
    pub async fn anonymous(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        self.send(with_json(builder, body)).await
    }
}

fn with_json(builder: axum::http::request::Builder, body: Option<Value>) -> Request<Body> {
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub fn review_body(name: &str, rating: i32, date: &str, avatar: &str) -> Value {
    serde_json::json!({
        "name": name,
        "location": "Boulder, CO",
        "avatarSrc": avatar,
        "rating": rating,
        "date": date,
        "content": "Great crew, finished on time.",
    })
}
