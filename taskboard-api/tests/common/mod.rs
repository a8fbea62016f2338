//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - An in-memory store behind the real router
//! - Test user creation with access tokens
//! - Request helpers that return status and parsed JSON

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::{ApiConfig, Config, DatabaseConfig, EventsConfig, JwtConfig};
use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
use taskboard_shared::events::BroadcastRelay;
use taskboard_shared::models::CreateUser;
use taskboard_shared::store::{MemoryStore, UserStore};
use tower::Service as _;
use uuid::Uuid;

pub const JWT_SECRET: &str = "test-secret-key-at-least-32-bytes-long";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: Router,
    pub config: Config,
}

/// A user with a valid access token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: Uuid,
    pub name: String,
    pub token: String,
}

impl TestContext {
    /// Creates a new test context with an empty store
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://unused".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: JWT_SECRET.to_string(),
            },
            events: EventsConfig { capacity: 64 },
        };

        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(
            store.clone(),
            BroadcastRelay::new(config.events.capacity),
            config.clone(),
        );
        let app = build_router(state);

        TestContext { store, app, config }
    }

    /// Inserts a user directly and mints an access token for it
    pub async fn user(&self, name: &str) -> TestUser {
        let user = self
            .store
            .create_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name.to_lowercase()),
                password_hash: "not-a-real-hash".to_string(),
            })
            .await
            .unwrap();

        let token = create_token(&Claims::new(user.id, TokenType::Access), JWT_SECRET).unwrap();

        TestUser {
            id: user.id,
            name: user.name,
            token,
        }
    }

    /// Sends a raw request through the router
    pub async fn call(&self, request: Request<Body>) -> Response {
        self.app.clone().call(request).await.unwrap()
    }

    /// Sends a request and returns status and JSON body (`Null` when empty)
    pub async fn send(
        &self,
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
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.call(request).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.token), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(&user.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(&user.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(&user.token), None).await
    }

    /// Creates a project owned by `owner` and returns its ID
    pub async fn create_project(&self, owner: &TestUser, team: &[&TestUser]) -> String {
        let team: Vec<Uuid> = team.iter().map(|u| u.id).collect();
        let (status, body) = self
            .post(
                "/v1/projects",
                owner,
                serde_json::json!({
                    "title": "Website relaunch",
                    "description": "Rebuild the marketing site",
                    "team_members": team,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a task in `project_id` as `caller` and returns its ID
    pub async fn create_task(
        &self,
        caller: &TestUser,
        project_id: &str,
        assignee: &TestUser,
    ) -> String {
        let (status, body) = self
            .post(
                "/v1/tasks",
                caller,
                serde_json::json!({
                    "project_id": project_id,
                    "assigned_to": assignee.id,
                    "title": "Draft copy",
                    "description": "Write the landing page copy",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);

        body["id"].as_str().unwrap().to_string()
    }
}

/// IDs of the users in a project's `team_members` array
pub fn team_ids(project: &Value) -> Vec<String> {
    let mut ids: Vec<String> = project["team_members"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect();
    ids.sort();
    ids
}
