//! Common test helpers for integration tests.
//!
//! This module provides a cookie-carrying test client that drives the router
//! through `tower::ServiceExt::oneshot`, plus helpers that seed users,
//! sessions, categories and tasks directly through the repositories.
//!
//! # Usage
//!
//! ```ignore
//! mod common;
//! use common::{TestClient, create_test_app_state, logged_in_client};
//! ```
//!
//! # Note
//!
//! The `#![allow(dead_code)]` attribute is necessary because Rust compiles each
//! integration test file as a separate crate. Functions used only by specific
//! test files would otherwise generate dead code warnings during compilation
//! of other test files.

#![allow(dead_code)]

use std::collections::BTreeMap;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use task_tracker::api::{AppState, create_router};
use task_tracker::domain::{
    Category, CategoryId, Session, Task, TaskId, Timestamp, User, UserId,
};
use task_tracker::infrastructure::Repositories;

/// Password used by accounts created through the registration form.
pub const TEST_PASSWORD: &str = "correct-horse-battery";

// =============================================================================
// AppState Creation Helpers
// =============================================================================

/// Creates a test `AppState` with in-memory repositories.
pub fn create_test_app_state() -> AppState {
    AppState::from_repositories(Repositories::in_memory())
}

// =============================================================================
// Test Client
// =============================================================================

/// A response with its body already collected.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// The `Location` header of a redirect.
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    /// The body parsed as JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).expect("response body should be JSON")
    }

    /// Raw `Set-Cookie` header values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(ToString::to_string)
            .collect()
    }

    /// The `Set-Cookie` header for `name`, if any.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{name}=");
        self.set_cookies()
            .into_iter()
            .find(|cookie| cookie.starts_with(&prefix))
    }
}

/// Drives the router like a browser: cookies set by responses are sent with
/// later requests, and removal cookies delete them.
pub struct TestClient {
    router: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn new(state: AppState) -> Self {
        Self {
            router: create_router(state),
            cookies: BTreeMap::new(),
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.cookies.insert(name.to_string(), value.to_string());
    }

    pub fn clear_cookies(&mut self) {
        self.cookies.clear();
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let request = self.request(Method::GET, uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post_form(&mut self, uri: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = serde_urlencoded::to_string(fields).unwrap();
        let request = self
            .request(Method::POST, uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    fn request(&self, method: Method, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        if self.cookies.is_empty() {
            return builder;
        }

        let cookie_header = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        builder.header(header::COOKIE, cookie_header)
    }

    async fn send(&mut self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes().to_vec();

        let response = TestResponse {
            status: parts.status,
            headers: parts.headers,
            body,
        };
        self.store_cookies(&response);
        response
    }

    fn store_cookies(&mut self, response: &TestResponse) {
        for set_cookie in response.set_cookies() {
            let pair = set_cookie.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let removed = value.is_empty() || set_cookie.contains("Max-Age=0");
            if removed {
                self.cookies.remove(name);
            } else {
                self.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }
}

// =============================================================================
// Seeding Helpers
// =============================================================================

/// Stores a user whose password hash is never checked.
pub async fn create_user(state: &AppState, username: &str) -> User {
    let user = User::new(
        UserId::generate(),
        username,
        None,
        "unused-hash",
        Timestamp::now(),
    );
    state.user_repository.insert(&user).await.unwrap();
    user
}

/// Creates a user with an open session and a client carrying its cookie.
pub async fn logged_in_client(state: &AppState, username: &str) -> (TestClient, User) {
    let user = create_user(state, username).await;
    let session = Session::start(user.user_id.clone(), Timestamp::now(), Duration::hours(1));
    state.session_repository.insert(&session).await.unwrap();

    let mut client = TestClient::new(state.clone());
    client.set_cookie("sessionid", session.token.as_str());
    (client, user)
}

pub async fn create_category(state: &AppState, name: &str) -> Category {
    let category = Category::new(CategoryId::generate(), name, Timestamp::now());
    state.category_repository.save(&category).await.unwrap();
    category
}

pub async fn create_task(state: &AppState, owner: &User, title: &str) -> Task {
    let task = Task::new(TaskId::generate(), title, Timestamp::now())
        .with_owner(owner.user_id.clone());
    state.task_repository.insert(&task).await.unwrap();
    task
}

/// Extracts the task id from a `/task/{id}` location.
pub fn task_id_from_location(location: &str) -> TaskId {
    location
        .trim_start_matches("/task/")
        .trim_end_matches('/')
        .parse()
        .expect("location should hold a task id")
}
