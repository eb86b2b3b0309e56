//! Integration tests for registration, login and logout.
//!
//! # Tests Covered
//!
//! - Full register, login, logout round trip with flash messages
//! - Post-login redirect to a local `next` path only
//! - Registration and login validation errors

mod common;

use axum::http::StatusCode;
use rstest::rstest;

use common::{TEST_PASSWORD, TestClient, create_test_app_state, create_user};
use task_tracker::domain::{SessionToken, Timestamp};

async fn register(client: &mut TestClient, username: &str) {
    let response = client
        .post_form(
            "/register/",
            &[
                ("username", username),
                ("email", "someone@example.com"),
                ("password1", TEST_PASSWORD),
                ("password2", TEST_PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/login/");
}

fn error_fields(body: &serde_json::Value) -> Vec<String> {
    body["data"]["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["field"].as_str().unwrap().to_string())
        .collect()
}

// =============================================================================
// Round Trip
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_register_login_logout_round_trip() {
    let state = create_test_app_state();
    let mut client = TestClient::new(state.clone());

    let form = client.get("/register/").await;
    assert_eq!(form.status, StatusCode::OK);
    assert_eq!(form.json()["view"], "register");

    register(&mut client, "alice").await;
    let user = state
        .user_repository
        .find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    assert_ne!(user.password_hash, TEST_PASSWORD);
    assert_eq!(user.email.as_deref(), Some("someone@example.com"));

    let login_form = client.get("/login/?next=%2Ftasks%2Fcreate%2F").await;
    assert_eq!(login_form.json()["data"]["form"]["next"], "/tasks/create/");

    let response = client
        .post_form(
            "/login/",
            &[
                ("username", "alice"),
                ("password", TEST_PASSWORD),
                ("next", "/tasks/create/"),
            ],
        )
        .await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/tasks/create/");
    let session_cookie = response.set_cookie("sessionid").unwrap();
    assert!(session_cookie.contains("HttpOnly"));
    assert!(session_cookie.contains("SameSite=Lax"));
    assert!(session_cookie.contains("Path=/"));

    let list = client.get("/tasks/").await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.json()["messages"][0], "Logged in successfully");

    let again = client.get("/register/").await;
    assert_eq!(again.status, StatusCode::SEE_OTHER);
    assert_eq!(again.location(), "/tasks/");

    let token = SessionToken::new(client.cookie("sessionid").unwrap());
    let response = client.post_form("/logout/", &[]).await;
    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/tasks/");
    assert_eq!(client.cookie("sessionid"), None);
    assert!(
        state
            .session_repository
            .find_active(&token, &Timestamp::now())
            .await
            .unwrap()
            .is_none()
    );

    let list = client.get("/tasks/").await;
    assert_eq!(list.status, StatusCode::SEE_OTHER);
    let login_page = client.get(list.location()).await.json();
    assert_eq!(login_page["view"], "login");
    assert_eq!(login_page["messages"][0], "Logged out successfully");
}

#[rstest]
#[tokio::test]
async fn test_login_ignores_offsite_next() {
    let state = create_test_app_state();
    let mut client = TestClient::new(state);
    register(&mut client, "alice").await;

    let response = client
        .post_form(
            "/login/?next=%2F%2Fevil.example%2F",
            &[("username", "alice"), ("password", TEST_PASSWORD)],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/tasks/");
}

#[rstest]
#[tokio::test]
async fn test_logout_when_anonymous_still_redirects() {
    let mut client = TestClient::new(create_test_app_state());

    let response = client.get("/logout/").await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    assert_eq!(response.location(), "/tasks/");
    assert_eq!(client.cookie("messages"), Some("logged_out"));
}

// =============================================================================
// Login Failures
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_login_with_wrong_password_is_rejected() {
    let state = create_test_app_state();
    let mut client = TestClient::new(state);
    register(&mut client, "alice").await;

    let response = client
        .post_form(
            "/login/",
            &[("username", "alice"), ("password", "not-the-password")],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["view"], "login");
    assert_eq!(error_fields(&body), vec!["__all__"]);
    assert_eq!(body["data"]["form"]["username"], "alice");
    assert_eq!(body["data"]["form"]["password"], serde_json::Value::Null);
    assert_eq!(client.cookie("sessionid"), None);
}

#[rstest]
#[tokio::test]
async fn test_login_with_unknown_user_is_rejected() {
    let mut client = TestClient::new(create_test_app_state());

    let response = client
        .post_form("/login/", &[("username", "ghost"), ("password", "whatever")])
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json()), vec!["__all__"]);
}

#[rstest]
#[tokio::test]
async fn test_login_requires_both_fields() {
    let mut client = TestClient::new(create_test_app_state());

    let response = client.post_form("/login/", &[("username", " ")]).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(error_fields(&response.json()), vec!["username", "password"]);
}

// =============================================================================
// Registration Failures
// =============================================================================

#[rstest]
#[tokio::test]
async fn test_register_with_taken_username_is_rejected() {
    let state = create_test_app_state();
    create_user(&state, "alice").await;
    let mut client = TestClient::new(state);

    let response = client
        .post_form(
            "/register/",
            &[
                ("username", "alice"),
                ("password1", TEST_PASSWORD),
                ("password2", TEST_PASSWORD),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(
        body["data"]["errors"][0]["message"],
        "A user with that username already exists."
    );
    assert_eq!(error_fields(&body), vec!["username"]);
}

#[rstest]
#[tokio::test]
async fn test_register_reports_every_invalid_field_without_echoing_passwords() {
    let state = create_test_app_state();
    let mut client = TestClient::new(state.clone());

    let response = client
        .post_form(
            "/register/",
            &[
                ("username", "bad name"),
                ("email", "nope"),
                ("password1", "1234567"),
                ("password2", "7654321"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(
        error_fields(&body),
        vec!["username", "email", "password2", "password2", "password2"]
    );
    assert_eq!(body["data"]["form"]["username"], "bad name");
    assert_eq!(body["data"]["form"]["password1"], serde_json::Value::Null);
    assert_eq!(body["data"]["form"]["password2"], serde_json::Value::Null);
    assert!(
        state
            .user_repository
            .find_by_username("bad name")
            .await
            .unwrap()
            .is_none()
    );
}
