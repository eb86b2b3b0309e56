//! Registration, login and logout.
//!
//! Passwords are hashed with Argon2id on the blocking thread pool. A
//! successful login stores a [`Session`] and hands its token to the client in
//! the `sessionid` cookie; logout deletes the stored session.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::dto::{AuthFormData, LoginForm, NextQuery, RegisterForm};
use super::error::{ApiErrorResponse, FieldError, LOGIN_PATH};
use super::handlers::AppState;
use super::routes::TASK_LIST_PATH;
use super::session::{
    FlashMessage, clear_session_cookie, push_flash, redirect, render, session_cookie,
    session_token,
};
use crate::domain::{Identity, Session, Timestamp, User, UserId};
use crate::infrastructure::{PasswordError, PasswordHasher, RepositoryError};

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str = "Please enter a correct username and password. \
                             Note that both fields may be case-sensitive.";

/// Returns `next` if it is a path on this site.
///
/// Rejects absolute and scheme-relative URLs so a crafted login link cannot
/// send the user elsewhere.
#[must_use]
pub fn safe_next(next: Option<&str>) -> Option<String> {
    next.map(str::trim)
        .filter(|path| {
            path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control)
        })
        .map(ToString::to_string)
}

async fn hash_password(
    hasher: PasswordHasher,
    password: String,
) -> Result<String, ApiErrorResponse> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|error| PasswordError::Hash(error.to_string()))?
        .map_err(ApiErrorResponse::from)
}

/// Checks `password` against `hash`. Without a hash (unknown username) the
/// same Argon2 work still runs and the answer is always `false`.
async fn verify_password(
    hasher: PasswordHasher,
    password: String,
    hash: Option<String>,
) -> Result<bool, ApiErrorResponse> {
    tokio::task::spawn_blocking(move || match hash {
        Some(hash) => hasher.verify(&password, &hash),
        None => hasher.verify_unknown_user(&password),
    })
        .await
        .map_err(|error| PasswordError::Hash(error.to_string()))?
        .map_err(ApiErrorResponse::from)
}

// =============================================================================
// /register/ Handlers
// =============================================================================

/// Shows the registration form, or redirects a logged-in user to the list.
pub async fn register_form(identity: Identity, jar: CookieJar) -> Response {
    if identity.is_authenticated() {
        return redirect(jar, TASK_LIST_PATH);
    }

    let data = AuthFormData {
        form: RegisterForm::default(),
        errors: Vec::new(),
    };
    render(jar, StatusCode::OK, "register", data)
}

/// Creates an account and redirects to the login page.
///
/// # Response
///
/// - **303 See Other**: account created
/// - **400 Bad Request**: `register` view with field errors
pub async fn register(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<Response, ApiErrorResponse> {
    if identity.is_authenticated() {
        return Ok(redirect(jar, TASK_LIST_PATH));
    }

    let rejected = |jar: CookieJar, errors: Vec<FieldError>| {
        let data = AuthFormData {
            form: form.without_passwords(),
            errors,
        };
        render(jar, StatusCode::BAD_REQUEST, "register", data)
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(error) => return Ok(rejected(jar, error.errors)),
    };

    if state
        .user_repository
        .find_by_username(&input.username)
        .await?
        .is_some()
    {
        return Ok(rejected(jar, vec![FieldError::new("username", USERNAME_TAKEN)]));
    }

    let password_hash = hash_password(state.password_hasher, input.password).await?;
    let user = User::new(
        UserId::generate(),
        input.username,
        input.email,
        password_hash,
        Timestamp::now(),
    );

    match state.user_repository.insert(&user).await {
        Ok(()) => {}
        Err(RepositoryError::Conflict(_)) => {
            return Ok(rejected(jar, vec![FieldError::new("username", USERNAME_TAKEN)]));
        }
        Err(error) => return Err(error.into()),
    }

    tracing::info!(user_id = %user.user_id, username = %user.username, "User registered");

    Ok(redirect(jar, LOGIN_PATH))
}

// =============================================================================
// /login/ Handlers
// =============================================================================

/// Shows the login form, or redirects a logged-in user to the list.
pub async fn login_form(
    identity: Identity,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
) -> Response {
    if identity.is_authenticated() {
        return redirect(jar, TASK_LIST_PATH);
    }

    let data = AuthFormData {
        form: LoginForm {
            next: safe_next(query.next.as_deref()),
            ..LoginForm::default()
        },
        errors: Vec::new(),
    };
    render(jar, StatusCode::OK, "login", data)
}

/// Verifies credentials and starts a session.
///
/// The destination is the `next` form field or query parameter when it is a
/// local path, the task list otherwise.
///
/// # Response
///
/// - **303 See Other**: logged in; sets the `sessionid` cookie
/// - **400 Bad Request**: `login` view with a form-wide error
pub async fn login(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<NextQuery>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiErrorResponse> {
    let next = safe_next(form.next.as_deref()).or_else(|| safe_next(query.next.as_deref()));
    if identity.is_authenticated() {
        return Ok(redirect(jar, TASK_LIST_PATH));
    }

    let rejected = |jar: CookieJar, errors: Vec<FieldError>| {
        let data = AuthFormData {
            form: LoginForm {
                next: next.clone(),
                ..form.without_password()
            },
            errors,
        };
        render(jar, StatusCode::BAD_REQUEST, "login", data)
    };

    let credentials = match form.validate() {
        Ok(credentials) => credentials,
        Err(error) => return Ok(rejected(jar, error.errors)),
    };

    let user = state
        .user_repository
        .find_by_username(&credentials.username)
        .await?;

    let stored_hash = user.as_ref().map(|user| user.password_hash.clone());
    let verified =
        verify_password(state.password_hasher, credentials.password, stored_hash).await?;
    let authenticated = user.filter(|_| verified);

    let Some(user) = authenticated else {
        tracing::warn!(username = %credentials.username, "Login failed");
        return Ok(rejected(jar, vec![FieldError::non_field(INVALID_LOGIN)]));
    };

    let now = Timestamp::now();
    let purged = state.session_repository.delete_expired(&now).await?;
    if purged > 0 {
        tracing::debug!(purged, "Expired sessions removed");
    }

    let session = Session::start(user.user_id.clone(), now, state.config.session_ttl);
    state.session_repository.insert(&session).await?;

    tracing::info!(user_id = %user.user_id, "User logged in");

    let secure = state.config.secure_cookies;
    let jar = jar.add(session_cookie(&session.token, secure));
    let jar = push_flash(jar, FlashMessage::LoggedIn, secure);

    let destination = next.as_deref().unwrap_or(TASK_LIST_PATH);
    Ok(redirect(jar, destination))
}

// =============================================================================
// /logout/ Handler
// =============================================================================

/// Ends the current session, if any, and redirects to the list.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, ApiErrorResponse> {
    if let Some(token) = session_token(&jar)
        && state.session_repository.delete(&token).await?
    {
        tracing::info!("User logged out");
    }

    let jar = clear_session_cookie(jar);
    let jar = push_flash(jar, FlashMessage::LoggedOut, state.config.secure_cookies);
    Ok(redirect(jar, TASK_LIST_PATH))
}
