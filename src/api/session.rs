//! Identity resolution, session cookies and flash messages.
//!
//! The `sessionid` cookie carries an opaque [`SessionToken`]. Each request
//! resolves it through the session repository to an [`Identity`]; the
//! [`CurrentUser`] extractor additionally turns an anonymous identity into a
//! redirect to the login page.
//!
//! Flash messages are one-shot confirmations carried between a redirect and
//! the next rendered page in the `messages` cookie.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;

use super::dto::View;
use super::error::{ApiErrorResponse, AuthRequired};
use super::handlers::AppState;
use crate::domain::{Identity, SessionToken, Timestamp, User};
use crate::infrastructure::RepositoryError;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sessionid";

/// Name of the flash message cookie.
pub const MESSAGES_COOKIE: &str = "messages";

const FLASH_SEPARATOR: char = ':';

// =============================================================================
// Flash Messages
// =============================================================================

/// A one-shot confirmation shown on the next rendered page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMessage {
    /// A task was created.
    TaskCreated,
    /// The user logged in.
    LoggedIn,
    /// The user logged out.
    LoggedOut,
}

impl FlashMessage {
    /// Cookie representation.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::LoggedIn => "logged_in",
            Self::LoggedOut => "logged_out",
        }
    }

    /// Text shown to the user.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            Self::TaskCreated => "Task created successfully",
            Self::LoggedIn => "Logged in successfully",
            Self::LoggedOut => "Logged out successfully",
        }
    }

    /// Parses a cookie code. Unknown codes are ignored by callers.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "task_created" => Some(Self::TaskCreated),
            "logged_in" => Some(Self::LoggedIn),
            "logged_out" => Some(Self::LoggedOut),
            _ => None,
        }
    }
}

/// Returns the flash messages waiting in `jar`, oldest first.
#[must_use]
pub fn pending_messages(jar: &CookieJar) -> Vec<FlashMessage> {
    jar.get(MESSAGES_COOKIE)
        .map(|cookie| {
            cookie
                .value()
                .split(FLASH_SEPARATOR)
                .filter_map(FlashMessage::from_code)
                .collect()
        })
        .unwrap_or_default()
}

/// Queues `message` for the next rendered page.
#[must_use]
pub fn push_flash(jar: CookieJar, message: FlashMessage, secure: bool) -> CookieJar {
    let mut codes: Vec<&str> = pending_messages(&jar)
        .into_iter()
        .map(FlashMessage::code)
        .collect();
    codes.push(message.code());

    let value = codes.join(&FLASH_SEPARATOR.to_string());
    jar.add(base_cookie(MESSAGES_COOKIE, value, secure))
}

// =============================================================================
// Responses
// =============================================================================

/// Renders a page descriptor, consuming any pending flash messages.
pub fn render<T: Serialize>(
    jar: CookieJar,
    status: StatusCode,
    view: &'static str,
    data: T,
) -> Response {
    let messages: Vec<String> = pending_messages(&jar)
        .into_iter()
        .map(|message| message.text().to_string())
        .collect();

    let jar = if jar.get(MESSAGES_COOKIE).is_some() {
        jar.remove(Cookie::build(MESSAGES_COOKIE).path("/"))
    } else {
        jar
    };

    (
        status,
        jar,
        Json(View {
            view,
            messages,
            data,
        }),
    )
        .into_response()
}

/// Redirects with `303 See Other`, applying the cookie changes in `jar`.
pub fn redirect(jar: CookieJar, location: &str) -> Response {
    (jar, Redirect::to(location)).into_response()
}

// =============================================================================
// Session Cookies
// =============================================================================

fn base_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

/// Builds the cookie carrying a freshly issued session token.
#[must_use]
pub fn session_cookie(token: &SessionToken, secure: bool) -> Cookie<'static> {
    base_cookie(SESSION_COOKIE, token.as_str().to_string(), secure)
}

/// Returns the session token presented with the request, if any.
#[must_use]
pub fn session_token(jar: &CookieJar) -> Option<SessionToken> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value())
        .filter(|value| !value.is_empty())
        .map(SessionToken::new)
}

/// Removes the session cookie from the client.
#[must_use]
pub fn clear_session_cookie(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

// =============================================================================
// Identity Resolution
// =============================================================================

/// Resolves the session cookie in `jar` to an identity.
///
/// Missing, unknown and expired sessions resolve to `Identity::Anonymous`.
///
/// # Errors
///
/// Returns `RepositoryError` if the session or user lookup fails.
pub async fn resolve_identity(
    jar: &CookieJar,
    state: &AppState,
) -> Result<Identity, RepositoryError> {
    let Some(token) = session_token(jar) else {
        return Ok(Identity::Anonymous);
    };

    let Some(session) = state
        .session_repository
        .find_active(&token, &Timestamp::now())
        .await?
    else {
        return Ok(Identity::Anonymous);
    };

    let user = state.user_repository.find_by_id(&session.user_id).await?;
    Ok(user.map_or(Identity::Anonymous, Identity::Authenticated))
}

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiErrorResponse;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Self>() {
            return Ok(identity.clone());
        }

        let jar = CookieJar::from_headers(&parts.headers);
        let identity = resolve_identity(&jar, state).await?;
        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}

/// Extractor for routes that require an authenticated user.
///
/// Anonymous requests are redirected to the login page with the original
/// path in `next`.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let identity = Identity::from_request_parts(parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        match identity {
            Identity::Authenticated(user) => Ok(Self(user)),
            Identity::Anonymous => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map_or_else(|| parts.uri.path(), |path| path.as_str());
                Err(AuthRequired::new(next).into_response())
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
