//! User, session and identity model.
//!
//! Users own tasks. A [`Session`] binds an opaque cookie token to a user for a
//! limited time, and an [`Identity`] is what a single request resolves to:
//! either an authenticated user or nobody.

use std::str::FromStr;

use chrono::Duration;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::Timestamp;

// =============================================================================
// User
// =============================================================================

/// Unique identifier for a user.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a `UserId` from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Generates a new `UserId` with a randomly generated UUID (v4).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(value).map(Self)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A registered user.
///
/// The password is only ever held as an Argon2 PHC string.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier.
    pub user_id: UserId,
    /// Login name, unique across users.
    pub username: String,
    /// Optional contact address.
    pub email: Option<String>,
    /// Argon2 hash of the password.
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// When the account was created.
    pub date_joined: Timestamp,
}

impl User {
    /// Maximum length of a username, in characters.
    pub const USERNAME_MAX_LENGTH: usize = 150;

    /// Creates a new user.
    #[must_use]
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        email: Option<String>,
        password_hash: impl Into<String>,
        date_joined: Timestamp,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            email,
            password_hash: password_hash.into(),
            date_joined,
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("User")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("date_joined", &self.date_joined)
            .finish()
    }
}

// =============================================================================
// Session
// =============================================================================

/// Opaque session token carried in the session cookie.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(String);

impl SessionToken {
    /// Number of random bytes in a generated token.
    const BYTES: usize = 32;

    /// Wraps a token received from a client.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generates a new token from 32 bytes of OS-seeded randomness,
    /// hex encoded.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; Self::BYTES];
        rand::rng().fill_bytes(&mut bytes);

        Self(hex::encode(bytes))
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str("SessionToken(<redacted>)")
    }
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Token identifying the session.
    pub token: SessionToken,
    /// User the session belongs to.
    pub user_id: UserId,
    /// When the session was established.
    pub created_at: Timestamp,
    /// When the session stops being valid.
    pub expires_at: Timestamp,
}

impl Session {
    /// Starts a new session for `user_id` lasting `time_to_live` from `now`.
    #[must_use]
    pub fn start(user_id: UserId, now: Timestamp, time_to_live: Duration) -> Self {
        let expires_at = Timestamp::from_datetime(*now.as_datetime() + time_to_live);
        Self {
            token: SessionToken::generate(),
            user_id,
            created_at: now,
            expires_at,
        }
    }

    /// Returns `true` if the session is still valid at `now`.
    #[must_use]
    pub fn is_active(&self, now: &Timestamp) -> bool {
        now < &self.expires_at
    }
}

// =============================================================================
// Identity
// =============================================================================

/// The identity a request acts as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    /// No valid session accompanied the request.
    #[default]
    Anonymous,
    /// The request carries a valid session for this user.
    Authenticated(User),
}

impl Identity {
    /// Returns the authenticated user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Anonymous => None,
            Self::Authenticated(user) => Some(user),
        }
    }

    /// Returns the authenticated user's id, if any.
    #[must_use]
    pub fn user_id(&self) -> Option<&UserId> {
        self.user().map(|user| &user.user_id)
    }

    /// Returns `true` if a user is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_session_token_generate_is_hex_and_unique() {
        let first = SessionToken::generate();
        let second = SessionToken::generate();

        assert_eq!(first.as_str().len(), 64);
        assert!(first.as_str().chars().all(|character| character.is_ascii_hexdigit()));
        assert_ne!(first, second);
    }

    #[rstest]
    fn test_session_token_debug_is_redacted() {
        let token = SessionToken::new("secret");
        assert!(!format!("{token:?}").contains("secret"));
    }

    #[rstest]
    fn test_session_is_active_until_expiry() {
        let now = Timestamp::now();
        let session = Session::start(UserId::generate(), now.clone(), Duration::hours(1));

        assert!(session.is_active(&now));
        let later = Timestamp::from_datetime(*now.as_datetime() + Duration::hours(2));
        assert!(!session.is_active(&later));
    }

    #[rstest]
    fn test_identity_accessors() {
        let user = User::new(
            UserId::generate(),
            "alice",
            None,
            "hash",
            Timestamp::now(),
        );
        let identity = Identity::Authenticated(user.clone());

        assert!(identity.is_authenticated());
        assert_eq!(identity.user_id(), Some(&user.user_id));
        assert!(!Identity::Anonymous.is_authenticated());
        assert!(Identity::Anonymous.user_id().is_none());
    }

    #[rstest]
    fn test_user_debug_redacts_password_hash() {
        let user = User::new(
            UserId::generate(),
            "alice",
            None,
            "$argon2id$secret",
            Timestamp::now(),
        );
        assert!(!format!("{user:?}").contains("secret"));
    }
}
