//! Authenticated session state.
//!
//! A [`Session`] is an explicit value handed to the HTTP client. Nothing in
//! this crate stores the token on disk; the CLI receives it through
//! `--token` / `TECHFLOW_TOKEN` and prints it after `login`.

use techflow_proto::auth::{LoginResponse, User};

/// Errors raised when building a session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    /// No token was supplied for a command that needs one.
    #[error("not logged in: pass --token or set TECHFLOW_TOKEN (run `techflow login` first)")]
    MissingToken,

    /// The supplied token is blank.
    #[error("token is empty")]
    EmptyToken,
}

/// A bearer token plus the user it belongs to, when known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user: Option<User>,
}

impl Session {
    /// Creates a session from a raw token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::EmptyToken`] if the token is blank.
    pub fn new(token: impl Into<String>) -> Result<Self, SessionError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(SessionError::EmptyToken);
        }
        Ok(Self { token, user: None })
    }

    /// Creates a session from an optional CLI/env token.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::MissingToken`] if no token was given, or
    /// [`SessionError::EmptyToken`] if it is blank.
    pub fn from_token(token: Option<&str>) -> Result<Self, SessionError> {
        token.map_or(Err(SessionError::MissingToken), Self::new)
    }

    /// The bearer token.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The logged-in user, if the session came from a login.
    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }
}

impl TryFrom<LoginResponse> for Session {
    type Error = SessionError;

    fn try_from(response: LoginResponse) -> Result<Self, Self::Error> {
        let mut session = Self::new(response.token)?;
        session.user = Some(response.user);
        Ok(session)
    }
}
