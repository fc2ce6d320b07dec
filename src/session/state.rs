//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Plain data plus the transitions the session lifecycle allows. Every
//! transition keeps `user` present exactly when the status is
//! `Authenticated`, and never leaves a session authenticated without a token.

use crate::net::types::User;

pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please login again.";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    /// The last login attempt failed before reaching the backend.
    Error,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub user: Option<User>,
    pub status: SessionStatus,
    /// Message from the most recent failed transition.
    pub error: Option<String>,
}

impl SessionState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.user.is_some() && self.token.is_some()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.status == SessionStatus::Authenticating
    }

    /// Start resolving a session; `token` is the credential being checked,
    /// if one is already known.
    pub fn begin(&mut self, token: Option<String>) {
        self.token = token;
        self.user = None;
        self.status = SessionStatus::Authenticating;
        self.error = None;
    }

    /// Install a freshly issued token while the profile is still resolving.
    pub fn install_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Finish resolution with the user the token belongs to.
    ///
    /// Ignored when no token is held; a resolved profile alone never
    /// authenticates a session.
    pub fn resolve(&mut self, user: User) -> bool {
        if self.token.is_none() {
            return false;
        }
        self.user = Some(user);
        self.status = SessionStatus::Authenticated;
        self.error = None;
        true
    }

    /// Replace the user of an authenticated session (e.g. after a re-fetch).
    pub fn refresh_user(&mut self, user: User) {
        if self.status == SessionStatus::Authenticated {
            self.user = Some(user);
        }
    }

    /// Drop credentials and return to `Unauthenticated`, keeping `error`.
    pub fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.status = SessionStatus::Unauthenticated;
    }

    /// Clear credentials and record why.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.clear();
        self.error = Some(message.into());
    }

    /// Clear credentials after a transport failure.
    pub fn fail_unreachable(&mut self, message: impl Into<String>) {
        self.fail(message);
        self.status = SessionStatus::Error;
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;
