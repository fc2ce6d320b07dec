//! Session lifecycle: startup resolution, login, logout.
//!
//! SYSTEM CONTEXT
//! ==============
//! Views call the manager to establish identity and read the derived
//! `is_authenticated` / `loading` / `error` projections. Domain calls go
//! through [`SessionManager::backend`], which shares the same session handle.
//!
//! ERROR HANDLING
//! ==============
//! Expected authentication failures are reported through `login`'s `false`
//! return and the `error` projection, never as an `Err`.

use std::sync::Arc;

use super::handle::SessionHandle;
use super::state::{SESSION_EXPIRED_MESSAGE, SessionState, SessionStatus};
use crate::net::types::{User, UserUpdate};
use crate::net::{ApiError, Backend};

const LOGIN_FAILED_MESSAGE: &str = "Login failed. Please try again.";
const UNREACHABLE_MESSAGE: &str = "Unable to reach the server. Please check your connection and try again.";

#[derive(Clone)]
pub struct SessionManager {
    backend: Arc<dyn Backend>,
    handle: SessionHandle,
}

impl SessionManager {
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, handle: SessionHandle) -> Self {
        Self { backend, handle }
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    #[must_use]
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Resolve a persisted token into an authenticated session.
    pub async fn initialize(&self) -> SessionStatus {
        let Some(token) = self.handle.persisted_token() else {
            self.handle.update(SessionState::clear);
            return SessionStatus::Unauthenticated;
        };
        self.handle.update(|state| state.begin(Some(token)));

        match self.backend.fetch_profile().await {
            Ok(user) => self.finish(user),
            Err(e) => {
                tracing::warn!(error = %e, "persisted session could not be resolved");
                self.handle.clear_with(Some(SESSION_EXPIRED_MESSAGE));
                SessionStatus::Unauthenticated
            }
        }
    }

    /// Exchange credentials for a session. Returns `true` once the profile
    /// has been resolved.
    pub async fn login(&self, username: &str, password: &str) -> bool {
        self.handle.begin_login();

        let issued = match self.backend.authenticate(username, password).await {
            Ok(issued) => issued,
            Err(ApiError::Transport(e)) => {
                tracing::warn!(error = %e, "login request did not reach the backend");
                self.handle.update(|state| state.fail_unreachable(UNREACHABLE_MESSAGE));
                return false;
            }
            Err(e) => {
                tracing::info!(username, error = %e, "login rejected");
                let message = match e {
                    ApiError::Unauthorized { detail } | ApiError::Status { detail, .. } if !detail.is_empty() => detail,
                    _ => LOGIN_FAILED_MESSAGE.to_owned(),
                };
                self.handle.update(|state| state.fail(message));
                return false;
            }
        };

        if !self.handle.install_issued(&issued.access_token) {
            tracing::info!(username, "login abandoned before the token was installed");
            return false;
        }

        match self.backend.fetch_profile().await {
            Ok(user) => {
                let status = self.finish(user);
                tracing::info!(username, "logged in");
                status == SessionStatus::Authenticated
            }
            Err(e) => {
                tracing::warn!(error = %e, "issued token could not be resolved to a profile");
                self.handle.clear_with(Some(&e.user_message()));
                false
            }
        }
    }

    /// Drop the session. Safe to call when already logged out.
    pub fn logout(&self) {
        let was_authenticated = self.is_authenticated();
        self.handle.clear_with(None);
        if was_authenticated {
            tracing::info!("logged out");
        }
    }

    /// Re-fetch the profile so aggregate counts reflect the backend.
    ///
    /// # Errors
    ///
    /// Returns the backend error; a 401 has already expired the session.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let user = self.backend.fetch_profile().await?;
        self.handle.update(|state| state.refresh_user(user.clone()));
        Ok(user)
    }

    /// Apply a partial profile update, then re-resolve the full profile.
    ///
    /// # Errors
    ///
    /// Returns the backend error from either request.
    pub async fn update_profile(&self, update: &UserUpdate) -> Result<User, ApiError> {
        self.backend.update_profile(update).await?;
        self.refresh_profile().await
    }

    fn finish(&self, user: User) -> SessionStatus {
        self.handle.update(|state| {
            state.resolve(user);
            state.status
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.handle.snapshot()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.handle.snapshot().is_authenticated()
    }

    #[must_use]
    pub fn loading(&self) -> bool {
        self.handle.snapshot().loading()
    }

    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.handle.snapshot().error
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.handle.user()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.handle.status()
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod manager_test;
