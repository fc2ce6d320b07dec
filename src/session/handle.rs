//! Shared, injectable session cell.
//!
//! DESIGN
//! ======
//! `SessionHandle` is the one owner of mutable session state. It is cloned
//! into the [`ApiClient`](crate::net::ApiClient) as its [`AuthHooks`] and into
//! the [`SessionManager`](super::SessionManager) that drives login and
//! logout. All state changes happen under one mutex that is never held
//! across an `.await`.
//!
//! TRADE-OFFS
//! ==========
//! A 401 only expires the session when the rejected request carried the
//! token the session still holds. Concurrent 401s for one token therefore
//! collapse into a single clear-and-redirect, and a late 401 for a token
//! that a newer login already replaced is ignored.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::state::{SESSION_EXPIRED_MESSAGE, SessionState, SessionStatus};
use super::store::TokenStore;
use crate::net::AuthHooks;
use crate::net::types::User;

/// Action taken when a held session is rejected by the backend.
pub trait LoginRedirect: Send + Sync {
    /// Send the user to the login entry point.
    fn redirect_to_login(&self);
}

/// Redirect that only records the event in the log.
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        tracing::info!("session expired; login required");
    }
}

#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

struct Inner {
    state: Mutex<SessionState>,
    store: Box<dyn TokenStore>,
    redirect: Box<dyn LoginRedirect>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(store: Box<dyn TokenStore>, redirect: Box<dyn LoginRedirect>) -> Self {
        Self {
            inner: Arc::new(Inner { state: Mutex::new(SessionState::default()), store, redirect }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    /// Token persisted by a previous run, if any. Storage failures count as
    /// "no token" and are logged.
    #[must_use]
    pub fn persisted_token(&self) -> Option<String> {
        match self.inner.store.load() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "could not read persisted session token");
                None
            }
        }
    }

    /// Start a credential exchange. Any previously persisted token is
    /// dropped so a failed attempt cannot resume the earlier account.
    pub(crate) fn begin_login(&self) {
        let mut state = self.lock();
        self.forget_token();
        state.begin(None);
    }

    /// Persist and install an issued token as one step. Returns `false` when
    /// the attempt was abandoned (e.g. a logout landed mid-exchange).
    pub(crate) fn install_issued(&self, token: &str) -> bool {
        let mut state = self.lock();
        if !state.loading() {
            return false;
        }
        if let Err(e) = self.inner.store.save(token) {
            tracing::warn!(error = %e, "could not persist session token");
        }
        state.install_token(token.to_owned());
        true
    }

    fn forget_token(&self) {
        if let Err(e) = self.inner.store.clear() {
            tracing::warn!(error = %e, "could not clear persisted session token");
        }
    }

    /// Apply `f` to the state under the session lock.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        f(&mut self.lock())
    }

    /// Clear persisted and in-memory credentials, recording `message`.
    pub(crate) fn clear_with(&self, message: Option<&str>) {
        let mut state = self.lock();
        self.forget_token();
        match message {
            Some(message) => state.fail(message),
            None => {
                state.clear();
                state.error = None;
            }
        }
    }
}

impl AuthHooks for SessionHandle {
    fn bearer_token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    fn session_rejected(&self, sent_token: Option<&str>) {
        // A tokenless request never belonged to a session, so there is
        // nothing to expire. The caller still gets `Unauthorized`.
        let Some(sent) = sent_token else {
            return;
        };
        let was_resolving = {
            let mut state = self.lock();
            if state.token.as_deref() != Some(sent) {
                return;
            }
            let was_resolving = state.loading();
            self.forget_token();
            state.fail(SESSION_EXPIRED_MESSAGE);
            was_resolving
        };
        tracing::info!("session rejected by backend; credentials cleared");
        if !was_resolving {
            self.inner.redirect.redirect_to_login();
        }
    }
}

#[cfg(test)]
#[path = "handle_test.rs"]
mod handle_test;
