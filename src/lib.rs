//! Client for the Human Match face-matching service.
//!
//! ARCHITECTURE
//! ============
//! `net` talks HTTP and knows nothing about sessions beyond the
//! [`net::AuthHooks`] seam. `session` owns the token and user, implements
//! that seam, and drives login/logout through the [`net::Backend`] trait.
//! `upload` and `matching` hold the client-side rules the views apply
//! before and after calling the backend.

pub mod config;
pub mod matching;
pub mod net;
pub mod session;
pub mod upload;

use std::sync::Arc;

use config::ClientConfig;
use net::{ApiClient, ApiError};
use session::{FileTokenStore, LoginRedirect, SessionHandle, SessionManager};

/// An API client and the session manager sharing its session handle.
#[derive(Clone)]
pub struct Connection {
    pub api: ApiClient,
    pub session: SessionManager,
}

/// Wire a file-backed session, an API client, and a session manager.
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be built.
pub fn connect(config: &ClientConfig, redirect: Box<dyn LoginRedirect>) -> Result<Connection, ApiError> {
    let store = FileTokenStore::new(config.token_file.clone());
    let handle = SessionHandle::new(Box::new(store), redirect);
    let api = ApiClient::new(config, Arc::new(handle.clone()))?;
    let session = SessionManager::new(Arc::new(api.clone()), handle);
    Ok(Connection { api, session })
}
