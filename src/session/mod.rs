//! Client-side session: state, token persistence, and lifecycle.

pub mod handle;
pub mod manager;
pub mod state;
pub mod store;

pub use handle::{LogRedirect, LoginRedirect, SessionHandle};
pub use manager::SessionManager;
pub use state::{SessionState, SessionStatus};
pub use store::{FileTokenStore, MemoryTokenStore, StoreError, TOKEN_STORAGE_KEY, TokenStore};
