use super::*;
use crate::config::ClientConfig;
use crate::net::ApiClient;
use crate::net::fake_backend::{CountingRedirect, PASSWORD, USERNAME, VALID_TOKEN, harness};
use crate::net::types::{Image, MatchOutcome, MatchResult, TokenResponse};
use crate::session::store::{MemoryTokenStore, TokenStore};
use crate::upload::UploadRequest;

// =============================================================================
// scripted backend for failure paths the fake server cannot produce
// =============================================================================

struct ScriptedBackend {
    token: Result<&'static str, fn() -> ApiError>,
    profile: fn() -> Result<User, ApiError>,
}

fn server_error() -> ApiError {
    ApiError::Status { status: 500, detail: "profile service down".to_owned() }
}

fn unreachable_error() -> ApiError {
    ApiError::Transport("connection refused".to_owned())
}

fn not_called() -> ApiError {
    ApiError::Request("not scripted".to_owned())
}

#[async_trait::async_trait]
impl Backend for ScriptedBackend {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<TokenResponse, ApiError> {
        match self.token {
            Ok(token) => Ok(TokenResponse { access_token: token.to_owned(), token_type: "bearer".to_owned() }),
            Err(make) => Err(make()),
        }
    }
    async fn fetch_profile(&self) -> Result<User, ApiError> {
        (self.profile)()
    }
    async fn update_profile(&self, _update: &UserUpdate) -> Result<User, ApiError> {
        Err(not_called())
    }
    async fn upload_image(&self, _upload: UploadRequest) -> Result<Image, ApiError> {
        Err(not_called())
    }
    async fn list_images(&self, _reference_only: bool) -> Result<Vec<Image>, ApiError> {
        Err(not_called())
    }
    async fn fetch_image(&self, _image_id: i64) -> Result<Image, ApiError> {
        Err(not_called())
    }
    async fn match_image(&self, _image_id: i64) -> Result<MatchOutcome, ApiError> {
        Err(not_called())
    }
    async fn match_history(&self) -> Result<Vec<MatchResult>, ApiError> {
        Err(not_called())
    }
}

fn scripted(backend: ScriptedBackend) -> (SessionManager, SessionHandle) {
    let handle = SessionHandle::new(Box::new(MemoryTokenStore::new()), Box::new(CountingRedirect::default()));
    (SessionManager::new(Arc::new(backend), handle.clone()), handle)
}

// =============================================================================
// initialize
// =============================================================================

#[tokio::test]
async fn initialize_without_token_stays_unauthenticated() {
    let h = harness(None).await;
    assert_eq!(h.manager.initialize().await, SessionStatus::Unauthenticated);
    assert!(!h.manager.is_authenticated());
    assert!(!h.manager.loading());
    assert!(h.manager.error().is_none());
    assert!(h.backend.seen().is_empty());
}

#[tokio::test]
async fn initialize_resolves_persisted_token() {
    let h = harness(Some(VALID_TOKEN)).await;
    assert_eq!(h.manager.initialize().await, SessionStatus::Authenticated);

    let user = h.manager.user().unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.username, "admin");
    assert!(h.manager.is_authenticated());
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn initialize_with_expired_token_clears_without_redirect() {
    let h = harness(Some("expired-token")).await;
    assert_eq!(h.manager.initialize().await, SessionStatus::Unauthenticated);

    assert_eq!(h.manager.error().as_deref(), Some(SESSION_EXPIRED_MESSAGE));
    assert_eq!(h.handle.persisted_token(), None);
    assert!(h.manager.user().is_none());
    assert_eq!(h.redirect.count(), 0);
}

// =============================================================================
// login
// =============================================================================

#[tokio::test]
async fn login_with_valid_credentials_persists_token() {
    let h = harness(None).await;
    assert!(h.manager.login(USERNAME, PASSWORD).await);

    assert_eq!(h.manager.status(), SessionStatus::Authenticated);
    assert_eq!(h.handle.persisted_token().as_deref(), Some(VALID_TOKEN));
    assert_eq!(h.manager.user().map(|u| u.username), Some("admin".to_owned()));
    assert!(h.manager.error().is_none());
}

#[tokio::test]
async fn login_with_invalid_credentials_reports_detail() {
    let h = harness(None).await;
    assert!(!h.manager.login(USERNAME, "nope").await);

    assert_eq!(h.manager.status(), SessionStatus::Unauthenticated);
    assert_eq!(h.handle.persisted_token(), None);
    assert_eq!(h.manager.error().as_deref(), Some("Incorrect username or password"));
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn login_transport_failure_enters_error_state() {
    let h = harness(None).await;
    let config = ClientConfig { api_url: "http://127.0.0.1:1".to_owned(), token_file: "unused.json".into() };
    let api = ApiClient::new(&config, Arc::new(h.handle.clone())).unwrap();
    let manager = SessionManager::new(Arc::new(api), h.handle.clone());

    assert!(!manager.login(USERNAME, PASSWORD).await);
    assert_eq!(manager.status(), SessionStatus::Error);
    assert!(!manager.is_authenticated());
    assert!(manager.error().unwrap().contains("try again"));
}

#[tokio::test]
async fn login_fails_when_profile_cannot_be_resolved() {
    let (manager, handle) = scripted(ScriptedBackend { token: Ok("fresh"), profile: || Err(server_error()) });
    assert!(!manager.login("u", "p").await);

    assert_eq!(manager.status(), SessionStatus::Unauthenticated);
    assert_eq!(handle.persisted_token(), None);
    assert_eq!(manager.error().as_deref(), Some("profile service down"));
}

#[tokio::test]
async fn scripted_transport_failure_does_not_persist() {
    let (manager, handle) = scripted(ScriptedBackend { token: Err(unreachable_error as fn() -> ApiError), profile: || Err(not_called()) });
    assert!(!manager.login("u", "p").await);
    assert_eq!(manager.status(), SessionStatus::Error);
    assert_eq!(handle.persisted_token(), None);
}

#[tokio::test]
async fn failed_login_forgets_previous_account() {
    let h = harness(Some(VALID_TOKEN)).await;
    assert_eq!(h.manager.initialize().await, SessionStatus::Authenticated);

    assert!(!h.manager.login("someone-else", "nope").await);
    assert_eq!(h.manager.status(), SessionStatus::Unauthenticated);
    assert_eq!(h.handle.persisted_token(), None);
    assert_eq!(h.manager.initialize().await, SessionStatus::Unauthenticated);
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn unreachable_login_forgets_previous_account() {
    let h = harness(Some(VALID_TOKEN)).await;
    let config = ClientConfig { api_url: "http://127.0.0.1:1".to_owned(), token_file: "unused.json".into() };
    let api = ApiClient::new(&config, Arc::new(h.handle.clone())).unwrap();
    let manager = SessionManager::new(Arc::new(api), h.handle.clone());

    assert!(!manager.login(USERNAME, PASSWORD).await);
    assert_eq!(manager.status(), SessionStatus::Error);
    assert_eq!(h.handle.persisted_token(), None);
}

/// Logs out while the credential exchange is in flight.
struct LogoutDuringExchange {
    handle: SessionHandle,
}

#[async_trait::async_trait]
impl Backend for LogoutDuringExchange {
    async fn authenticate(&self, _username: &str, _password: &str) -> Result<TokenResponse, ApiError> {
        self.handle.clear_with(None);
        Ok(TokenResponse { access_token: "late".to_owned(), token_type: "bearer".to_owned() })
    }
    async fn fetch_profile(&self) -> Result<User, ApiError> {
        Err(not_called())
    }
    async fn update_profile(&self, _update: &UserUpdate) -> Result<User, ApiError> {
        Err(not_called())
    }
    async fn upload_image(&self, _upload: UploadRequest) -> Result<Image, ApiError> {
        Err(not_called())
    }
    async fn list_images(&self, _reference_only: bool) -> Result<Vec<Image>, ApiError> {
        Err(not_called())
    }
    async fn fetch_image(&self, _image_id: i64) -> Result<Image, ApiError> {
        Err(not_called())
    }
    async fn match_image(&self, _image_id: i64) -> Result<MatchOutcome, ApiError> {
        Err(not_called())
    }
    async fn match_history(&self) -> Result<Vec<MatchResult>, ApiError> {
        Err(not_called())
    }
}

#[tokio::test]
async fn logout_during_exchange_abandons_login() {
    let handle = SessionHandle::new(Box::new(MemoryTokenStore::new()), Box::new(CountingRedirect::default()));
    let manager = SessionManager::new(Arc::new(LogoutDuringExchange { handle: handle.clone() }), handle.clone());

    assert!(!manager.login("u", "p").await);
    let state = handle.snapshot();
    assert_eq!(state.status, SessionStatus::Unauthenticated);
    assert_eq!(state.token, None);
    assert_eq!(handle.persisted_token(), None);
}

#[tokio::test]
async fn relogin_after_failure_clears_error() {
    let h = harness(None).await;
    assert!(!h.manager.login(USERNAME, "nope").await);
    assert!(h.manager.login(USERNAME, PASSWORD).await);
    assert!(h.manager.error().is_none());
}

// =============================================================================
// logout
// =============================================================================

#[tokio::test]
async fn logout_is_idempotent() {
    let h = harness(None).await;
    assert!(h.manager.login(USERNAME, PASSWORD).await);

    h.manager.logout();
    let once = h.handle.snapshot();
    h.manager.logout();
    let twice = h.handle.snapshot();

    assert_eq!(once, twice);
    assert_eq!(twice.status, SessionStatus::Unauthenticated);
    assert_eq!(h.handle.persisted_token(), None);
    assert_eq!(h.redirect.count(), 0);
}

#[tokio::test]
async fn logout_drops_previous_login_error() {
    let h = harness(None).await;
    assert!(!h.manager.login(USERNAME, "wrong").await);
    assert!(h.manager.error().is_some());

    h.manager.logout();
    let snapshot = h.manager.snapshot();
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.token, None);
    assert!(!h.manager.loading());
}

#[tokio::test]
async fn requests_after_logout_carry_no_token() {
    let h = harness(None).await;
    assert!(h.manager.login(USERNAME, PASSWORD).await);
    h.manager.logout();

    assert!(h.manager.backend().list_images(false).await.is_err());
    let last = h.backend.seen().pop().unwrap();
    assert!(last.authorization.is_none());
    assert_eq!(h.redirect.count(), 0);
}

// =============================================================================
// profile
// =============================================================================

#[tokio::test]
async fn refresh_profile_picks_up_new_aggregates() {
    let h = harness(Some(VALID_TOKEN)).await;
    h.manager.initialize().await;
    assert_eq!(h.manager.user().unwrap().total_uploads, 0);

    h.backend.seed_image(1, "a.jpg", false);
    let user = h.manager.refresh_profile().await.unwrap();
    assert_eq!(user.total_uploads, 1);
    assert_eq!(h.manager.user().unwrap().total_uploads, 1);
}

#[tokio::test]
async fn update_profile_returns_refreshed_user() {
    let h = harness(Some(VALID_TOKEN)).await;
    h.manager.initialize().await;
    h.backend.seed_image(1, "a.jpg", false);

    let update = UserUpdate { full_name: Some("Ada Admin".to_owned()), ..UserUpdate::default() };
    let user = h.manager.update_profile(&update).await.unwrap();
    assert_eq!(user.display_name(), "Ada Admin");
    assert_eq!(user.total_uploads, 1);
    assert_eq!(h.manager.user().unwrap().full_name.as_deref(), Some("Ada Admin"));
}

#[tokio::test]
async fn persisted_token_survives_into_new_session() {
    let h = harness(None).await;
    let store = MemoryTokenStore::new();
    store.save(VALID_TOKEN).unwrap();
    let handle = SessionHandle::new(Box::new(store), Box::new(CountingRedirect::default()));
    let api = ApiClient::new(&h.backend.config(), Arc::new(handle.clone())).unwrap();
    let manager = SessionManager::new(Arc::new(api), handle);
    assert_eq!(manager.initialize().await, SessionStatus::Authenticated);
}
