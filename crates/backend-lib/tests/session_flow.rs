// crates/backend-lib/tests/session_flow.rs
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Request};
use backend_lib::{
    auth::{AuthRedirect, BcryptHasher, Credentials, SessionAuthenticator, SessionConfig},
    config::{ConfigError, Settings},
    error::AppError,
    storage::{CredentialStore, FlatFileStore, MemoryStore, User},
    AppState,
};
use tempfile::TempDir;

fn settings() -> Settings {
    let mut settings = Settings::default();
    settings.session.secret = Some("integration-secret".to_string());
    settings.password.bcrypt_cost = 4;
    settings
}

fn authenticator_over(store: Arc<dyn CredentialStore>) -> SessionAuthenticator {
    SessionAuthenticator::new(
        SessionConfig::from_settings(&settings()).unwrap(),
        store,
        Arc::new(BcryptHasher::new(4)),
    )
}

/// What a browser sends back after receiving `Set-Cookie`
fn browser_cookie(redirect: &AuthRedirect) -> HeaderMap {
    let set_cookie = redirect
        .set_cookie()
        .expect("redirect sets a cookie")
        .to_str()
        .unwrap();
    let pair = set_cookie.split(';').next().unwrap().trim();
    let mut headers = HeaderMap::new();
    headers.insert(header::COOKIE, HeaderValue::from_str(pair).unwrap());
    headers
}

/// A store whose every call fails, as if the database were down
struct UnavailableStore;

#[async_trait]
impl CredentialStore for UnavailableStore {
    async fn find_by_username(&self, _: &str) -> Result<Option<User>, AppError> {
        Err(AppError::Store("connection refused".to_string()))
    }

    async fn find_by_id(&self, _: &str) -> Result<Option<User>, AppError> {
        Err(AppError::Store("connection refused".to_string()))
    }

    async fn create_user(&self, _: &str, _: &str) -> Result<User, AppError> {
        Err(AppError::Store("connection refused".to_string()))
    }
}

#[tokio::test]
async fn registered_users_can_log_in() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));

    for (username, password) in [("kody", "twixrox"), ("hannah", "correct horse"), ("ünï", "päßwörd")] {
        let creds = Credentials::new(username, password);
        let registered = auth.register(&creds).await.unwrap();
        let logged_in = auth.login(&creds).await.unwrap().expect("login succeeds");

        assert_eq!(logged_in.id, registered.id);
        assert_eq!(logged_in.username, username);
    }
}

#[tokio::test]
async fn wrong_password_returns_none() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    auth.register(&Credentials::new("kody", "twixrox")).await.unwrap();

    for wrong in ["", "twixro", "TWIXROX", "twixrox "] {
        assert!(auth.login(&Credentials::new("kody", wrong)).await.unwrap().is_none());
    }
}

#[tokio::test]
async fn unknown_username_returns_none() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    assert!(auth
        .login(&Credentials::new("nobody", "twixrox"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn login_propagates_store_failures() {
    let auth = authenticator_over(Arc::new(UnavailableStore));
    let err = auth
        .login(&Credentials::new("kody", "twixrox"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Store(_)));
}

#[tokio::test]
async fn duplicate_usernames_are_rejected_by_the_store() {
    let temp_dir = TempDir::new().unwrap();
    let auth = authenticator_over(Arc::new(FlatFileStore::new(temp_dir.path()).unwrap()));

    auth.register(&Credentials::new("kody", "twixrox")).await.unwrap();
    let err = auth
        .register(&Credentials::new("kody", "different"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::UsernameTaken(_)));
}

#[test]
fn no_cookie_header_means_no_user_id() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    assert_eq!(auth.get_user_id(&HeaderMap::new()), None);
}

#[test]
fn created_session_round_trips_through_the_cookie() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    let redirect = auth.create_user_session("some-user-id", "/x").unwrap();

    assert_eq!(redirect.location(), "/x");
    assert_eq!(
        auth.get_user_id(&browser_cookie(&redirect)).as_deref(),
        Some("some-user-id")
    );
}

#[test]
fn require_user_id_redirects_to_login_with_original_path() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    let (parts, _) = Request::builder()
        .uri("/jokes/new")
        .body(())
        .unwrap()
        .into_parts();

    let redirect = auth.require_user_id(&parts, None).unwrap_err();
    assert_eq!(redirect.location(), "/login?redirectTo=%2Fjokes%2Fnew");
}

#[test]
fn logout_then_replay_yields_no_user_id() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    let login = auth.create_user_session("user-1", "/").unwrap();
    let signed_in = browser_cookie(&login);
    assert!(auth.get_user_id(&signed_in).is_some());

    let logout = auth.logout(&signed_in).unwrap();
    assert_eq!(logout.location(), "/login");

    // The browser replaces its cookie with the cleared one
    assert_eq!(auth.get_user_id(&browser_cookie(&logout)), None);
}

#[tokio::test]
async fn get_user_resolves_the_session_user() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    let user = auth.register(&Credentials::new("kody", "twixrox")).await.unwrap();
    let session = auth.create_user_session(&user.id, "/").unwrap();

    let resolved = auth.get_user(&browser_cookie(&session)).await.unwrap();
    assert_eq!(resolved, Some(user));

    assert_eq!(auth.get_user(&HeaderMap::new()).await.unwrap(), None);
}

#[tokio::test]
async fn get_user_for_deleted_user_is_none() {
    let auth = authenticator_over(Arc::new(MemoryStore::new()));
    let session = auth
        .create_user_session("00000000-0000-4000-8000-000000000000", "/")
        .unwrap();

    assert_eq!(auth.get_user(&browser_cookie(&session)).await.unwrap(), None);
}

#[tokio::test]
async fn get_user_forces_logout_when_store_fails() {
    let auth = authenticator_over(Arc::new(UnavailableStore));
    let session = auth.create_user_session("user-1", "/").unwrap();

    let redirect = auth.get_user(&browser_cookie(&session)).await.unwrap_err();
    assert_eq!(redirect.location(), "/login");
    assert_eq!(auth.get_user_id(&browser_cookie(&redirect)), None);
}

#[test]
fn startup_without_session_secret_fails() {
    let err = AppState::new(Settings::default(), Arc::new(MemoryStore::new())).err();
    assert!(matches!(
        err,
        Some(AppError::Config(ConfigError::MissingSessionSecret))
    ));
}

#[test]
fn startup_with_session_secret_succeeds() {
    let temp_dir = TempDir::new().unwrap();
    let mut settings = settings();
    settings.data_dir = temp_dir.path().to_path_buf();
    assert!(AppState::from_settings(settings).is_ok());
}
