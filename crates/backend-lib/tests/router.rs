// crates/backend-lib/tests/router.rs
use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use backend_lib::{config::Settings, router::create_router, storage::MemoryStore, AppState};
use jokes_common::{LoginActionData, UserRef};
use tower::ServiceExt;

fn app() -> Router {
    let mut settings = Settings::default();
    settings.session.secret = Some("router-secret".to_string());
    settings.password.bcrypt_cost = 4;
    let state = AppState::new(settings, Arc::new(MemoryStore::new())).unwrap();
    create_router(state)
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn session_cookie(response: &Response) -> String {
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn register_sets_cookie_and_redirects() {
    let app = app();
    let response = app
        .oneshot(form_post(
            "/login",
            "loginType=register&username=kody&password=twixrox&redirectTo=%2Fjokes%2Fnew",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/jokes/new");
    assert!(session_cookie(&response).starts_with("Jokes_session="));
}

#[tokio::test]
async fn offsite_redirect_target_falls_back_to_jokes() {
    let app = app();
    let response = app
        .oneshot(form_post(
            "/login",
            "loginType=register&username=kody&password=twixrox&redirectTo=https%3A%2F%2Fevil.test",
        ))
        .await
        .unwrap();

    assert_eq!(response.headers()[header::LOCATION], "/jokes");
}

#[tokio::test]
async fn full_login_flow() {
    let app = app();

    let registered = app
        .clone()
        .oneshot(form_post(
            "/login",
            "loginType=register&username=kody&password=twixrox",
        ))
        .await
        .unwrap();
    assert_eq!(registered.status(), StatusCode::FOUND);

    let logged_in = app
        .clone()
        .oneshot(form_post("/login", "loginType=login&username=kody&password=twixrox"))
        .await
        .unwrap();
    assert_eq!(logged_in.status(), StatusCode::FOUND);
    let cookie = session_cookie(&logged_in);

    let me = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me.status(), StatusCode::OK);
    let user: UserRef = json_body(me).await;
    assert_eq!(user.username, "kody");

    let logout = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(logout.status(), StatusCode::FOUND);
    assert_eq!(logout.headers()[header::LOCATION], "/login");
    let cleared = session_cookie(&logout);
    assert_eq!(cleared, "Jokes_session=");

    let me_after = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::COOKIE, &cleared)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(me_after.status(), StatusCode::FOUND);
    assert_eq!(me_after.headers()[header::LOCATION], "/login?redirectTo=%2Fme");
}

#[tokio::test]
async fn wrong_password_is_a_form_error() {
    let app = app();
    app.clone()
        .oneshot(form_post("/login", "loginType=register&username=kody&password=twixrox"))
        .await
        .unwrap();

    let response = app
        .oneshot(form_post("/login", "loginType=login&username=kody&password=wrongpass"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let data: LoginActionData = json_body(response).await;
    assert_eq!(
        data.form_error.as_deref(),
        Some("Username/Password combination is incorrect")
    );
    assert_eq!(data.fields.username, "kody");
}

#[tokio::test]
async fn duplicate_registration_is_a_form_error() {
    let app = app();
    app.clone()
        .oneshot(form_post("/login", "loginType=register&username=kody&password=twixrox"))
        .await
        .unwrap();

    let response = app
        .oneshot(form_post("/login", "loginType=register&username=kody&password=another1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let data: LoginActionData = json_body(response).await;
    assert_eq!(
        data.form_error.as_deref(),
        Some("User with username kody already exists")
    );
}

#[tokio::test]
async fn invalid_fields_are_reported() {
    let response = app()
        .oneshot(form_post("/login", "username=ko&password=abc"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let data: LoginActionData = json_body(response).await;
    assert!(data.field_errors.username.is_some());
    assert!(data.field_errors.password.is_some());
    assert!(data.form_error.is_none());
}

#[tokio::test]
async fn protected_route_redirects_anonymous_requests() {
    let response = app()
        .oneshot(Request::builder().uri("/me").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login?redirectTo=%2Fme");
}

#[tokio::test]
async fn stale_session_is_cleared() {
    let app = app();

    // A validly signed session for a user the store has never seen
    let mut settings = Settings::default();
    settings.session.secret = Some("router-secret".to_string());
    let forged_by_server = AppState::new(settings, Arc::new(MemoryStore::new()))
        .unwrap()
        .auth
        .create_user_session("00000000-0000-4000-8000-000000000000", "/")
        .unwrap();
    let cookie = forged_by_server.set_cookie().unwrap().to_str().unwrap();
    let cookie = cookie.split(';').next().unwrap().to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[header::LOCATION], "/login");
    assert_eq!(session_cookie(&response), "Jokes_session=");
}

#[tokio::test]
async fn login_page_reports_target_or_skips_when_signed_in() {
    let app = app();

    let anonymous = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/login?redirectTo=%2Fjokes%2F42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(anonymous.status(), StatusCode::OK);
    let body: serde_json::Value = json_body(anonymous).await;
    assert_eq!(body["redirectTo"], "/jokes/42");

    let registered = app
        .clone()
        .oneshot(form_post("/login", "loginType=register&username=kody&password=twixrox"))
        .await
        .unwrap();
    let cookie = session_cookie(&registered);

    let signed_in = app
        .oneshot(
            Request::builder()
                .uri("/login?redirectTo=%2Fjokes%2F42")
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(signed_in.status(), StatusCode::FOUND);
    assert_eq!(signed_in.headers()[header::LOCATION], "/jokes/42");
}
