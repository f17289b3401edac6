// ============================
// crates/backend-lib/src/handlers/auth.rs
// ============================
//! Login, registration, logout and "who am I" handlers.
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use jokes_common::{LoginActionData, LoginForm, LoginType, SubmittedFields};
use serde::Deserialize;
use tracing::info;

use crate::auth::{safe_redirect, AuthRedirect, Credentials, SessionAuthenticator};
use crate::error::AppError;
use crate::middleware::{CurrentUserId, MaybeUserId};
use crate::validation::validate_login_form;

/// Where users land after logging in when no valid `redirectTo` was given
pub const DEFAULT_LANDING: &str = "/jokes";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginQuery {
    pub redirect_to: Option<String>,
}

fn bad_request(data: LoginActionData) -> Response {
    (StatusCode::BAD_REQUEST, Json(data)).into_response()
}

/// `GET /login`: signed-in users go straight to their target, everyone else
/// gets the target to submit back with the form
pub async fn login_page(
    MaybeUserId(user_id): MaybeUserId,
    Query(query): Query<LoginQuery>,
) -> Response {
    let redirect_to = safe_redirect(query.redirect_to.as_deref(), DEFAULT_LANDING);
    match user_id {
        Some(_) => AuthRedirect::to(redirect_to).into_response(),
        None => Json(serde_json::json!({ "redirectTo": redirect_to })).into_response(),
    }
}

/// `POST /login`: log in or register, then start a session
pub async fn login_action(
    State(auth): State<SessionAuthenticator>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let fields = SubmittedFields {
        login_type: form.login_type,
        username: form.username.clone(),
    };

    let field_errors = validate_login_form(&form);
    if !field_errors.is_empty() {
        return Ok(bad_request(LoginActionData {
            field_errors,
            form_error: None,
            fields,
        }));
    }

    let redirect_to = safe_redirect(form.redirect_to.as_deref(), DEFAULT_LANDING).to_string();
    let login_type = form.login_type;
    let credentials = Credentials::from(form);

    let user = match login_type {
        LoginType::Login => match auth.login(&credentials).await? {
            Some(user) => user,
            None => {
                return Ok(bad_request(LoginActionData {
                    field_errors: Default::default(),
                    form_error: Some("Username/Password combination is incorrect".to_string()),
                    fields,
                }))
            }
        },
        LoginType::Register => match auth.register(&credentials).await {
            Ok(user) => user,
            Err(AppError::UsernameTaken(username)) => {
                return Ok(bad_request(LoginActionData {
                    field_errors: Default::default(),
                    form_error: Some(format!("User with username {username} already exists")),
                    fields,
                }))
            }
            Err(e) => return Err(e),
        },
    };

    info!(user_id = %user.id, ?login_type, "starting session");
    Ok(auth.create_user_session(&user.id, &redirect_to)?.into_response())
}

/// `POST /logout`
pub async fn logout_action(
    State(auth): State<SessionAuthenticator>,
    headers: HeaderMap,
) -> Result<AuthRedirect, AppError> {
    auth.logout(&headers)
}

/// `GET /me`: the signed-in user. A session whose user no longer exists is
/// cleared like a logout.
pub async fn current_user(
    CurrentUserId(_): CurrentUserId,
    State(auth): State<SessionAuthenticator>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    match auth.get_user(&headers).await {
        Ok(Some(user)) => Ok(Json(user).into_response()),
        Ok(None) => Ok(auth.logout(&headers)?.into_response()),
        Err(redirect) => Ok(redirect.into_response()),
    }
}
