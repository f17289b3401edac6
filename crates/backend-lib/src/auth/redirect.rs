//! Redirect outcomes returned by the authenticator.
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use jokes_common::REDIRECT_TO_PARAM;

use crate::error::AppError;

/// Path of the login page
pub const LOGIN_PATH: &str = "/login";

/// A redirect the caller should send to the browser, optionally carrying a
/// `Set-Cookie` header. Used both for successful session changes and as the
/// "not signed in" outcome of [`SessionAuthenticator::require_user_id`].
///
/// [`SessionAuthenticator::require_user_id`]: crate::auth::SessionAuthenticator::require_user_id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRedirect {
    location: String,
    set_cookie: Option<HeaderValue>,
}

impl AuthRedirect {
    pub fn to(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            set_cookie: None,
        }
    }

    /// Redirect to the login page, remembering where the user was headed
    pub fn login(redirect_to: &str) -> Self {
        Self::to(login_url(redirect_to))
    }

    pub fn with_cookie(mut self, set_cookie: HeaderValue) -> Self {
        self.set_cookie = Some(set_cookie);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn set_cookie(&self) -> Option<&HeaderValue> {
        self.set_cookie.as_ref()
    }
}

impl IntoResponse for AuthRedirect {
    fn into_response(self) -> Response {
        let location = match HeaderValue::from_str(&self.location) {
            Ok(location) => location,
            Err(_) => {
                return AppError::Internal(format!("unencodable redirect target {:?}", self.location))
                    .into_response()
            }
        };

        let mut response = (StatusCode::FOUND, [(header::LOCATION, location)]).into_response();
        if let Some(set_cookie) = self.set_cookie {
            response.headers_mut().insert(header::SET_COOKIE, set_cookie);
        }
        response
    }
}

/// `/login?redirectTo=<path>` with the path `application/x-www-form-urlencoded`
pub fn login_url(redirect_to: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair(REDIRECT_TO_PARAM, redirect_to)
        .finish();
    format!("{LOGIN_PATH}?{query}")
}

/// Accept only same-site absolute paths as post-login targets
pub fn safe_redirect<'a>(target: Option<&'a str>, fallback: &'a str) -> &'a str {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => path,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_url_encodes_the_original_path() {
        assert_eq!(login_url("/jokes"), "/login?redirectTo=%2Fjokes");
        assert_eq!(
            login_url("/jokes/new?draft=1"),
            "/login?redirectTo=%2Fjokes%2Fnew%3Fdraft%3D1"
        );
    }

    #[test]
    fn login_url_uses_form_encoding() {
        assert_eq!(login_url("/~kody/*"), "/login?redirectTo=%2F%7Ekody%2F*");
        assert_eq!(
            login_url("/jokes/a b&c"),
            "/login?redirectTo=%2Fjokes%2Fa+b%26c"
        );
    }

    #[test]
    fn safe_redirect_rejects_offsite_targets() {
        assert_eq!(safe_redirect(Some("/jokes/1"), "/jokes"), "/jokes/1");
        assert_eq!(safe_redirect(Some("https://evil.test"), "/jokes"), "/jokes");
        assert_eq!(safe_redirect(Some("//evil.test"), "/jokes"), "/jokes");
        assert_eq!(safe_redirect(Some("/\\evil.test"), "/jokes"), "/jokes");
        assert_eq!(safe_redirect(None, "/jokes"), "/jokes");
    }

    #[test]
    fn redirect_response_carries_location_and_cookie() {
        let response = AuthRedirect::to("/jokes")
            .with_cookie(HeaderValue::from_static("Jokes_session=abc; Path=/"))
            .into_response();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/jokes");
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "Jokes_session=abc; Path=/"
        );
    }

    #[test]
    fn unencodable_location_becomes_server_error() {
        let response = AuthRedirect::to("/bad\nheader").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
