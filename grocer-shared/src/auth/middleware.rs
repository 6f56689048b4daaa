/// Request authentication primitives for Axum
///
/// Tokens are accepted from two places, in order:
///
/// 1. the `accessToken` / `refreshToken` cookies set at login
/// 2. an `Authorization: Bearer <token>` header (for non-browser clients)
///
/// After successful authentication the API inserts an [`AuthContext`] into the
/// request extensions; handlers read it with `Extension<AuthContext>`.
///
/// # Example
///
/// ```
/// use axum::Extension;
/// use grocer_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}", auth.user_id)
/// }
/// ```

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::{validate_access_token, JwtError, JwtKeys, TokenType};

/// Cookie carrying the access token
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie carrying the refresh token
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

impl AuthContext {
    /// Creates auth context from a validated user ID
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No token in cookies or headers
    #[error("Provide token")]
    MissingCredentials,

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(String),
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, self.to_string()).into_response()
    }
}

/// Finds the token named `cookie_name` in cookies, falling back to a Bearer header
///
/// Any other `Authorization` scheme counts as no token.
pub fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name).filter(|c| !c.value().is_empty()) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Authenticates a request from its headers
pub fn authenticate(headers: &HeaderMap, keys: &JwtKeys) -> Result<AuthContext, AuthError> {
    let token = extract_token(headers, ACCESS_TOKEN_COOKIE).ok_or(AuthError::MissingCredentials)?;
    let claims = validate_access_token(&token, keys)?;

    Ok(AuthContext::new(claims.sub))
}

/// Builds the cookie that carries a token of the given type
///
/// Cookies are `HttpOnly` and `SameSite=None` so the storefront on another
/// origin can send them; `secure` should be true whenever served over HTTPS.
pub fn token_cookie(token_type: TokenType, token: String, secure: bool) -> Cookie<'static> {
    let name = match token_type {
        TokenType::Access => ACCESS_TOKEN_COOKIE,
        TokenType::Refresh => REFRESH_TOKEN_COOKIE,
    };
    let max_age = cookie::time::Duration::seconds(token_type.lifetime().num_seconds());

    Cookie::build((name, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(if secure { SameSite::None } else { SameSite::Lax })
        .max_age(max_age)
        .build()
}

/// Builds a cookie that removes `name` on the client
pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    Cookie::build((name, "")).path("/").build()
}
