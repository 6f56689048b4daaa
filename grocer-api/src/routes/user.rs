/// Account endpoints
///
/// # Endpoints
///
/// - `POST /api/user/register` - Register and send the verification link
/// - `POST /api/user/verify-email` - Confirm the link code
/// - `POST /api/user/login` - Issue tokens (body and cookies)
/// - `GET  /api/user/logout` - Clear cookies and revoke the refresh token
/// - `PUT  /api/user/update-user` - Edit the caller's profile
/// - `PUT  /api/user/forgot-password` - Mail a reset OTP
/// - `PUT  /api/user/verify-forgot-password-otp` - Check the OTP
/// - `PUT  /api/user/reset-password` - Set a new password
/// - `POST /api/user/refresh-token` - Exchange the refresh token for an access token
/// - `GET  /api/user/user-details` - The caller's profile

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::{ok, Envelope},
    routes::present,
};
use axum::{extract::State, http::HeaderMap, Extension, Json};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use grocer_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        middleware::{
            extract_token, removal_cookie, token_cookie, AuthContext, ACCESS_TOKEN_COOKIE,
            REFRESH_TOKEN_COOKIE,
        },
        otp::{self, OtpCheck},
        password,
    },
    mail,
    models::user::{CreateUser, PublicUser, UpdateProfile, User, UserStatus},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Tokens returned by login and refresh
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPair {
    #[serde(rename = "accessToken")]
    pub access_token: String,

    #[serde(rename = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub mobile: Option<String>,

    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,

    #[validate(url(message = "Avatar must be a URL"))]
    pub avatar: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Option<String>,
    pub otp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: Option<String>,
    #[serde(rename = "newPassword")]
    pub new_password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
}

/// Registers a user and mails the verification link
///
/// # Errors
///
/// - `400`: a field is missing or the email is taken
/// - `422`: malformed email or short password
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Envelope<PublicUser>> {
    let (Some(name), Some(email), Some(plain)) =
        (present(&req.name), present(&req.email), present(&req.password))
    else {
        return Err(ApiError::BadRequest("provide email, name, password".to_string()));
    };
    req.validate()?;

    if User::find_by_email(&state.db, email).await?.is_some() {
        return Err(ApiError::BadRequest("Already register email".to_string()));
    }

    let user = User::create(
        &state.db,
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password_hash: password::hash_password(plain)?,
        },
    )
    .await?;

    let message = mail::verify_email_message(&user.email, &user.name, &state.config.api.frontend_url, user.id);
    if let Err(e) = state.mailer.send(&message).await {
        tracing::error!(user_id = %user.id, error = %e, "Verification mail failed");
    }

    tracing::info!(user_id = %user.id, "User registered");
    Ok(ok("User register successfully", user.into()))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Envelope<()>> {
    let user_id = present(&req.code)
        .and_then(|code| Uuid::parse_str(code).ok())
        .ok_or_else(|| ApiError::BadRequest("Invalid code".to_string()))?;

    if !User::mark_email_verified(&state.db, user_id).await? {
        return Err(ApiError::BadRequest("Invalid code".to_string()));
    }

    Ok(ok("Verify email done", ()))
}

/// Authenticates with email and password
///
/// Tokens are returned in the body and set as `accessToken` / `refreshToken`
/// cookies. The refresh token is stored on the user so logout can revoke it.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Envelope<TokenPair>)> {
    let (Some(email), Some(plain)) = (present(&req.email), present(&req.password)) else {
        return Err(ApiError::BadRequest("provide email, password".to_string()));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("User not register".to_string()))?;

    if user.status() != UserStatus::Active {
        tracing::warn!(user_id = %user.id, status = %user.status, "Login refused for inactive account");
        return Err(ApiError::BadRequest("Contact to Admin".to_string()));
    }

    if !password::verify_password(plain, &user.password_hash)? {
        return Err(ApiError::BadRequest("Check your password".to_string()));
    }

    let access_token = jwt::create_token(&Claims::new(user.id, TokenType::Access), &state.keys)?;
    let refresh_token = jwt::create_token(&Claims::new(user.id, TokenType::Refresh), &state.keys)?;

    User::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;
    User::update_last_login(&state.db, user.id).await?;

    let secure = state.secure_cookies();
    let jar = jar
        .add(token_cookie(TokenType::Access, access_token.clone(), secure))
        .add(token_cookie(TokenType::Refresh, refresh_token.clone(), secure));

    tracing::info!(user_id = %user.id, "User logged in");
    Ok((
        jar,
        ok(
            "Login successfully",
            TokenPair {
                access_token,
                refresh_token: Some(refresh_token),
            },
        ),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Envelope<()>)> {
    User::set_refresh_token(&state.db, auth.user_id, None).await?;

    let jar = jar
        .remove(removal_cookie(ACCESS_TOKEN_COOKIE))
        .remove(removal_cookie(REFRESH_TOKEN_COOKIE));

    Ok((jar, ok("Logout successfully", ())))
}

/// Updates the caller's profile; a new password is re-hashed
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Envelope<PublicUser>> {
    req.validate()?;

    let password_hash = match present(&req.password) {
        Some(plain) => Some(password::hash_password(plain)?),
        None => None,
    };

    let update = UpdateProfile {
        name: present(&req.name).map(str::to_string),
        email: present(&req.email).map(str::to_string),
        mobile: present(&req.mobile).map(str::to_string),
        avatar: present(&req.avatar).map(str::to_string),
        password_hash,
    };

    let user = if update.is_empty() {
        User::find_by_id(&state.db, auth.user_id).await?
    } else {
        User::update_profile(&state.db, auth.user_id, update).await?
    };
    let user = user.ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ok("Updated successfully", user.into()))
}

/// Stores a fresh OTP and mails it
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<Envelope<()>> {
    let email = present(&req.email).ok_or_else(|| ApiError::BadRequest("Provide email".to_string()))?;

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Email not available".to_string()))?;

    let code = otp::generate_otp();
    User::set_forgot_password_otp(&state.db, user.id, &code, otp::otp_expiry()).await?;

    state
        .mailer
        .send(&mail::forgot_password_message(&user.email, &user.name, &code))
        .await?;

    Ok(ok("check your email", ()))
}

pub async fn verify_forgot_password_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> ApiResult<Envelope<()>> {
    let (Some(email), Some(given)) = (present(&req.email), present(&req.otp)) else {
        return Err(ApiError::BadRequest("Provide required field email, otp.".to_string()));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Email not available".to_string()))?;

    match otp::check_otp(
        user.forgot_password_otp.as_deref(),
        user.forgot_password_expiry,
        given,
        Utc::now(),
    ) {
        OtpCheck::Valid => {}
        OtpCheck::Expired => return Err(ApiError::BadRequest("Otp is expired".to_string())),
        OtpCheck::Mismatch | OtpCheck::Missing => {
            return Err(ApiError::BadRequest("Invalid otp".to_string()))
        }
    }

    User::clear_forgot_password_otp(&state.db, user.id).await?;

    Ok(ok("Verify otp successfully", ()))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Envelope<()>> {
    let (Some(email), Some(new_password), Some(confirm_password)) = (
        present(&req.email),
        present(&req.new_password),
        present(&req.confirm_password),
    ) else {
        return Err(ApiError::BadRequest(
            "provide required fields email, newPassword, confirmPassword".to_string(),
        ));
    };

    let user = User::find_by_email(&state.db, email)
        .await?
        .ok_or_else(|| ApiError::BadRequest("Email is not available".to_string()))?;

    if new_password != confirm_password {
        return Err(ApiError::BadRequest(
            "newPassword and confirmPassword must be same.".to_string(),
        ));
    }

    User::update_password(&state.db, user.id, &password::hash_password(new_password)?).await?;

    Ok(ok("Password updated successfully.", ()))
}

/// Issues a new access token
///
/// The refresh token comes from the `refreshToken` cookie or a Bearer header
/// and must match the one stored at login.
pub async fn refresh_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Envelope<TokenPair>)> {
    let token = extract_token(&headers, REFRESH_TOKEN_COOKIE)
        .ok_or_else(|| ApiError::Unauthorized("Invalid token".to_string()))?;

    let expired = || ApiError::Unauthorized("token is expired".to_string());

    let (access_token, claims) = jwt::refresh_access_token(&token, &state.keys).map_err(|e| {
        tracing::debug!(error = %e, "Refresh token rejected");
        expired()
    })?;

    let user = User::find_by_id(&state.db, claims.sub).await?.ok_or_else(expired)?;
    if user.refresh_token.as_deref() != Some(token.as_str()) {
        tracing::warn!(user_id = %user.id, "Refresh token does not match the stored token");
        return Err(expired());
    }

    let jar = jar.add(token_cookie(TokenType::Access, access_token.clone(), state.secure_cookies()));

    Ok((
        jar,
        ok(
            "New Access token generated",
            TokenPair {
                access_token,
                refresh_token: None,
            },
        ),
    ))
}

pub async fn user_details(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(ok("user details", user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_validation() {
        let req = RegisterRequest {
            name: Some("Asha".to_string()),
            email: Some("asha@example".to_string()),
            password: Some("secret1".to_string()),
        };
        assert!(req.validate().is_err());

        let req = RegisterRequest {
            email: Some("asha@example.com".to_string()),
            ..req
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_update_request_ignores_absent_fields() {
        assert!(UpdateUserRequest::default().validate().is_ok());

        let req = UpdateUserRequest {
            avatar: Some("not a url".to_string()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_token_pair_json() {
        let json = serde_json::to_value(TokenPair {
            access_token: "a".to_string(),
            refresh_token: None,
        })
        .unwrap();
        assert_eq!(json["accessToken"], "a");
        assert!(json.get("refreshToken").is_none());
    }
}
