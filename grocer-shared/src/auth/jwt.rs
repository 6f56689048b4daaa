/// Shopper session tokens (HS256)
///
/// Two kinds, each signed with its own secret:
///
/// | kind    | lifetime | carried in                                   |
/// |---------|----------|----------------------------------------------|
/// | access  | 5 hours  | `accessToken` cookie or `Authorization: Bearer` |
/// | refresh | 7 days   | `refreshToken` cookie, also stored on the user |
///
/// ```
/// use grocer_shared::auth::jwt::{create_token, validate_access_token, Claims, JwtKeys, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), grocer_shared::auth::jwt::JwtError> {
/// let keys = JwtKeys::new("access-secret", "refresh-secret");
/// let shopper = Uuid::new_v4();
///
/// let token = create_token(&Claims::new(shopper, TokenType::Access), &keys)?;
/// assert_eq!(validate_access_token(&token, &keys)?.sub, shopper);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ISSUER: &str = "grocer";

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Failed to create token: {0}")]
    CreateError(String),

    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

impl TokenType {
    /// How long a freshly issued token stays valid; also the cookie max-age
    pub fn lifetime(self) -> Duration {
        match self {
            TokenType::Access => Duration::hours(5),
            TokenType::Refresh => Duration::days(7),
        }
    }
}

/// The access and refresh signing secrets
#[derive(Clone)]
pub struct JwtKeys {
    access: String,
    refresh: String,
}

impl JwtKeys {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }

    fn secret(&self, token_type: TokenType) -> &[u8] {
        match token_type {
            TokenType::Access => self.access.as_bytes(),
            TokenType::Refresh => self.refresh.as_bytes(),
        }
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("JwtKeys { .. }")
    }
}

/// Token payload; `sub` is the user ID, times are Unix seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub token_type: TokenType,
}

impl Claims {
    pub fn new(user_id: Uuid, token_type: TokenType) -> Self {
        Self::issued_at(user_id, token_type, Utc::now())
    }

    /// Claims as if issued at `now`, valid for the kind's lifetime
    pub fn issued_at(user_id: Uuid, token_type: TokenType, now: DateTime<Utc>) -> Self {
        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + token_type.lifetime()).timestamp(),
            token_type,
        }
    }
}

/// Signs `claims` with the secret of its own kind
pub fn create_token(claims: &Claims, keys: &JwtKeys) -> Result<String, JwtError> {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(keys.secret(claims.token_type)),
    )
    .map_err(|e| JwtError::CreateError(e.to_string()))
}

fn validate(token: &str, keys: &JwtKeys, expected: TokenType) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_nbf = true;
    validation.leeway = 0;

    let claims = jsonwebtoken::decode::<Claims>(token, &DecodingKey::from_secret(keys.secret(expected)), &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
                expected: ISSUER.to_string(),
            },
            _ => JwtError::ValidationError(e.to_string()),
        })?
        .claims;

    // same secret reused for both kinds would otherwise let one pass as the other
    if claims.token_type != expected {
        return Err(JwtError::ValidationError(format!(
            "expected {:?} token, got {:?}",
            expected, claims.token_type
        )));
    }

    Ok(claims)
}

pub fn validate_access_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate(token, keys, TokenType::Access)
}

pub fn validate_refresh_token(token: &str, keys: &JwtKeys) -> Result<Claims, JwtError> {
    validate(token, keys, TokenType::Refresh)
}

/// Mints a new access token from a valid refresh token
///
/// The refresh claims come back too; callers still compare the raw refresh
/// token with the one stored for `claims.sub`.
pub fn refresh_access_token(refresh_token: &str, keys: &JwtKeys) -> Result<(String, Claims), JwtError> {
    let claims = validate_refresh_token(refresh_token, keys)?;
    let access = create_token(&Claims::new(claims.sub, TokenType::Access), keys)?;

    Ok((access, claims))
}
