/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing
/// - [`jwt`]: Access/refresh token generation and validation
/// - [`otp`]: One-time codes for the forgot-password flow
/// - [`middleware`]: Request auth context and token extraction
///
/// # Example
///
/// ```no_run
/// use grocer_shared::auth::password::{hash_password, verify_password};
/// use grocer_shared::auth::jwt::{create_token, Claims, JwtKeys, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let keys = JwtKeys::new("access-secret", "refresh-secret");
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, &keys)?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod middleware;
pub mod otp;
pub mod password;
