/// Shopper password hashing (Argon2id, PHC strings)
///
/// The stored string carries its own salt and cost parameters, so
/// [`verify_password`] works for hashes made under older settings.
///
/// ```
/// use grocer_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), grocer_shared::auth::password::PasswordError> {
/// let stored = hash_password("basket-of-apples")?;
/// assert!(verify_password("basket-of-apples", &stored)?);
/// assert!(!verify_password("basket-of-pears", &stored)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// The stored value is not a PHC string we can read
    #[error("Stored password hash is unreadable: {0}")]
    InvalidHash(String),

    #[error("Failed to verify password: {0}")]
    VerifyError(String),
}

/// 19 MiB, 2 passes, 1 lane
const COST: (u32, u32, u32) = (19 * 1024, 2, 1);

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let (memory_kib, passes, lanes) = COST;
    let params = Params::new(memory_kib, passes, lanes, None)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes `password` with a fresh random salt
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashError(e.to_string()))
}

/// Checks `password` against a stored hash
///
/// A wrong password is `Ok(false)`; errors mean the stored hash itself is bad.
pub fn verify_password(password: &str, stored: &str) -> Result<bool, PasswordError> {
    let stored = PasswordHash::new(stored).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &stored) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_phc_argon2id() {
        let stored = hash_password("basket-of-apples").unwrap();

        assert!(stored.starts_with("$argon2id$v=19$"));
        assert!(stored.contains("m=19456,t=2,p=1"));
    }

    #[test]
    fn test_same_password_salts_differ() {
        assert_ne!(hash_password("milk").unwrap(), hash_password("milk").unwrap());
    }

    #[test]
    fn test_verify() {
        let stored = hash_password("basket-of-apples").unwrap();

        assert!(verify_password("basket-of-apples", &stored).unwrap());
        assert!(!verify_password("Basket-of-apples", &stored).unwrap());
        assert!(!verify_password("", &stored).unwrap());
        assert!(verify_password("मसाला-चाय", &hash_password("मसाला-चाय").unwrap()).unwrap());
    }

    #[test]
    fn test_unreadable_stored_hash() {
        assert!(matches!(
            verify_password("milk", "not-a-hash"),
            Err(PasswordError::InvalidHash(_))
        ));
    }
}
