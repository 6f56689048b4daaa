/// One-time codes for the forgot-password flow
///
/// A code is six decimal digits and stays valid for one hour. Codes are stored
/// on the user row and cleared once verified.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// How long a freshly issued code stays valid
pub const OTP_TTL_MINUTES: i64 = 60;

/// Result of checking a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    /// Code matches and has not expired
    Valid,

    /// Code was issued but its expiry has passed
    Expired,

    /// Code does not match the issued one
    Mismatch,

    /// No code was issued for this user
    Missing,
}

/// Generates a 6-digit numeric code (100000..=999999)
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}

/// Expiry timestamp for a code issued now
pub fn otp_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(OTP_TTL_MINUTES)
}

/// Checks a submitted code against the stored one
///
/// Expiry is checked before the code itself so that a stale code always
/// reports `Expired`, matching what the user needs to do next (request a new one).
pub fn check_otp(
    stored: Option<&str>,
    expiry: Option<DateTime<Utc>>,
    given: &str,
    now: DateTime<Utc>,
) -> OtpCheck {
    let (Some(stored), Some(expiry)) = (stored, expiry) else {
        return OtpCheck::Missing;
    };

    if expiry < now {
        return OtpCheck::Expired;
    }

    if stored != given.trim() {
        return OtpCheck::Mismatch;
    }

    OtpCheck::Valid
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(otp.chars().next(), Some('0'));
        }
    }

    #[test]
    fn test_otp_expiry_is_one_hour_out() {
        let expiry = otp_expiry();
        let delta = expiry - Utc::now();
        assert!(delta <= Duration::minutes(60));
        assert!(delta > Duration::minutes(59));
    }

    #[test]
    fn test_check_otp() {
        let now = Utc::now();
        let later = now + Duration::minutes(10);
        let earlier = now - Duration::minutes(1);

        assert_eq!(check_otp(Some("123456"), Some(later), "123456", now), OtpCheck::Valid);
        assert_eq!(check_otp(Some("123456"), Some(later), " 123456 ", now), OtpCheck::Valid);
        assert_eq!(check_otp(Some("123456"), Some(later), "654321", now), OtpCheck::Mismatch);
        assert_eq!(check_otp(Some("123456"), Some(earlier), "123456", now), OtpCheck::Expired);
        assert_eq!(check_otp(None, Some(later), "123456", now), OtpCheck::Missing);
        assert_eq!(check_otp(Some("123456"), None, "123456", now), OtpCheck::Missing);
    }
}
