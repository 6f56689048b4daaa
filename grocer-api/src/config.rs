/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first in development).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `FRONTEND_URL`: storefront origin, used for CORS and redirect links (required)
/// - `PRODUCTION`: `true` enables `Secure` cookies and HSTS (default `false`)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `SECRET_KEY_ACCESS_TOKEN` / `SECRET_KEY_REFRESH_TOKEN`: JWT secrets, at least 32 characters (required)
/// - `STRIPE_SECRET_KEY`: Stripe API key (required)
/// - `STRIPE_ENDPOINT_WEBHOOK_SECRET_KEY`: webhook signing secret (required)
/// - `STRIPE_API_BASE`: Stripe base URL (default `https://api.stripe.com`)
/// - `CURRENCY`: checkout currency (default `inr`)
/// - `RESEND_API`: Resend API key; when unset mail is only logged
/// - `MAIL_FROM`: sender address
///
/// # Example
///
/// ```no_run
/// use grocer_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use grocer_shared::auth::jwt::JwtKeys;
use grocer_shared::payments::stripe::DEFAULT_API_BASE;
use serde::{Deserialize, Serialize};
use std::env;

/// Minimum length of each JWT secret
pub const MIN_SECRET_LEN: usize = 32;

/// Complete application configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub stripe: StripeConfig,
    pub mail: MailConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api", &self.api)
            .field("database_max_connections", &self.database.max_connections)
            .field("stripe_api_base", &self.stripe.api_base)
            .field("currency", &self.stripe.currency)
            .field("mail_enabled", &self.mail.resend_api_key.is_some())
            .finish_non_exhaustive()
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Storefront origin, without trailing slash
    pub frontend_url: String,

    /// Serving over HTTPS in production
    pub production: bool,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub access_secret: String,
    pub refresh_secret: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    pub secret_key: String,
    pub webhook_secret: String,
    pub api_base: String,

    /// Lowercase ISO code
    pub currency: String,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

fn required(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
}

fn secret(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> anyhow::Result<String> {
    let value = required(lookup, key)?;
    if value.len() < MIN_SECRET_LEN {
        anyhow::bail!("{} must be at least {} characters long", key, MIN_SECRET_LEN);
    }
    Ok(value)
}

impl Config {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is missing, a number does
    /// not parse, or a JWT secret is too short.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = lookup("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;

        let frontend_url = required(&lookup, "FRONTEND_URL")?
            .trim_end_matches('/')
            .to_string();
        let production = lookup("PRODUCTION")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                frontend_url,
                production,
            },
            database: DatabaseConfig {
                url: required(&lookup, "DATABASE_URL")?,
                max_connections,
            },
            jwt: JwtConfig {
                access_secret: secret(&lookup, "SECRET_KEY_ACCESS_TOKEN")?,
                refresh_secret: secret(&lookup, "SECRET_KEY_REFRESH_TOKEN")?,
            },
            stripe: StripeConfig {
                secret_key: required(&lookup, "STRIPE_SECRET_KEY")?,
                webhook_secret: required(&lookup, "STRIPE_ENDPOINT_WEBHOOK_SECRET_KEY")?,
                api_base: lookup("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                currency: lookup("CURRENCY")
                    .unwrap_or_else(|| "inr".to_string())
                    .to_ascii_lowercase(),
            },
            mail: MailConfig {
                resend_api_key: lookup("RESEND_API").filter(|v| !v.trim().is_empty()),
                from: lookup("MAIL_FROM").unwrap_or_else(|| "Grocer <noreply@grocer.local>".to_string()),
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn jwt_keys(&self) -> JwtKeys {
        JwtKeys::new(self.jwt.access_secret.clone(), self.jwt.refresh_secret.clone())
    }

    /// Where Checkout sends the payer after paying
    pub fn checkout_success_url(&self) -> String {
        format!("{}/success", self.api.frontend_url)
    }

    /// Where Checkout sends the payer after backing out
    pub fn checkout_cancel_url(&self) -> String {
        format!("{}/cancel", self.api.frontend_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("FRONTEND_URL", "https://shop.example/".to_string()),
            ("DATABASE_URL", "postgresql://localhost/grocer".to_string()),
            ("SECRET_KEY_ACCESS_TOKEN", "a".repeat(32)),
            ("SECRET_KEY_REFRESH_TOKEN", "r".repeat(40)),
            ("STRIPE_SECRET_KEY", "sk_test_123".to_string()),
            ("STRIPE_ENDPOINT_WEBHOOK_SECRET_KEY", "whsec_123".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> anyhow::Result<Config> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&base_env()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.api.frontend_url, "https://shop.example");
        assert!(!config.api.production);
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.stripe.api_base, "https://api.stripe.com");
        assert_eq!(config.stripe.currency, "inr");
        assert!(config.mail.resend_api_key.is_none());
        assert_eq!(config.checkout_success_url(), "https://shop.example/success");
        assert_eq!(config.checkout_cancel_url(), "https://shop.example/cancel");
    }

    #[test]
    fn test_overrides() {
        let mut env = base_env();
        env.insert("API_PORT", "9000".to_string());
        env.insert("PRODUCTION", "TRUE".to_string());
        env.insert("CURRENCY", "USD".to_string());
        env.insert("RESEND_API", "re_123".to_string());

        let config = load(&env).unwrap();
        assert_eq!(config.api.port, 9000);
        assert!(config.api.production);
        assert_eq!(config.stripe.currency, "usd");
        assert_eq!(config.mail.resend_api_key.as_deref(), Some("re_123"));
    }

    #[test]
    fn test_missing_required() {
        let mut env = base_env();
        env.remove("STRIPE_ENDPOINT_WEBHOOK_SECRET_KEY");

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("STRIPE_ENDPOINT_WEBHOOK_SECRET_KEY"));
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut env = base_env();
        env.insert("SECRET_KEY_ACCESS_TOKEN", "short".to_string());

        let err = load(&env).unwrap_err();
        assert!(err.to_string().contains("at least 32"));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = load(&base_env()).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk_test_123"));
        assert!(!debug.contains("whsec_123"));
    }
}
