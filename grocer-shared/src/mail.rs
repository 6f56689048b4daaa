/// Transactional mail
///
/// Two messages are sent: the email verification link after registration
/// and the password-reset OTP. Delivery goes through the [`Mailer`] trait so
/// the API can run with [`LogMailer`] when no provider key is configured.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::otp::OTP_TTL_MINUTES;

/// Resend's send-email endpoint
pub const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Mail provider rejected message ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// A plain-text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Sends mail
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Mailer backed by the Resend HTTP API
#[derive(Clone)]
pub struct ResendMailer {
    http: reqwest::Client,
    api_key: String,
    from: String,
    endpoint: String,
}

impl std::fmt::Debug for ResendMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResendMailer")
            .field("from", &self.from)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ResendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: api_key.into(),
            from: from.into(),
            endpoint: RESEND_ENDPOINT.to_string(),
        }
    }

    /// Overrides the endpoint (for a local stub server)
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ResendRequest {
                from: &self.from,
                to: [&message.to],
                subject: &message.subject,
                text: &message.body,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), to = %message.to, "Mail delivery rejected");
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message: body,
            });
        }

        debug!(to = %message.to, subject = %message.subject, "Mail sent");
        Ok(())
    }
}

/// Mailer that only logs
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "Mail delivery disabled; logging message"
        );
        Ok(())
    }
}

/// Link sent after registration; the code is the user's ID
pub fn verify_email_url(frontend_url: &str, user_id: Uuid) -> String {
    format!("{}/verify-email?code={}", frontend_url.trim_end_matches('/'), user_id)
}

pub fn verify_email_message(to: &str, name: &str, frontend_url: &str, user_id: Uuid) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Verify email from Grocer".to_string(),
        body: format!(
            "Dear {},\n\nThank you for registering with Grocer.\n\nVerify your email: {}\n",
            name,
            verify_email_url(frontend_url, user_id)
        ),
    }
}

pub fn forgot_password_message(to: &str, name: &str, otp: &str) -> MailMessage {
    MailMessage {
        to: to.to_string(),
        subject: "Forgot password from Grocer".to_string(),
        body: format!(
            "Dear {},\n\nYou requested a password reset. Use this OTP to reset your password: {}\n\n\
             The OTP is valid for {} minutes. Enter it on the Grocer website to continue.\n",
            name, otp, OTP_TTL_MINUTES
        ),
    }
}
