//! # Grocer Shared Library
//!
//! This crate contains shared types, utilities, and business logic used by
//! the Grocer API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication utilities (JWT, passwords, OTPs, request context)
//! - `db`: Connection pool and migrations
//! - `pricing`: Discount and currency arithmetic
//! - `payments`: Payment gateway abstraction, Stripe client, webhook verification
//! - `mail`: Transactional mail delivery

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod payments;
pub mod pricing;

/// Current version of the Grocer shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
