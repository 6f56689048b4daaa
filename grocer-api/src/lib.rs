//! # Grocer API Server Library
//!
//! HTTP layer of the grocery storefront: router, handlers, guards and the
//! error/response envelopes. Persistence, auth primitives, payments and
//! mail live in `grocer-shared`.
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `config`: configuration from the environment
//! - `error`: error type and HTTP mapping
//! - `middleware`: auth guards and security headers
//! - `response`: success envelope
//! - `routes`: route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod response;
pub mod routes;
