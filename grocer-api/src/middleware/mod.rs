/// Middleware for the API server
///
/// - `security`: security response headers
/// - `auth`: access-token guard and admin guard

pub mod auth;
pub mod security;
