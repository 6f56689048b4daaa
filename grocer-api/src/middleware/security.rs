/// Response hardening headers
///
/// Every response gets `nosniff`, `DENY` framing, a strict referrer policy, a
/// deny-all CSP and `Cache-Control: no-store` (bodies carry tokens and
/// account data). HSTS is added only in production.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

const HSTS: &str = "max-age=31536000; includeSubDomains";

fn hardening_headers(production: bool) -> impl Iterator<Item = (HeaderName, &'static str)> {
    [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (header::CONTENT_SECURITY_POLICY, "default-src 'none'; frame-ancestors 'none'"),
        (header::CACHE_CONTROL, "no-store"),
    ]
    .into_iter()
    .chain(production.then_some((header::STRICT_TRANSPORT_SECURITY, HSTS)))
}

fn apply(headers: &mut HeaderMap, production: bool) {
    for (name, value) in hardening_headers(production) {
        headers.insert(name, HeaderValue::from_static(value));
    }
}

/// Use with `from_fn_with_state(production, security_headers)`
pub async fn security_headers(State(production): State<bool>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    apply(response.headers_mut(), production);
    response
}
