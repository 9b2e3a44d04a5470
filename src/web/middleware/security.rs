//! Security headers middleware.

use axum::{
    extract::Request,
    http::header::{HeaderValue, CACHE_CONTROL},
    middleware::Next,
    response::Response,
};

/// Security headers middleware.
///
/// Every response is marked non-sniffable, non-frameable and uncacheable.
/// Strict-Transport-Security is left to the TLS-terminating proxy.
pub async fn security_headers(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert(
        "X-Content-Type-Options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "Content-Security-Policy",
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
    );

    // Tokens are in bodies; nothing may be cached.
    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}
