use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::transport::is_websocket_upgrade;

/// Routes under this prefix serve JSON and skip the HTML-only headers.
pub const API_PREFIX: &str = "/api";

static PERMISSIONS_POLICY: HeaderName = HeaderName::from_static("permissions-policy");

const HSTS: &str = "max-age=31536000; includeSubDomains";
const PERMISSIONS: &str = "geolocation=(), microphone=(), camera=(), payment=(), usb=()";
const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    img-src 'self' data: https://res.cloudinary.com https://cf.geekdo-images.com; \
    style-src 'self' 'unsafe-inline'; \
    script-src 'self'; \
    connect-src 'self'; \
    frame-ancestors 'none'";

pub fn is_api_path(path: &str) -> bool {
    path == API_PREFIX
        || path
            .strip_prefix(API_PREFIX)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Adds the security headers for `path`, leaving any header the handler
/// already set untouched.
pub fn apply_security_headers(path: &str, headers: &mut HeaderMap) {
    set_if_absent(headers, header::X_FRAME_OPTIONS, "DENY");
    set_if_absent(headers, header::X_CONTENT_TYPE_OPTIONS, "nosniff");
    set_if_absent(headers, header::STRICT_TRANSPORT_SECURITY, HSTS);
    set_if_absent(headers, header::REFERRER_POLICY, "strict-origin-when-cross-origin");
    set_if_absent(headers, PERMISSIONS_POLICY.clone(), PERMISSIONS);

    if !is_api_path(path) {
        set_if_absent(headers, header::CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY);
        set_if_absent(headers, header::X_XSS_PROTECTION, "1; mode=block");
    }
}

fn set_if_absent(headers: &mut HeaderMap, name: HeaderName, value: &'static str) {
    headers
        .entry(name)
        .or_insert_with(|| HeaderValue::from_static(value));
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    if is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_owned();
    let mut response = next.run(request).await;
    apply_security_headers(&path, response.headers_mut());
    response
}
