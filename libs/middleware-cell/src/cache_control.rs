use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::security_headers::API_PREFIX;
use crate::transport::is_websocket_upgrade;

const PUBLIC_LISTING_PREFIXES: &[&str] = &["/api/public/games", "/api/public/categories"];
const HEALTH_PREFIX: &str = "/api/health";
const ADMIN_PREFIX: &str = "/api/admin";
// The image proxy sets its own long-lived cache headers.
const IMAGE_PROXY_PREFIX: &str = "/api/public/image-proxy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    PublicListing,
    HealthCheck,
    Admin,
    Api,
}

impl CacheTier {
    pub fn classify(path: &str) -> Option<Self> {
        if has_prefix(path, IMAGE_PROXY_PREFIX) {
            return None;
        }

        if PUBLIC_LISTING_PREFIXES
            .iter()
            .any(|prefix| has_prefix(path, prefix))
        {
            Some(CacheTier::PublicListing)
        } else if has_prefix(path, HEALTH_PREFIX) {
            Some(CacheTier::HealthCheck)
        } else if has_prefix(path, ADMIN_PREFIX) {
            Some(CacheTier::Admin)
        } else if has_prefix(path, API_PREFIX) {
            Some(CacheTier::Api)
        } else {
            None
        }
    }

    pub fn header_value(&self) -> &'static str {
        match self {
            CacheTier::PublicListing => "public, max-age=300, s-maxage=300",
            CacheTier::HealthCheck | CacheTier::Api => "public, max-age=60, s-maxage=60",
            CacheTier::Admin => "private, no-cache, no-store, must-revalidate",
        }
    }
}

fn has_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub async fn cache_control_middleware(request: Request, next: Next) -> Response {
    if is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let tier = CacheTier::classify(request.uri().path());
    let mut response = next.run(request).await;

    if let Some(tier) = tier {
        if response.headers().contains_key(header::CACHE_CONTROL) {
            debug!("Handler set Cache-Control, keeping it over {:?} tier", tier);
        } else {
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(tier.header_value()),
            );
        }
    }

    response
}
