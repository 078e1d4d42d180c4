//! Request identification.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for tracing and responses
//! - Derive the client key used for rate and lockout accounting
//!
//! # Design Decisions
//! - `X-Forwarded-For` is ignored unless explicitly trusted; a spoofed header
//!   would otherwise let one client spread across unlimited buckets
//! - Shared IPs behind a proxy share a budget; over-limiting is acceptable

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Bucket for requests whose peer address is unknown.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Client key for throttling: the first forwarded address when trusted,
/// otherwise the socket peer.
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        let forwarded = headers
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip.to_string();
        }
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
