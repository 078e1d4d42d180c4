//! Admission middleware.
//! Runs the gate before any handler reads the request body.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::request::client_key;
use crate::http::server::AppState;
use crate::observability::metrics;

pub async fn admission_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_key(req.headers(), peer, state.auth.trust_forwarded_for);

    let credential = req
        .headers()
        .get(state.auth.header_name.as_str())
        .and_then(|v| v.to_str().ok());

    match state.gate.authorize(&client, credential) {
        Ok(admission) => {
            req.extensions_mut().insert(admission);
            next.run(req).await
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// Records request count and latency for every response, rejections included.
pub async fn request_metrics(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let response = next.run(req).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
