//! Request-recording middleware.
//!
//! Every HTTP exchange, success or failure, produces exactly one request
//! log entry with the true final status code, and one `RequestLogged`
//! event on the bus.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, Response};
use axum::middleware::Next;
use tracing::info;

use textlens_models::RequestLogEntry;

use crate::events::ServerEvent;
use crate::metrics;
use crate::state::AppState;

pub async fn record_request(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let entry = RequestLogEntry::new(
        method,
        path,
        response.status().as_u16(),
        start.elapsed().as_millis() as u64,
        client_addr,
    );

    state.request_count.fetch_add(1, Ordering::Relaxed);
    info!("{}", entry.formatted());
    metrics::record_http_request(&entry);
    state.request_log.append(entry.clone());
    state.events.publish(ServerEvent::RequestLogged(entry));

    response
}
