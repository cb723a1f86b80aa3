//! Application state.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Instant;

use textlens_engine::RecognizerGate;

use crate::auth::AuthGate;
use crate::config::ServerConfig;
use crate::events::EventBus;
use crate::request_log::RequestLog;
use crate::ws::ConnectionRegistry;

/// Shared application state, injected into both routers.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub auth: Arc<AuthGate>,
    pub engine: Arc<RecognizerGate>,
    pub request_log: Arc<RequestLog>,
    pub events: EventBus,
    pub connections: Arc<ConnectionRegistry>,
    pub request_count: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        auth: Arc<AuthGate>,
        engine: Arc<RecognizerGate>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            auth,
            engine,
            request_log: Arc::new(RequestLog::new()),
            events,
            connections: Arc::new(ConnectionRegistry::new()),
            request_count: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}
