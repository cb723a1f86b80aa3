//! Axum HTTP listener and WebSocket hub for the textlens OCR server.
//!
//! This crate provides:
//! - Exact-route HTTP endpoints (`/health`, `/status`, `/ocr`)
//! - The realtime hub with typed JSON frames
//! - The shared authentication gate
//! - The bounded request log and the observability event bus

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod request_log;
pub mod routes;
pub mod state;
pub mod ws;

pub use auth::{AuthGate, UNAUTHORIZED_MESSAGE};
pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use events::{EventBus, ServerEvent, SubscriptionId};
pub use request_log::{RequestLog, MAX_LOG_ENTRIES};
pub use routes::{create_router, create_ws_router};
pub use state::AppState;
