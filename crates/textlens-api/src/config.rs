//! Server configuration.
//!
//! All fields are accepted from the outer layer at start time and are
//! mutable only while the serving layer is stopped.

use std::time::Duration;

use textlens_engine::GateConfig;
use textlens_models::OcrLanguage;

/// Configuration for both listeners and the recognition gate.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,
    /// HTTP listener port
    pub http_port: u16,
    /// WebSocket listener port
    pub ws_port: u16,
    /// Selected OCR language
    pub language: OcrLanguage,
    /// Whether the auth gate is enforced
    pub auth_enabled: bool,
    /// Bearer token compared verbatim
    pub auth_token: Option<String>,
    /// Max request body size
    pub max_body_size: usize,
    /// Per-recognition deadline
    pub recognition_timeout: Duration,
    /// Recognitions admitted at once (one running, the rest queued)
    pub max_pending_recognitions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            ws_port: 8081,
            language: OcrLanguage::English,
            auth_enabled: false,
            auth_token: None,
            max_body_size: 10 * 1024 * 1024, // 10MB
            recognition_timeout: Duration::from_secs(30),
            max_pending_recognitions: 8,
        }
    }
}

impl ServerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("TEXTLENS_HOST").unwrap_or(defaults.host),
            http_port: std::env::var("TEXTLENS_HTTP_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.http_port),
            ws_port: std::env::var("TEXTLENS_WS_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.ws_port),
            language: std::env::var("TEXTLENS_OCR_LANGUAGE")
                .map(|s| OcrLanguage::from_code(&s))
                .unwrap_or(defaults.language),
            auth_enabled: std::env::var("TEXTLENS_AUTH_ENABLED")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.auth_enabled),
            auth_token: std::env::var("TEXTLENS_AUTH_TOKEN")
                .ok()
                .filter(|t| !t.is_empty()),
            max_body_size: std::env::var("TEXTLENS_MAX_BODY_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_body_size),
            recognition_timeout: Duration::from_secs(
                std::env::var("TEXTLENS_RECOGNITION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            max_pending_recognitions: std::env::var("TEXTLENS_MAX_PENDING_RECOGNITIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_pending_recognitions),
        }
    }

    /// Gate policy derived from this config.
    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            max_pending: self.max_pending_recognitions,
            timeout: self.recognition_timeout,
        }
    }
}
