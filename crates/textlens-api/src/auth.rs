//! Shared authentication gate.
//!
//! One gate instance is evaluated by both listeners: the HTTP listener per
//! request, the realtime hub per `auth` message. Settings are mutated only
//! while the serving layer is stopped and read concurrently while running.

use axum::http::{header, HeaderMap};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Fixed body reused verbatim by both listeners on auth failure.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Invalid or missing authentication token";

#[derive(Debug, Clone, Default)]
struct AuthSettings {
    enabled: bool,
    token: Option<String>,
}

/// Fixed `{authorized, message}` structure for unauthorized replies.
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub authorized: bool,
    pub message: String,
}

/// Stateless policy evaluator over a small mutable config.
pub struct AuthGate {
    settings: RwLock<AuthSettings>,
}

impl AuthGate {
    pub fn new(enabled: bool, token: Option<String>) -> Self {
        Self {
            settings: RwLock::new(AuthSettings { enabled, token }),
        }
    }

    /// Only called while the serving layer is stopped.
    pub async fn set_enabled(&self, enabled: bool) {
        self.settings.write().await.enabled = enabled;
        debug!(enabled, "authentication toggled");
    }

    /// Only called while the serving layer is stopped.
    pub async fn set_token(&self, token: Option<String>) {
        let set = token.is_some();
        self.settings.write().await.token = token;
        debug!(set, "auth token updated");
    }

    /// Evaluate the policy against a request's headers.
    ///
    /// When auth is enabled but no token is configured the gate is
    /// fail-open: every request passes. This mirrors the deployed
    /// behavior and is surfaced as a warning rather than silently
    /// hardened to fail-closed.
    pub async fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        let settings = self.settings.read().await;

        if !settings.enabled {
            return true;
        }

        let Some(expected) = settings.token.as_deref() else {
            warn!("auth is enabled but no token is set; failing open");
            return true;
        };

        let Some(provided) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
        else {
            debug!("no authorization header provided");
            return false;
        };

        let cleaned = provided.strip_prefix("Bearer ").unwrap_or(provided).trim();
        cleaned == expected
    }

    pub fn unauthorized_response(&self) -> AuthResponse {
        AuthResponse {
            authorized: false,
            message: UNAUTHORIZED_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_disabled_gate_accepts_anything() {
        let gate = AuthGate::new(false, Some("T".to_string()));
        assert!(gate.is_authenticated(&HeaderMap::new()).await);
        assert!(gate.is_authenticated(&bearer("wrong")).await);
    }

    #[tokio::test]
    async fn test_enabled_gate_requires_exact_token() {
        let gate = AuthGate::new(true, Some("T".to_string()));
        assert!(gate.is_authenticated(&bearer("T")).await);
        assert!(!gate.is_authenticated(&bearer("X")).await);
        assert!(!gate.is_authenticated(&HeaderMap::new()).await);
    }

    #[tokio::test]
    async fn test_raw_token_without_bearer_prefix_is_accepted() {
        let gate = AuthGate::new(true, Some("T".to_string()));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("T"));
        assert!(gate.is_authenticated(&headers).await);
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_trimmed() {
        let gate = AuthGate::new(true, Some("T".to_string()));
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer T  "));
        assert!(gate.is_authenticated(&headers).await);
    }

    #[tokio::test]
    async fn test_enabled_without_token_fails_open() {
        let gate = AuthGate::new(true, None);
        assert!(gate.is_authenticated(&HeaderMap::new()).await);
        assert!(gate.is_authenticated(&bearer("anything")).await);
    }

    #[tokio::test]
    async fn test_settings_mutation_applies() {
        let gate = AuthGate::new(false, None);
        gate.set_enabled(true).await;
        gate.set_token(Some("secret".to_string())).await;
        assert!(gate.is_authenticated(&bearer("secret")).await);
        assert!(!gate.is_authenticated(&bearer("other")).await);
    }

    #[test]
    fn test_unauthorized_response_shape() {
        let gate = AuthGate::new(true, Some("T".to_string()));
        let response = gate.unauthorized_response();
        assert!(!response.authorized);
        assert_eq!(response.message, UNAUTHORIZED_MESSAGE);
    }
}
