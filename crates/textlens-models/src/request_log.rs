//! Completed-request records.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One completed HTTP exchange, immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub client_addr: String,
}

impl RequestLogEntry {
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration_ms: u64,
        client_addr: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms,
            client_addr: client_addr.into(),
        }
    }

    /// Render as `HH:MM:SS - METHOD PATH - STATUS (Nms)`.
    pub fn formatted(&self) -> String {
        format!(
            "{} - {} {} - {} ({}ms)",
            self.timestamp.format("%H:%M:%S"),
            self.method,
            self.path,
            self.status_code,
            self.duration_ms
        )
    }
}
