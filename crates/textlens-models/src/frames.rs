//! WebSocket frame schemas.
//!
//! These frames maintain compatibility with the HTTP response shapes: a
//! `result` frame carries the same fields as a successful `POST /ocr`
//! response body.

use chrono::Utc;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ocr::{BlockSummary, OcrResult};

/// Millisecond timestamps, matching the HTTP `timestamp` fields.
fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn default_frame_type() -> String {
    "ocr".to_string()
}

/// Inbound client frame envelope.
///
/// A missing `type` field defaults to `"ocr"`; unknown types are answered
/// with an `error` frame by the hub, so the envelope keeps the raw string.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClientFrame {
    #[serde(rename = "type", default = "default_frame_type")]
    pub frame_type: String,
    /// Token for `auth` frames.
    #[serde(default)]
    pub token: Option<String>,
    /// Base64 or data-URI image for `ocr` frames.
    #[serde(default)]
    pub image: Option<String>,
}

/// Outbound server frame envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerFrame {
    /// Connection and authentication state changes.
    Status {
        status: String,
        message: String,
        timestamp: i64,
    },

    /// Midpoint marker while recognition is in flight.
    Progress { status: String, progress: u8 },

    /// Full recognition result.
    Result {
        success: bool,
        text: String,
        confidence: f32,
        language: String,
        #[serde(rename = "processingTimeMs")]
        processing_time_ms: u64,
        blocks: Vec<BlockSummary>,
    },

    /// Request- or connection-scoped failure; the connection stays open.
    Error { error: String, timestamp: i64 },

    /// Reply to a client `ping`.
    Pong { timestamp: i64 },

    /// Server-initiated message to every open connection.
    Broadcast { message: String, timestamp: i64 },
}

impl ServerFrame {
    pub fn status(status: impl Into<String>, message: impl Into<String>) -> Self {
        ServerFrame::Status {
            status: status.into(),
            message: message.into(),
            timestamp: now_ms(),
        }
    }

    pub fn progress(status: impl Into<String>, progress: u8) -> Self {
        ServerFrame::Progress {
            status: status.into(),
            progress: progress.min(100),
        }
    }

    pub fn result(result: &OcrResult) -> Self {
        ServerFrame::Result {
            success: true,
            text: result.text.clone(),
            confidence: result.confidence,
            language: result.language.clone(),
            processing_time_ms: result.processing_time_ms,
            blocks: result.block_summaries(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerFrame::Error {
            error: message.into(),
            timestamp: now_ms(),
        }
    }

    pub fn pong() -> Self {
        ServerFrame::Pong { timestamp: now_ms() }
    }

    pub fn broadcast(message: impl Into<String>) -> Self {
        ServerFrame::Broadcast {
            message: message.into(),
            timestamp: now_ms(),
        }
    }

    /// Serialize to the wire text payload.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            // Frames contain only JSON-safe fields; this path is unreachable
            // in practice but must not panic the hub.
            "{\"type\":\"error\",\"error\":\"serialization failure\"}".to_string()
        })
    }
}
