//! Realtime hub: persistent WebSocket connections.
//!
//! Each connection gets an outbound channel drained by a writer task, so
//! recognition work spawned for an `ocr` message never blocks the receive
//! loop, and sends racing a close are swallowed by the writer instead of
//! tearing down the handling path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use textlens_engine::imaging;
use textlens_models::{ClientFrame, ServerFrame};

use crate::events::ServerEvent;
use crate::metrics;
use crate::state::AppState;

/// Membership set for open realtime connections.
///
/// Registration and removal return the count taken under the same lock,
/// so reported counts are always consistent with the live set.
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    senders: Mutex<HashMap<u64, mpsc::UnboundedSender<Message>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            senders: Mutex::new(HashMap::new()),
        }
    }

    fn register(&self, tx: mpsc::UnboundedSender<Message>) -> (u64, usize) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.insert(id, tx);
        (id, senders.len())
    }

    fn deregister(&self, id: u64) -> usize {
        let mut senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        senders.remove(&id);
        senders.len()
    }

    pub fn count(&self) -> usize {
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Push a `broadcast` frame to every open connection, best-effort.
    pub fn broadcast(&self, message: &str) {
        let frame = ServerFrame::broadcast(message);
        let payload = frame.to_json();
        let senders = self
            .senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for tx in senders.values() {
            let _ = tx.send(Message::Text(payload.clone()));
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// WebSocket upgrade endpoint.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let (id, count) = state.connections.register(tx.clone());
    debug!(connection = id, total = count, "websocket connection opened");
    metrics::record_ws_connection();
    metrics::set_ws_active_connections(count);
    state.events.publish(ServerEvent::ConnectionCount(count));

    // Writer task: drains the outbound channel. A send error means the
    // client went away; outstanding sends are dropped silently.
    let writer = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    send_frame(&tx, ServerFrame::status("connected", "Connection established"));

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => handle_text(&state, &tx, &text).await,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }

    let count = state.connections.deregister(id);
    debug!(connection = id, total = count, "websocket connection closed");
    metrics::set_ws_active_connections(count);
    state.events.publish(ServerEvent::ConnectionCount(count));

    writer.abort();
}

/// Dispatch one inbound text frame. Never returns an error: every failure
/// becomes an `error` frame and the connection stays open.
pub(crate) async fn handle_text(
    state: &AppState,
    tx: &mpsc::UnboundedSender<Message>,
    text: &str,
) {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            send_frame(tx, ServerFrame::error(format!("Invalid message format: {e}")));
            return;
        }
    };

    metrics::record_ws_message(&frame.frame_type);

    match frame.frame_type.as_str() {
        "auth" => handle_auth(state, tx, frame.token.unwrap_or_default()).await,
        "ping" => send_frame(tx, ServerFrame::pong()),
        "ocr" => handle_ocr(state, tx, frame.image).await,
        other => send_frame(
            tx,
            ServerFrame::error(format!("Unknown message type: {other}")),
        ),
    }
}

/// Advisory authentication check: evaluates the shared gate but does not
/// mark the connection, so later `ocr` frames are not gated by it.
async fn handle_auth(state: &AppState, tx: &mpsc::UnboundedSender<Message>, token: String) {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
        headers.insert(header::AUTHORIZATION, value);
    }

    if state.auth.is_authenticated(&headers).await {
        send_frame(
            tx,
            ServerFrame::status("authenticated", "Authentication successful"),
        );
    } else {
        send_frame(tx, ServerFrame::error("Authentication failed"));
    }
}

async fn handle_ocr(state: &AppState, tx: &mpsc::UnboundedSender<Message>, image: Option<String>) {
    let Some(payload) = image else {
        send_frame(tx, ServerFrame::error("Missing 'image' field in request"));
        return;
    };

    let image = match imaging::decode_base64(&payload) {
        Ok(image) => image,
        Err(e) => {
            debug!(error = %e, "rejected websocket image payload");
            send_frame(tx, ServerFrame::error("Invalid image data"));
            return;
        }
    };

    send_frame(tx, ServerFrame::status("processing", "Processing image..."));

    // Recognition runs off the receive loop; the connection keeps
    // handling frames while this is in flight.
    let engine = Arc::clone(&state.engine);
    let language = state.config.language;
    let tx = tx.clone();
    tokio::spawn(async move {
        let image = imaging::resize_if_needed(image);
        send_frame(&tx, ServerFrame::progress("recognizing", 50));

        match engine.recognize(&image, language).await {
            Ok(result) => {
                metrics::record_recognition("ok");
                send_frame(&tx, ServerFrame::result(&result));
            }
            Err(e) => {
                metrics::record_recognition("error");
                warn!(error = %e, "websocket recognition failed");
                send_frame(&tx, ServerFrame::error(format!("OCR processing failed: {e}")));
            }
        }
    });
}

/// Queue a frame for the writer task; errors mean the connection already
/// closed and are swallowed.
fn send_frame(tx: &mpsc::UnboundedSender<Message>, frame: ServerFrame) {
    let _ = tx.send(Message::Text(frame.to_json()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthGate;
    use crate::config::ServerConfig;
    use crate::events::EventBus;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::Utc;
    use std::io::Cursor;
    use textlens_engine::{FixtureRecognizer, RecognizerGate};

    fn test_state(auth: AuthGate) -> AppState {
        let config = ServerConfig::default();
        let gate = RecognizerGate::new(
            Arc::new(FixtureRecognizer::new("probe text")),
            config.gate_config(),
        );
        AppState::new(config, Arc::new(auth), Arc::new(gate), EventBus::new())
    }

    fn png_base64() -> String {
        let image = image::DynamicImage::new_rgb8(8, 8);
        let mut buf = Cursor::new(Vec::new());
        image.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        STANDARD.encode(buf.into_inner())
    }

    async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Message>) -> ServerFrame {
        let message = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("channel closed");
        let Message::Text(text) = message else {
            panic!("expected text frame");
        };
        serde_json::from_str(&text).unwrap()
    }

    #[tokio::test]
    async fn test_ping_yields_pong_with_current_timestamp() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let before = Utc::now().timestamp_millis();
        handle_text(&state, &tx, r#"{"type":"ping"}"#).await;

        match next_frame(&mut rx).await {
            ServerFrame::Pong { timestamp } => assert!(timestamp >= before),
            other => panic!("expected pong, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_auth_frame_is_advisory() {
        let state = test_state(AuthGate::new(true, Some("T".to_string())));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_text(&state, &tx, r#"{"type":"auth","token":"T"}"#).await;
        match next_frame(&mut rx).await {
            ServerFrame::Status { status, .. } => assert_eq!(status, "authenticated"),
            other => panic!("expected status, got {other:?}"),
        }

        handle_text(&state, &tx, r#"{"type":"auth","token":"wrong"}"#).await;
        match next_frame(&mut rx).await {
            ServerFrame::Error { error, .. } => assert_eq!(error, "Authentication failed"),
            other => panic!("expected error, got {other:?}"),
        }

        // A failed auth does not gate a later ocr frame on the same
        // connection: it still gets processed.
        let text = format!(r#"{{"type":"ocr","image":"{}"}}"#, png_base64());
        handle_text(&state, &tx, &text).await;
        match next_frame(&mut rx).await {
            ServerFrame::Status { status, .. } => assert_eq!(status, "processing"),
            other => panic!("expected processing status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ocr_missing_image_field() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_text(&state, &tx, r#"{"type":"ocr"}"#).await;
        match next_frame(&mut rx).await {
            ServerFrame::Error { error, .. } => {
                assert_eq!(error, "Missing 'image' field in request")
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ocr_invalid_image_data() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_text(&state, &tx, r#"{"type":"ocr","image":"not-base64!!"}"#).await;
        match next_frame(&mut rx).await {
            ServerFrame::Error { error, .. } => assert_eq!(error, "Invalid image data"),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ocr_happy_path_emits_processing_progress_result() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Missing type defaults to ocr.
        let text = format!(r#"{{"image":"{}"}}"#, png_base64());
        handle_text(&state, &tx, &text).await;

        match next_frame(&mut rx).await {
            ServerFrame::Status { status, .. } => assert_eq!(status, "processing"),
            other => panic!("expected processing status, got {other:?}"),
        }
        match next_frame(&mut rx).await {
            ServerFrame::Progress { status, progress } => {
                assert_eq!(status, "recognizing");
                assert_eq!(progress, 50);
            }
            other => panic!("expected progress, got {other:?}"),
        }
        match next_frame(&mut rx).await {
            ServerFrame::Result { success, text, .. } => {
                assert!(success);
                assert_eq!(text, "probe text");
            }
            other => panic!("expected result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_type_names_the_type() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_text(&state, &tx, r#"{"type":"dance"}"#).await;
        match next_frame(&mut rx).await {
            ServerFrame::Error { error, .. } => {
                assert_eq!(error, "Unknown message type: dance")
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_an_error_frame() {
        let state = test_state(AuthGate::new(false, None));
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_text(&state, &tx, "{not json").await;
        match next_frame(&mut rx).await {
            ServerFrame::Error { error, .. } => {
                assert!(error.starts_with("Invalid message format:"))
            }
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_registry_counts_and_broadcast() {
        let registry = ConnectionRegistry::new();
        let (tx_a, mut rx_a) = mpsc::unbounded_channel();
        let (tx_b, mut rx_b) = mpsc::unbounded_channel();

        let (id_a, count) = registry.register(tx_a);
        assert_eq!(count, 1);
        let (_id_b, count) = registry.register(tx_b);
        assert_eq!(count, 2);

        // Closed connections are skipped without error.
        drop(rx_b);
        registry.broadcast("hello everyone");

        match next_frame(&mut rx_a).await {
            ServerFrame::Broadcast { message, .. } => assert_eq!(message, "hello everyone"),
            other => panic!("expected broadcast, got {other:?}"),
        }

        assert_eq!(registry.deregister(id_a), 1);
    }
}
