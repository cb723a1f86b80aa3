//! Single-flight gate over the shared recognizer.
//!
//! Both listeners call into one recognizer instance, and the instance is
//! not proven safe for concurrent invocation. The gate admits at most one
//! in-flight `recognize` at a time; additional callers queue on the flight
//! lock, bounded by an admission semaphore, and every call carries a
//! timeout so a wedged engine cannot pin a connection forever.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::sync::{Mutex, Semaphore};
use tracing::warn;

use textlens_models::{OcrLanguage, OcrResult};

use crate::error::{EngineError, EngineResult};
use crate::recognizer::TextRecognizer;

/// Admission and timeout policy for the gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Calls admitted at once (one running, the rest queued).
    pub max_pending: usize,
    /// Per-call deadline.
    pub timeout: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_pending: 8,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Serializing wrapper shared by the HTTP listener and the realtime hub.
pub struct RecognizerGate {
    inner: Arc<dyn TextRecognizer>,
    flight: Mutex<()>,
    admission: Semaphore,
    timeout: Duration,
}

impl RecognizerGate {
    pub fn new(inner: Arc<dyn TextRecognizer>, config: GateConfig) -> Self {
        Self {
            inner,
            flight: Mutex::new(()),
            admission: Semaphore::new(config.max_pending),
            timeout: config.timeout,
        }
    }

    /// Engine name reported by `GET /status`.
    pub fn engine_name(&self) -> &'static str {
        self.inner.name()
    }

    /// Run one recognition call through the gate.
    ///
    /// Fails fast with [`EngineError::Saturated`] when the queue is full,
    /// and with [`EngineError::Timeout`] when the engine misses the
    /// per-call deadline.
    pub async fn recognize(
        &self,
        image: &DynamicImage,
        language: OcrLanguage,
    ) -> EngineResult<OcrResult> {
        let _permit = self.admission.try_acquire().map_err(|_| {
            warn!("recognition queue saturated, rejecting request");
            EngineError::Saturated
        })?;

        let _flight = self.flight.lock().await;
        match tokio::time::timeout(self.timeout, self.inner.recognize(image, language)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "recognition timed out");
                Err(EngineError::Timeout)
            }
        }
    }
}
