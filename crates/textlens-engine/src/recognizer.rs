//! The recognition capability seam.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::DynamicImage;

use textlens_models::{BoundingBox, OcrLanguage, OcrResult, TextBlock, TextLine};

use crate::error::EngineResult;

/// The external text-recognition capability.
///
/// Implementations may be slow (hundreds of milliseconds) and are not
/// assumed safe for unsynchronized concurrent use; callers go through
/// [`crate::RecognizerGate`] rather than invoking an instance directly.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    /// Recognize text in a normalized image.
    async fn recognize(&self, image: &DynamicImage, language: OcrLanguage) -> EngineResult<OcrResult>;

    /// Engine name reported by `GET /status`.
    fn name(&self) -> &'static str;
}

/// Deterministic recognizer for local runs and tests.
///
/// Returns the configured text as a single full-image block, after an
/// optional artificial delay that stands in for real inference latency.
pub struct FixtureRecognizer {
    text: String,
    delay: Duration,
}

impl FixtureRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for FixtureRecognizer {
    fn default() -> Self {
        Self::new("textlens fixture output")
    }
}

#[async_trait]
impl TextRecognizer for FixtureRecognizer {
    async fn recognize(&self, image: &DynamicImage, language: OcrLanguage) -> EngineResult<OcrResult> {
        let start = Instant::now();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let bounding_box = Some(BoundingBox {
            left: 0,
            top: 0,
            right: image.width() as i32,
            bottom: image.height() as i32,
        });

        Ok(OcrResult {
            text: self.text.clone(),
            confidence: 0.99,
            language: language.code().to_string(),
            blocks: vec![TextBlock {
                text: self.text.clone(),
                bounding_box,
                lines: vec![TextLine {
                    text: self.text.clone(),
                    bounding_box,
                }],
            }],
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
