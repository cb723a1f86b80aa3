//! Recognition boundary for the textlens server.
//!
//! This crate owns everything between "decoded request payload" and
//! "recognition result":
//! - the [`TextRecognizer`] trait, the seam behind which the actual OCR
//!   capability lives
//! - [`RecognizerGate`], the single-flight/admission wrapper both
//!   listeners share
//! - the `imaging` module: decode, validate, bounded resize, JPEG re-encode

pub mod error;
pub mod gate;
pub mod imaging;
pub mod recognizer;

pub use error::EngineError;
pub use gate::{GateConfig, RecognizerGate};
pub use recognizer::{FixtureRecognizer, TextRecognizer};
