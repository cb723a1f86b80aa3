//! Shared data models for the textlens OCR server.
//!
//! This crate provides Serde-serializable types for:
//! - Recognition results (text blocks, lines, bounding boxes)
//! - OCR language selection
//! - Request log entries
//! - WebSocket frame schemas

pub mod frames;
pub mod language;
pub mod ocr;
pub mod request_log;

// Re-export common types
pub use frames::{ClientFrame, ServerFrame};
pub use language::OcrLanguage;
pub use ocr::{BlockSummary, BoundingBox, OcrResult, TextBlock, TextLine};
pub use request_log::RequestLogEntry;
