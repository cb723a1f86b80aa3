//! Recognition result types.
//!
//! Coordinates are pixel positions in the normalized (post-resize) image.
//! A missing bounding box means the recognizer did not report one; it must
//! serialize as absent, never as zeros.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// A single recognized line of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextLine {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// A recognized block of text, made of ordered lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    pub lines: Vec<TextLine>,
}

/// Block as it appears on the wire: text plus optional box, no lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

impl From<&TextBlock> for BlockSummary {
    fn from(block: &TextBlock) -> Self {
        Self {
            text: block.text.clone(),
            bounding_box: block.bounding_box,
        }
    }
}

/// Full result of one recognition call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OcrResult {
    pub text: String,
    /// Average confidence in `[0, 1]`.
    pub confidence: f32,
    /// Detected (or requested) language code.
    pub language: String,
    pub blocks: Vec<TextBlock>,
    pub processing_time_ms: u64,
}

impl OcrResult {
    /// Result for an image in which no text was found.
    pub fn empty(processing_time_ms: u64) -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            language: "unknown".to_string(),
            blocks: Vec::new(),
            processing_time_ms,
        }
    }

    /// Wire representation of the blocks (text + optional box).
    pub fn block_summaries(&self) -> Vec<BlockSummary> {
        self.blocks.iter().map(BlockSummary::from).collect()
    }
}
