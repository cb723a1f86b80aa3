//! OCR language selection.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Languages the recognition capability can be asked for.
///
/// Unknown codes fall back to [`OcrLanguage::Auto`] so a stale client
/// setting never breaks recognition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    #[default]
    Auto,
    #[serde(rename = "eng")]
    English,
    #[serde(rename = "rus")]
    Russian,
    Chinese,
    Devanagari,
    Japanese,
    Korean,
}

impl OcrLanguage {
    /// Wire code for this language.
    pub fn code(&self) -> &'static str {
        match self {
            OcrLanguage::Auto => "auto",
            OcrLanguage::English => "eng",
            OcrLanguage::Russian => "rus",
            OcrLanguage::Chinese => "chinese",
            OcrLanguage::Devanagari => "devanagari",
            OcrLanguage::Japanese => "japanese",
            OcrLanguage::Korean => "korean",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            OcrLanguage::Auto => "Auto Detect",
            OcrLanguage::English => "English",
            OcrLanguage::Russian => "Russian",
            OcrLanguage::Chinese => "Chinese",
            OcrLanguage::Devanagari => "Devanagari",
            OcrLanguage::Japanese => "Japanese",
            OcrLanguage::Korean => "Korean",
        }
    }

    /// Parse a code, falling back to `Auto` for anything unknown.
    pub fn from_code(code: &str) -> Self {
        match code {
            "eng" => OcrLanguage::English,
            "rus" => OcrLanguage::Russian,
            "chinese" => OcrLanguage::Chinese,
            "devanagari" => OcrLanguage::Devanagari,
            "japanese" => OcrLanguage::Japanese,
            "korean" => OcrLanguage::Korean,
            _ => OcrLanguage::Auto,
        }
    }
}

impl fmt::Display for OcrLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for OcrLanguage {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_code(s))
    }
}
