//! Engine error types.

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("engine initialization failed: {0}")]
    Init(String),

    #[error("recognition failed: {0}")]
    Recognition(String),

    #[error("recognition queue is full")]
    Saturated,

    #[error("recognition timed out")]
    Timeout,
}

impl EngineError {
    pub fn invalid_image(msg: impl Into<String>) -> Self {
        Self::InvalidImage(msg.into())
    }

    pub fn recognition(msg: impl Into<String>) -> Self {
        Self::Recognition(msg.into())
    }
}
