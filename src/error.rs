use std::fmt;

use thiserror::Error;

/// Coarse classification of a failed webhook invocation, used in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Parse,
    Transport,
    Decode,
    Backend,
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::Parse => write!(f, "parse"),
            FaultKind::Transport => write!(f, "transport"),
            FaultKind::Decode => write!(f, "decode"),
            FaultKind::Backend => write!(f, "backend"),
        }
    }
}

/// Everything that can go wrong while turning one update into one reply.
#[derive(Debug, Error)]
pub enum BotError {
    /// The payload is not a usable Telegram update.
    #[error("invalid update: {0}")]
    Parse(String),

    /// A request to Telegram or Gemini failed at the network level.
    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Downloaded bytes are not an image we can read.
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    /// Gemini answered, but with an error or without usable text.
    #[error("generation failed: {0}")]
    Backend(String),
}

impl BotError {
    pub fn transport(
        service: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        BotError::Transport {
            service,
            source: source.into(),
        }
    }

    pub fn kind(&self) -> FaultKind {
        match self {
            BotError::Parse(_) => FaultKind::Parse,
            BotError::Transport { .. } => FaultKind::Transport,
            BotError::Decode(_) => FaultKind::Decode,
            BotError::Backend(_) => FaultKind::Backend,
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Parse(err.to_string())
    }
}
