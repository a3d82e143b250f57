use serde::{Deserialize, Serialize};

/// How a stream ended, as reported by its terminal event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTerminal {
    Completed,
    Failed,
    TierLimited,
}

impl StreamTerminal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::TierLimited => "tier_limited",
        }
    }
}

/// Inbound event decoded from one text frame.
///
/// Exactly one tag per frame. Serialization produces the canonical wire shape
/// and is what scripted servers and mocks emit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial assistant text; boundaries carry no meaning.
    Chunk { data: String },
    /// Stream finished; `id` is the conversation identifier for follow-ups.
    Complete {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    /// Terminal failure rendered inline as content.
    Error { message: String },
    /// Upload progress.
    Update { completed: u64, total: u64 },
    /// Server-side quota exhausted.
    FreeTierLimit,
}

impl StreamEvent {
    pub fn chunk(data: impl Into<String>) -> Self {
        Self::Chunk { data: data.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chunk { .. } => "chunk",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
            Self::Update { .. } => "update",
            Self::FreeTierLimit => "free_tier_limit",
        }
    }

    /// Terminal state carried by this event, if it ends the stream.
    pub fn terminal(&self) -> Option<StreamTerminal> {
        match self {
            Self::Complete { .. } => Some(StreamTerminal::Completed),
            Self::Error { .. } => Some(StreamTerminal::Failed),
            Self::FreeTierLimit => Some(StreamTerminal::TierLimited),
            Self::Chunk { .. } | Self::Update { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal().is_some()
    }
}
