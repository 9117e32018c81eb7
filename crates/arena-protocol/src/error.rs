use thiserror::Error;

/// Errors produced while decoding or checking wire events.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed {event_type} event: {reason}")]
    MalformedEvent {
        event_type: &'static str,
        reason: String,
    },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}

impl ProtocolError {
    pub(crate) fn malformed(event_type: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedEvent {
            event_type,
            reason: reason.into(),
        }
    }
}
