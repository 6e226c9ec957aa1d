//! Error types for voice autosuggest sessions.

/// Error type for all voice autosuggest operations.
///
/// Every failure is terminal for the session it occurs in and is reported
/// exactly once, either as a `Result` from a client method or as a
/// [`VoiceEvent::Failed`](crate::VoiceEvent::Failed) on the event channel.
/// The client never retries internally.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceError {
    /// The WebSocket handshake or initial connect failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// `open()` was called while a session is still live.
    #[error("session already active")]
    SessionActive,
    /// `send()` was called outside of an active session.
    #[error("not connected")]
    NotConnected,
    /// The client configuration is unusable (e.g. missing API key).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Transport-level failure after the connection was established.
    #[error("network error: {0}")]
    Network(String),
    /// The remote reported an error envelope (`code` + `message`).
    #[error("voice api error ({code}): {message}")]
    Api { code: String, message: String },
    /// The remote closed the connection with a non-normal close code.
    #[error("remote closed connection ({code}): {reason}")]
    RemoteClosed { code: u16, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VoiceError::Api {
            code: "BadKey".to_string(),
            message: "BadKey".to_string(),
        };
        assert_eq!(err.to_string(), "voice api error (BadKey): BadKey");

        let err = VoiceError::RemoteClosed {
            code: 1011,
            reason: "backend gone".to_string(),
        };
        assert!(err.to_string().contains("1011"));
        assert!(err.to_string().contains("backend gone"));
    }
}
