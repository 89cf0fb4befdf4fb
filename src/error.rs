//! Error types for the hal agent.

/// Top-level error type for the agent and its speech subsystem.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Audio device or stream error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text service error.
    #[error("STT error: {0}")]
    Stt(String),

    /// Text-to-speech service error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Rule table is malformed (bad pattern, missing catch-all, ...).
    #[error("rule table error: {0}")]
    Rules(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Speech worker lifecycle error (spawn failure, worker panic).
    #[error("speech worker error: {0}")]
    Speech(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AgentError>;
