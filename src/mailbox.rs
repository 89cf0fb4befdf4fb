//! One-slot, last-write-wins handoff of the next utterance to speak.
//!
//! The agent writes every reply here; the speech output worker drains it once
//! per tick. A reply that has not been spoken by the time the next one arrives
//! is replaced, so speech never lags behind the conversation.

use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Single-slot overwrite channel shared between the agent and the output worker.
#[derive(Debug, Default)]
pub struct SpeechMailbox {
    pending: Mutex<Option<String>>,
}

impl SpeechMailbox {
    /// Create an empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `text`, replacing any unread utterance.
    ///
    /// Never blocks on the consumer. Returns `true` if an unspoken utterance
    /// was overwritten.
    pub fn write(&self, text: impl Into<String>) -> bool {
        let replaced = self.slot().replace(text.into());
        if let Some(ref dropped) = replaced {
            debug!("speech mailbox overwrote unspoken utterance: \"{dropped}\"");
        }
        replaced.is_some()
    }

    /// Take the pending utterance, leaving the mailbox empty.
    pub fn drain(&self) -> Option<String> {
        self.slot().take()
    }

    /// Whether nothing is waiting to be spoken.
    pub fn is_empty(&self) -> bool {
        self.slot().is_none()
    }

    fn slot(&self) -> MutexGuard<'_, Option<String>> {
        // The slot holds plain data; a panicked writer cannot leave it half-updated.
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}
