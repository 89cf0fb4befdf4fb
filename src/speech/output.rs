//! Speech output worker: speaks whatever the mailbox holds, once per tick.

use super::SpeechSynthesizer;
use crate::config::SpeechConfig;
use crate::mailbox::SpeechMailbox;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drains the [`SpeechMailbox`] into a [`SpeechSynthesizer`].
pub struct SpeechOutput {
    mailbox: Arc<SpeechMailbox>,
    tts: Box<dyn SpeechSynthesizer>,
    tick: Duration,
    stop: CancellationToken,
}

impl SpeechOutput {
    pub fn new(
        config: &SpeechConfig,
        mailbox: Arc<SpeechMailbox>,
        tts: Box<dyn SpeechSynthesizer>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            mailbox,
            tts,
            tick: Duration::from_millis(config.output_tick_ms),
            stop,
        }
    }

    /// Speak the pending utterance, if any.
    ///
    /// Synthesis failures are logged and the utterance is dropped.
    /// Returns `true` if something was taken from the mailbox.
    pub fn tick_once(&mut self) -> bool {
        let Some(text) = self.mailbox.drain() else {
            return false;
        };
        debug!("speaking: \"{text}\"");
        if let Err(e) = self.tts.speak(&text) {
            error!("speech synthesis failed: {e}");
        }
        true
    }

    /// Loop until the stop token is cancelled.
    pub fn run(mut self) {
        info!("speech output running (tick {:?})", self.tick);
        while !self.stop.is_cancelled() {
            std::thread::sleep(self.tick);
            if self.stop.is_cancelled() {
                break;
            }
            self.tick_once();
        }
        info!("speech output stopped");
    }
}
