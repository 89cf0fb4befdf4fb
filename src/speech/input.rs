//! Speech input worker: microphone → endpointer → recognizer → handler.
//!
//! [`SpeechInput::utterances`] is a lazy, endless sequence of recognized
//! strings. An empty string marks an utterance the recognizer could not make
//! out, or a capture that failed. The sequence ends only when the stop token
//! is cancelled, and each call to `next` blocks for one full
//! capture-and-recognize round.

use super::messages::{Recognition, SpeechSegment};
use super::{Microphone, SpeechToText, UtteranceHandler};
use crate::config::SpeechConfig;
use crate::error::Result;
use crate::vad::EnergyEndpointer;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// An open microphone that is closed again when dropped.
struct OpenMicrophone<'a> {
    mic: &'a mut dyn Microphone,
}

impl<'a> OpenMicrophone<'a> {
    fn open(mic: &'a mut dyn Microphone) -> Result<Self> {
        mic.open()?;
        Ok(Self { mic })
    }
}

impl Drop for OpenMicrophone<'_> {
    fn drop(&mut self) {
        self.mic.close();
    }
}

/// Produces recognized utterances from a microphone.
pub struct SpeechInput {
    microphone: Box<dyn Microphone>,
    stt: Box<dyn SpeechToText>,
    endpointer: EnergyEndpointer,
    stop: CancellationToken,
    retry_backoff: Duration,
}

impl SpeechInput {
    pub fn new(
        config: &SpeechConfig,
        microphone: Box<dyn Microphone>,
        stt: Box<dyn SpeechToText>,
        stop: CancellationToken,
    ) -> Self {
        Self {
            microphone,
            stt,
            endpointer: EnergyEndpointer::new(config),
            stop,
            retry_backoff: Duration::from_millis(config.output_tick_ms),
        }
    }

    /// Pause after a failed or empty capture before listening again.
    ///
    /// Defaults to one speech tick (`output_tick_ms`).
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// The lazy utterance sequence.
    pub fn utterances(&mut self) -> Utterances<'_> {
        Utterances { input: self }
    }

    /// Wait `delay`, then deliver every utterance to `handler` until stopped.
    pub fn run(mut self, handler: Arc<dyn UtteranceHandler>, delay: Duration) {
        std::thread::sleep(delay);
        info!("speech input running");
        for text in self.utterances() {
            handler.on_message(None, &text);
        }
        info!("speech input stopped");
    }

    /// One capture-and-recognize round. Never fails; problems yield `""`.
    fn listen_once(&mut self) -> String {
        info!("listening to microphone...");
        let segment = match self.capture() {
            Ok(Some(segment)) => segment,
            Ok(None) => {
                if !self.stop.is_cancelled() {
                    debug!("microphone ended without an utterance");
                    std::thread::sleep(self.retry_backoff);
                }
                return String::new();
            }
            Err(e) => {
                warn!("audio capture failed: {e}");
                std::thread::sleep(self.retry_backoff);
                return String::new();
            }
        };

        info!("analysing {:.2}s of audio", segment.duration_secs());
        match self.stt.transcribe(&segment) {
            Ok(Recognition::Text(text)) => {
                debug!("recognized: \"{text}\"");
                text
            }
            Ok(Recognition::NotUnderstood) => {
                info!("could not understand");
                String::new()
            }
            Err(e) => {
                error!("speech recognition failed: {e}");
                String::new()
            }
        }
    }

    /// Read chunks until the endpointer closes an utterance.
    ///
    /// `Ok(None)` means the stop token fired or the source ran dry before an
    /// utterance long enough to keep.
    fn capture(&mut self) -> Result<Option<SpeechSegment>> {
        let mut mic = OpenMicrophone::open(self.microphone.as_mut())?;
        self.endpointer.reset();
        loop {
            if self.stop.is_cancelled() {
                return Ok(None);
            }
            match mic.mic.read_chunk()? {
                Some(chunk) => {
                    if let Some(segment) = self.endpointer.process_chunk(&chunk) {
                        return Ok(Some(segment));
                    }
                }
                None => return Ok(self.endpointer.finish()),
            }
        }
    }
}

/// Iterator over recognized utterances; see [`SpeechInput::utterances`].
pub struct Utterances<'a> {
    input: &'a mut SpeechInput,
}

impl Iterator for Utterances<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.input.stop.is_cancelled() {
            return None;
        }
        let text = self.input.listen_once();
        if text.is_empty() && self.input.stop.is_cancelled() {
            return None;
        }
        Some(text)
    }
}
