//! Concurrent speech input and output.
//!
//! Two dedicated threads keep every blocking call off the conversation loop:
//!
//! - **output**: once per tick, drains the [`SpeechMailbox`] and speaks the
//!   text through a [`SpeechSynthesizer`];
//! - **input**: captures an utterance from a [`Microphone`], transcribes it
//!   with a [`SpeechToText`] service and hands the text to an
//!   [`UtteranceHandler`] (the agent) on its own thread.
//!
//! Stopping is cooperative. Both threads poll a shared [`CancellationToken`]
//! once per loop iteration, so [`SpeechSubsystem::stop`] waits out whatever
//! capture, recognition or synthesis call is in flight.

pub mod input;
pub mod messages;
pub mod output;

use crate::config::SpeechConfig;
use crate::error::{AgentError, Result};
use crate::mailbox::SpeechMailbox;
use input::SpeechInput;
use messages::{AudioChunk, Recognition, SpeechSegment};
use output::SpeechOutput;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Audio source with explicit open/close so capture can be scoped.
pub trait Microphone: Send {
    /// Start capturing.
    fn open(&mut self) -> Result<()>;
    /// Block for the next chunk. `Ok(None)` means the source is exhausted.
    fn read_chunk(&mut self) -> Result<Option<AudioChunk>>;
    /// Stop capturing and release the device. Must be safe to call twice.
    fn close(&mut self);
}

/// Blocking speech-to-text service.
pub trait SpeechToText: Send {
    /// Transcribe one utterance.
    ///
    /// `Ok(Recognition::NotUnderstood)` is a normal outcome; `Err` means the
    /// service itself failed.
    fn transcribe(&mut self, segment: &SpeechSegment) -> Result<Recognition>;
}

/// Blocking text-to-speech service.
pub trait SpeechSynthesizer: Send {
    /// Speak `text`, returning once playback has finished.
    fn speak(&mut self, text: &str) -> Result<()>;
}

/// Receiver of recognized utterances, called from the speech input thread.
pub trait UtteranceHandler: Send + Sync {
    /// `text` is empty when the recognizer did not understand.
    fn on_message(&self, source: Option<&str>, text: &str);
}

/// Owner of the speech worker threads and their stop flag.
pub struct SpeechSubsystem {
    stop: CancellationToken,
    output: Option<JoinHandle<()>>,
    input: Option<JoinHandle<()>>,
}

impl SpeechSubsystem {
    /// A subsystem with no workers running yet.
    pub fn new() -> Self {
        Self {
            stop: CancellationToken::new(),
            output: None,
            input: None,
        }
    }

    /// Start both workers.
    ///
    /// # Errors
    ///
    /// Returns an error if a worker thread cannot be spawned. Any worker
    /// already started is stopped and joined before the error is returned.
    pub fn start(
        config: &SpeechConfig,
        mailbox: Arc<SpeechMailbox>,
        handler: Arc<dyn UtteranceHandler>,
        microphone: Box<dyn Microphone>,
        stt: Box<dyn SpeechToText>,
        tts: Box<dyn SpeechSynthesizer>,
    ) -> Result<Self> {
        let mut subsystem = Self::new();
        let started = subsystem
            .spawn_output(config, mailbox, tts)
            .and_then(|()| subsystem.spawn_input(config, microphone, stt, handler));
        match started {
            Ok(()) => Ok(subsystem),
            Err(e) => Err(subsystem.abandon(e)),
        }
    }

    /// Start the output worker.
    ///
    /// # Errors
    ///
    /// Returns an error if an output worker is already running or the thread
    /// cannot be spawned.
    pub fn spawn_output(
        &mut self,
        config: &SpeechConfig,
        mailbox: Arc<SpeechMailbox>,
        tts: Box<dyn SpeechSynthesizer>,
    ) -> Result<()> {
        if self.output.is_some() {
            return Err(AgentError::Speech("output worker already running".into()));
        }
        let worker = SpeechOutput::new(config, mailbox, tts, self.stop.clone());
        let handle = std::thread::Builder::new()
            .name("hal-speech-out".into())
            .spawn(move || worker.run())?;
        self.output = Some(handle);
        info!("speech output worker started");
        Ok(())
    }

    /// Start the input worker.
    ///
    /// # Errors
    ///
    /// Returns an error if an input worker is already running or the thread
    /// cannot be spawned.
    pub fn spawn_input(
        &mut self,
        config: &SpeechConfig,
        microphone: Box<dyn Microphone>,
        stt: Box<dyn SpeechToText>,
        handler: Arc<dyn UtteranceHandler>,
    ) -> Result<()> {
        if self.input.is_some() {
            return Err(AgentError::Speech("input worker already running".into()));
        }
        let worker = SpeechInput::new(config, microphone, stt, self.stop.clone());
        let delay = Duration::from_millis(config.listen_delay_ms);
        let handle = std::thread::Builder::new()
            .name("hal-speech-in".into())
            .spawn(move || worker.run(handler, delay))?;
        self.input = Some(handle);
        info!("speech input worker started");
        Ok(())
    }

    /// The shared stop flag.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Whether any worker thread is still running.
    pub fn is_running(&self) -> bool {
        [&self.output, &self.input]
            .into_iter()
            .flatten()
            .any(|h| !h.is_finished())
    }

    /// Stop and join whatever already started, then hand back `err`.
    fn abandon(self, err: AgentError) -> AgentError {
        if let Err(stop_err) = self.stop() {
            warn!("while abandoning speech startup: {stop_err}");
        }
        err
    }

    /// Signal both workers and wait for them to exit.
    ///
    /// Blocks until each worker reaches its next loop boundary, which may
    /// take as long as one in-flight capture, recognition or synthesis call.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Speech`] if a worker thread panicked.
    pub fn stop(mut self) -> Result<()> {
        self.stop.cancel();
        let mut panicked = Vec::new();
        for (name, handle) in [("output", self.output.take()), ("input", self.input.take())] {
            let Some(handle) = handle else { continue };
            if handle.join().is_err() {
                panicked.push(name);
            }
        }
        if panicked.is_empty() {
            info!("speech subsystem stopped");
            Ok(())
        } else {
            Err(AgentError::Speech(format!(
                "speech worker(s) panicked: {}",
                panicked.join(", ")
            )))
        }
    }
}

impl Default for SpeechSubsystem {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SpeechSubsystem {
    fn drop(&mut self) {
        if self.output.is_some() || self.input.is_some() {
            warn!("speech subsystem dropped without stop(); detaching workers");
            self.stop.cancel();
        }
    }
}
