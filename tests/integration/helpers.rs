//! Shared helpers for integration tests: an agent wired to an in-memory
//! terminal, and scripted doubles for the speech services.

use hal::error::{AgentError, Result};
use hal::speech::messages::{AudioChunk, Recognition, SpeechSegment};
use hal::speech::{Microphone, SpeechSynthesizer, SpeechToText};
use hal::{Agent, AgentConfig, MemoryTerminal, Responder};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Sample rate used by the scripted microphone.
pub(crate) const RATE: u32 = 1_000;

/// Build an agent with default persona and the built-in HAL rules.
/// Returns `(agent, terminal)`.
pub(crate) fn hal_agent() -> (Arc<Agent>, Arc<MemoryTerminal>) {
    let terminal = Arc::new(MemoryTerminal::new());
    let agent = Agent::new(
        &AgentConfig::default(),
        Responder::hal().expect("built-in rules"),
        terminal.clone(),
    );
    (Arc::new(agent), terminal)
}

/// Speech config tuned for 100-sample chunks at [`RATE`].
pub(crate) fn fast_speech_config() -> hal::config::SpeechConfig {
    hal::config::SpeechConfig {
        input_sample_rate: RATE,
        pause_ms: 300,
        min_speech_ms: 200,
        output_tick_ms: 5,
        listen_delay_ms: 0,
        ..Default::default()
    }
}

fn chunk(level: f32) -> AudioChunk {
    AudioChunk {
        samples: vec![level; 100],
        sample_rate: RATE,
        captured_at: Instant::now(),
    }
}

/// Chunks for one utterance: voiced audio followed by a closing pause.
pub(crate) fn utterance_chunks() -> Vec<AudioChunk> {
    let mut chunks: Vec<_> = (0..3).map(|_| chunk(0.2)).collect();
    chunks.extend((0..3).map(|_| chunk(0.001)));
    chunks
}

/// Microphone that plays `utterances` scripted utterances, then only silence.
pub(crate) struct ScriptedMic {
    chunks: VecDeque<AudioChunk>,
    pub(crate) opened: Arc<Mutex<usize>>,
    pub(crate) closed: Arc<Mutex<usize>>,
}

impl ScriptedMic {
    pub(crate) fn new(utterances: usize) -> Self {
        Self {
            chunks: (0..utterances).flat_map(|_| utterance_chunks()).collect(),
            opened: Arc::new(Mutex::new(0)),
            closed: Arc::new(Mutex::new(0)),
        }
    }
}

impl Microphone for ScriptedMic {
    fn open(&mut self) -> Result<()> {
        *self.opened.lock().unwrap() += 1;
        Ok(())
    }

    fn read_chunk(&mut self) -> Result<Option<AudioChunk>> {
        match self.chunks.pop_front() {
            Some(chunk) => Ok(Some(chunk)),
            None => {
                // A quiet room: nothing to hear, but keep the loop polling.
                std::thread::sleep(Duration::from_millis(2));
                Ok(Some(chunk(0.0)))
            }
        }
    }

    fn close(&mut self) {
        *self.closed.lock().unwrap() += 1;
    }
}

/// Recognizer that returns scripted outcomes in order, then `NotUnderstood`.
pub(crate) struct ScriptedStt {
    results: VecDeque<Result<Recognition>>,
}

impl ScriptedStt {
    pub(crate) fn new(results: Vec<Result<Recognition>>) -> Self {
        Self {
            results: results.into(),
        }
    }

    pub(crate) fn texts(texts: &[&str]) -> Self {
        Self::new(
            texts
                .iter()
                .map(|t| Ok(Recognition::Text((*t).to_owned())))
                .collect(),
        )
    }
}

impl SpeechToText for ScriptedStt {
    fn transcribe(&mut self, _segment: &SpeechSegment) -> Result<Recognition> {
        self.results
            .pop_front()
            .unwrap_or(Ok(Recognition::NotUnderstood))
    }
}

/// Synthesizer that records what it was asked to say.
#[derive(Clone, Default)]
pub(crate) struct RecordingTts {
    pub(crate) spoken: Arc<Mutex<Vec<String>>>,
    pub(crate) fail: bool,
}

impl SpeechSynthesizer for RecordingTts {
    fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_owned());
        if self.fail {
            Err(AgentError::Tts("audio device busy".into()))
        } else {
            Ok(())
        }
    }
}

/// Poll `cond` until it holds or five seconds pass.
pub(crate) fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}
