//! Message types passed between the microphone, endpointer and recognizer.

use std::time::Instant;

/// A chunk of raw audio samples from the microphone.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono f32 samples in \[-1, 1\] at the configured input sample rate.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Timestamp when this chunk was captured.
    pub captured_at: Instant,
}

/// A complete utterance detected by the endpointer, ready for recognition.
#[derive(Debug, Clone)]
pub struct SpeechSegment {
    /// Concatenated audio samples for the entire utterance.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// When the utterance started.
    pub started_at: Instant,
}

impl SpeechSegment {
    /// Segment length in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Outcome of a speech-to-text call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The transcribed text.
    Text(String),
    /// The service could not make out any words.
    NotUnderstood,
}
