//! Utterance endpointing using energy-based analysis.
//!
//! Uses RMS energy thresholding to decide where an utterance starts and
//! where it ends. The threshold is expressed in 16-bit sample units so it
//! lines up with how microphone levels are usually quoted.

use crate::config::SpeechConfig;
use crate::speech::messages::{AudioChunk, SpeechSegment};
use std::time::Instant;
use tracing::{debug, info};

/// Full-scale amplitude of a 16-bit sample.
const I16_SCALE: f32 = 32_768.0;

/// Utterance boundary detector using RMS energy thresholding.
#[derive(Debug)]
pub struct EnergyEndpointer {
    /// Accumulated samples for the current utterance.
    speech_buffer: Vec<f32>,
    /// Whether we are currently inside an utterance.
    in_speech: bool,
    /// Consecutive trailing silence, in samples.
    silence_samples: usize,
    /// Trailing silence that ends an utterance, in samples.
    pause_samples: usize,
    /// When the current utterance started.
    speech_start: Option<Instant>,
    /// Configured sample rate.
    sample_rate: u32,
    /// Energy threshold in 16-bit units.
    threshold: f32,
    /// Minimum voiced length in samples.
    min_speech_samples: usize,
}

impl EnergyEndpointer {
    /// Create a new endpointer from the speech configuration.
    pub fn new(config: &SpeechConfig) -> Self {
        let sample_rate = config.input_sample_rate;
        let pause_samples = ms_to_samples(sample_rate, config.pause_ms);
        let min_speech_samples = ms_to_samples(sample_rate, config.min_speech_ms);

        info!(
            "endpointer initialized: threshold={}, pause={}ms, min_speech={}ms",
            config.energy_threshold, config.pause_ms, config.min_speech_ms
        );

        Self {
            speech_buffer: Vec::new(),
            in_speech: false,
            silence_samples: 0,
            pause_samples,
            speech_start: None,
            sample_rate,
            threshold: config.energy_threshold,
            min_speech_samples,
        }
    }

    /// Process an audio chunk and return a segment once an utterance has ended.
    pub fn process_chunk(&mut self, chunk: &AudioChunk) -> Option<SpeechSegment> {
        let energy = compute_rms_energy(&chunk.samples) * I16_SCALE;
        let is_speech = energy > self.threshold;

        if is_speech {
            if !self.in_speech {
                self.in_speech = true;
                self.speech_start = Some(chunk.captured_at);
                self.speech_buffer.clear();
            }
            self.silence_samples = 0;
            self.speech_buffer.extend_from_slice(&chunk.samples);
        } else if self.in_speech {
            self.silence_samples += chunk.samples.len();
            // Keep the pause inside the segment; recognizers like the tail.
            self.speech_buffer.extend_from_slice(&chunk.samples);

            if self.silence_samples >= self.pause_samples {
                return self.close_segment();
            }
        }

        None
    }

    /// Flush an utterance still in progress (e.g. the audio stream ended).
    pub fn finish(&mut self) -> Option<SpeechSegment> {
        if self.in_speech {
            self.close_segment()
        } else {
            None
        }
    }

    /// Whether an utterance is currently being accumulated.
    pub fn in_speech(&self) -> bool {
        self.in_speech
    }

    /// Reset the endpointer state.
    pub fn reset(&mut self) {
        self.speech_buffer.clear();
        self.in_speech = false;
        self.silence_samples = 0;
        self.speech_start = None;
    }

    fn close_segment(&mut self) -> Option<SpeechSegment> {
        let voiced = self.speech_buffer.len().saturating_sub(self.silence_samples);
        let started_at = self.speech_start.unwrap_or_else(Instant::now);
        let samples = std::mem::take(&mut self.speech_buffer);
        self.reset();

        if voiced < self.min_speech_samples {
            debug!("discarding {voiced}-sample burst below minimum utterance length");
            return None;
        }
        Some(SpeechSegment {
            samples,
            sample_rate: self.sample_rate,
            started_at,
        })
    }
}

fn ms_to_samples(sample_rate: u32, ms: u32) -> usize {
    (sample_rate as usize * ms as usize) / 1000
}

/// Compute RMS energy of audio samples.
fn compute_rms_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    /// 100 ms chunks at 1 kHz keep the arithmetic readable.
    fn config() -> SpeechConfig {
        SpeechConfig {
            input_sample_rate: 1_000,
            energy_threshold: 1000.0,
            pause_ms: 300,
            min_speech_ms: 200,
            ..SpeechConfig::default()
        }
    }

    fn chunk(level: f32) -> AudioChunk {
        AudioChunk {
            samples: vec![level; 100],
            sample_rate: 1_000,
            captured_at: Instant::now(),
        }
    }

    const LOUD: f32 = 0.2; // ~6500 in 16-bit units
    const QUIET: f32 = 0.001; // ~33

    #[test]
    fn silence_never_produces_a_segment() {
        let mut ep = EnergyEndpointer::new(&config());
        for _ in 0..50 {
            assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        }
        assert!(!ep.in_speech());
        assert!(ep.finish().is_none());
    }

    #[test]
    fn utterance_ends_after_pause() {
        let mut ep = EnergyEndpointer::new(&config());
        for _ in 0..3 {
            assert!(ep.process_chunk(&chunk(LOUD)).is_none());
        }
        assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        let segment = ep.process_chunk(&chunk(QUIET)).expect("segment after 300ms pause");
        assert_eq!(segment.samples.len(), 600);
        assert_eq!(segment.sample_rate, 1_000);
        assert!(!ep.in_speech());
    }

    #[test]
    fn speech_resets_the_pause_counter() {
        let mut ep = EnergyEndpointer::new(&config());
        ep.process_chunk(&chunk(LOUD));
        ep.process_chunk(&chunk(LOUD));
        ep.process_chunk(&chunk(QUIET));
        ep.process_chunk(&chunk(QUIET));
        assert!(ep.process_chunk(&chunk(LOUD)).is_none());
        assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        assert!(ep.process_chunk(&chunk(QUIET)).is_some());
    }

    #[test]
    fn short_bursts_are_discarded() {
        let mut ep = EnergyEndpointer::new(&config());
        ep.process_chunk(&chunk(LOUD));
        for _ in 0..3 {
            assert!(ep.process_chunk(&chunk(QUIET)).is_none());
        }
        assert!(!ep.in_speech());
    }

    #[test]
    fn threshold_is_in_sixteen_bit_units() {
        let mut ep = EnergyEndpointer::new(&SpeechConfig {
            energy_threshold: 4000.0,
            ..config()
        });
        // 0.1 full scale is ~3277, below a loud-room threshold.
        ep.process_chunk(&chunk(0.1));
        assert!(!ep.in_speech());
        ep.process_chunk(&chunk(LOUD));
        assert!(ep.in_speech());
    }

    #[test]
    fn finish_flushes_utterance_in_progress() {
        let mut ep = EnergyEndpointer::new(&config());
        ep.process_chunk(&chunk(LOUD));
        ep.process_chunk(&chunk(LOUD));
        let segment = ep.finish().expect("flushed segment");
        assert_eq!(segment.samples.len(), 200);
        assert!(ep.finish().is_none());
    }

    #[test]
    fn rms_of_empty_is_zero() {
        assert_eq!(compute_rms_energy(&[]), 0.0);
    }
}
