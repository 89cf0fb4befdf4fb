//! Speech-to-text through an external recognizer command.
//!
//! Each utterance is written to a scratch 16-bit mono WAV file whose path
//! is appended to the configured command line (whisper.cpp's `whisper-cli`
//! by default). Whatever the command prints on stdout is the transcript.

use crate::error::{AgentError, Result};
use crate::speech::SpeechToText;
use crate::speech::messages::{Recognition, SpeechSegment};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

static SCRATCH_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Scratch WAV path, deleted when dropped whether or not the write finished.
struct ScratchWav(PathBuf);

impl ScratchWav {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ScratchWav {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.0) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("cannot remove {}: {e}", self.0.display()),
        }
    }
}

/// Recognizer that shells out once per utterance.
#[derive(Debug, Clone)]
pub struct CommandStt {
    program: PathBuf,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl CommandStt {
    /// Resolve the recognizer program on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the command line is empty and
    /// [`AgentError::Stt`] if the program cannot be found.
    pub fn new(command: &[String]) -> Result<Self> {
        let (name, args) = command
            .split_first()
            .ok_or_else(|| AgentError::Config("speech.stt_command is empty".into()))?;
        let program = which::which(name)
            .map_err(|e| AgentError::Stt(format!("recognizer '{name}' not found: {e}")))?;
        info!("STT command: {} {}", program.display(), args.join(" "));
        Ok(Self {
            program,
            args: args.to_vec(),
            scratch_dir: std::env::temp_dir(),
        })
    }

    /// Write scratch WAV files into `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    fn scratch_wav(&self) -> ScratchWav {
        let n = SCRATCH_COUNTER.fetch_add(1, Ordering::Relaxed);
        ScratchWav(
            self.scratch_dir
                .join(format!("hal-utterance-{}-{n}.wav", std::process::id())),
        )
    }
}

impl SpeechToText for CommandStt {
    fn transcribe(&mut self, segment: &SpeechSegment) -> Result<Recognition> {
        let started = Instant::now();
        let wav = self.scratch_wav();
        write_wav(wav.path(), &segment.samples, segment.sample_rate)?;

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(wav.path())
            .output()
            .map_err(|e| AgentError::Stt(format!("cannot run recognizer: {e}")))?;
        drop(wav);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Stt(format!(
                "recognizer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let recognition = parse_transcript(&String::from_utf8_lossy(&output.stdout));
        debug!(
            "STT took {:.0}ms for {:.2}s of audio",
            started.elapsed().as_secs_f64() * 1000.0,
            segment.duration_secs()
        );
        Ok(recognition)
    }
}

/// Turn recognizer stdout into a [`Recognition`].
///
/// Lines are joined with single spaces and bracketed markers such as
/// `[BLANK_AUDIO]` are dropped. Nothing left means nothing understood.
pub fn parse_transcript(stdout: &str) -> Recognition {
    let text = stdout
        .split_whitespace()
        .filter(|word| !(word.starts_with('[') && word.ends_with(']')))
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        Recognition::NotUnderstood
    } else {
        Recognition::Text(text)
    }
}

/// Write mono f32 samples as a 16-bit PCM WAV file.
fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| AgentError::Stt(format!("cannot create WAV: {e}")))?;

    for &s in samples {
        let sample_i16 = (s * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| AgentError::Stt(format!("WAV write error: {e}")))?;
    }
    writer
        .finalize()
        .map_err(|e| AgentError::Stt(format!("WAV finalize error: {e}")))?;

    Ok(())
}
