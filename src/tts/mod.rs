//! Text-to-speech through an external synthesizer command.
//!
//! The reply text is appended as the final argument to the configured
//! command line (`espeak` by default) and the call blocks until the
//! command exits, which for most synthesizers is when playback ends.

use crate::error::{AgentError, Result};
use crate::speech::SpeechSynthesizer;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Synthesizer that runs a command per utterance.
#[derive(Debug, Clone)]
pub struct CommandTts {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTts {
    /// Resolve the synthesizer program on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the command line is empty and
    /// [`AgentError::Tts`] if the program cannot be found.
    pub fn new(command: &[String]) -> Result<Self> {
        let (name, args) = command
            .split_first()
            .ok_or_else(|| AgentError::Config("speech.tts_command is empty".into()))?;
        let program = which::which(name)
            .map_err(|e| AgentError::Tts(format!("synthesizer '{name}' not found: {e}")))?;
        info!("TTS command: {} {}", program.display(), args.join(" "));
        Ok(Self {
            program,
            args: args.to_vec(),
        })
    }
}

impl SpeechSynthesizer for CommandTts {
    fn speak(&mut self, text: &str) -> Result<()> {
        debug!("synthesizing {} chars", text.len());
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| AgentError::Tts(format!("cannot run synthesizer: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(AgentError::Tts(format!(
                "synthesizer exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}
