//! Configuration types for the agent, its display, and the speech subsystem.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Who the agent is and what it says outside the rule table.
    pub persona: PersonaConfig,
    /// Console rendering settings.
    pub display: DisplayConfig,
    /// Microphone, recognition and synthesis settings.
    pub speech: SpeechConfig,
    /// Where the response rule table comes from.
    pub rules: RulesConfig,
}

/// Agent persona: the fixed phrases that bypass the rule table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Display name used in the join banner.
    pub name: String,
    /// Reply to the very first utterance, whatever it says.
    pub greeting: String,
    /// Exact text that asks for the current location.
    pub location_probe: String,
    /// Location before any `relocate` command.
    pub initial_location: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "HAL9000".to_owned(),
            greeting: "Hello! This is HAL.".to_owned(),
            location_probe: "Where am I?".to_owned(),
            initial_location: "unknown".to_owned(),
        }
    }
}

/// Console display settings. Colors are `#RRGGBB` strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Line width used for center/right alignment.
    pub width: usize,
    /// Agent replies.
    pub agent_color: String,
    /// Operator utterances echoed from speech input.
    pub operator_color: String,
    /// Centered status lines (relocation, warnings).
    pub status_color: String,
    /// Errors such as unknown commands.
    pub error_color: String,
    /// Banner and hint lines.
    pub hint_color: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 80,
            agent_color: "#00805A".to_owned(),
            operator_color: "#1A6FB0".to_owned(),
            status_color: "#404040".to_owned(),
            error_color: "#FF3000".to_owned(),
            hint_color: "#808080".to_owned(),
        }
    }
}

/// Speech input/output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Whether the speech subsystem is started at all.
    pub enabled: bool,
    /// RMS energy threshold for speech detection, in 16-bit sample units.
    ///
    /// The endpointer uses it to segment audio into utterances:
    ///   - 300:  very sensitive, quiet room and a close microphone
    ///   - 1000: normal (default), clear speech into the microphone
    ///   - 4000: loud room
    pub energy_threshold: f32,
    /// Trailing silence in ms that ends an utterance.
    pub pause_ms: u32,
    /// Minimum utterance length in ms; shorter bursts are discarded.
    pub min_speech_ms: u32,
    /// Speech tick in ms: the interval between mailbox checks, and the
    /// back-off before the microphone is retried after a failed capture.
    pub output_tick_ms: u64,
    /// Pause in ms before the first capture, so the agent is fully wired.
    pub listen_delay_ms: u64,
    /// Input device name (None = system default).
    pub input_device: Option<String>,
    /// Sample rate in Hz handed to the recognizer.
    pub input_sample_rate: u32,
    /// Speech-to-text program and arguments. The WAV file path is appended.
    pub stt_command: Vec<String>,
    /// Text-to-speech program and arguments. The text to speak is appended.
    pub tts_command: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            energy_threshold: 1000.0,
            pause_ms: 800,
            min_speech_ms: 250,
            output_tick_ms: 1000,
            listen_delay_ms: 100,
            input_device: None,
            input_sample_rate: 16_000,
            stt_command: vec![
                "whisper-cli".to_owned(),
                "--no-timestamps".to_owned(),
                "--no-prints".to_owned(),
                "-f".to_owned(),
            ],
            tts_command: vec!["espeak".to_owned()],
        }
    }
}

/// Rule table source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// TOML rule table. When `None`, the built-in table is used.
    pub path: Option<PathBuf>,
}

impl AgentConfig {
    /// Load configuration from a TOML file, falling back to defaults for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::error::AgentError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = self.to_toml()?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Render the configuration as pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> crate::error::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::error::AgentError::Config(e.to_string()))
    }

    /// Returns the default config file path: `<config dir>/hal/config.toml`.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| std::env::temp_dir().join("hal-config"))
            .join("hal")
            .join("config.toml")
    }
}
