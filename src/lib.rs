//! HAL: a rule-based conversational agent with spoken input and output.
//!
//! Typed or spoken utterances are answered by an ordered table of pattern
//! rules, while a few `/` commands drive a small session state machine:
//! Microphone → Endpointer → STT → Agent → Mailbox → TTS
//!
//! # Architecture
//!
//! - **Responder**: ordered regex rules with `%n` capture substitution and
//!   word reflection, always ending in a catch-all rule
//! - **Agent**: greeting latch, location, and the push confirmation dialogue
//! - **Mailbox**: one-slot, last-write-wins handoff of the next reply to speak
//! - **Speech**: an input thread (capture via `cpal`, energy endpointing,
//!   external recognizer) and an output thread (external synthesizer)

pub mod agent;
pub mod audio;
pub mod command;
pub mod config;
pub mod error;
pub mod mailbox;
pub mod reflection;
pub mod responder;
pub mod rules;
pub mod speech;
pub mod stt;
pub mod terminal;
pub mod tts;
pub mod vad;

pub use agent::{Agent, CommandState};
pub use command::{Command, parse_command};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use mailbox::SpeechMailbox;
pub use reflection::ReflectionMap;
pub use responder::Responder;
pub use rules::{ResponseRule, RuleTable};
pub use speech::SpeechSubsystem;
pub use terminal::{Align, ConsoleTerminal, MemoryTerminal, Terminal};
