//! The conversational agent: session state, reply routing and commands.
//!
//! Typed input arrives through [`Agent::on_input`], recognized speech through
//! [`Agent::on_message`] (from the speech input thread), and `/` commands
//! through [`Agent::on_command`]. All three run under one dispatch lock so a
//! typed and a spoken utterance can never interleave their session updates.
//!
//! Every reply is shown right-aligned and written to the [`SpeechMailbox`],
//! replacing whatever the output worker has not spoken yet.

use crate::command::{Command, parse_command};
use crate::config::{AgentConfig, DisplayConfig, PersonaConfig};
use crate::mailbox::SpeechMailbox;
use crate::responder::Responder;
use crate::speech::UtteranceHandler;
use crate::terminal::{Align, Terminal};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Where the command sub-dialogue stands.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CommandState {
    /// No confirmation pending.
    #[default]
    Idle,
    /// A `push` was requested and waits for `yes` or `no`.
    AwaitingPushConfirmation {
        /// What the operator asked to push.
        target: String,
    },
}

/// Mutable per-agent state, guarded by the dispatch lock.
#[derive(Debug)]
struct AgentSession {
    location: String,
    /// One-shot latch: the first utterance gets the greeting.
    greeting_pending: bool,
    state: CommandState,
}

/// Rule-driven conversational agent.
pub struct Agent {
    persona: PersonaConfig,
    display: DisplayConfig,
    responder: Responder,
    terminal: Arc<dyn Terminal>,
    mailbox: Arc<SpeechMailbox>,
    shutdown: CancellationToken,
    session: Mutex<AgentSession>,
}

impl Agent {
    /// Create an agent with its own mailbox and shutdown token.
    pub fn new(config: &AgentConfig, responder: Responder, terminal: Arc<dyn Terminal>) -> Self {
        Self {
            persona: config.persona.clone(),
            display: config.display.clone(),
            responder,
            terminal,
            mailbox: Arc::new(SpeechMailbox::new()),
            shutdown: CancellationToken::new(),
            session: Mutex::new(AgentSession {
                location: config.persona.initial_location.clone(),
                greeting_pending: true,
                state: CommandState::Idle,
            }),
        }
    }

    /// Share an existing mailbox (e.g. one already handed to a speech worker).
    pub fn with_mailbox(mut self, mailbox: Arc<SpeechMailbox>) -> Self {
        self.mailbox = mailbox;
        self
    }

    /// Cancel `token` instead of an internal one when shutdown is requested.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Typed operator input.
    pub fn on_input(&self, text: &str) {
        let mut session = self.lock_session();
        let answer = self.answer(&mut session, text);
        self.reply(&answer);
    }

    /// Recognized speech. Empty text means the recognizer did not understand.
    pub fn on_message(&self, source: Option<&str>, text: &str) {
        if text.is_empty() {
            debug!("ignoring empty utterance");
            return;
        }
        let mut session = self.lock_session();
        debug!(source = source.unwrap_or("microphone"), "heard: \"{text}\"");
        self.terminal
            .log(text, Align::Left, &self.display.operator_color);
        let answer = self.answer(&mut session, text);
        self.reply(&answer);
    }

    /// Operator command (leading `/` already stripped).
    pub fn on_command(&self, text: &str) {
        let mut session = self.lock_session();
        let command = parse_command(text);
        info!("command: {command:?}");

        match (command, session.state.clone()) {
            (Command::Quit, _) => self.request_shutdown("quit command"),

            (Command::Relocate { location }, CommandState::Idle) => {
                self.status("");
                self.status(&format!("\u{2014} Now in the {location}. \u{2014}"));
                session.location = location;
            }

            (Command::Push { target }, CommandState::Idle) => {
                self.terminal.log(
                    "\u{2014} WARNING \u{2014}",
                    Align::Center,
                    &self.display.error_color,
                );
                self.terminal.log(
                    &format!("Operator requested: push the {target}."),
                    Align::Left,
                    &self.display.error_color,
                );
                self.say(&format!("Pushing the {target} cannot be undone."));
                self.say("Are you sure? Answer /yes or /no.");
                session.state = CommandState::AwaitingPushConfirmation { target };
            }

            (Command::Confirm, CommandState::AwaitingPushConfirmation { target }) => {
                warn!("push of the {target} confirmed");
                self.request_shutdown("push confirmed");
            }

            (Command::Decline, CommandState::AwaitingPushConfirmation { target }) => {
                self.say(&format!("Understood. I will not push the {target}."));
                session.state = CommandState::Idle;
            }

            _ => {
                self.terminal.log(
                    &format!("Command `{text}` unknown."),
                    Align::Left,
                    &self.display.error_color,
                );
                self.say("I'm afraid I can't do that.");
            }
        }
    }

    /// Current location.
    pub fn location(&self) -> String {
        self.lock_session().location.clone()
    }

    /// Current command sub-dialogue state.
    pub fn command_state(&self) -> CommandState {
        self.lock_session().state.clone()
    }

    /// Whether the next utterance will get the greeting.
    pub fn is_greeting_pending(&self) -> bool {
        self.lock_session().greeting_pending
    }

    /// Token cancelled when the agent requests process shutdown.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Mailbox the agent writes replies into.
    pub fn mailbox(&self) -> Arc<SpeechMailbox> {
        Arc::clone(&self.mailbox)
    }

    fn answer(&self, session: &mut AgentSession, text: &str) -> String {
        if session.greeting_pending {
            session.greeting_pending = false;
            return self.persona.greeting.clone();
        }
        if text == self.persona.location_probe {
            return format!("You are in the {}.", session.location);
        }
        self.responder.respond(text)
    }

    /// Show a reply and queue it for speech.
    fn reply(&self, answer: &str) {
        self.say(answer);
        self.mailbox.write(answer);
    }

    fn say(&self, text: &str) {
        self.terminal
            .log(text, Align::Right, &self.display.agent_color);
    }

    fn status(&self, text: &str) {
        self.terminal
            .log(text, Align::Center, &self.display.status_color);
    }

    fn request_shutdown(&self, reason: &str) {
        info!("shutdown requested: {reason}");
        self.shutdown.cancel();
    }

    fn lock_session(&self) -> MutexGuard<'_, AgentSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl UtteranceHandler for Agent {
    fn on_message(&self, source: Option<&str>, text: &str) {
        Agent::on_message(self, source, text);
    }
}
