//! CLI binary for hal.

use clap::{Parser, Subcommand};
use hal::audio::capture::CpalMicrophone;
use hal::speech::UtteranceHandler;
use hal::stt::CommandStt;
use hal::tts::CommandTts;
use hal::{
    Agent, AgentConfig, Align, ConsoleTerminal, Responder, RuleTable, SpeechSubsystem, Terminal,
};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// How long to wait for the speech workers before exiting anyway.
const SPEECH_STOP_GRACE: Duration = Duration::from_secs(3);

/// HAL: a rule-based conversational agent you can talk to.
#[derive(Parser)]
#[command(name = "hal", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Disable speech input and output for this run.
    #[arg(long)]
    no_speech: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Chat with the agent (the default).
    Chat,

    /// List available audio input devices.
    Devices,

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the chat on stdout.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hal=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(config, cli.no_speech).await,
        Command::Devices => list_devices(),
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

/// Explicit path, else the per-user config file if present, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<AgentConfig> {
    if let Some(path) = path {
        return Ok(AgentConfig::from_file(path)?);
    }
    let default_path = AgentConfig::default_config_path();
    if default_path.is_file() {
        info!("loading config from {}", default_path.display());
        Ok(AgentConfig::from_file(&default_path)?)
    } else {
        Ok(AgentConfig::default())
    }
}

async fn run_chat(config: AgentConfig, no_speech: bool) -> anyhow::Result<()> {
    let table = match config.rules.path {
        Some(ref path) => RuleTable::from_file(path)?,
        None => RuleTable::hal(),
    };
    let responder = Responder::from_table(&table)?;

    let terminal: Arc<dyn Terminal> = Arc::new(ConsoleTerminal::new(config.display.width));
    let shutdown = CancellationToken::new();
    let agent = Arc::new(
        Agent::new(&config, responder, Arc::clone(&terminal)).with_shutdown(shutdown.clone()),
    );

    terminal.log(
        "Operator started the chat.",
        Align::Left,
        &config.display.hint_color,
    );
    terminal.log(
        &format!("{} joined.", config.persona.name),
        Align::Right,
        &config.display.hint_color,
    );

    let speech = if config.speech.enabled && !no_speech {
        match start_speech(&config, &agent) {
            Ok(speech) => Some(speech),
            Err(e) => {
                warn!("speech disabled: {e}");
                None
            }
        }
    } else {
        None
    };

    // Handle Ctrl+C
    let shutdown_clone = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            shutdown_clone.cancel();
        }
    });

    let mut lines = spawn_stdin_reader();
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.recv() => match line {
                Some(line) => dispatch(&agent, &line),
                None => break,
            },
        }
    }

    if let Some(speech) = speech {
        stop_speech(speech).await;
    }
    Ok(())
}

/// Route one typed line: `/` prefixes a command, anything else is chat.
fn dispatch(agent: &Agent, line: &str) {
    let line = line.trim_end();
    if line.trim().is_empty() {
        return;
    }
    match line.strip_prefix('/') {
        Some(command) => agent.on_command(command),
        None => agent.on_input(line),
    }
}

/// Read stdin on a plain thread; a pending read must not hold up exit.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("hal-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("cannot read stdin: {e}");
    }
    rx
}

fn start_speech(config: &AgentConfig, agent: &Arc<Agent>) -> hal::Result<SpeechSubsystem> {
    let tts = CommandTts::new(&config.speech.tts_command)?;
    let stt = CommandStt::new(&config.speech.stt_command)?;
    let microphone = CpalMicrophone::new(&config.speech);
    let handler: Arc<dyn UtteranceHandler> = agent.clone();
    SpeechSubsystem::start(
        &config.speech,
        agent.mailbox(),
        handler,
        Box::new(microphone),
        Box::new(stt),
        Box::new(tts),
    )
}

/// Stop the workers, giving up after [`SPEECH_STOP_GRACE`].
async fn stop_speech(speech: SpeechSubsystem) {
    let (done_tx, done_rx) = oneshot::channel();
    let spawned = std::thread::Builder::new()
        .name("hal-speech-stop".into())
        .spawn(move || {
            let _ = done_tx.send(speech.stop());
        });
    if let Err(e) = spawned {
        warn!("cannot stop speech workers: {e}");
        return;
    }
    match tokio::time::timeout(SPEECH_STOP_GRACE, done_rx).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!("{e}"),
        Ok(Err(_)) => warn!("speech stop thread exited without a result"),
        Err(_) => warn!(
            "speech workers still busy after {:?}, exiting anyway",
            SPEECH_STOP_GRACE
        ),
    }
}

fn list_devices() -> anyhow::Result<()> {
    let devices = CpalMicrophone::list_input_devices()?;
    if devices.is_empty() {
        println!("No input devices found.");
    } else {
        println!("Input devices:");
        for name in devices {
            println!("  {name}");
        }
    }
    Ok(())
}
