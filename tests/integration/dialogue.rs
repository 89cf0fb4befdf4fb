//! End-to-end conversations through the agent's public handlers.

use crate::helpers::hal_agent;
use hal::{Align, CommandState};

#[test]
fn first_utterance_gets_greeting_then_rules_answer() {
    let (agent, terminal) = hal_agent();

    agent.on_input("You are scary");
    agent.on_input("You are scary");

    let lines = terminal.take();
    assert_eq!(lines[0].text, "Hello! This is HAL.");
    assert_eq!(lines[0].align, Align::Right);
    assert!(
        ["Yes, I am scary.", "Oh, sooo scary."].contains(&lines[1].text.as_str()),
        "got {:?}",
        lines[1].text
    );
}

#[test]
fn relocate_then_probe_reports_new_location() {
    let (agent, terminal) = hal_agent();
    agent.on_input("hi");
    agent.on_command("relocate lab");
    terminal.take();

    agent.on_input("Where am I?");

    let lines = terminal.take();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].text, "You are in the lab.");
    assert_eq!(
        agent.mailbox().drain().as_deref(),
        Some("You are in the lab.")
    );
}

#[test]
fn push_confirmation_dialogue_can_be_declined_and_retried() {
    let (agent, terminal) = hal_agent();

    agent.on_command("push button");
    assert_eq!(
        agent.command_state(),
        CommandState::AwaitingPushConfirmation {
            target: "button".into()
        }
    );
    agent.on_command("no");
    assert_eq!(agent.command_state(), CommandState::Idle);
    assert!(!agent.shutdown_token().is_cancelled());

    agent.on_command("push button");
    agent.on_command("yes");
    assert!(agent.shutdown_token().is_cancelled());

    let texts: Vec<_> = terminal.take().into_iter().map(|l| l.text).collect();
    assert!(texts.contains(&"Understood. I will not push the button.".to_owned()));
}

#[test]
fn confirmation_outside_a_push_is_unknown() {
    let (agent, terminal) = hal_agent();
    agent.on_command("yes");

    let lines = terminal.take();
    assert_eq!(lines[0].text, "Command `yes` unknown.");
    assert_eq!(lines[1].text, "I'm afraid I can't do that.");
    assert!(!agent.shutdown_token().is_cancelled());
}

#[test]
fn quit_requests_shutdown_even_mid_confirmation() {
    let (agent, _terminal) = hal_agent();
    agent.on_command("push button");
    agent.on_command("quit");
    assert!(agent.shutdown_token().is_cancelled());
}

#[test]
fn empty_speech_is_ignored_without_spending_the_greeting() {
    let (agent, terminal) = hal_agent();
    agent.on_message(None, "");
    assert!(terminal.lines().is_empty());
    assert!(agent.is_greeting_pending());
    assert!(agent.mailbox().is_empty());
}

#[test]
fn typed_and_spoken_input_share_one_session() {
    let (agent, terminal) = hal_agent();
    let spoken = {
        let agent = agent.clone();
        std::thread::spawn(move || {
            for _ in 0..50 {
                agent.on_message(None, "Are you alive?");
            }
        })
    };
    for _ in 0..50 {
        agent.on_input("Are you alive?");
    }
    spoken.join().unwrap();

    assert!(!agent.is_greeting_pending());
    let lines = terminal.lines();
    // 50 spoken echoes plus 100 answers.
    assert_eq!(lines.len(), 150);
    let greetings = lines
        .iter()
        .filter(|l| l.text == "Hello! This is HAL.")
        .count();
    assert_eq!(greetings, 1);
    let echoes = lines
        .iter()
        .filter(|l| l.align == Align::Left && l.text == "Are you alive?")
        .count();
    assert_eq!(echoes, 50);
}
