//! The speech subsystem driving a real agent with scripted services.

use crate::helpers::{RecordingTts, ScriptedMic, ScriptedStt, fast_speech_config, hal_agent, wait_for};
use hal::SpeechSubsystem;
use hal::error::AgentError;
use hal::speech::UtteranceHandler;
use hal::speech::messages::Recognition;
use std::sync::Arc;

#[test]
fn spoken_utterances_are_answered_and_spoken_back() {
    let (agent, terminal) = hal_agent();
    let tts = RecordingTts::default();
    let spoken = Arc::clone(&tts.spoken);
    let handler: Arc<dyn UtteranceHandler> = agent.clone();

    let speech = SpeechSubsystem::start(
        &fast_speech_config(),
        agent.mailbox(),
        handler,
        Box::new(ScriptedMic::new(1)),
        Box::new(ScriptedStt::texts(&["Are you alive?"])),
        Box::new(tts),
    )
    .unwrap();

    assert!(wait_for(|| !spoken.lock().unwrap().is_empty()));
    speech.stop().unwrap();

    let lines = terminal.lines();
    assert_eq!(lines[0].text, "Are you alive?");
    assert_eq!(lines[1].text, "Hello! This is HAL.");
    assert_eq!(*spoken.lock().unwrap(), vec!["Hello! This is HAL.".to_owned()]);
}

#[test]
fn recognition_misses_and_failures_do_not_stop_listening() {
    let (agent, terminal) = hal_agent();
    let handler: Arc<dyn UtteranceHandler> = agent.clone();
    let stt = ScriptedStt::new(vec![
        Ok(Recognition::NotUnderstood),
        Err(AgentError::Stt("service unavailable".into())),
        Ok(Recognition::Text("You are disturbing".into())),
    ]);

    let mut speech = SpeechSubsystem::new();
    speech
        .spawn_input(
            &fast_speech_config(),
            Box::new(ScriptedMic::new(3)),
            Box::new(stt),
            handler,
        )
        .unwrap();

    assert!(wait_for(|| terminal.lines().len() >= 2));
    speech.stop().unwrap();

    let lines = terminal.lines();
    assert_eq!(lines[0].text, "You are disturbing");
    assert_eq!(lines[1].text, "Hello! This is HAL.");
}

#[test]
fn failed_synthesis_keeps_the_output_worker_alive() {
    let (agent, _terminal) = hal_agent();
    let tts = RecordingTts {
        fail: true,
        ..Default::default()
    };
    let spoken = Arc::clone(&tts.spoken);

    let mut speech = SpeechSubsystem::new();
    speech
        .spawn_output(&fast_speech_config(), agent.mailbox(), Box::new(tts))
        .unwrap();

    agent.on_input("first");
    assert!(wait_for(|| spoken.lock().unwrap().len() == 1));
    agent.on_input("second");
    assert!(wait_for(|| spoken.lock().unwrap().len() == 2));
    assert!(speech.is_running());
    speech.stop().unwrap();
}

#[test]
fn stop_joins_both_workers() {
    let (agent, _terminal) = hal_agent();
    let handler: Arc<dyn UtteranceHandler> = agent.clone();
    let mic = ScriptedMic::new(0);
    let opened = Arc::clone(&mic.opened);
    let closed = Arc::clone(&mic.closed);

    let speech = SpeechSubsystem::start(
        &fast_speech_config(),
        agent.mailbox(),
        handler,
        Box::new(mic),
        Box::new(ScriptedStt::new(vec![])),
        Box::new(RecordingTts::default()),
    )
    .unwrap();
    assert!(wait_for(|| *opened.lock().unwrap() >= 1));
    let token = speech.stop_token();

    speech.stop().unwrap();
    assert!(token.is_cancelled());
    assert_eq!(*opened.lock().unwrap(), *closed.lock().unwrap());
}

#[test]
fn second_worker_of_a_kind_is_rejected() {
    let (agent, _terminal) = hal_agent();
    let mut speech = SpeechSubsystem::new();
    speech
        .spawn_output(
            &fast_speech_config(),
            agent.mailbox(),
            Box::new(RecordingTts::default()),
        )
        .unwrap();
    let again = speech.spawn_output(
        &fast_speech_config(),
        agent.mailbox(),
        Box::new(RecordingTts::default()),
    );
    assert!(matches!(again, Err(AgentError::Speech(_))));
    speech.stop().unwrap();
}
