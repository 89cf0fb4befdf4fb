//! Loading rule tables from TOML files.

use hal::{AgentError, Responder, RuleTable};

#[test]
fn rule_file_replaces_built_in_rules() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(
        &path,
        r#"
[[rules]]
patterns = ['I feel (\w+)']
templates = ["Why do you feel %1?"]

[[rules]]
patterns = [""]
templates = ["Go on."]

[reflections]
my = "your"
"#,
    )
    .unwrap();

    let table = RuleTable::from_file(&path).unwrap();
    let responder = Responder::from_table(&table).unwrap();
    assert_eq!(responder.respond("I feel tired"), "Why do you feel tired?");
    assert_eq!(responder.respond("The pod bay doors"), "Go on.");
}

#[test]
fn rule_file_without_catch_all_is_rejected() {
    let table = RuleTable::from_toml(
        r#"
[[rules]]
patterns = ["hello"]
templates = ["Hi."]
"#,
    )
    .unwrap();
    assert!(matches!(
        Responder::from_table(&table),
        Err(AgentError::Rules(_))
    ));
}

#[test]
fn missing_rule_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(RuleTable::from_file(&dir.path().join("absent.toml")).is_err());
}
