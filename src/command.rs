//! Operator command parsing.
//!
//! Commands are typed with a leading `/`, which the display layer strips
//! before handing the text to the agent. Matching is literal and
//! case-sensitive.
//!
//! # Supported Commands
//!
//! | Text | Command |
//! |------|---------|
//! | `quit` | `Quit` |
//! | `relocate {name}` | `Relocate` |
//! | `push {target}` | `Push` |
//! | `yes` | `Confirm` |
//! | `no` | `Decline` |
//!
//! Anything else, including `relocate` or `push` without an argument, parses
//! as `Unknown`.

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Shut the process down.
    Quit,
    /// Move the agent to a new location.
    Relocate {
        /// New location name, verbatim.
        location: String,
    },
    /// Ask the agent to push something; needs confirmation.
    Push {
        /// What to push, verbatim.
        target: String,
    },
    /// Confirm a pending push.
    Confirm,
    /// Decline a pending push.
    Decline,
    /// Not part of the grammar.
    Unknown(String),
}

/// Parse command text (without the leading `/`).
pub fn parse_command(text: &str) -> Command {
    match text {
        "quit" => Command::Quit,
        "yes" => Command::Confirm,
        "no" => Command::Decline,
        _ => {
            if let Some(location) = argument(text, "relocate") {
                Command::Relocate { location }
            } else if let Some(target) = argument(text, "push") {
                Command::Push { target }
            } else {
                Command::Unknown(text.to_owned())
            }
        }
    }
}

/// Text after `keyword ` if it is non-empty.
fn argument(text: &str, keyword: &str) -> Option<String> {
    let rest = text.strip_prefix(keyword)?.strip_prefix(' ')?;
    if rest.trim().is_empty() {
        None
    } else {
        Some(rest.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literal_commands() {
        assert_eq!(parse_command("quit"), Command::Quit);
        assert_eq!(parse_command("yes"), Command::Confirm);
        assert_eq!(parse_command("no"), Command::Decline);
    }

    #[test]
    fn parses_relocate_with_multi_word_name() {
        assert_eq!(
            parse_command("relocate engine room"),
            Command::Relocate {
                location: "engine room".to_owned()
            }
        );
    }

    #[test]
    fn parses_push_target() {
        assert_eq!(
            parse_command("push red button"),
            Command::Push {
                target: "red button".to_owned()
            }
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert_eq!(parse_command("Quit"), Command::Unknown("Quit".to_owned()));
        assert_eq!(parse_command("YES"), Command::Unknown("YES".to_owned()));
        assert!(matches!(parse_command("Relocate lab"), Command::Unknown(_)));
    }

    #[test]
    fn keyword_without_argument_is_unknown() {
        assert!(matches!(parse_command("relocate"), Command::Unknown(_)));
        assert!(matches!(parse_command("relocate   "), Command::Unknown(_)));
        assert!(matches!(parse_command("push"), Command::Unknown(_)));
    }

    #[test]
    fn keyword_must_be_a_whole_word() {
        assert!(matches!(parse_command("relocated lab"), Command::Unknown(_)));
        assert!(matches!(parse_command("pushy"), Command::Unknown(_)));
        assert!(matches!(parse_command("quit now"), Command::Unknown(_)));
    }
}
