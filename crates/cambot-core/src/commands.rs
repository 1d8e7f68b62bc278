//! Command vocabulary and the prefix classifier.
//!
//! Classification is a pure function of session status + message text, so the
//! registry's critical section stays free of I/O.

/// Commands, in classification priority order. Prefix matching is first-match,
/// so no command string may be a prefix of another.
pub const CMD_START: &str = "/start";
pub const CMD_CAPTURE: &str = "/capture";
pub const CMD_STATUS: &str = "/status";
pub const CMD_HELP: &str = "/help";

pub const MSG_DEFAULT: &str = "Input your command:";
pub const MSG_UNKNOWN: &str = "Unknown command.";

/// Per-user conversation state. Only one state exists today; kept as an enum
/// so the classifier's signature survives a future multi-step flow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionStatus {
    #[default]
    Waiting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Capture,
    Status,
    Help,
    Unknown { text: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Start => "start",
            Command::Capture => "capture",
            Command::Status => "status",
            Command::Help => "help",
            Command::Unknown { .. } => "unknown",
        }
    }
}

/// Classify message text in fixed priority order; the first matching prefix
/// wins. `/cancel` is deliberately absent from the set and falls through to
/// `Unknown` like any other unrecognized text.
pub fn classify(status: SessionStatus, text: &str) -> Command {
    match status {
        SessionStatus::Waiting => {
            if text.starts_with(CMD_START) {
                Command::Start
            } else if text.starts_with(CMD_CAPTURE) {
                Command::Capture
            } else if text.starts_with(CMD_STATUS) {
                Command::Status
            } else if text.starts_with(CMD_HELP) {
                Command::Help
            } else {
                Command::Unknown {
                    text: text.to_string(),
                }
            }
        }
    }
}

/// Reply for unrecognized input. Non-empty text is echoed back in bold ahead
/// of the generic message.
pub fn unknown_reply(text: &str) -> String {
    if text.is_empty() {
        MSG_UNKNOWN.to_string()
    } else {
        format!("*{text}*: {MSG_UNKNOWN}")
    }
}

pub fn help_text() -> String {
    format!(
        r#"
Following commands are supported:

*For the camera*

{CMD_CAPTURE} : capture a still image

*Others*

{CMD_STATUS} : show this bot's status
{CMD_HELP} : show this help message
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_COMMANDS: [&str; 4] = [CMD_START, CMD_CAPTURE, CMD_STATUS, CMD_HELP];

    #[test]
    fn no_command_is_a_prefix_of_another() {
        for (i, a) in ALL_COMMANDS.iter().enumerate() {
            for (j, b) in ALL_COMMANDS.iter().enumerate() {
                if i != j {
                    assert!(!a.starts_with(b), "{a} is shadowed by {b}");
                }
            }
        }
    }

    #[test]
    fn classifies_in_priority_order() {
        assert_eq!(
            classify(SessionStatus::Waiting, "/start"),
            Command::Start
        );
        assert_eq!(
            classify(SessionStatus::Waiting, "/capture"),
            Command::Capture
        );
        assert_eq!(
            classify(SessionStatus::Waiting, "/status"),
            Command::Status
        );
        assert_eq!(classify(SessionStatus::Waiting, "/help"), Command::Help);
    }

    #[test]
    fn prefix_match_accepts_trailing_text() {
        assert_eq!(
            classify(SessionStatus::Waiting, "/capture now please"),
            Command::Capture
        );
    }

    #[test]
    fn cancel_falls_through_to_unknown() {
        assert_eq!(
            classify(SessionStatus::Waiting, "/cancel"),
            Command::Unknown {
                text: "/cancel".to_string()
            }
        );
    }

    #[test]
    fn unknown_echoes_nonempty_text() {
        assert_eq!(unknown_reply("abc"), "*abc*: Unknown command.");
        assert_eq!(unknown_reply(""), "Unknown command.");
    }
}
