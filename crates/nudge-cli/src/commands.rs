//! Parsing of lines typed into the session.

use nudge_core::TriggerMode;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Plain text for the assistant.
    Say(String),
    New,
    Enable,
    Disable,
    Status,
    Send(TriggerMode),
    Reload,
    Help,
    Quit,
    /// A slash command we could not make sense of, with the reason.
    Invalid(String),
}

pub const HELP: &str = "\
/new                          start a new conversation
/enable, /disable             turn proactive messages on or off
/status                       show scheduler state
/send fixed|random|inactivity run the gate for a mode now
/reload                       re-read the config file
/quit                         leave";

impl Input {
    /// Parse a line; blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Some(Self::Say(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let input = match (parts.next().unwrap_or_default(), parts.next()) {
            ("new", None) => Self::New,
            ("enable", None) => Self::Enable,
            ("disable", None) => Self::Disable,
            ("status", None) => Self::Status,
            ("reload", None) => Self::Reload,
            ("help", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            ("send", Some(mode)) => match mode.parse::<TriggerMode>() {
                Ok(mode) => Self::Send(mode),
                Err(_) => Self::Invalid(format!("unknown mode '{}'", mode)),
            },
            ("send", None) => Self::Invalid("usage: /send fixed|random|inactivity".to_string()),
            (name, _) => Self::Invalid(format!("unknown command '/{}'", name)),
        };
        Some(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text() {
        assert_eq!(
            Input::parse("  how are you?  "),
            Some(Input::Say("how are you?".to_string()))
        );
        assert_eq!(Input::parse("   "), None);
    }

    #[test]
    fn test_commands() {
        assert_eq!(Input::parse("/new"), Some(Input::New));
        assert_eq!(Input::parse("/disable"), Some(Input::Disable));
        assert_eq!(Input::parse("/exit"), Some(Input::Quit));
        assert_eq!(
            Input::parse("/send Inactivity"),
            Some(Input::Send(TriggerMode::Inactivity))
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert!(matches!(Input::parse("/send"), Some(Input::Invalid(_))));
        assert!(matches!(Input::parse("/send hourly"), Some(Input::Invalid(_))));
        assert!(matches!(Input::parse("/status now"), Some(Input::Invalid(_))));
        assert!(matches!(Input::parse("/dance"), Some(Input::Invalid(_))));
    }
}
