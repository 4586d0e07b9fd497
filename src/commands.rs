//! Slash-command parsing for the chat input.
//!
//! A submitted message starting with `/` is a command for the app, not a
//! message for the model.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    /// `/log <file>` enables logging; bare `/log` toggles pause/resume.
    Log(Option<String>),
    Logout,
    Status,
    Unknown(String),
}

/// Parse a submitted line. Returns `None` when the line is a normal message.
pub fn parse_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|a| !a.is_empty());

    let command = match name {
        "/help" => SlashCommand::Help,
        "/log" => SlashCommand::Log(arg.map(str::to_string)),
        "/logout" => SlashCommand::Logout,
        "/status" => SlashCommand::Status,
        other => SlashCommand::Unknown(other.to_string()),
    };
    Some(command)
}

pub fn help_text() -> &'static str {
    "Commands:\n\
     /help            Show this help\n\
     /log <file>      Enable transcript logging to a file\n\
     /log             Pause or resume logging\n\
     /status          Show session status\n\
     /logout          Clear the stored Google session\n\n\
     Keys:\n\
     Enter            Send the message\n\
     Alt+Enter        Insert a line break\n\
     @                Mention a file or tab as context\n\
     Esc              Close the mention menu, or stop a streaming response\n\
     F2 / F3          Choose model / task\n\
     Up/Down, Mouse   Scroll the transcript\n\
     Ctrl+C           Quit"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_messages_are_not_commands() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("  hi /log"), None);
        assert_eq!(parse_command(""), None);
    }

    #[test]
    fn log_takes_an_optional_path() {
        assert_eq!(
            parse_command("/log chat.txt"),
            Some(SlashCommand::Log(Some("chat.txt".to_string())))
        );
        assert_eq!(parse_command("/log"), Some(SlashCommand::Log(None)));
        assert_eq!(parse_command("/log   "), Some(SlashCommand::Log(None)));
    }

    #[test]
    fn known_commands_parse() {
        assert_eq!(parse_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_command("/logout"), Some(SlashCommand::Logout));
        assert_eq!(parse_command("/status"), Some(SlashCommand::Status));
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }
}
