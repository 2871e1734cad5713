use std::str::FromStr;

use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Commands that can be invoked by starting a message with a leading slash.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, AsRefStr, IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SlashCommand {
    /// Show help
    Help,
    /// Exit the application
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandEntry {
    pub command: SlashCommand,
    pub keyword: &'static str,
    pub description: &'static str,
}

pub fn command_entries() -> Vec<CommandEntry> {
    SlashCommand::iter()
        .map(|command| CommandEntry {
            command,
            keyword: command.command(),
            description: command.description(),
        })
        .collect()
}

impl SlashCommand {
    /// User-visible description shown in help.
    pub fn description(self) -> &'static str {
        match self {
            SlashCommand::Help => "show available commands",
            SlashCommand::Quit => "exit the application",
        }
    }

    /// Command string without the leading '/'.
    pub fn command(self) -> &'static str {
        self.into()
    }
}

/// Parse a slash command from user input
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    if !input.starts_with('/') {
        return None;
    }

    let head = input[1..].split_whitespace().next()?;

    SlashCommand::from_str(head)
        .ok()
        .or_else(|| match head.to_lowercase().as_str() {
            "q" | "exit" | "bye" => Some(SlashCommand::Quit),
            "h" | "?" => Some(SlashCommand::Help),
            _ => None,
        })
}

/// Get help text for all available commands
pub fn get_help_text() -> String {
    let mut help = String::from("Available commands:\n\n");
    for entry in command_entries() {
        help.push_str(&format!("/{} - {}\n", entry.keyword, entry.description));
    }
    help.push_str("\nAliases: /q and /exit for /quit, /h and /? for /help");
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_aliases() {
        assert_eq!(parse_slash_command("/help"), Some(SlashCommand::Help));
        assert_eq!(parse_slash_command("/quit"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/q"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/? anything after"), Some(SlashCommand::Help));
    }

    #[test]
    fn rejects_unknown_and_plain_text() {
        assert_eq!(parse_slash_command("/frobnicate"), None);
        assert_eq!(parse_slash_command("hello"), None);
        assert_eq!(parse_slash_command("/"), None);
    }
}
