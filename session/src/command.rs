/// Fixed help text written by the `help` command
pub const HELP_TEXT: &str = "Available commands:\n  \
help - Show this help message\n  \
clear - Clear the terminal\n  \
exit/quit - Exit the application\n  \
Any other input will be sent to the AI";

/// What a line of user input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Help,
    Generate(String),
}

impl Command {
    /// Classify one input line.
    ///
    /// Only the line terminator is stripped. Empty lines yield `None`. The
    /// control words must match the whole line, ignoring case; anything else,
    /// padded control words and whitespace-only lines included, is a
    /// generation request carrying the line verbatim.
    pub fn parse(line: &str) -> Option<Command> {
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            return None;
        }

        let command = if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            Command::Exit
        } else if line.eq_ignore_ascii_case("clear") {
            Command::Clear
        } else if line.eq_ignore_ascii_case("help") {
            Command::Help
        } else {
            Command::Generate(line.to_string())
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_words_ignore_case() {
        for input in ["exit", "EXIT", "Quit", "qUiT", "exit\n", "quit\r\n"] {
            assert_eq!(Command::parse(input), Some(Command::Exit), "{input:?}");
        }
        assert_eq!(Command::parse("Clear"), Some(Command::Clear));
        assert_eq!(Command::parse("HELP"), Some(Command::Help));
    }

    #[test]
    fn only_empty_lines_are_filtered() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("\r\n"), None);
        assert_eq!(Command::parse("   "), Some(Command::Generate("   ".to_string())));
    }

    #[test]
    fn padded_control_words_are_prompts() {
        assert_eq!(Command::parse(" exit"), Some(Command::Generate(" exit".to_string())));
        assert_eq!(Command::parse("help "), Some(Command::Generate("help ".to_string())));
        assert_eq!(Command::parse("\tclear"), Some(Command::Generate("\tclear".to_string())));
    }

    #[test]
    fn everything_else_is_generate_verbatim() {
        assert_eq!(
            Command::parse("  Tell me a joke \n"),
            Some(Command::Generate("  Tell me a joke ".to_string()))
        );
        assert_eq!(Command::parse("exit now"), Some(Command::Generate("exit now".to_string())));
        assert_eq!(Command::parse("helpme"), Some(Command::Generate("helpme".to_string())));
    }

    #[test]
    fn help_text_lists_commands() {
        assert_eq!(
            HELP_TEXT,
            "Available commands:\n  help - Show this help message\n  clear - Clear the terminal\n  exit/quit - Exit the application\n  Any other input will be sent to the AI"
        );
    }
}
