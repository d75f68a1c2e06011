//! Just enough shell parsing to describe a command in a notification.

/// A command split into its program, positional arguments and options
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub program: String,
    pub args: Vec<String>,
    pub options: Vec<(String, Option<String>)>,
}

impl ParsedCommand {
    /// Program followed by positional arguments
    pub fn parts(&self) -> Vec<&str> {
        if self.program.is_empty() {
            return Vec::new();
        }
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect()
    }
}

/// Parse a command into program, positional args and options. An option
/// consumes the following word as its value unless that word is itself an
/// option. Falls back to whitespace splitting if quoting is unbalanced.
pub fn parse_command(command: &str) -> ParsedCommand {
    let words = shlex::split(command)
        .unwrap_or_else(|| command.split_whitespace().map(String::from).collect());

    let mut words = words.into_iter().peekable();
    let Some(program) = words.next() else {
        return ParsedCommand::default();
    };

    let mut parsed = ParsedCommand {
        program,
        ..ParsedCommand::default()
    };
    while let Some(word) = words.next() {
        if word.starts_with('-') {
            let value = words.next_if(|next| !next.starts_with('-'));
            parsed.options.push((word, value));
        } else {
            parsed.args.push(word);
        }
    }
    parsed
}

/// Whether `command` is `prefix` or starts with `prefix` followed by a space
pub fn has_command_prefix(command: &str, prefix: &str) -> bool {
    let command = command.trim_start();
    command == prefix
        || command
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

/// Truncate to at most `max_chars` characters, marking the cut with "..."
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    const SUFFIX: &str = "...";
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= SUFFIX.len() {
        return SUFFIX.chars().take(max_chars).collect();
    }
    let kept: String = text.chars().take(max_chars - SUFFIX.len()).collect();
    format!("{kept}{SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_quoting() {
        let parsed = parse_command(r#"git commit -m "fix: the bug""#);
        assert_eq!(
            parsed.options,
            vec![("-m".to_string(), Some("fix: the bug".to_string()))]
        );

        let parsed = parse_command(r#"echo 'a  b' c\ d "say \"hi\"" "\$HOME""#);
        assert_eq!(parsed.args, vec!["a  b", "c d", "say \"hi\"", "$HOME"]);

        assert_eq!(parse_command("   "), ParsedCommand::default());
    }

    #[test]
    fn test_parse_command_options() {
        let parsed = parse_command(r#"git commit -m "message" --amend"#);
        assert_eq!(parsed.program, "git");
        assert_eq!(parsed.args, vec!["commit"]);
        assert_eq!(
            parsed.options,
            vec![
                ("-m".to_string(), Some("message".to_string())),
                ("--amend".to_string(), None),
            ]
        );
        assert_eq!(parsed.parts(), vec!["git", "commit"]);
    }

    #[test]
    fn test_parse_command_unbalanced_falls_back() {
        let parsed = parse_command("echo 'oops here");
        assert_eq!(parsed.program, "echo");
        assert_eq!(parsed.args, vec!["'oops", "here"]);
    }

    #[test]
    fn test_parse_empty_command() {
        let parsed = parse_command("");
        assert!(parsed.program.is_empty());
        assert!(parsed.parts().is_empty());
    }

    #[test]
    fn test_has_command_prefix() {
        assert!(has_command_prefix("git status", "git status"));
        assert!(has_command_prefix("  git status --short", "git status"));
        assert!(has_command_prefix("ls -la", "ls"));
        assert!(!has_command_prefix("lsof -i", "ls"));
        assert!(!has_command_prefix("gitk", "git"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_chars("日本語のテキストです", 6), "日本語...");
        assert_eq!(truncate_chars("abcdef", 2), "..");
    }
}
