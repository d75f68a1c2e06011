use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::io::ErrorKind;
use std::process::Command;

/// Upper bound on what gets synthesized
pub const MAX_MESSAGE_CHARS: usize = 1000;

/// zundaspeak reading styles, passed as `-s <digit>`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    #[default]
    Normal,
    Amaama,
    Tsuntsun,
    Sexy,
    Sasayaki,
    Hisohiso,
    Herohero,
    Namidame,
}

impl Style {
    pub fn digit(self) -> &'static str {
        match self {
            Style::Normal => "0",
            Style::Amaama => "1",
            Style::Tsuntsun => "2",
            Style::Sexy => "3",
            Style::Sasayaki => "4",
            Style::Hisohiso => "5",
            Style::Herohero => "6",
            Style::Namidame => "7",
        }
    }
}

/// Speech synthesis seam
pub trait Voice {
    fn speak(&self, text: &str, style: Style) -> Result<()>;
}

/// Runs the `zundaspeak` CLI directly, without a shell
#[derive(Debug, Clone)]
pub struct ZundaspeakCommand {
    program: String,
}

impl ZundaspeakCommand {
    pub fn new(program: impl Into<String>) -> Self {
        ZundaspeakCommand {
            program: program.into(),
        }
    }
}

impl Voice for ZundaspeakCommand {
    fn speak(&self, text: &str, style: Style) -> Result<()> {
        let output = match Command::new(&self.program)
            .args(["-s", style.digit(), text])
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(program = %self.program, "speech program not found, skipping");
                return Ok(());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to run {}", self.program));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

/// Keep only characters that are safe and meaningful to read aloud: kana, CJK,
/// full-width forms, ASCII alphanumerics and a small punctuation set. Whitespace
/// runs collapse to one space.
pub fn sanitize(message: &str) -> String {
    let kept: String = message
        .chars()
        .take(MAX_MESSAGE_CHARS)
        .filter(|&c| is_speakable(c))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_speakable(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'
        | '\u{30A0}'..='\u{30FF}'
        | '\u{4E00}'..='\u{9FAF}'
        | '\u{FF01}'..='\u{FF60}'
        | 'a'..='z'
        | 'A'..='Z'
        | '0'..='9'
        | '.' | ',' | '!' | '?' | '(' | ')' | '[' | ']' | '{' | '}' | '\''
        | '「' | '」' | '『' | '』' | '、' | '。' | '〜'
        | '/' | '-' | '_' | '=' | '@' | '#' | '%' | '&' | '*' | '+' | '<' | '>' | ':'
    ) || c.is_whitespace()
}
