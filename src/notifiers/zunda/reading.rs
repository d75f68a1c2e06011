//! Turning commands and prompts into something worth reading aloud.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::shell::parse_command;

const EMPTY_PROMPT: &str = "空のプロンプトなのだ";
const PROMPT_SUFFIX: &str = "、という指示なのだ";
const LONG_PROMPT_CHARS: usize = 100;
const LONG_PROMPT_HEAD: usize = 80;

/// Words with a katakana reading
static WORDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("npm", "エヌピーエム"),
        ("pnpm", "ピーエヌピーエム"),
        ("tsx", "ティーエスエックス"),
    ])
});

/// How many leading parts of a command to read, keyed by its leading parts
static PARTS_LIMIT: LazyLock<HashMap<&'static str, usize>> = LazyLock::new(|| {
    HashMap::from([
        ("git", 2),
        ("npm", 2),
        ("npm run", 3),
        ("yarn", 2),
        ("yarn run", 3),
        ("pnpm", 2),
        ("pnpm run", 3),
        ("uv", 2),
        ("uv run", 3),
        ("uv run task", 4),
        ("docker", 2),
        ("docker compose", 3),
        ("gh", 2),
        ("gh pr", 3),
        ("gh issue", 3),
        ("go", 2),
        ("go mod", 3),
        ("cargo", 2),
        ("kubectl", 2),
        ("terraform", 2),
    ])
});

/// Acronyms and symbols in prompts, with their readings
const PROMPT_TERMS: &[(&str, &str)] = &[
    ("TODO:", "トゥードゥー、"),
    ("FIXME:", "フィックスミー、"),
    ("TODO", "トゥードゥー"),
    ("FIXME", "フィックスミー"),
    ("README", "リードミー"),
    ("HTTPS", "エイチティーティーピーエス"),
    ("HTTP", "エイチティーティーピー"),
    ("JSON", "ジェイソン"),
    ("HTML", "エイチティーエムエル"),
    ("API", "エーピーアイ"),
    ("URL", "ユーアールエル"),
    ("XML", "エックスエムエル"),
    ("CSS", "シーエスエス"),
    ("JS", "ジェイエス"),
    ("TS", "ティーエス"),
    ("...", "てんてんてん"),
    ("->", "矢印"),
    ("=>", "矢印"),
    ("@", "アット"),
    ("#", "シャープ"),
    ("&", "アンド"),
];

#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("pattern must compile")
}

static URL: LazyLock<Regex> = LazyLock::new(|| pattern(r"https?://\S+"));
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| pattern(r"```[a-z]*"));
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| pattern(r"`([^`]+)`"));
static FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"[/\\]([^/\\\s]+\.[a-z]+)"));
// Alternation order is the table order, so longer terms win
static TERM: LazyLock<Regex> = LazyLock::new(|| {
    let alternatives: Vec<String> = PROMPT_TERMS
        .iter()
        .map(|(term, _)| regex::escape(term))
        .collect();
    pattern(&alternatives.join("|"))
});

/// Short spoken form of a shell command: options dropped, known words read in
/// katakana, and only as many leading parts as the command family warrants.
pub fn read_command(command: &str) -> String {
    if let Some(word) = WORDS.get(command.trim()) {
        return word.to_string();
    }

    let parsed = parse_command(command);
    tracing::trace!(
        program = %parsed.program,
        dropped_options = parsed.options.len(),
        "parsed command"
    );
    let parts = parsed.parts();
    if parts.is_empty() {
        return String::new();
    }

    let limit = parts_limit(&parts);
    parts
        .iter()
        .take(limit)
        .map(|part| WORDS.get(*part).copied().unwrap_or(*part))
        .collect::<Vec<_>>()
        .join(" ")
}

fn parts_limit(parts: &[&str]) -> usize {
    (1..=parts.len().min(4))
        .rev()
        .find_map(|length| PARTS_LIMIT.get(parts[..length].join(" ").as_str()))
        .copied()
        .unwrap_or(1)
}

/// Spoken form of a user prompt, always ending in のだ
pub fn read_prompt(prompt: &str) -> String {
    let prompt = prompt.replace("\\n", " ");
    let prompt = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        return EMPTY_PROMPT.to_string();
    }

    if prompt.chars().count() > LONG_PROMPT_CHARS {
        let head: String = prompt.chars().take(LONG_PROMPT_HEAD).collect();
        let head = match head.rsplit_once(' ') {
            Some((words, _)) => words.to_string(),
            None => head,
        };
        return format!("{head}{PROMPT_SUFFIX}");
    }

    let text = URL.replace_all(&prompt, "URL");

    let mut fences = 0;
    let text = CODE_FENCE.replace_all(&text, |_: &Captures| {
        fences += 1;
        if fences % 2 == 1 {
            "コードブロック開始"
        } else {
            "コードブロック終了"
        }
    });

    let text = INLINE_CODE.replace_all(&text, "$1");
    let text = FILE_NAME.replace_all(&text, "、${1}ファイル");
    let text = TERM.replace_all(&text, |caps: &Captures| {
        let matched = &caps[0];
        PROMPT_TERMS
            .iter()
            .find(|(term, _)| *term == matched)
            .map(|(_, reading)| *reading)
            .unwrap_or(matched)
            .to_string()
    });

    let mut text = text.into_owned();
    if !text.ends_with("のだ") {
        text.push_str(PROMPT_SUFFIX);
    }
    text
}
