//! Spoken notifications through the zundaspeak voice.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::LazyLock;

use crate::config::{Config, ZundaConfig};
use crate::input::{HookEvent, HookEventName, NotificationBody};
use crate::notifiers::Notifier;
use crate::shell::has_command_prefix;

pub mod reading;
pub mod voice;

use reading::{read_command, read_prompt};
use voice::{sanitize, Style, Voice};

const TASK_EXECUTE: &str = "タスク実行するのだ";
const SESSION_END: &str = "作業が終わったのだ。次は何をするのだ？";
const PRE_COMPACT: &str =
    "コンテキストが長くなってきたのだ。そろそろ新しいセッションを始めるのがおすすめなのだ";
const MAX_HOST_CHARS: usize = 50;

/// Notification texts that get spoken, and how
static NOTIFICATION_PHRASES: LazyLock<HashMap<String, &'static str>> =
    LazyLock::new(|| {
        let mut m = HashMap::new();

        for (tool, phrase) in [
            ("Bash", "コマンドの許可が欲しいのだ"),
            ("Task", "タスク実行の許可が欲しいのだ"),
            ("Read", "ファイル読み込みの許可が欲しいのだ"),
            ("Write", "ファイル書き込みの許可が欲しいのだ"),
            ("Edit", "ファイル編集の許可が欲しいのだ"),
            ("MultiEdit", "ファイル編集の許可が欲しいのだ"),
            ("TodoWrite", "TODO更新の許可が欲しいのだ"),
            ("WebSearch", "Web検索の許可が欲しいのだ"),
            ("WebFetch", "Webアクセスの許可が欲しいのだ"),
            ("Fetch", "Webアクセスの許可が欲しいのだ"),
            ("Grep", "ファイル検索の許可が欲しいのだ"),
            ("Glob", "ファイル探索の許可が欲しいのだ"),
            ("LS", "フォルダ閲覧の許可が欲しいのだ"),
        ] {
            m.insert(format!("Claude needs your permission to use {tool}"), phrase);
        }

        m.insert(
            "Claude is waiting for your input".to_string(),
            "入力待ちなのだ。何か指示が欲しいのだ",
        );
        m.insert("Claude is thinking".to_string(), "考え中なのだ。少し待つのだ");
        m.insert("Claude has finished".to_string(), "終わったのだ");
        m
    });

pub struct ZundaSpeaker<V: Voice> {
    config: ZundaConfig,
    test_environment: bool,
    voice: V,
}

impl<V: Voice> ZundaSpeaker<V> {
    pub fn new(config: &Config, voice: V) -> Self {
        ZundaSpeaker {
            config: config.zunda.clone(),
            test_environment: config.test_environment,
            voice,
        }
    }

    pub fn should_handle(&self) -> bool {
        self.config.enabled && !self.test_environment
    }

    fn is_silent_command(&self, command: &str) -> bool {
        self.config
            .silent_commands
            .iter()
            .any(|silent| has_command_prefix(command, silent))
    }

    /// What to say for `event`, and in which style
    fn utterance(&self, event: &HookEvent) -> Option<(String, Style)> {
        let default = self.config.default_style;
        match event.name {
            HookEventName::PreToolUse => self.pre_tool_use(event).map(|text| (text, default)),
            HookEventName::Notification => {
                let NotificationBody::Text(text) = event.notification()? else {
                    return None;
                };
                let phrase = NOTIFICATION_PHRASES.get(text.as_str())?;
                let style = if text.to_lowercase().contains("permission") {
                    Style::Amaama
                } else {
                    default
                };
                Some((phrase.to_string(), style))
            }
            HookEventName::Stop => Some((SESSION_END.to_string(), Style::Sexy)),
            HookEventName::PreCompact => Some((PRE_COMPACT.to_string(), default)),
            HookEventName::UserPromptSubmit if self.config.speak_on_prompt_submit => {
                event.prompt().map(|prompt| (read_prompt(prompt), default))
            }
            _ => None,
        }
    }

    fn pre_tool_use(&self, event: &HookEvent) -> Option<String> {
        let tool_name = event.tool_name.as_deref()?;
        if !event.has_tool_input() {
            return None;
        }

        match tool_name {
            "Task" => Some(match event.tool_input_str("description") {
                Some(description) => format!("タスク「{description}」を実行するのだ"),
                None => TASK_EXECUTE.to_string(),
            }),
            "Bash" => {
                let command = event.tool_input_str("command")?;
                if self.is_silent_command(command) {
                    return None;
                }
                let readable = read_command(command);
                tracing::debug!(command, readable = %readable, "command reading");
                if readable.is_empty() {
                    return None;
                }
                Some(format!("コマンド『{readable}』発射するのだ"))
            }
            "WebFetch" => {
                let url = event.tool_input_str("url")?;
                Some(format!("ウェブサイト『{}』をチェックするのだ", site_name(url)))
            }
            _ => None,
        }
    }

    fn speak(&self, text: &str, style: Style) -> Result<()> {
        let text = sanitize(text);
        if text.is_empty() {
            return Ok(());
        }
        tracing::debug!(style = style.digit(), text = %text, "speaking");
        self.voice.speak(&text, style)
    }
}

/// Host part of a URL, or its first characters when it does not parse
fn site_name(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.chars().take(MAX_HOST_CHARS).collect())
}

impl<V: Voice> Notifier for ZundaSpeaker<V> {
    fn name(&self) -> &'static str {
        "zunda"
    }

    fn handle(&mut self, event: &HookEvent) -> Result<()> {
        if !self.should_handle() {
            return Ok(());
        }
        match self.utterance(event) {
            Some((text, style)) => self.speak(&text, style),
            None => Ok(()),
        }
    }
}
