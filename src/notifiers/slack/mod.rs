//! Slack notifications, one thread per assistant session.

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::PathBuf;

use crate::config::{Config, SlackConfig};
use crate::input::{HookEvent, HookEventName};
use crate::notifiers::Notifier;
use crate::session::SessionTracker;
use crate::shell::truncate_chars;

pub mod client;
pub mod format;
pub mod threads;

use client::{ChatClient, PostMessage};
use format::{EventFormatter, NotificationLevel, PRE_COMPACT, SESSION_END, TASK_COMPLETE};
use threads::ThreadStore;

/// A message waiting to be posted
#[derive(Debug, Clone, PartialEq)]
struct Outgoing {
    text: String,
    level: NotificationLevel,
    broadcast: bool,
}

impl Outgoing {
    fn new((text, level): (String, NotificationLevel)) -> Self {
        Outgoing {
            text,
            level,
            broadcast: false,
        }
    }

    fn broadcast(text: impl Into<String>) -> Self {
        Outgoing {
            text: text.into(),
            level: NotificationLevel::Thread,
            broadcast: true,
        }
    }
}

pub struct SlackNotifier<C: ChatClient> {
    config: SlackConfig,
    test_environment: bool,
    sessions_dir: PathBuf,
    threads: ThreadStore,
    formatter: EventFormatter,
    client: C,
}

impl<C: ChatClient> SlackNotifier<C> {
    pub fn new(config: &Config, client: C) -> Self {
        let paths = config.paths();
        SlackNotifier {
            formatter: EventFormatter::new(config.slack.session_id_length, dirs::home_dir()),
            config: config.slack.clone(),
            test_environment: config.test_environment,
            sessions_dir: paths.sessions_dir(),
            threads: ThreadStore::new(paths.threads_dir()),
            client,
        }
    }

    pub fn should_handle(&self) -> bool {
        self.config.enabled && self.config.is_configured() && !self.test_environment
    }

    /// The message for `event`, if it warrants one
    fn event_message(&self, event: &HookEvent) -> Option<Outgoing> {
        match event.name {
            HookEventName::PreToolUse if self.config.notify_on_tool_use => {
                self.pre_tool_use(event)
            }
            HookEventName::PostToolUse => self.post_tool_use(event),
            HookEventName::Notification => event
                .notification()
                .map(|body| Outgoing::new(self.formatter.notification(&body))),
            HookEventName::Stop if self.config.notify_on_stop => {
                Some(Outgoing::broadcast(SESSION_END))
            }
            HookEventName::UserPromptSubmit => event
                .prompt()
                .map(|prompt| Outgoing::broadcast(self.formatter.user_prompt(prompt))),
            HookEventName::PreCompact => Some(Outgoing::broadcast(PRE_COMPACT)),
            _ => None,
        }
    }

    fn pre_tool_use(&self, event: &HookEvent) -> Option<Outgoing> {
        let tool_name = event.tool_name.as_deref()?;
        if !event.has_tool_input() {
            return None;
        }

        let formatted = match tool_name {
            "Task" => self
                .formatter
                .task_start(event.tool_input_str("description")),
            "Bash" => {
                let command = event.tool_input_str("command")?;
                self.formatter
                    .command(&truncate_chars(command, self.config.command_max_length))
            }
            "TodoWrite" => {
                let todos = event
                    .tool_input_value("todos")
                    .and_then(Value::as_array)
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                self.formatter.todo_update(todos)
            }
            "Write" | "Edit" | "MultiEdit" => {
                let file_path = event.tool_input_str("file_path")?;
                self.formatter
                    .file_operation(tool_name, file_path, &event.cwd)
            }
            "WebFetch" => self.formatter.web_fetch(event.tool_input_str("url")?),
            _ => return None,
        };
        Some(Outgoing::new(formatted))
    }

    fn post_tool_use(&self, event: &HookEvent) -> Option<Outgoing> {
        let tool_name = event.tool_name.as_deref()?;
        if !event.has_result() {
            return None;
        }

        if let Some(error) = event.tool_error() {
            return Some(Outgoing::new(self.formatter.tool_error(tool_name, &error)));
        }
        if tool_name == "Task" {
            return Some(Outgoing::new((
                TASK_COMPLETE.to_string(),
                NotificationLevel::Thread,
            )));
        }
        None
    }

    /// Post into the session thread, or start it. Channel-level and broadcast
    /// replies are also shown in the channel.
    fn send(&self, session_id: &str, outgoing: &Outgoing) -> Result<()> {
        let channel = self.config.channel_id.as_deref().unwrap_or_default();
        let mut message = PostMessage::new(channel, &outgoing.text);

        let thread = self.threads.load(session_id);
        let starts_thread = thread.is_none();
        if let Some(thread) = thread {
            message.thread_ts = Some(thread.thread_ts);
            message.reply_broadcast =
                outgoing.broadcast || outgoing.level == NotificationLevel::Channel;
        }

        let ts = self.client.post_message(&message).with_context(|| {
            format!(
                "Failed to post Slack message: {}",
                truncate_chars(&outgoing.text, 100)
            )
        })?;

        if starts_thread && !ts.is_empty() {
            self.threads.save(session_id, &ts)?;
        }
        Ok(())
    }
}

impl<C: ChatClient> Notifier for SlackNotifier<C> {
    fn name(&self) -> &'static str {
        "slack"
    }

    fn handle(&mut self, event: &HookEvent) -> Result<()> {
        if !self.should_handle() {
            return Ok(());
        }

        let session = SessionTracker::open(&self.sessions_dir, &event.session_id)?;

        // A new session never continues an old thread
        if session.is_new_session() {
            self.threads.clear(session.session_id())?;
            self.threads.prune_orphans(&self.sessions_dir);
        }

        let mut outgoing = Vec::new();
        if session.is_new_session() && self.config.show_session_start {
            outgoing.push(Outgoing::new((
                self.formatter.session_start(session.session_id(), &event.cwd),
                NotificationLevel::Channel,
            )));
        }
        outgoing.extend(self.event_message(event));

        // Every message gets its chance; the first failure is reported
        let mut first_error = None;
        for message in &outgoing {
            if let Err(e) = self.send(session.session_id(), message) {
                tracing::warn!(session_id = %event.session_id, "{e:#}");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
