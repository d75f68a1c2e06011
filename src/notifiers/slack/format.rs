use serde_json::Value;
use std::path::{Component, Path, PathBuf};

use crate::input::NotificationBody;
use crate::shell::has_command_prefix;

/// Where a message lands: the channel (broadcast from the session thread) or the
/// thread only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Channel,
    Thread,
}

pub const SESSION_END: &str = "🛑 Claude Codeセッション終了";
pub const PRE_COMPACT: &str =
    "⚠️ コンテキストが長くなってきました。新しいセッションの開始を検討してください。";
pub const TASK_COMPLETE: &str = "✅ タスク完了: Task";

const CRITICAL_COMMANDS: &[&str] = &["git commit", "git push", "npm publish", "docker push"];
const IMPORTANT_COMMANDS: &[&str] = &["git", "npm", "pnpm", "docker", "kubectl", "terraform"];
const IMPORTANT_TASK_KEYWORDS: &[&str] =
    &["エラー", "修正", "実装", "バグ", "fix", "bug", "implement"];
const IMPORTANT_NOTIFICATIONS: &[&str] = &[
    "claude has finished",
    "claude is waiting for your input",
    "claude needs your permission",
    "error",
    "failed",
    "completed successfully",
];
const PERMISSION_PREFIX: &str = "Claude needs your permission to use";
const MAX_TODOS: usize = 5;
const MAX_ERROR_CHARS: usize = 100;

/// Renders hook events as Slack message text
#[derive(Debug, Clone)]
pub struct EventFormatter {
    session_id_length: usize,
    home: Option<PathBuf>,
}

impl EventFormatter {
    pub fn new(session_id_length: usize, home: Option<PathBuf>) -> Self {
        EventFormatter {
            session_id_length,
            home,
        }
    }

    pub fn session_start(&self, session_id: &str, cwd: &str) -> String {
        let short: String = session_id.chars().take(self.session_id_length).collect();
        format!(":clapper: `{}` `{}`", short, self.display_cwd(cwd))
    }

    /// `~/src/github.com/owner/repo` becomes `owner/repo`, other paths under
    /// home get a `~` prefix
    fn display_cwd(&self, cwd: &str) -> String {
        let Some(home) = &self.home else {
            return cwd.to_string();
        };
        let path = Path::new(cwd);
        if let Ok(repo) = path.strip_prefix(home.join("src").join("github.com")) {
            if !repo.as_os_str().is_empty() {
                return repo.to_string_lossy().to_string();
            }
        }
        match path.strip_prefix(home) {
            Ok(rest) if rest.as_os_str().is_empty() => "~".to_string(),
            Ok(rest) => format!("~/{}", rest.to_string_lossy()),
            Err(_) => cwd.to_string(),
        }
    }

    pub fn task_start(&self, description: Option<&str>) -> (String, NotificationLevel) {
        match description {
            Some(description) => {
                let lower = description.to_lowercase();
                let level = if IMPORTANT_TASK_KEYWORDS.iter().any(|k| lower.contains(k)) {
                    NotificationLevel::Channel
                } else {
                    NotificationLevel::Thread
                };
                (format!("🔧 タスク開始: {description}"), level)
            }
            None => ("🔧 タスク開始".to_string(), NotificationLevel::Thread),
        }
    }

    /// `command` is expected to be truncated already
    pub fn command(&self, command: &str) -> (String, NotificationLevel) {
        let (emoji, level) = if CRITICAL_COMMANDS
            .iter()
            .any(|prefix| has_command_prefix(command, prefix))
        {
            ("🚨", NotificationLevel::Channel)
        } else if IMPORTANT_COMMANDS
            .iter()
            .any(|prefix| has_command_prefix(command, prefix))
        {
            ("⚡", NotificationLevel::Thread)
        } else {
            ("💻", NotificationLevel::Thread)
        };

        let message = if command.contains('\n') {
            let escaped = command.replace("```", "\\`\\`\\`");
            format!("{emoji} コマンド実行\n```\n$ {escaped}\n```")
        } else {
            format!("{emoji} コマンド実行: `{command}`")
        };
        (message, level)
    }

    pub fn todo_update(&self, todos: &[Value]) -> (String, NotificationLevel) {
        if todos.is_empty() {
            return ("📋 TODO更新".to_string(), NotificationLevel::Thread);
        }

        let lines: Vec<String> = todos
            .iter()
            .take(MAX_TODOS)
            .map(|todo| {
                let checkbox = if todo.get("status").and_then(Value::as_str) == Some("completed")
                {
                    ":white_check_mark:"
                } else {
                    ":ballot_box_with_check:"
                };
                let content = todo.get("content").and_then(Value::as_str).unwrap_or("");
                format!("{checkbox} {content}")
            })
            .collect();
        (
            format!("---\n📋 TODO更新:\n{}\n---", lines.join("\n")),
            NotificationLevel::Thread,
        )
    }

    pub fn file_operation(
        &self,
        tool_name: &str,
        file_path: &str,
        cwd: &str,
    ) -> (String, NotificationLevel) {
        let operation = match tool_name {
            "Write" => "作成".to_string(),
            "Edit" | "MultiEdit" => "編集".to_string(),
            other => other.to_lowercase(),
        };
        let relative = relative_path(Path::new(file_path), Path::new(cwd));
        (
            format!("📝 ファイル{operation}: `{relative}`"),
            NotificationLevel::Thread,
        )
    }

    pub fn web_fetch(&self, url: &str) -> (String, NotificationLevel) {
        (format!("🌐 Web取得: {url}"), NotificationLevel::Thread)
    }

    pub fn tool_error(&self, tool_name: &str, error: &str) -> (String, NotificationLevel) {
        let head: String = error.chars().take(MAX_ERROR_CHARS).collect();
        (
            format!("❌ {tool_name} エラー: {head}..."),
            NotificationLevel::Channel,
        )
    }

    pub fn notification(&self, body: &NotificationBody) -> (String, NotificationLevel) {
        let text = match body {
            NotificationBody::ApprovalRequest { tool } => {
                return (permission_request(tool), NotificationLevel::Channel);
            }
            NotificationBody::Text(text) => text,
        };

        let lower = text.to_lowercase();
        let message = if lower.contains("error") || lower.contains("failed") {
            format!("⚠️ 通知: {text}")
        } else if lower.contains("completed successfully") || lower.contains("claude has finished")
        {
            format!("✅ {text}")
        } else if lower.contains("claude needs your permission") {
            match permission_tool(text) {
                Some(tool) => permission_request(tool),
                None => format!("🔐 許可要求: {text}"),
            }
        } else if lower.contains("claude is waiting for your input") {
            format!("⏱️ {text}")
        } else {
            format!("ℹ️ {text}")
        };

        let level = if IMPORTANT_NOTIFICATIONS.iter().any(|k| lower.contains(k)) {
            NotificationLevel::Channel
        } else {
            NotificationLevel::Thread
        };
        (message, level)
    }

    pub fn user_prompt(&self, prompt: &str) -> String {
        format!("```\n{}\n```", prompt.replace("\\n", "\n"))
    }
}

fn permission_request(tool: &str) -> String {
    format!("🔐 許可要求: {tool}ツールの使用許可")
}

fn permission_tool(text: &str) -> Option<&str> {
    let (_, rest) = text.split_once(PERMISSION_PREFIX)?;
    rest.split_whitespace().next()
}

/// `path` relative to `base`, computed lexically. Relative inputs, or paths that
/// share no root with `base`, are returned unchanged.
fn relative_path(path: &Path, base: &Path) -> String {
    if !path.is_absolute() || !base.is_absolute() {
        return path.to_string_lossy().to_string();
    }

    let path: Vec<Component> = normalize(path);
    let base: Vec<Component> = normalize(base);
    if path.first() != base.first() {
        return path.iter().collect::<PathBuf>().to_string_lossy().to_string();
    }

    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &path[common..] {
        relative.push(component);
    }

    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.to_string_lossy().to_string()
    }
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                }
            }
            other => components.push(other),
        }
    }
    components
}
