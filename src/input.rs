use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fmt;

/// Session id used when the hook payload does not carry one
pub const UNKNOWN_SESSION: &str = "unknown";

/// Hook lifecycle moments this handler knows about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEventName {
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    UserPromptSubmit,
    PreCompact,
    Other(String),
}

impl HookEventName {
    pub fn from_name(name: &str) -> Self {
        match name {
            "PreToolUse" => HookEventName::PreToolUse,
            "PostToolUse" => HookEventName::PostToolUse,
            "Notification" => HookEventName::Notification,
            "Stop" => HookEventName::Stop,
            "UserPromptSubmit" => HookEventName::UserPromptSubmit,
            "PreCompact" => HookEventName::PreCompact,
            other => HookEventName::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            HookEventName::PreToolUse => "PreToolUse",
            HookEventName::PostToolUse => "PostToolUse",
            HookEventName::Notification => "Notification",
            HookEventName::Stop => "Stop",
            HookEventName::UserPromptSubmit => "UserPromptSubmit",
            HookEventName::PreCompact => "PreCompact",
            HookEventName::Other(name) => name,
        }
    }
}

impl fmt::Display for HookEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification payload, normalised across the shapes Claude Code has used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationBody {
    /// Free-form text such as "Claude is waiting for your input"
    Text(String),
    /// Structured `toolUseRequiresApproval` request
    ApprovalRequest { tool: String },
}

/// One parsed hook event. Lives for a single process invocation.
#[derive(Debug, Clone)]
pub struct HookEvent {
    pub name: HookEventName,
    pub session_id: String,
    pub cwd: String,
    pub transcript_path: Option<String>,
    pub tool_name: Option<String>,
    pub tool_input: Option<Value>,
    pub result: Option<Value>,
    pub prompt: Option<String>,
    pub message: Option<String>,
    pub notification: Option<Value>,
    /// The input object exactly as received
    pub raw: Value,
    /// The input text exactly as received, for pass-through output
    pub raw_text: String,
}

impl HookEvent {
    /// Parse a hook payload. Fails on invalid JSON, a non-object payload or a
    /// missing or non-string `hook_event_name`; every other field is optional.
    pub fn parse(text: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(text).context("invalid JSON input")?;
        if !raw.is_object() {
            bail!("hook input must be a JSON object");
        }
        let Some(name) = raw.get("hook_event_name") else {
            bail!("missing required field: hook_event_name");
        };
        let Some(name) = name.as_str() else {
            bail!("hook_event_name must be a string");
        };

        // Everything else is optional; a mistyped field counts as absent
        let session_id = str_field(&raw, "session_id")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_SESSION.to_string());
        let cwd = str_field(&raw, "cwd")
            .filter(|c| !c.is_empty())
            .unwrap_or_else(current_dir);
        let result = object_field(&raw, "result").or_else(|| object_field(&raw, "tool_response"));

        Ok(HookEvent {
            name: HookEventName::from_name(name),
            session_id,
            cwd,
            transcript_path: str_field(&raw, "transcript_path"),
            tool_name: str_field(&raw, "tool_name").filter(|t| !t.is_empty()),
            tool_input: raw.get("tool_input").filter(|v| !v.is_null()).cloned(),
            result,
            prompt: str_field(&raw, "prompt"),
            message: str_field(&raw, "message"),
            notification: raw.get("notification").filter(|v| !v.is_null()).cloned(),
            raw_text: text.trim().to_string(),
            raw,
        })
    }

    /// Whether `tool_input` is present and non-empty
    pub fn has_tool_input(&self) -> bool {
        match &self.tool_input {
            Some(Value::Object(map)) => !map.is_empty(),
            Some(Value::Null) | None => false,
            Some(_) => true,
        }
    }

    pub fn tool_input_value(&self, key: &str) -> Option<&Value> {
        self.tool_input.as_ref()?.get(key)
    }

    /// String field of `tool_input`; `None` if missing, mistyped or empty
    pub fn tool_input_str(&self, key: &str) -> Option<&str> {
        self.tool_input_value(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Error text carried by a failed tool result, if any
    pub fn tool_error(&self) -> Option<String> {
        let result = self.result.as_ref()?.as_object()?;
        let value = result.get("error").or_else(|| result.get("exception"))?;
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Whether the event carries a tool result object
    pub fn has_result(&self) -> bool {
        matches!(&self.result, Some(Value::Object(map)) if !map.is_empty())
    }

    pub fn notification(&self) -> Option<NotificationBody> {
        if let Some(notification) = &self.notification {
            match notification {
                Value::String(text) if !text.is_empty() => {
                    return Some(NotificationBody::Text(text.clone()));
                }
                Value::Object(map) => {
                    if map.get("type").and_then(Value::as_str) == Some("toolUseRequiresApproval")
                    {
                        let tool = map
                            .get("tool")
                            .and_then(Value::as_str)
                            .unwrap_or("Unknown")
                            .to_string();
                        return Some(NotificationBody::ApprovalRequest { tool });
                    }
                    if let Some(text) = map.get("text").and_then(Value::as_str) {
                        if !text.is_empty() {
                            return Some(NotificationBody::Text(text.to_string()));
                        }
                    }
                }
                _ => {}
            }
        }

        self.message
            .as_ref()
            .filter(|m| !m.is_empty())
            .map(|m| NotificationBody::Text(m.clone()))
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref().filter(|p| !p.is_empty())
    }
}

fn str_field(raw: &Value, key: &str) -> Option<String> {
    raw.get(key).and_then(Value::as_str).map(str::to_string)
}

fn object_field(raw: &Value, key: &str) -> Option<Value> {
    raw.get(key).filter(|v| v.is_object()).cloned()
}

fn current_dir() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|_| ".".to_string())
}
