use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::notifiers::zunda::voice::Style;

const CONFIG_FILENAME: &str = "config.yaml";
const APP_DIR: &str = "cchh";

/// Slack notifier settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub enabled: bool,
    pub bot_token: Option<String>,
    pub channel_id: Option<String>,
    pub api_url: String,
    /// HTTP timeout; the assistant blocks on the hook until it returns
    pub timeout_secs: u64,
    /// Post the session banner as the thread root of a new session
    pub show_session_start: bool,
    pub notify_on_tool_use: bool,
    pub notify_on_stop: bool,
    pub command_max_length: usize,
    pub session_id_length: usize,
}

impl Default for SlackConfig {
    fn default() -> Self {
        SlackConfig {
            enabled: true,
            bot_token: None,
            channel_id: None,
            api_url: "https://slack.com/api/chat.postMessage".to_string(),
            timeout_secs: 10,
            show_session_start: true,
            notify_on_tool_use: true,
            notify_on_stop: true,
            command_max_length: 200,
            session_id_length: 8,
        }
    }
}

impl SlackConfig {
    /// Both credentials are present and non-empty
    pub fn is_configured(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.bot_token) && present(&self.channel_id)
    }
}

/// Voice notifier settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZundaConfig {
    pub enabled: bool,
    /// Text-to-speech executable, invoked as `<program> -s <style> <text>`
    pub program: String,
    pub default_style: Style,
    pub speak_on_prompt_submit: bool,
    /// Commands that are never read aloud
    pub silent_commands: Vec<String>,
}

impl Default for ZundaConfig {
    fn default() -> Self {
        ZundaConfig {
            enabled: true,
            program: "zundaspeak".to_string(),
            default_style: Style::Normal,
            speak_on_prompt_submit: false,
            silent_commands: ["git status", "git log", "git diff", "ls", "pwd", "cat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Event log settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EventLogConfig {
    pub enabled: bool,
    /// Overrides `<data_dir>/logs/events.jsonl`
    pub path: Option<PathBuf>,
}

impl Default for EventLogConfig {
    fn default() -> Self {
        EventLogConfig {
            enabled: true,
            path: None,
        }
    }
}

/// Resolved configuration, passed explicitly into every notifier
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Suppresses network and audio side effects (CI, test suites)
    pub test_environment: bool,
    /// Echo the hook input back on stdout
    pub echo_input: bool,
    /// Overrides `~/.cchh`
    pub data_dir: Option<PathBuf>,
    pub slack: SlackConfig,
    pub zunda: ZundaConfig,
    pub event_log: EventLogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            test_environment: false,
            echo_input: true,
            data_dir: None,
            slack: SlackConfig::default(),
            zunda: ZundaConfig::default(),
            event_log: EventLogConfig::default(),
        }
    }
}

impl Config {
    /// Load from the config file (if any), then apply environment overrides.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let path = match lookup("CCHH_CONFIG") {
            Some(explicit) => Some(PathBuf::from(explicit)),
            None => default_config_path(&lookup).filter(|p| p.exists()),
        };

        let mut config = match path {
            Some(path) => load_config(&path)?,
            None => Config::default(),
        };
        config.apply_env(&lookup)?;
        config.validate(Path::new("environment"))?;
        Ok(config)
    }

    /// Apply `CCHH_*` environment overrides on top of file values
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let flag = |key: &str, target: &mut bool| {
            if let Some(value) = lookup(key) {
                *target = parse_bool(&value);
            }
        };

        flag("CCHH_TEST_ENVIRONMENT", &mut self.test_environment);
        flag("CCHH_SLACK_NOTIFICATIONS_ENABLED", &mut self.slack.enabled);
        flag(
            "CCHH_SLACK_SHOW_SESSION_START",
            &mut self.slack.show_session_start,
        );
        flag(
            "CCHH_SLACK_NOTIFY_ON_TOOL_USE",
            &mut self.slack.notify_on_tool_use,
        );
        flag("CCHH_SLACK_NOTIFY_ON_STOP", &mut self.slack.notify_on_stop);
        flag("CCHH_ZUNDA_SPEAKER_ENABLED", &mut self.zunda.enabled);
        flag(
            "CCHH_ZUNDA_SPEAK_ON_PROMPT_SUBMIT",
            &mut self.zunda.speak_on_prompt_submit,
        );
        flag("CCHH_EVENT_LOGGING_ENABLED", &mut self.event_log.enabled);

        if let Some(home) = lookup("CCHH_HOME").filter(|h| !h.is_empty()) {
            self.data_dir = Some(PathBuf::from(home));
        }
        if let Some(token) = lookup("CCHH_SLACK_BOT_TOKEN") {
            self.slack.bot_token = Some(token);
        }
        if let Some(channel) = lookup("CCHH_SLACK_CHANNEL_ID") {
            self.slack.channel_id = Some(channel);
        }
        if let Some(value) = lookup("CCHH_SLACK_COMMAND_MAX_LENGTH") {
            self.slack.command_max_length = value
                .trim()
                .parse()
                .with_context(|| format!("CCHH_SLACK_COMMAND_MAX_LENGTH is not a number: {value}"))?;
        }
        if let Some(value) = lookup("CCHH_SLACK_SESSION_ID_LENGTH") {
            self.slack.session_id_length = value
                .trim()
                .parse()
                .with_context(|| format!("CCHH_SLACK_SESSION_ID_LENGTH is not a number: {value}"))?;
        }

        Ok(())
    }

    fn validate(&self, source: &Path) -> Result<()> {
        if self.slack.session_id_length == 0 {
            bail!(
                "Invalid config at {}: 'slack.session_id_length' must be positive",
                source.display()
            );
        }
        if self.slack.command_max_length == 0 {
            bail!(
                "Invalid config at {}: 'slack.command_max_length' must be positive",
                source.display()
            );
        }
        if self.slack.timeout_secs == 0 {
            bail!(
                "Invalid config at {}: 'slack.timeout_secs' must be positive",
                source.display()
            );
        }
        if self.zunda.program.trim().is_empty() {
            bail!(
                "Invalid config at {}: 'zunda.program' cannot be empty",
                source.display()
            );
        }
        Ok(())
    }

    /// File locations derived from the data directory
    pub fn paths(&self) -> Paths {
        let data_dir = self.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".cchh")
        });
        let event_log = self
            .event_log
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("logs").join("events.jsonl"));
        Paths {
            data_dir,
            event_log,
        }
    }
}

/// On-disk layout under the data directory
#[derive(Debug, Clone)]
pub struct Paths {
    pub data_dir: PathBuf,
    pub event_log: PathBuf,
}

impl Paths {
    pub fn sessions_dir(&self) -> PathBuf {
        self.data_dir.join("sessions")
    }

    pub fn threads_dir(&self) -> PathBuf {
        self.data_dir.join("slack_threads")
    }

    pub fn error_log(&self) -> PathBuf {
        self.data_dir.join("errors.log")
    }
}

/// `1`, `true` and `yes` (any case) are true; everything else is false
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

/// $XDG_CONFIG_HOME/cchh/config.yaml, falling back to ~/.config
fn default_config_path(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let xdg_config = lookup("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;

    Some(xdg_config.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Loads and validates a config file.
pub fn load_config(config_path: &Path) -> Result<Config> {
    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

    // An empty file means "all defaults"
    if content.trim().is_empty() {
        return Ok(Config::default());
    }

    let config: Config = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;

    config.validate(config_path)?;
    Ok(config)
}
