use anyhow::{Context, Result};
use serde_json::json;
use std::io::{self, Read, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod dispatcher;
mod error_log;
mod input;
mod notifiers;
mod session;
mod shell;

use config::Config;
use dispatcher::Dispatcher;
use error_log::ErrorLog;
use input::HookEvent;

/// RFC 3339 UTC timestamp with milliseconds, as written to every log file
pub(crate) fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CCHH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn main() -> ExitCode {
    init_tracing();

    let event = match read_input().and_then(|text| HookEvent::parse(&text)) {
        Ok(event) => event,
        Err(e) => {
            tracing::error!("{e:#}");
            emit("{}");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::load(env_lookup) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            record_config_error(&event, &format!("{e:#}"));
            emit(&event.raw_text);
            return ExitCode::FAILURE;
        }
    };

    tracing::debug!(event = %event.name, session_id = %event.session_id, "dispatching");
    let report = Dispatcher::from_config(&config).dispatch(&event);
    if !report.is_clean() {
        tracing::debug!(failed = ?report.failed, "some notifiers failed");
    }

    if config.echo_input {
        emit(&event.raw_text);
    }
    ExitCode::SUCCESS
}

fn read_input() -> Result<String> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    Ok(buffer)
}

/// The config could not be loaded, so journal the failure under whatever data
/// directory the environment alone points at
fn record_config_error(event: &HookEvent, message: &str) {
    let mut fallback = Config::default();
    if let Err(e) = fallback.apply_env(env_lookup) {
        tracing::debug!("ignoring environment overrides: {e:#}");
    }
    ErrorLog::new(fallback.paths().error_log()).record(
        "config_error",
        message,
        json!({
            "hook_event_name": event.name.as_str(),
            "session_id": event.session_id,
        }),
    );
}

/// Write hook output. A closed stdout is traced, never a panic.
fn emit(text: &str) {
    let mut stdout = io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{text}").and_then(|()| stdout.flush()) {
        tracing::warn!("failed to write hook output: {e}");
    }
}
