use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::config::Config;
use crate::error_log::append_json_line;
use crate::input::HookEvent;
use crate::notifiers::Notifier;

/// One line of the event log
#[derive(Debug, Serialize)]
struct EventEntry<'a> {
    time: String,
    session_id: &'a str,
    hook_event_name: &'a str,
    raw_input: &'a Value,
}

/// Appends every hook event to a JSON-lines file
pub struct EventLogger {
    path: PathBuf,
    enabled: bool,
}

impl EventLogger {
    pub fn new(config: &Config) -> Self {
        EventLogger {
            path: config.paths().event_log,
            enabled: config.event_log.enabled,
        }
    }
}

impl Notifier for EventLogger {
    fn name(&self) -> &'static str {
        "event_log"
    }

    fn handle(&mut self, event: &HookEvent) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        let entry = EventEntry {
            time: crate::timestamp(),
            session_id: &event.session_id,
            hook_event_name: event.name.as_str(),
            raw_input: &event.raw,
        };
        append_json_line(&self.path, &entry)
    }
}
