use serde_json::json;
use std::panic::{self, AssertUnwindSafe};

use crate::config::Config;
use crate::error_log::ErrorLog;
use crate::input::HookEvent;
use crate::notifiers::event_log::EventLogger;
use crate::notifiers::slack::client::SlackClient;
use crate::notifiers::slack::SlackNotifier;
use crate::notifiers::zunda::voice::ZundaspeakCommand;
use crate::notifiers::zunda::ZundaSpeaker;
use crate::notifiers::Notifier;

/// Outcome of one dispatch
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Names of notifiers that failed, in dispatch order
    pub failed: Vec<&'static str>,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Fans one event out to every notifier, isolating their failures
pub struct Dispatcher {
    notifiers: Vec<Box<dyn Notifier>>,
    errors: ErrorLog,
}

impl Dispatcher {
    pub fn new(notifiers: Vec<Box<dyn Notifier>>, errors: ErrorLog) -> Self {
        Dispatcher { notifiers, errors }
    }

    /// Slack, then speech, then the event log. Disabled notifiers are left out.
    pub fn from_config(config: &Config) -> Self {
        let errors = ErrorLog::new(config.paths().error_log());
        let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

        if config.slack.enabled {
            match SlackClient::new(&config.slack) {
                Ok(client) => notifiers.push(Box::new(SlackNotifier::new(config, client))),
                Err(e) => {
                    tracing::error!("failed to build Slack client: {e}");
                    errors.record(
                        "slack_client_error",
                        &e.to_string(),
                        json!({ "api_url": config.slack.api_url }),
                    );
                }
            }
        }
        if config.zunda.enabled {
            let voice = ZundaspeakCommand::new(config.zunda.program.clone());
            notifiers.push(Box::new(ZundaSpeaker::new(config, voice)));
        }
        if config.event_log.enabled {
            notifiers.push(Box::new(EventLogger::new(config)));
        }

        Dispatcher::new(notifiers, errors)
    }

    #[cfg(test)]
    pub fn notifier_names(&self) -> Vec<&'static str> {
        self.notifiers.iter().map(|n| n.name()).collect()
    }

    /// Run every notifier in order. A failure or panic in one is logged and
    /// recorded; the rest still run.
    pub fn dispatch(&mut self, event: &HookEvent) -> DispatchReport {
        let mut report = DispatchReport::default();

        for notifier in &mut self.notifiers {
            let name = notifier.name();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| notifier.handle(event)));

            let message = match outcome {
                Ok(Ok(())) => {
                    tracing::debug!(notifier = name, event = %event.name, "handled");
                    continue;
                }
                Ok(Err(e)) => format!("{e:#}"),
                Err(panic) => panic_message(panic.as_ref()),
            };

            tracing::warn!(notifier = name, event = %event.name, "notifier failed: {message}");
            self.errors.record(
                &format!("{name}_handler_error"),
                &message,
                json!({
                    "handler": name,
                    "hook_event_name": event.name.as_str(),
                    "session_id": event.session_id,
                    "cwd": event.cwd,
                    "transcript_path": event.transcript_path,
                }),
            );
            report.failed.push(name);
        }

        report
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use serde_json::Value;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    enum Behavior {
        Succeed,
        Fail,
        Panic,
    }

    struct FakeNotifier {
        name: &'static str,
        behavior: Behavior,
        calls: Rc<RefCell<Vec<&'static str>>>,
    }

    impl Notifier for FakeNotifier {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle(&mut self, _event: &HookEvent) -> Result<()> {
            self.calls.borrow_mut().push(self.name);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::Fail => bail!("boom"),
                Behavior::Panic => panic!("kaboom"),
            }
        }
    }

    fn fake(
        name: &'static str,
        behavior: Behavior,
        calls: &Rc<RefCell<Vec<&'static str>>>,
    ) -> Box<dyn Notifier> {
        Box::new(FakeNotifier {
            name,
            behavior,
            calls: Rc::clone(calls),
        })
    }

    fn event() -> HookEvent {
        HookEvent::parse(r#"{"hook_event_name":"Stop","session_id":"s1","cwd":"/tmp"}"#).unwrap()
    }

    fn read_errors(path: &std::path::Path) -> Vec<Value> {
        fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_failures_are_isolated() {
        let temp = TempDir::new().unwrap();
        let error_path = temp.path().join("errors.log");
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(
            vec![
                fake("first", Behavior::Fail, &calls),
                fake("second", Behavior::Panic, &calls),
                fake("third", Behavior::Succeed, &calls),
            ],
            ErrorLog::new(&error_path),
        );

        let report = dispatcher.dispatch(&event());
        assert_eq!(*calls.borrow(), vec!["first", "second", "third"]);
        assert_eq!(report.failed, vec!["first", "second"]);
        assert!(!report.is_clean());

        let errors = read_errors(&error_path);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["error_type"], "first_handler_error");
        assert_eq!(errors[0]["error_message"], "boom");
        assert_eq!(errors[0]["context"]["hook_event_name"], "Stop");
        assert_eq!(errors[0]["context"]["session_id"], "s1");
        assert_eq!(errors[1]["error_type"], "second_handler_error");
        assert_eq!(errors[1]["error_message"], "panicked: kaboom");
    }

    #[test]
    fn test_clean_dispatch_writes_no_errors() {
        let temp = TempDir::new().unwrap();
        let error_path = temp.path().join("errors.log");
        let calls = Rc::new(RefCell::new(Vec::new()));
        let mut dispatcher = Dispatcher::new(
            vec![fake("only", Behavior::Succeed, &calls)],
            ErrorLog::new(&error_path),
        );

        assert!(dispatcher.dispatch(&event()).is_clean());
        assert!(!error_path.exists());
    }

    #[test]
    fn test_from_config_order_and_flags() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = Some(temp.path().to_path_buf());
        assert_eq!(
            Dispatcher::from_config(&config).notifier_names(),
            vec!["slack", "zunda", "event_log"]
        );

        config.slack.enabled = false;
        config.event_log.enabled = false;
        assert_eq!(Dispatcher::from_config(&config).notifier_names(), vec!["zunda"]);
    }

    #[test]
    fn test_event_log_runs_in_test_environment() {
        let temp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.data_dir = Some(temp.path().to_path_buf());
        config.test_environment = true;
        config.slack.bot_token = Some("xoxb-test".to_string());
        config.slack.channel_id = Some("C123".to_string());

        let report = Dispatcher::from_config(&config).dispatch(&event());
        assert!(report.is_clean());

        let paths = config.paths();
        assert!(paths.event_log.exists());
        assert!(!paths.sessions_dir().exists());
        assert!(!paths.threads_dir().exists());
    }
}
