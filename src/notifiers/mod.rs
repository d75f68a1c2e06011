use anyhow::Result;

use crate::input::HookEvent;

pub mod event_log;
pub mod slack;
pub mod zunda;

/// An independent side-effect handler for hook events.
///
/// Implementations decide for themselves whether an event is relevant and
/// no-op on events that lack the fields they need. Errors are reported to the
/// dispatcher, which records them without affecting other notifiers.
pub trait Notifier {
    /// Short name used in logs and error journal entries
    fn name(&self) -> &'static str;

    fn handle(&mut self, event: &HookEvent) -> Result<()>;
}
