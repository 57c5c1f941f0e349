//! User-facing notifications
//!
//! Every asynchronous failure in the engine is translated into exactly one
//! notification at the boundary where it happens; embedders decide how the
//! message is actually shown by supplying a [`Notifier`].

use std::cell::RefCell;

use tracing::{error, info, warn};

/// Notification severity, matching the alert variants the form surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

pub trait Notifier {
    fn notify(&self, severity: Severity, message: &str);

    fn success(&self, message: &str) {
        self.notify(Severity::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(Severity::Error, message);
    }

    fn warning(&self, message: &str) {
        self.notify(Severity::Warning, message);
    }

    fn info(&self, message: &str) {
        self.notify(Severity::Info, message);
    }
}

/// Notifier that forwards everything to the tracing subscriber. Suits
/// embedders without their own toast/alert surface.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Success | Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
    }
}

/// Notifier that records everything it is told, for tests and headless runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: RefCell<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events.borrow().clone()
    }

    /// Last message recorded at a given severity.
    pub fn last(&self, severity: Severity) -> Option<String> {
        self.events
            .borrow()
            .iter()
            .rev()
            .find(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.events.borrow_mut().push((severity, message.to_string()));
    }
}
