//! Session-complete notifications.

use std::cell::RefCell;
use std::rc::Rc;

/// Fire-and-forget sink for "session finished" signals.
///
/// Implementations must not fail loudly: a notifier that cannot deliver
/// (no permission, no sound device) simply drops the signal.
pub trait Notifier {
    fn notify(&self, session_label: &str);
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _session_label: &str) {}
}

/// Remembers the labels it was given. Handy for embedding applications that
/// render notifications themselves, and for tests.
#[derive(Debug, Default, Clone)]
pub struct RecordingNotifier {
    labels: Rc<RefCell<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn labels(&self) -> Vec<String> {
        self.labels.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.labels.borrow().len()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, session_label: &str) {
        self.labels.borrow_mut().push(session_label.to_string());
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, session_label: &str) {
        (**self).notify(session_label)
    }
}
