//! Trailing-edge debounce gate for [`DebounceMode::LastPass`].
//!
//! Triggers inside the window are coalesced: each new trigger aborts the
//! previously scheduled one, so only the last trigger's closure fires once
//! the window elapses. Superseded closures are dropped, which resolves their
//! waiters as canceled. Retry and refresh never go through the gate.
//!
//! [`DebounceMode::LastPass`]: crate::options::DebounceMode::LastPass

use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

pub(crate) struct DebounceGate {
    window: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl DebounceGate {
    pub(crate) const fn new(window: Duration) -> Self {
        Self {
            window,
            timer: Mutex::new(None),
        }
    }

    /// Schedule `fire` after the window, discarding any pending trigger.
    pub(crate) fn schedule(&self, fire: Box<dyn FnOnce() + Send>) {
        let mut timer = self.timer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = timer.take() {
            previous.abort();
        }
        let window = self.window;
        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            fire();
        }));
    }

    /// Drop any pending trigger without firing it.
    pub(crate) fn cancel(&self) {
        if let Some(previous) = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.abort();
        }
    }
}

impl Drop for DebounceGate {
    fn drop(&mut self) {
        self.cancel();
    }
}
