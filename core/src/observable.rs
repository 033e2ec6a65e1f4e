//! Reactive cells built on `tokio::sync::watch`.
//!
//! Every lifecycle field an operation exposes (`pending`, `loading`, `data`,
//! ...) is an [`Observable`]: a single-value cell that can be read, written,
//! and subscribed to for change notification. Any UI-binding layer can adapt
//! a watch receiver to its own reactivity system.
//!
//! # Example
//!
//! ```
//! use reqflow_core::observable::Observable;
//!
//! let cell = Observable::new(0u32);
//! let mut rx = cell.subscribe();
//! cell.set(1);
//! assert_eq!(cell.get(), 1);
//! assert!(rx.has_changed().unwrap());
//! ```

use tokio::sync::watch;

/// A reactive single-value cell.
///
/// Cloning an `Observable` clones the handle, not the value: all clones share
/// the same underlying channel. The cell keeps one receiver alive internally
/// so writes never fail with a closed channel.
#[derive(Debug)]
pub struct Observable<T> {
    tx: watch::Sender<T>,
    // Held so the channel stays open even with no external subscribers.
    _keepalive: watch::Receiver<T>,
}

impl<T> Observable<T> {
    /// Create a new cell holding `initial`.
    #[must_use]
    pub fn new(initial: T) -> Self {
        let (tx, rx) = watch::channel(initial);
        Self { tx, _keepalive: rx }
    }

    /// Read the current value.
    #[must_use]
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.tx.borrow().clone()
    }

    /// Read the current value through a projection, without cloning the whole
    /// value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.tx.borrow())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_modify(f);
    }

    /// Mutate the value in place without notifying subscribers.
    ///
    /// This is the shallow-observe path: deep mutations made through a data
    /// merge hook can skip notification, and the caller triggers it manually
    /// with [`Observable::notify`] once the batch is complete.
    pub fn mutate_silent(&self, f: impl FnOnce(&mut T)) {
        self.tx.send_if_modified(|value| {
            f(value);
            false
        });
    }

    /// Notify subscribers without changing the value.
    pub fn notify(&self) {
        self.tx.send_if_modified(|_| true);
    }

    /// Subscribe to change notifications.
    ///
    /// The receiver observes the value at subscription time and every
    /// subsequent notified write.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    /// Wait until the value is changed by a notified write.
    pub async fn changed(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.changed().await;
    }
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            _keepalive: self.tx.subscribe(),
        }
    }
}

impl<T: Default> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let cell = Observable::new(1u32);
        assert_eq!(cell.get(), 1);
        cell.set(2);
        assert_eq!(cell.get(), 2);
    }

    #[test]
    fn clones_share_state() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        a.set(String::from("y"));
        assert_eq!(b.get(), "y");
    }

    #[test]
    fn silent_mutation_skips_notification() {
        let cell = Observable::new(vec![1]);
        let mut rx = cell.subscribe();
        assert!(!rx.has_changed().unwrap());

        cell.mutate_silent(|v| v.push(2));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(cell.get(), vec![1, 2]);

        cell.notify();
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn changed_wakes_on_set() {
        let cell = Observable::new(0u32);
        let waiter = cell.clone();
        let task = tokio::spawn(async move { waiter.changed().await });
        tokio::task::yield_now().await;
        cell.set(5);
        task.await.unwrap();
        assert_eq!(cell.get(), 5);
    }
}
