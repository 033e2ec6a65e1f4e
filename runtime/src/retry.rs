//! Retry backoff and countdown scheduling.
//!
//! The countdown formula is `interval * attempt + attempt` seconds, clamped
//! to `[1, 30]` — kept verbatim for compatibility; the intent is simply a
//! monotonically increasing backoff with a ceiling. The countdown ticks once
//! per second through an observable cell so a UI can render "retrying in Ns",
//! and fires a callback when it reaches zero.

use reqflow_core::observable::Observable;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Seconds to wait before retry number `attempt` (1-based).
#[must_use]
pub fn backoff_countdown(interval_secs: u64, attempt: u32) -> u32 {
    let attempt = u64::from(attempt);
    let countdown = interval_secs.saturating_mul(attempt).saturating_add(attempt);
    u32::try_from(countdown.clamp(1, 30)).unwrap_or(30)
}

/// Start a 1 Hz countdown on `cell` from `seconds`, invoking `on_zero` when
/// it expires. The returned handle aborts the countdown when dropped into a
/// timer slot and replaced.
pub(crate) fn spawn_countdown(
    cell: Observable<u32>,
    seconds: u32,
    on_zero: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    cell.set(seconds);
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let remaining = cell.get().saturating_sub(1);
            cell.set(remaining);
            if remaining == 0 {
                break;
            }
        }
        on_zero();
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn countdown_matches_formula() {
        assert_eq!(backoff_countdown(2, 1), 3);
        assert_eq!(backoff_countdown(2, 2), 6);
        assert_eq!(backoff_countdown(2, 3), 9);
    }

    #[test]
    fn countdown_is_clamped() {
        assert_eq!(backoff_countdown(0, 0), 1);
        assert_eq!(backoff_countdown(20, 5), 30);
        assert_eq!(backoff_countdown(u64::MAX, u32::MAX), 30);
    }

    proptest! {
        #[test]
        fn countdown_stays_in_range(interval in 0u64..100, attempt in 0u32..100) {
            let countdown = backoff_countdown(interval, attempt);
            prop_assert!((1..=30).contains(&countdown));
        }

        #[test]
        fn countdown_is_monotonic_in_attempt(interval in 0u64..10, attempt in 1u32..50) {
            prop_assert!(
                backoff_countdown(interval, attempt + 1) >= backoff_countdown(interval, attempt)
            );
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_down_and_fires() {
        let cell = Observable::new(0u32);
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let _handle = spawn_countdown(cell.clone(), 3, move || {
            flag.store(true, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(cell.get(), 2);
        assert!(!fired.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(cell.get(), 0);
        tokio::task::yield_now().await;
        assert!(fired.load(Ordering::SeqCst));
    }
}
