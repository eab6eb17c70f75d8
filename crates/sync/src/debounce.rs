//! Trailing-edge debounce for search input
//!
//! Each keystroke calls [`SearchDebouncer::settle`]. The call waits out the
//! window and hands the value back only if no newer keystroke arrived in the
//! meantime, so a burst of input produces exactly one request, for the last
//! value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Default debounce window
pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct SearchDebouncer {
    window: Duration,
    latest: AtomicU64,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SearchDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            latest: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Wait out the window; `None` if a newer value superseded this one
    pub async fn settle<T>(&self, value: T) -> Option<T> {
        let ticket = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        tokio::time::sleep(self.window).await;
        if self.latest.load(Ordering::Acquire) == ticket {
            Some(value)
        } else {
            tracing::trace!(ticket, "debounced input superseded");
            None
        }
    }

    /// Drop any value still waiting
    pub fn cancel(&self) {
        self.latest.fetch_add(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_single_value_settles() {
        let debouncer = SearchDebouncer::default();
        assert_eq!(debouncer.settle("Alice").await, Some("Alice"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_keeps_only_last_value() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(300));
        let typed = |text: &'static str, after: u64| {
            let debouncer = &debouncer;
            async move {
                tokio::time::sleep(Duration::from_millis(after)).await;
                debouncer.settle(text).await
            }
        };
        let (a, b, c) = tokio::join!(typed("Al", 0), typed("Ali", 100), typed("Alice", 200));
        assert_eq!((a, b, c), (None, None, Some("Alice")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_values_outside_window_both_settle() {
        let debouncer = SearchDebouncer::new(Duration::from_millis(300));
        assert_eq!(debouncer.settle(1).await, Some(1));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(debouncer.settle(2).await, Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_drops_pending_value() {
        let debouncer = SearchDebouncer::default();
        let pending = debouncer.settle("Al");
        let cancel = async { debouncer.cancel() };
        let (value, ()) = tokio::join!(pending, cancel);
        assert_eq!(value, None);
    }
}
