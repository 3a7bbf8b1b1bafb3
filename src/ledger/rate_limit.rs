//! Outbound request budget for the ledger client.
//!
//! Fixed-window counter: N requests per window. `acquire()` suspends the
//! caller until the window resets when the budget is exhausted — callers see
//! a wait, never a failure. The counter is the one piece of shared mutable
//! state in the engine, so it lives behind a single mutex and is shared by
//! `Arc` wherever the ledger client is shared.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::LedgerConfig;

struct WindowState {
    window_start: Instant,
    used: u32,
}

/// Injectable fixed-window request budget.
pub struct RateBudget {
    max_requests: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl RateBudget {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            max_requests: config.max_requests.max(1),
            window: config.window,
            state: Mutex::new(WindowState {
                window_start: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Take one request slot, waiting for the window to reset if exhausted.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                let elapsed = state.window_start.elapsed();
                if elapsed >= self.window {
                    state.window_start = Instant::now();
                    state.used = 0;
                }
                if state.used < self.max_requests {
                    state.used += 1;
                    return;
                }
                self.window.saturating_sub(elapsed)
            };

            tracing::debug!(wait = ?wait, "Ledger rate budget exhausted, waiting for window reset");
            tokio::time::sleep(wait).await;
        }
    }

    /// Requests used in the current window (observability only).
    pub async fn used(&self) -> u32 {
        let state = self.state.lock().await;
        if state.window_start.elapsed() >= self.window {
            0
        } else {
            state.used
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max: u32, window_secs: u64) -> RateBudget {
        RateBudget::new(&LedgerConfig {
            max_requests: max,
            window: Duration::from_secs(window_secs),
        })
    }

    #[tokio::test(start_paused = true)]
    async fn acquire_within_budget_does_not_wait() {
        let b = budget(3, 100);
        let before = Instant::now();
        b.acquire().await;
        b.acquire().await;
        b.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
        assert_eq!(b.used().await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_blocks_until_window_reset() {
        let b = budget(2, 100);
        b.acquire().await;
        b.acquire().await;

        let before = Instant::now();
        b.acquire().await; // must wait for the window to expire
        assert!(before.elapsed() >= Duration::from_secs(100));
        // The wait reset the window; the new one has a single slot used.
        assert_eq!(b.used().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn counter_resets_on_window_expiry() {
        let b = budget(2, 100);
        b.acquire().await;
        b.acquire().await;

        tokio::time::sleep(Duration::from_secs(101)).await;
        assert_eq!(b.used().await, 0);

        let before = Instant::now();
        b.acquire().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }
}
