//! Rolling-window rate limiting for provider calls.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

/// Bounds calls per rolling time window.
///
/// `acquire` blocks until a slot frees; a held slot is returned by an
/// explicit [`release`](RateLimiter::release) (normally via the permit
/// guard) or by aging past the window. The internal counters are the one
/// resource legitimately shared across concurrent conversations; access to
/// them is mutually exclusive per acquire/release pair.
#[derive(Debug)]
pub struct RateLimiter {
    max_calls: usize,
    time_window: Duration,
    held: Mutex<VecDeque<Instant>>,
    freed: Notify,
}

impl RateLimiter {
    /// `max_calls` permitted per `time_window`.
    pub fn new(max_calls: usize, time_window: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1),
            time_window,
            held: Mutex::new(VecDeque::new()),
            freed: Notify::new(),
        }
    }

    /// Requests-per-minute convenience constructor.
    pub fn per_minute(max_calls: usize) -> Self {
        Self::new(max_calls, Duration::from_secs(60))
    }

    /// Block until a slot is available, then take it.
    ///
    /// The returned permit releases the slot on drop, so the slot is given
    /// back even when the guarded call errors or panics.
    pub async fn acquire(&self) -> RateLimitPermit<'_> {
        loop {
            let freed = self.freed.notified();
            tokio::pin!(freed);
            freed.as_mut().enable();

            let wait_until = {
                let mut held = self.held.lock().expect("rate limiter poisoned");
                let now = Instant::now();
                while held
                    .front()
                    .is_some_and(|t| now.duration_since(*t) >= self.time_window)
                {
                    held.pop_front();
                }
                if held.len() < self.max_calls {
                    held.push_back(now);
                    return RateLimitPermit { limiter: self };
                }
                held.front().map(|t| *t + self.time_window)
            };

            match wait_until {
                Some(deadline) => {
                    tokio::select! {
                        _ = &mut freed => {}
                        _ = tokio::time::sleep_until(deadline) => {}
                    }
                }
                None => freed.await,
            }
        }
    }

    /// Return the oldest held slot.
    pub fn release(&self) {
        let mut held = self.held.lock().expect("rate limiter poisoned");
        held.pop_front();
        drop(held);
        self.freed.notify_waiters();
    }

    /// Slots currently held (expired entries included until next purge).
    pub fn held_slots(&self) -> usize {
        self.held.lock().expect("rate limiter poisoned").len()
    }
}

/// Guard for one rate-limit slot; releases on drop.
#[derive(Debug)]
pub struct RateLimitPermit<'a> {
    limiter: &'a RateLimiter,
}

impl Drop for RateLimitPermit<'_> {
    fn drop(&mut self) {
        self.limiter.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn extra_caller_blocks_until_release() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));

        let first = limiter.acquire().await;
        let _second = limiter.acquire().await;

        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished(), "third caller should be blocked");

        drop(first);
        tokio::time::advance(Duration::from_millis(1)).await;
        waiter.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn extra_caller_unblocks_when_window_elapses() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_secs(10)));

        let held = limiter.acquire().await;
        let waiter = {
            let limiter = limiter.clone();
            tokio::spawn(async move {
                let _permit = limiter.acquire().await;
            })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        // No release; the held slot ages out of the window instead.
        tokio::time::advance(Duration::from_secs(11)).await;
        waiter.await.unwrap();
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn permits_up_to_max_calls_do_not_block() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let _a = limiter.acquire().await;
        let _b = limiter.acquire().await;
        let _c = limiter.acquire().await;
        assert_eq!(limiter.held_slots(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_permit_returns_slot() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        {
            let _permit = limiter.acquire().await;
            assert_eq!(limiter.held_slots(), 1);
        }
        assert_eq!(limiter.held_slots(), 0);
    }
}
