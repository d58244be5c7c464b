//! Single-slot coalescing latch
//!
//! At most one run is in flight. A request arriving during a run marks the
//! slot pending and returns at once; when the run ends, a marked slot causes
//! exactly one more run. Any number of requests during one run collapse into
//! that single trailing run.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};

const IDLE: u8 = 0;
const RUNNING: u8 = 1;
const PENDING: u8 = 2;

#[derive(Debug, Default)]
pub struct CoalescingLatch {
    state: AtomicU8,
}

/// Puts the latch back to idle if a run is dropped mid-flight
struct RunGuard<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(IDLE, Ordering::SeqCst);
        }
    }
}

impl CoalescingLatch {
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(IDLE),
        }
    }

    /// Take the slot, or mark it pending. True if the caller must run.
    fn try_acquire(&self) -> bool {
        let previous = self.state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| match s {
            IDLE => Some(RUNNING),
            _ => Some(PENDING),
        });
        previous == Ok(IDLE)
    }

    /// Finish a run. True if a request came in meanwhile and another run is owed.
    fn release_or_rearm(&self) -> bool {
        let previous = self.state.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |s| match s {
            PENDING => Some(RUNNING),
            _ => Some(IDLE),
        });
        previous == Ok(PENDING)
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) != IDLE
    }

    /// Run `work`, coalescing with any run already in flight.
    ///
    /// Returns the number of times `work` ran in this call: 0 if another
    /// caller owns the slot, otherwise 1 plus one per trailing run.
    pub async fn run<F, Fut>(&self, mut work: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        if !self.try_acquire() {
            return 0;
        }

        let mut guard = RunGuard {
            state: &self.state,
            armed: true,
        };
        let mut runs = 0;
        loop {
            work().await;
            runs += 1;
            if !self.release_or_rearm() {
                break;
            }
        }
        guard.armed = false;
        runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_single_run_when_idle() {
        let latch = CoalescingLatch::new();
        let count = AtomicUsize::new(0);
        let counter = &count;
        let runs = latch
            .run(move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        assert_eq!(runs, 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!latch.is_running());
    }

    #[tokio::test]
    async fn test_overlapping_requests_coalesce_into_one_trailing_run() {
        let latch = CoalescingLatch::new();
        let count = AtomicUsize::new(0);
        let counter = &count;
        let work = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
        };

        let (a, b, c, d) = tokio::join!(latch.run(work), latch.run(work), latch.run(work), latch.run(work));
        assert_eq!(a, 2);
        assert_eq!((b, c, d), (0, 0, 0));
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!latch.is_running());
    }

    #[tokio::test]
    async fn test_request_during_trailing_run_queues_another() {
        let latch = Arc::new(CoalescingLatch::new());
        let count = Arc::new(AtomicUsize::new(0));

        let spawn_run = |latch: Arc<CoalescingLatch>, count: Arc<AtomicUsize>| {
            tokio::spawn(async move {
                latch
                    .run(|| {
                        let count = count.clone();
                        async move {
                            count.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(30)).await;
                        }
                    })
                    .await
            })
        };

        let first = spawn_run(latch.clone(), count.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(spawn_run(latch.clone(), count.clone()).await.unwrap(), 0);
        // Lands during the trailing run
        tokio::time::sleep(Duration::from_millis(35)).await;
        assert_eq!(spawn_run(latch.clone(), count.clone()).await.unwrap(), 0);

        assert_eq!(first.await.unwrap(), 3);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_dropped_run_releases_latch() {
        let latch = CoalescingLatch::new();
        let never = latch.run(|| std::future::pending::<()>());
        let _ = tokio::time::timeout(Duration::from_millis(5), never).await;
        assert!(!latch.is_running());

        let runs = latch.run(|| async {}).await;
        assert_eq!(runs, 1);
    }
}
