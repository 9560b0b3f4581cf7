//! Shared measurement session state.
//!
//! One [`Session`] object owns the submission queue, the activity log, the
//! harness clock, and the cancellation flag, and is handed to the generator,
//! the pipeline worker, and the driver. There are no module-level singletons;
//! everything that is shared flows through here explicitly.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::activity::ActivityLog;
use crate::clock::HarnessClock;
use crate::config::HarnessConfig;
use crate::pipeline::SubmissionQueue;

/// Opt-in early-stop control.
///
/// Checked by the generator at each emission and by the pipeline worker at
/// each dequeue. It does not interrupt an exchange already in flight; a
/// stalled peer still stalls the worker until the transport errors out.
#[derive(Debug, Clone)]
pub struct CancelFlag {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelFlag {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request a stop. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once `cancel` has been called (immediately if it already was).
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        while !*rx.borrow_and_update() {
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for one benchmark session.
#[derive(Clone)]
pub struct Session {
    pub queue: Arc<SubmissionQueue>,
    pub log: Arc<Mutex<ActivityLog>>,
    pub clock: HarnessClock,
    pub cancel: CancelFlag,
}

impl Session {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            queue: Arc::new(SubmissionQueue::new(config.queue_high_water)),
            log: Arc::new(Mutex::new(ActivityLog::new(config.log_capacity))),
            clock: HarnessClock::start(),
            cancel: CancelFlag::new(),
        }
    }

    /// Clear the queue and the log so the next round starts from empty state.
    ///
    /// Both locks are acquired before either structure is cleared, so no
    /// observer can see an empty queue alongside stale log entries (or the
    /// reverse).
    pub fn reset_round(&self) {
        let mut queue = self.queue.lock();
        let mut log = self.log.lock();
        queue.clear();
        log.reset();
        drop(log);
        drop(queue);
        self.queue.rearm_high_water();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::RequestDescriptor;
    use crate::protocol::Direction;
    use std::time::Duration;

    #[test]
    fn reset_round_clears_queue_and_log() {
        let session = Session::new(&HarnessConfig::default());
        session.queue.enqueue(RequestDescriptor {
            direction: Direction::Write,
            address: 0,
            size: 4096,
            issue_timestamp: 1,
        });
        session.log.lock().push(1, 2, 4096);

        session.reset_round();

        assert_eq!(session.queue.depth(), 0);
        assert!(session.log.lock().is_empty());
    }

    #[tokio::test]
    async fn cancel_flag_wakes_waiters() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());

        let waiter = {
            let flag = flag.clone();
            tokio::spawn(async move { flag.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        flag.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woke up")
            .expect("waiter task completed");
        assert!(flag.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_immediately_when_already_set() {
        let flag = CancelFlag::new();
        flag.cancel();
        tokio::time::timeout(Duration::from_millis(50), flag.cancelled())
            .await
            .expect("resolved without waiting");
    }
}
