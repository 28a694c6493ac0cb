//! Cancellable delayed task with at most one pending run.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct PendingRun {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

/// Runs a future after a delay. Scheduling again before it fires replaces the
/// pending run, so bursts of triggers collapse into one.
///
/// Cancellation only reaches a run that is still waiting out its delay. Once
/// the delay elapsed the future runs to completion.
#[derive(Debug, Default)]
pub struct ScheduledTask {
    pending: Mutex<Option<PendingRun>>,
}

impl ScheduledTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, cancelling any run that has not fired yet.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                () = token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
            task.await;
        });

        let previous = self.lock().replace(PendingRun { handle, cancel });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }
    }

    /// Cancel the run if it has not fired yet. Returns whether a run was
    /// still outstanding.
    pub fn cancel(&self) -> bool {
        let Some(run) = self.lock().take() else {
            return false;
        };
        run.cancel.cancel();
        !run.handle.is_finished()
    }

    /// Whether a run is waiting or still running.
    pub fn is_pending(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    fn lock(&self) -> MutexGuard<'_, Option<PendingRun>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(run) = self.lock().take() {
            run.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::{Notify, Semaphore};

    fn counting_task(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_after_delay() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = ScheduledTask::new();
        task.schedule(Duration::from_secs(1), counting_task(&counter));
        assert!(task.is_pending());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!task.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_debounces() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = ScheduledTask::new();
        for _ in 0..5 {
            task.schedule(Duration::from_secs(1), counting_task(&counter));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_run() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = ScheduledTask::new();
        task.schedule(Duration::from_secs(1), counting_task(&counter));
        assert!(task.cancel());
        assert!(!task.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_that_already_fired_is_not_interrupted() {
        let started = Arc::new(Notify::new());
        let gate = Arc::new(Semaphore::new(0));
        let counter = Arc::new(AtomicUsize::new(0));
        let task = ScheduledTask::new();

        task.schedule(Duration::from_secs(1), {
            let (started, gate, counter) = (started.clone(), gate.clone(), counter.clone());
            async move {
                started.notify_one();
                let _permit = gate.acquire().await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        started.notified().await;

        // Replacing and cancelling only touch the new, still waiting run.
        task.schedule(Duration::from_secs(1), counting_task(&counter));
        assert!(task.cancel());

        gate.add_permits(1);
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
