use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type Action = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

#[derive(Default)]
struct Slot {
    generation: u64,
    timer: Option<JoinHandle<()>>,
    /// Timer whose action is executing, tagged with its generation.
    running: Option<(u64, JoinHandle<()>)>,
}

/// Runs an action once after a quiet period.
///
/// Every `schedule` restarts the timer, so a burst of triggers collapses into
/// a single run. `flush` skips the wait and runs a pending action right away.
#[derive(Clone)]
pub struct DebouncedTask {
    delay: Duration,
    action: Action,
    slot: Arc<Mutex<Slot>>,
}

impl DebouncedTask {
    pub fn new<F>(delay: Duration, action: F) -> Self
    where
        F: Fn() -> TaskFuture + Send + Sync + 'static,
    {
        Self {
            delay,
            action: Arc::new(action),
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Starts or restarts the timer. Must be called inside a tokio runtime.
    pub fn schedule(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = slot.timer.take() {
            timer.abort();
        }
        slot.generation += 1;
        let generation = slot.generation;

        let shared = Arc::clone(&self.slot);
        let action = Arc::clone(&self.action);
        let delay = self.delay;
        slot.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            {
                let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
                if slot.generation != generation {
                    return;
                }
                slot.running = slot.timer.take().map(|timer| (generation, timer));
            }
            debug!("debounced task firing");
            action().await;
            let mut slot = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.running.as_ref().is_some_and(|(run, _)| *run == generation) {
                slot.running = None;
            }
        }));
    }

    /// Runs the pending action now and waits for one that already fired.
    /// Returns whether any action ran.
    pub async fn flush(&self) -> bool {
        let (pending, running) = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            slot.generation += 1;
            (slot.timer.take(), slot.running.take())
        };

        let waited = match running {
            Some((_, handle)) => {
                debug!("waiting for running debounced task");
                let _ = handle.await;
                true
            }
            None => false,
        };
        let Some(timer) = pending else {
            return waited;
        };
        timer.abort();
        debug!("debounced task flushed");
        (self.action)().await;
        true
    }

    /// Drops the pending action without running it.
    pub fn cancel(&self) {
        if let Some(timer) = self.take_pending() {
            timer.abort();
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .timer
            .is_some()
    }

    fn take_pending(&self) -> Option<JoinHandle<()>> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.generation += 1;
        slot.timer.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(delay: Duration) -> (DebouncedTask, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = DebouncedTask::new(delay, move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        (task, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_schedules_runs_once() {
        let (task, runs) = counting(Duration::from_millis(1_500));
        for _ in 0..5 {
            task.schedule();
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(task.is_pending());

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!task.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_resets_the_timer() {
        let (task, runs) = counting(Duration::from_millis(1_000));
        task.schedule();
        tokio::time::sleep(Duration::from_millis(900)).await;
        task.schedule();
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_runs_pending_action_immediately_once() {
        let (task, runs) = counting(Duration::from_millis(1_500));
        assert!(!task.flush().await);

        task.schedule();
        assert!(task.flush().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_an_action_already_running() {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let task = DebouncedTask::new(Duration::from_millis(1_000), move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });

        task.schedule();
        tokio::time::sleep(Duration::from_millis(1_050)).await;
        assert!(!task.is_pending());
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        assert!(task.flush().await);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!task.flush().await);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_action() {
        let (task, runs) = counting(Duration::from_millis(100));
        task.schedule();
        task.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }
}
