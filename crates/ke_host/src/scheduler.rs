//! Deferred/recurring task scheduler on host runtime time.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;

use parking_lot::Mutex;

pub type TaskId = u64;

type TaskCallback = Box<dyn FnMut() + Send>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

struct Task {
    due_seconds: f64,
    interval_seconds: Option<f64>,
    cancelled: bool,
    // Taken out while the callback runs, so callbacks can reach the
    // scheduler through a cloned handle without deadlocking.
    callback: Option<TaskCallback>,
}

// Min-heap entry: earliest due time first, task id as the stable
// tiebreaker so same-time tasks fire in insertion order.
struct HeapEntry {
    due_seconds: f64,
    task_id: TaskId,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest entry.
        other
            .due_seconds
            .total_cmp(&self.due_seconds)
            .then_with(|| other.task_id.cmp(&self.task_id))
    }
}

#[derive(Default)]
struct SchedulerInner {
    now_seconds: f64,
    next_task_id: TaskId,
    tasks: HashMap<TaskId, Task>,
    queue: BinaryHeap<HeapEntry>,
    enqueued_count: u64,
    dequeued_count: u64,
}

/// Time-based scheduler for the runtime and modules.
///
/// Cloning yields another handle onto the same queue; callbacks may
/// schedule or cancel through a clone while `advance` runs.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<Mutex<SchedulerInner>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner {
                next_task_id: 1,
                ..Default::default()
            })),
        }
    }

    pub fn now_seconds(&self) -> f64 {
        self.inner.lock().now_seconds
    }

    /// Count of active (non-cancelled) queued tasks.
    pub fn queued_task_count(&self) -> usize {
        self.inner
            .lock()
            .tasks
            .values()
            .filter(|task| !task.cancelled)
            .count()
    }

    /// Schedule a one-shot callback after a delay.
    pub fn call_later(
        &self,
        delay_seconds: f64,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<TaskId, SchedulerError> {
        if delay_seconds < 0.0 {
            return Err(SchedulerError::InvalidArgument(
                "delay_seconds must be >= 0".to_owned(),
            ));
        }
        let mut inner = self.inner.lock();
        let due_seconds = inner.now_seconds + delay_seconds;
        Ok(inner.schedule(due_seconds, None, Box::new(callback)))
    }

    /// Schedule a recurring callback at a fixed interval.
    pub fn call_every(
        &self,
        interval_seconds: f64,
        callback: impl FnMut() + Send + 'static,
    ) -> Result<TaskId, SchedulerError> {
        if interval_seconds <= 0.0 {
            return Err(SchedulerError::InvalidArgument(
                "interval_seconds must be > 0".to_owned(),
            ));
        }
        let mut inner = self.inner.lock();
        let due_seconds = inner.now_seconds + interval_seconds;
        Ok(inner.schedule(due_seconds, Some(interval_seconds), Box::new(callback)))
    }

    /// Cancel a scheduled task if it exists. Idempotent.
    pub fn cancel(&self, task_id: TaskId) {
        if let Some(task) = self.inner.lock().tasks.get_mut(&task_id) {
            task.cancelled = true;
        }
    }

    /// Enqueued/dequeued counters since the previous call, then reset.
    pub fn consume_activity_counts(&self) -> (u64, u64) {
        let mut inner = self.inner.lock();
        let counts = (inner.enqueued_count, inner.dequeued_count);
        inner.enqueued_count = 0;
        inner.dequeued_count = 0;
        counts
    }

    /// Advance the scheduler clock and run due callbacks.
    pub fn advance(&self, delta_seconds: f64) -> Result<usize, SchedulerError> {
        if delta_seconds < 0.0 {
            return Err(SchedulerError::InvalidArgument(
                "delta_seconds must be >= 0".to_owned(),
            ));
        }
        let now_seconds = {
            let mut inner = self.inner.lock();
            inner.now_seconds += delta_seconds;
            inner.now_seconds
        };
        Ok(self.run_due_at(now_seconds))
    }

    /// Run callbacks due at or before `now_seconds`.
    pub fn run_due(&self, now_seconds: f64) -> Result<usize, SchedulerError> {
        {
            let mut inner = self.inner.lock();
            if now_seconds < inner.now_seconds {
                return Err(SchedulerError::InvalidArgument(
                    "now_seconds cannot move backwards".to_owned(),
                ));
            }
            inner.now_seconds = now_seconds;
        }
        Ok(self.run_due_at(now_seconds))
    }

    // Pops due entries one at a time, releasing the lock while each
    // callback runs. Recurring tasks are re-queued only after the loop,
    // so one `advance` never fires the same task twice; fresh tasks
    // scheduled by callbacks still run when due.
    fn run_due_at(&self, now_seconds: f64) -> usize {
        let mut executed = 0;
        let mut requeue: Vec<HeapEntry> = Vec::new();

        loop {
            let (task_id, mut callback) = {
                let mut inner = self.inner.lock();
                let Some(entry) = inner.queue.pop() else {
                    break;
                };
                if entry.due_seconds > now_seconds {
                    inner.queue.push(entry);
                    break;
                }
                let task_id = entry.task_id;
                match inner.tasks.get_mut(&task_id) {
                    None => continue,
                    Some(task) if task.cancelled => {
                        inner.tasks.remove(&task_id);
                        continue;
                    }
                    Some(task) => match task.callback.take() {
                        // A stale heap entry for a task that is already
                        // mid-flight elsewhere; skip it.
                        None => continue,
                        Some(callback) => (task_id, callback),
                    },
                }
            };

            callback();
            executed += 1;

            let mut inner = self.inner.lock();
            inner.dequeued_count += 1;
            let Some(task) = inner.tasks.get_mut(&task_id) else {
                continue;
            };
            if task.cancelled {
                inner.tasks.remove(&task_id);
                continue;
            }
            match task.interval_seconds {
                None => {
                    inner.tasks.remove(&task_id);
                }
                Some(interval_seconds) => {
                    task.due_seconds += interval_seconds;
                    task.callback = Some(callback);
                    requeue.push(HeapEntry {
                        due_seconds: task.due_seconds,
                        task_id,
                    });
                }
            }
        }

        let mut inner = self.inner.lock();
        for entry in requeue {
            inner.queue.push(entry);
        }
        executed
    }
}

impl SchedulerInner {
    fn schedule(
        &mut self,
        due_seconds: f64,
        interval_seconds: Option<f64>,
        callback: TaskCallback,
    ) -> TaskId {
        let task_id = self.next_task_id;
        self.next_task_id += 1;
        self.tasks.insert(
            task_id,
            Task {
                due_seconds,
                interval_seconds,
                cancelled: false,
                callback: Some(callback),
            },
        );
        self.queue.push(HeapEntry {
            due_seconds,
            task_id,
        });
        self.enqueued_count += 1;
        task_id
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    #[test]
    fn due_order_with_partial_advances() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(Mutex::new(Vec::new()));

        let sink = fired.clone();
        scheduler
            .call_later(0.2, move || sink.lock().push("A"))
            .unwrap();
        let sink = fired.clone();
        scheduler
            .call_later(0.1, move || sink.lock().push("B"))
            .unwrap();

        assert_eq!(scheduler.advance(0.05).unwrap(), 0);
        assert!(fired.lock().is_empty());
        assert_eq!(scheduler.advance(0.1).unwrap(), 1);
        assert_eq!(*fired.lock(), vec!["B"]);
        assert_eq!(scheduler.advance(0.05).unwrap(), 1);
        assert_eq!(*fired.lock(), vec!["B", "A"]);
        assert_eq!(scheduler.queued_task_count(), 0);
    }

    #[test]
    fn same_due_time_fires_in_insertion_order() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let sink = fired.clone();
            scheduler
                .call_later(0.5, move || sink.lock().push(name))
                .unwrap();
        }
        scheduler.advance(0.5).unwrap();
        assert_eq!(*fired.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn recurring_task_runs_once_per_advance() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        scheduler
            .call_every(0.1, move || {
                sink.fetch_add(1, AtomicOrdering::SeqCst);
            })
            .unwrap();

        // A large advance covers many intervals but fires exactly once.
        assert_eq!(scheduler.advance(1.0).unwrap(), 1);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(scheduler.queued_task_count(), 1);
        // The re-queued occurrence is due on the next advance.
        assert_eq!(scheduler.advance(0.0).unwrap(), 1);
    }

    #[test]
    fn cancel_is_idempotent_and_skips_execution() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let sink = count.clone();
        let task = scheduler
            .call_later(0.1, move || {
                sink.fetch_add(1, AtomicOrdering::SeqCst);
            })
            .unwrap();
        scheduler.cancel(task);
        scheduler.cancel(task);
        assert_eq!(scheduler.queued_task_count(), 0);
        assert_eq!(scheduler.advance(1.0).unwrap(), 0);
        assert_eq!(count.load(AtomicOrdering::SeqCst), 0);
    }

    #[test]
    fn callbacks_may_schedule_tasks_that_run_in_the_same_advance() {
        let scheduler = Scheduler::new();
        let fired = Arc::new(Mutex::new(Vec::new()));

        let inner_scheduler = scheduler.clone();
        let sink = fired.clone();
        scheduler
            .call_later(0.1, move || {
                sink.lock().push("outer");
                let sink = sink.clone();
                // Due immediately: runs within this same advance.
                inner_scheduler
                    .call_later(0.0, move || sink.lock().push("inner"))
                    .unwrap();
            })
            .unwrap();

        assert_eq!(scheduler.advance(0.2).unwrap(), 2);
        assert_eq!(*fired.lock(), vec!["outer", "inner"]);
    }

    #[test]
    fn recurring_callback_can_cancel_itself() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle: Arc<Mutex<Option<TaskId>>> = Arc::new(Mutex::new(None));

        let inner_scheduler = scheduler.clone();
        let inner_handle = handle.clone();
        let sink = count.clone();
        let task = scheduler
            .call_every(0.1, move || {
                sink.fetch_add(1, AtomicOrdering::SeqCst);
                if let Some(task_id) = *inner_handle.lock() {
                    inner_scheduler.cancel(task_id);
                }
            })
            .unwrap();
        *handle.lock() = Some(task);

        scheduler.advance(0.1).unwrap();
        scheduler.advance(1.0).unwrap();
        assert_eq!(count.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(scheduler.queued_task_count(), 0);
    }

    #[test]
    fn invalid_arguments_are_rejected() {
        let scheduler = Scheduler::new();
        assert!(scheduler.call_later(-0.1, || {}).is_err());
        assert!(scheduler.call_every(0.0, || {}).is_err());
        assert!(scheduler.advance(-0.5).is_err());
        scheduler.advance(1.0).unwrap();
        assert!(scheduler.run_due(0.5).is_err());
    }

    #[test]
    fn activity_counts_match_invocations() {
        let scheduler = Scheduler::new();
        let mut total_invocations = 0usize;
        let mut total_dequeued = 0u64;

        for round in 0..3 {
            for _ in 0..=round {
                scheduler.call_later(0.0, || {}).unwrap();
            }
            total_invocations += scheduler.advance(0.1).unwrap();
            let (enqueued, dequeued) = scheduler.consume_activity_counts();
            assert_eq!(enqueued, round as u64 + 1);
            total_dequeued += dequeued;
        }
        assert_eq!(total_dequeued, total_invocations as u64);
        // Counters reset on consumption.
        assert_eq!(scheduler.consume_activity_counts(), (0, 0));
    }
}
