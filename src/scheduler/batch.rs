use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

use crate::communication::Task;

/// # Batch
///
/// An ordered set of tasks a scheduler has grouped for joint dispatch.
///
/// A batch is open while the scheduler may still add tasks and closed once
/// its membership is final. Processors must observe the close before reading
/// the task list, because a scheduler is allowed to invoke its process-batch
/// callback slightly ahead of the close propagating.
pub struct Batch<B> {
    tasks: Vec<Task<B>>,
    closed: Arc<AtomicBool>,
    close_notify: Arc<Notify>,
}

impl<B> Batch<B> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            closed: Arc::new(AtomicBool::new(false)),
            close_notify: Arc::new(Notify::new()),
        }
    }

    /// Appends a task. Callers must not push into a closed batch.
    pub fn push(&mut self, task: Task<B>) {
        debug_assert!(!self.closed.load(Ordering::Acquire), "push into a closed batch");
        self.tasks.push(task);
    }

    /// Number of tasks in the batch.
    pub fn num_tasks(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Total rows in the batch: the sum of the tasks' leading-dimension
    /// sizes.
    pub fn size(&self) -> usize {
        self.tasks.iter().map(Task::size).sum()
    }

    /// The i-th task, in scheduler-presentation order.
    pub fn task(&self, index: usize) -> &Task<B> {
        &self.tasks[index]
    }

    /// All tasks, in scheduler-presentation order.
    pub fn tasks(&self) -> &[Task<B>] {
        &self.tasks
    }

    /// Consumes the batch, yielding its tasks for completion fan-out.
    pub(crate) fn into_tasks(self) -> Vec<Task<B>> {
        self.tasks
    }

    /// Marks the membership final and wakes any processor waiting on it.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.close_notify.notify_waiters();
    }

    /// Blocks until no further tasks will be added.
    pub async fn wait_until_closed(&self) {
        while !self.closed.load(Ordering::Acquire) {
            let notified = self.close_notify.notified();
            // Re-check after registering, so a close racing with registration
            // is not missed.
            if self.closed.load(Ordering::Acquire) {
                break;
            }
            notified.await;
        }
    }
}

impl<B> Default for Batch<B> {
    fn default() -> Self {
        Self::new()
    }
}
