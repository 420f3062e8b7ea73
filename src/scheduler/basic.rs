use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::debug;

use crate::backend::Backend;
use crate::communication::Task;
use crate::error::{Result, SessionError};
use super::batch::Batch;
use super::worker::BatchWorkerHandle;
use super::{BatchScheduler, ProcessBatchCallback};

/// How long an idle worker sleeps before re-checking its running flag.
const IDLE_POLL: Duration = Duration::from_millis(100);

/// Configuration of the basic queue-and-timer scheduler.
#[derive(Clone, Copy, Debug)]
pub struct BasicSchedulerOptions {
    /// Largest number of rows a batch may carry. Also the largest admissible
    /// single task.
    pub max_batch_size: usize,

    /// How long a non-full batch may wait for more tasks before closing.
    pub batch_timeout: Duration,

    /// Rows of queued work beyond which `schedule` rejects new tasks.
    pub max_enqueued_size: usize,
}

impl Default for BasicSchedulerOptions {
    fn default() -> Self {
        Self {
            max_batch_size: 32,
            batch_timeout: Duration::from_millis(10),
            max_enqueued_size: 1024,
        }
    }
}

struct QueuedTask<B> {
    task: Task<B>,
    enqueued_at: Instant,
}

/// # BasicBatchScheduler
///
/// Groups tasks into batches by row count and age: a batch closes as soon as
/// its rows reach `max_batch_size`, or once its oldest task has waited
/// `batch_timeout`. Closed batches are handed to the process-batch callback
/// on a dedicated worker task, one at a time, in arrival order.
pub struct BasicBatchScheduler<B: Backend> {
    options: BasicSchedulerOptions,

    /// FIFO of tasks not yet assigned to a closed batch
    queue: Arc<Mutex<VecDeque<QueuedTask<B>>>>,

    worker: BatchWorkerHandle,
}

impl<B: Backend> BasicBatchScheduler<B> {
    pub fn new(
        options: BasicSchedulerOptions,
        process_batch_callback: ProcessBatchCallback<B>,
    ) -> Result<Self> {
        if options.max_batch_size == 0 {
            return Err(SessionError::InvalidArgument(
                "max_batch_size must be positive".to_string(),
            ));
        }

        let queue: Arc<Mutex<VecDeque<QueuedTask<B>>>> = Arc::new(Mutex::new(VecDeque::new()));

        let worker = BatchWorkerHandle::new({
            let queue = queue.clone();
            move |running, notifier| {
                tokio::spawn(scheduling_loop(
                    options,
                    queue,
                    process_batch_callback,
                    running,
                    notifier,
                ))
            }
        });

        Ok(Self {
            options,
            queue,
            worker,
        })
    }
}

#[async_trait]
impl<B: Backend> BatchScheduler<B> for BasicBatchScheduler<B> {
    async fn schedule(&self, task: Task<B>) -> Result<()> {
        if task.size() > self.options.max_batch_size {
            return Err(SessionError::InvalidArgument(format!(
                "task size {} is larger than maximum batch size {}",
                task.size(),
                self.options.max_batch_size
            )));
        }

        {
            let mut queue = self.queue.lock().await;
            let queued_size: usize = queue.iter().map(|queued| queued.task.size()).sum();
            if queued_size + task.size() > self.options.max_enqueued_size {
                return Err(SessionError::Unavailable(
                    "batch scheduler queue is full".to_string(),
                ));
            }
            queue.push_back(QueuedTask {
                task,
                enqueued_at: Instant::now(),
            });
        }

        // Notify the worker that new work is available
        self.worker.notify();
        Ok(())
    }
}

async fn scheduling_loop<B: Backend>(
    options: BasicSchedulerOptions,
    queue: Arc<Mutex<VecDeque<QueuedTask<B>>>>,
    process_batch_callback: ProcessBatchCallback<B>,
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
) {
    loop {
        if !running.load(Ordering::SeqCst) {
            break;
        }

        let (queued_size, oldest) = {
            let queue = queue.lock().await;
            (
                queue.iter().map(|queued| queued.task.size()).sum::<usize>(),
                queue.front().map(|queued| queued.enqueued_at),
            )
        };

        let Some(oldest) = oldest else {
            // Nothing queued; park until new work arrives or check the
            // running flag again.
            let _ = tokio::time::timeout(IDLE_POLL, notifier.notified()).await;
            continue;
        };

        let age = oldest.elapsed();
        if queued_size < options.max_batch_size && age < options.batch_timeout {
            // The open batch is neither full nor expired. Sleep until its
            // deadline, or until another arrival might fill it.
            let remaining = options.batch_timeout - age;
            let _ = tokio::time::timeout(remaining, notifier.notified()).await;
            continue;
        }

        // Close over a FIFO prefix of tasks that fit. A task that does not
        // fit stays queued and opens the next batch.
        let batch = {
            let mut queue = queue.lock().await;
            let mut batch = Batch::new();
            while queue
                .front()
                .is_some_and(|queued| batch.size() + queued.task.size() <= options.max_batch_size)
            {
                if let Some(queued) = queue.pop_front() {
                    batch.push(queued.task);
                }
            }
            batch
        };

        if batch.is_empty() {
            continue;
        }

        debug!(num_tasks = batch.num_tasks(), size = batch.size(), "dispatching batch");
        batch.close();
        (process_batch_callback)(batch).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock_tensor::MockTensor;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    fn task_of_size(size: usize) -> Task<MockTensor> {
        let (tx, _rx) = oneshot::channel();
        let rows: Vec<Vec<f32>> = (0..size).map(|i| vec![i as f32]).collect();
        let row_refs: Vec<&[f32]> = rows.iter().map(|r| r.as_slice()).collect();
        Task::new(
            vec![("x".to_string(), MockTensor::from_rows(&row_refs))],
            vec!["y".to_string()],
            size,
            tx,
        )
    }

    /// Records the task sizes of each dispatched batch, completes the tasks
    /// with empty outputs, and signals once per batch.
    fn recording_callback(
        dispatched: Arc<StdMutex<Vec<Vec<usize>>>>,
        done: UnboundedSender<()>,
    ) -> ProcessBatchCallback<MockTensor> {
        Arc::new(move |batch: Batch<MockTensor>| {
            let dispatched = dispatched.clone();
            let done = done.clone();
            Box::pin(async move {
                batch.wait_until_closed().await;
                let sizes: Vec<usize> = batch.tasks().iter().map(Task::size).collect();
                dispatched.lock().expect("test lock").push(sizes);
                for task in batch.into_tasks() {
                    task.complete(Ok(vec![]));
                }
                let _ = done.send(());
            })
        })
    }

    #[tokio::test]
    async fn test_oversized_task_is_rejected() {
        let dispatched = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, _done_rx) = unbounded_channel();
        let scheduler = BasicBatchScheduler::new(
            BasicSchedulerOptions {
                max_batch_size: 2,
                batch_timeout: Duration::from_secs(10),
                max_enqueued_size: 100,
            },
            recording_callback(dispatched.clone(), done_tx),
        )
        .expect("scheduler must construct");

        let result = scheduler.schedule(task_of_size(3)).await;

        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
        assert!(dispatched.lock().expect("test lock").is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_rejects_synchronously() {
        let dispatched = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, _done_rx) = unbounded_channel();
        // A long timeout and large batch size keep the queued tasks parked.
        let scheduler = BasicBatchScheduler::new(
            BasicSchedulerOptions {
                max_batch_size: 100,
                batch_timeout: Duration::from_secs(10),
                max_enqueued_size: 2,
            },
            recording_callback(dispatched, done_tx),
        )
        .expect("scheduler must construct");

        scheduler.schedule(task_of_size(1)).await.expect("first fits");
        scheduler.schedule(task_of_size(1)).await.expect("second fits");

        let result = scheduler.schedule(task_of_size(1)).await;
        assert!(matches!(result, Err(SessionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_batch_closes_when_full() {
        let dispatched = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, mut done_rx) = unbounded_channel();
        let scheduler = BasicBatchScheduler::new(
            BasicSchedulerOptions {
                max_batch_size: 3,
                batch_timeout: Duration::from_secs(10),
                max_enqueued_size: 100,
            },
            recording_callback(dispatched.clone(), done_tx),
        )
        .expect("scheduler must construct");

        scheduler.schedule(task_of_size(1)).await.expect("schedule");
        scheduler.schedule(task_of_size(2)).await.expect("schedule");

        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("a full batch must dispatch without waiting out the timer");

        assert_eq!(*dispatched.lock().expect("test lock"), vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn test_batch_closes_on_timeout() {
        let dispatched = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, mut done_rx) = unbounded_channel();
        let scheduler = BasicBatchScheduler::new(
            BasicSchedulerOptions {
                max_batch_size: 100,
                batch_timeout: Duration::from_millis(20),
                max_enqueued_size: 100,
            },
            recording_callback(dispatched.clone(), done_tx),
        )
        .expect("scheduler must construct");

        scheduler.schedule(task_of_size(2)).await.expect("schedule");

        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("an aged batch must dispatch despite spare capacity");

        assert_eq!(*dispatched.lock().expect("test lock"), vec![vec![2]]);
    }

    #[tokio::test]
    async fn test_nonfitting_task_opens_the_next_batch() {
        let dispatched = Arc::new(StdMutex::new(Vec::new()));
        let (done_tx, mut done_rx) = unbounded_channel();
        let scheduler = BasicBatchScheduler::new(
            BasicSchedulerOptions {
                max_batch_size: 3,
                batch_timeout: Duration::from_millis(20),
                max_enqueued_size: 100,
            },
            recording_callback(dispatched.clone(), done_tx),
        )
        .expect("scheduler must construct");

        scheduler.schedule(task_of_size(2)).await.expect("schedule");
        scheduler.schedule(task_of_size(2)).await.expect("schedule");

        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("first batch");
        timeout(Duration::from_secs(1), done_rx.recv())
            .await
            .expect("second batch");

        assert_eq!(
            *dispatched.lock().expect("test lock"),
            vec![vec![2], vec![2]],
            "a task that does not fit must stay FIFO and open the next batch"
        );
    }

    #[tokio::test]
    async fn test_zero_max_batch_size_fails_construction() {
        let (done_tx, _done_rx) = unbounded_channel();
        let result = BasicBatchScheduler::<MockTensor>::new(
            BasicSchedulerOptions {
                max_batch_size: 0,
                ..Default::default()
            },
            recording_callback(Arc::new(StdMutex::new(Vec::new())), done_tx),
        );

        assert!(matches!(result, Err(SessionError::InvalidArgument(_))));
    }
}
