use std::sync::{Arc, atomic::{AtomicBool, Ordering}};

use tokio::{sync::Notify, task::JoinHandle};

/// Owns a scheduler's background worker: a running flag, a wakeup channel,
/// and the spawned task itself. Dropping the handle stops the worker.
pub(crate) struct BatchWorkerHandle {
    running: Arc<AtomicBool>,
    notifier: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl BatchWorkerHandle {
    /// Spawns a worker. The closure receives the shared running flag and
    /// wakeup channel and must return the spawned task's join handle.
    pub fn new<F>(task: F) -> Self
    where
        F: FnOnce(Arc<AtomicBool>, Arc<Notify>) -> JoinHandle<()>,
    {
        let running = Arc::new(AtomicBool::new(true));
        let notifier = Arc::new(Notify::new());
        let handle = task(running.clone(), notifier.clone());

        Self {
            running,
            notifier,
            handle: Some(handle),
        }
    }

    /// Wakes the worker to re-examine its queue.
    pub fn notify(&self) {
        self.notifier.notify_one();
    }

    pub fn shutdown(&mut self) {
        // Signal the worker to stop, then wake it so it observes the flag.
        self.running.store(false, Ordering::SeqCst);
        self.notifier.notify_one();

        // Detach rather than abort: the loop finishes its current batch, sees
        // the flag on the next iteration, and exits.
        if let Some(handle) = self.handle.take() {
            drop(handle);
        }
    }
}

impl Drop for BatchWorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_worker_runs_until_shutdown() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let mut worker = BatchWorkerHandle::new(|running, notifier| {
            tokio::spawn(async move {
                while running.load(Ordering::SeqCst) {
                    let _ = timeout(Duration::from_millis(10), notifier.notified()).await;
                }
                let _ = tx.send(());
            })
        });

        worker.shutdown();

        timeout(Duration::from_secs(1), rx)
            .await
            .expect("worker must observe shutdown promptly")
            .expect("worker must send its exit marker");
    }

    #[tokio::test]
    async fn test_notify_wakes_a_parked_worker() {
        let (tx, rx) = tokio::sync::oneshot::channel();

        let worker = BatchWorkerHandle::new(|_running, notifier| {
            tokio::spawn(async move {
                notifier.notified().await;
                let _ = tx.send(());
            })
        });

        worker.notify();

        timeout(Duration::from_secs(1), rx)
            .await
            .expect("notify must wake the worker")
            .expect("worker must send its wake marker");
    }
}
