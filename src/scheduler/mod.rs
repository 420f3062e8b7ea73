//! # Batch Scheduling
//!
//! This module defines the contract between the batching session and a batch
//! scheduler, plus a basic queue-and-timer scheduler implementation.
//!
//! A scheduler is constructed around a process-batch callback. It accepts
//! tasks one at a time through [`BatchScheduler::schedule`], groups them into
//! batches by its own policy, and invokes the callback exactly once per
//! closed batch, on a worker of its own.

mod basic;
mod batch;
mod worker;

pub use basic::{BasicBatchScheduler, BasicSchedulerOptions};
pub use batch::Batch;

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::backend::Backend;
use crate::communication::Task;
use crate::error::Result;

/// Callback a scheduler invokes, on a worker of its own, for each batch it
/// closes. Takes the owning handle to the closed batch.
pub type ProcessBatchCallback<B> = Arc<dyn Fn(Batch<B>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Builds a scheduler around a process-batch callback.
///
/// The session factory calls each creator once, handing it a callback bound
/// to that scheduler's signature.
pub type SchedulerCreator<B> =
    Box<dyn FnOnce(ProcessBatchCallback<B>) -> Result<Box<dyn BatchScheduler<B>>> + Send>;

/// The scheduling contract the batching session consumes.
#[async_trait]
pub trait BatchScheduler<B: Backend>: Send + Sync {
    /// Enqueues a task for inclusion in exactly one future batch.
    ///
    /// May fail synchronously, e.g. when the scheduler's queue is full; on
    /// success the task's completion is the processor's responsibility.
    async fn schedule(&self, task: Task<B>) -> Result<()>;
}
