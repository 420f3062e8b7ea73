//! # Batching Session
//!
//! The public façade of the crate: a session that mirrors the wrapped
//! engine's call contract while transparently coalescing concurrent calls
//! into batched engine invocations.
//!
//! ## Overview
//!
//! A [`BatchingSession`] is constructed over a wrapped engine together with
//! the set of [`TensorSignature`]s it should batch, one scheduler per
//! signature. Each call is routed by its derived signature:
//!
//! - A declared signature sends the call through that signature's scheduler,
//!   where it waits to travel in a batch with its peers
//! - An undeclared signature is logged and passed through to the wrapped
//!   engine in-line, unbatched
//!
//! The caller's future resolves once its rows have gone through the engine
//! and been split back out, carrying exactly the rows it submitted.

mod processor;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;
use tracing::warn;

use crate::backend::Backend;
use crate::communication::{Completion, Task};
use crate::error::{Result, SessionError};
use crate::scheduler::{
    BasicBatchScheduler, BasicSchedulerOptions, Batch, BatchScheduler, ProcessBatchCallback,
    SchedulerCreator,
};
use crate::signature::TensorSignature;
use processor::BatchProcessor;

/// The call contract shared by the wrapped engine and the batching façade.
///
/// `run` executes the named output tensors for the given inputs and returns
/// them in the order requested. Target nodes are part of the signature for
/// contract parity with engines that support them; the batching path rejects
/// non-empty target node lists.
#[async_trait]
pub trait Session<B: Backend>: Send + Sync {
    async fn run(
        &self,
        inputs: &[(String, B)],
        output_tensor_names: &[String],
        target_node_names: &[String],
    ) -> Result<Vec<B>>;
}

/// Session-level batching configuration.
#[derive(Clone, Debug, Default)]
pub struct BatchingSessionOptions {
    /// Ascending batch sizes the wrapped engine accepts. When non-empty,
    /// every merged batch is padded up to the smallest entry that holds it.
    /// Empty disables rounding.
    pub allowed_batch_sizes: Vec<usize>,
}

/// One declared signature paired with the closure that builds its scheduler.
pub struct SignatureWithSchedulerCreator<B: Backend> {
    pub signature: TensorSignature,
    pub scheduler_creator: SchedulerCreator<B>,
}

/// # BatchingSession
///
/// A session that performs batching on top of a wrapped engine.
///
/// The signature→scheduler map is fixed at construction; concurrent callers
/// share it without coordination. The session owns the wrapped engine and
/// every scheduler; schedulers shut down before the engine is released.
pub struct BatchingSession<B: Backend> {
    schedulers: HashMap<TensorSignature, Box<dyn BatchScheduler<B>>>,
    wrapped: Arc<dyn Session<B>>,
}

impl<B: Backend> BatchingSession<B> {
    /// Constructs a batching session over `wrapped`.
    ///
    /// For each `(signature, creator)` pair, the creator is invoked with a
    /// process-batch callback bound to that signature, and the scheduler it
    /// returns is stored under the signature key.
    pub fn create(
        options: BatchingSessionOptions,
        wrapped: Arc<dyn Session<B>>,
        signatures_with_scheduler_creators: Vec<SignatureWithSchedulerCreator<B>>,
    ) -> Result<Self> {
        let processor = Arc::new(BatchProcessor::new(options, wrapped.clone()));

        let mut schedulers = HashMap::with_capacity(signatures_with_scheduler_creators.len());
        for entry in signatures_with_scheduler_creators {
            let SignatureWithSchedulerCreator {
                signature,
                scheduler_creator,
            } = entry;

            let callback: ProcessBatchCallback<B> = {
                let processor = processor.clone();
                let signature = signature.clone();
                Arc::new(move |batch: Batch<B>| {
                    let processor = processor.clone();
                    let signature = signature.clone();
                    Box::pin(async move {
                        processor.process_batch(&signature, batch).await;
                    })
                })
            };

            let scheduler = scheduler_creator(callback)?;
            schedulers.insert(signature, scheduler);
        }

        Ok(Self {
            schedulers,
            wrapped,
        })
    }

    /// Computes the leading-dimension size a task contributes to a batch.
    ///
    /// All input tensors must agree on that size, and every tensor must have
    /// at least one dimension; otherwise the submission is rejected before a
    /// task is created.
    fn compute_input_size(inputs: &[(String, B)]) -> Result<usize> {
        let mut size: Option<usize> = None;
        for (_, tensor) in inputs {
            let shape = tensor.shape();
            if shape.is_empty() {
                return Err(SessionError::InvalidArgument(
                    "batching session input tensors must have at least one dimension".to_string(),
                ));
            }
            match size {
                None => size = Some(shape[0]),
                Some(expected) if expected != shape[0] => {
                    return Err(SessionError::InvalidArgument(
                        "batching session input tensors must have equal 0th-dimension size"
                            .to_string(),
                    ));
                }
                Some(_) => {}
            }
        }
        size.ok_or_else(|| {
            SessionError::InvalidArgument(
                "batching session must have at least one input tensor".to_string(),
            )
        })
    }
}

#[async_trait]
impl<B: Backend> Session<B> for BatchingSession<B> {
    async fn run(
        &self,
        inputs: &[(String, B)],
        output_tensor_names: &[String],
        target_node_names: &[String],
    ) -> Result<Vec<B>> {
        if !target_node_names.is_empty() {
            return Err(SessionError::InvalidConfiguration(
                "batching session does not support target nodes".to_string(),
            ));
        }

        let signature = TensorSignature::from_run_args(inputs, output_tensor_names);
        let Some(scheduler) = self.schedulers.get(&signature) else {
            // An ad-hoc call the operator did not declare as batchable. Keep
            // it correct, at the cost of no batching.
            warn!(
                %signature,
                "request does not match any declared signature; bypassing batching"
            );
            return self
                .wrapped
                .run(inputs, output_tensor_names, target_node_names)
                .await;
        };

        let zeroth_dim_size = Self::compute_input_size(inputs)?;

        let (sender, receiver) = oneshot::channel();
        let task = Task::new(
            inputs.to_vec(),
            output_tensor_names.to_vec(),
            zeroth_dim_size,
            sender,
        );
        scheduler.schedule(task).await?;

        Completion::new(receiver).await
    }
}

/// Constructs a batching session with a single declared signature served by a
/// [`BasicBatchScheduler`].
///
/// Validates that a non-empty `allowed_batch_sizes` ends exactly at the
/// scheduler's `max_batch_size`; anything else would leave the largest
/// batches unrounded and is rejected as a configuration error.
pub fn create_basic_batching_session<B: Backend>(
    schedule_options: BasicSchedulerOptions,
    batching_session_options: BatchingSessionOptions,
    signature: TensorSignature,
    wrapped: Arc<dyn Session<B>>,
) -> Result<BatchingSession<B>> {
    if let Some(&last) = batching_session_options.allowed_batch_sizes.last() {
        if last != schedule_options.max_batch_size {
            return Err(SessionError::InvalidConfiguration(format!(
                "last entry in allowed_batch_sizes must match max_batch_size; \
                 last entry was {last}; expected {}",
                schedule_options.max_batch_size
            )));
        }
    }

    let scheduler_creator: SchedulerCreator<B> = Box::new(move |process_batch_callback| {
        let scheduler = BasicBatchScheduler::new(schedule_options, process_batch_callback)?;
        Ok(Box::new(scheduler) as Box<dyn BatchScheduler<B>>)
    });

    BatchingSession::create(
        batching_session_options,
        wrapped,
        vec![SignatureWithSchedulerCreator {
            signature,
            scheduler_creator,
        }],
    )
}
