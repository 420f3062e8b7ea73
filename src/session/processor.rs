use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, error};

use crate::backend::Backend;
use crate::error::{Result, SessionError};
use crate::scheduler::Batch;
use crate::signature::TensorSignature;
use crate::tensor::operations::{cat_rows, padding_row, split_rows};
use super::{BatchingSessionOptions, Session};

/// # BatchProcessor
///
/// Executes one closed batch: merges the tasks' inputs into a single engine
/// call, runs the wrapped engine, splits the combined outputs back out, and
/// completes every task.
///
/// Shared by the session façade and every per-signature scheduler callback.
pub(crate) struct BatchProcessor<B: Backend> {
    options: BatchingSessionOptions,
    wrapped: Arc<dyn Session<B>>,
}

impl<B: Backend> BatchProcessor<B> {
    pub(crate) fn new(options: BatchingSessionOptions, wrapped: Arc<dyn Session<B>>) -> Self {
        Self { options, wrapped }
    }

    /// Returns the smallest allowed batch size that can hold `batch_size`,
    /// or `batch_size` itself when no allowed sizes are configured.
    pub(crate) fn round_to_lowest_allowed_batch_size(&self, batch_size: usize) -> usize {
        if self.options.allowed_batch_sizes.is_empty() {
            return batch_size;
        }
        for &allowed_size in &self.options.allowed_batch_sizes {
            if allowed_size >= batch_size {
                return allowed_size;
            }
        }
        error!(
            batch_size,
            "batch size greater than largest allowed size; ignoring allowed sizes constraint"
        );
        batch_size
    }

    /// Concatenates the batch's inputs into one merged input list, padding up
    /// to the nearest allowed batch size.
    ///
    /// Tensors are gathered per input name in task order; padding rows are
    /// sliced from the last task's tensors so the engine only ever sees valid
    /// example data. Merged pairs are emitted in the signature's order.
    pub(crate) fn merge_input_tensors(
        &self,
        signature: &TensorSignature,
        batch: &Batch<B>,
    ) -> Result<Vec<(String, B)>> {
        if batch.num_tasks() < 1 {
            return Err(SessionError::Internal(format!(
                "batch size expected to be positive; was {}",
                batch.num_tasks()
            )));
        }

        let padding_size = self.round_to_lowest_allowed_batch_size(batch.size()) - batch.size();

        // For each input tensor name, the tensors from the individual tasks.
        let mut tensors_to_merge: BTreeMap<String, Vec<B>> = BTreeMap::new();
        for (i, task) in batch.tasks().iter().enumerate() {
            let is_last_task = i + 1 == batch.num_tasks();
            for (tensor_name, tensor) in task.inputs() {
                let tensor_vec = tensors_to_merge.entry(tensor_name.clone()).or_default();
                tensor_vec.push(tensor.clone());

                if is_last_task && padding_size > 0 {
                    // Pad with replicas of a row we know is valid, via a
                    // leading-dimension slice rather than a fresh allocation.
                    let padding = padding_row(tensor);
                    for _ in 0..padding_size {
                        tensor_vec.push(padding.clone());
                    }
                }
            }
        }

        if tensors_to_merge.len() != signature.input_tensors().len() {
            return Err(SessionError::Internal(
                "one or more tasks does not conform to batch signature".to_string(),
            ));
        }

        let mut merged_inputs = Vec::with_capacity(tensors_to_merge.len());
        for tensor_name in signature.input_tensors() {
            let tensors = tensors_to_merge.get(tensor_name).ok_or_else(|| {
                SessionError::Internal(
                    "one or more tasks does not conform to batch signature".to_string(),
                )
            })?;
            merged_inputs.push((tensor_name.clone(), cat_rows(tensors)));
        }

        Ok(merged_inputs)
    }

    /// Splits the combined engine outputs back into per-task output vectors,
    /// discarding the padding piece.
    ///
    /// Each task's vector is ordered by the task's own requested output
    /// names, matching the contract the caller sees on a direct engine call.
    pub(crate) fn split_output_tensors(
        &self,
        signature: &TensorSignature,
        combined_outputs: &[B],
        batch: &Batch<B>,
    ) -> Result<Vec<Vec<B>>> {
        if batch.num_tasks() < 1 {
            return Err(SessionError::Internal(format!(
                "batch size expected to be positive; was {}",
                batch.num_tasks()
            )));
        }

        let mut task_sizes_plus_optional_padding: Vec<usize> =
            batch.tasks().iter().map(|task| task.size()).collect();
        let padding_size = self.round_to_lowest_allowed_batch_size(batch.size()) - batch.size();
        if padding_size > 0 {
            task_sizes_plus_optional_padding.push(padding_size);
        }

        if combined_outputs.len() != signature.output_tensors().len() {
            return Err(SessionError::Internal(
                "wrong number of batched output tensors".to_string(),
            ));
        }

        // For each output tensor name, a divided-up tensor with one entry per
        // task (plus the ignored padding entry).
        let mut split_tensors: BTreeMap<&String, Vec<B>> = BTreeMap::new();
        for (tensor_name, tensor) in signature.output_tensors().iter().zip(combined_outputs) {
            let shape = tensor.shape();
            if shape.is_empty() {
                return Err(SessionError::FailedPrecondition(
                    "batched output tensor has 0 dimensions".to_string(),
                ));
            }
            if shape[0] != batch.size() + padding_size {
                return Err(SessionError::FailedPrecondition(
                    "batched output tensor's 0th dimension does not equal the sum of the \
                     0th dimension sizes of the input tensors"
                        .to_string(),
                ));
            }
            split_tensors.insert(
                tensor_name,
                split_rows(tensor, &task_sizes_plus_optional_padding),
            );
        }

        let mut task_outputs = Vec::with_capacity(batch.num_tasks());
        for (i, task) in batch.tasks().iter().enumerate() {
            let mut outputs = Vec::with_capacity(task.output_tensor_names().len());
            for tensor_name in task.output_tensor_names() {
                let pieces = split_tensors.get(tensor_name).ok_or_else(|| {
                    SessionError::Internal(
                        "task does not conform to batch signature".to_string(),
                    )
                })?;
                let piece = pieces.get(i).ok_or_else(|| {
                    SessionError::Internal(format!(
                        "tensor split did not produce a piece for task {i}"
                    ))
                })?;
                outputs.push(piece.clone());
            }
            task_outputs.push(outputs);
        }

        Ok(task_outputs)
    }

    /// Processes one closed batch and completes every task in it.
    ///
    /// Every exit path delivers the same terminal status to all tasks: the
    /// batch is drained exactly once, into either per-task outputs or clones
    /// of the failure.
    pub(crate) async fn process_batch(&self, signature: &TensorSignature, batch: Batch<B>) {
        // The scheduler may invoke us slightly before the close propagates.
        batch.wait_until_closed().await;

        if batch.is_empty() {
            return;
        }

        debug!(
            num_tasks = batch.num_tasks(),
            size = batch.size(),
            %signature,
            "processing batch"
        );

        match self.run_batch(signature, &batch).await {
            Ok(task_outputs) => {
                for (task, outputs) in batch.into_tasks().into_iter().zip(task_outputs) {
                    task.complete(Ok(outputs));
                }
            }
            Err(status) => {
                for task in batch.into_tasks() {
                    task.fail(status.clone());
                }
            }
        }
    }

    /// The fallible stretch of batch processing: merge, engine call, split.
    async fn run_batch(
        &self,
        signature: &TensorSignature,
        batch: &Batch<B>,
    ) -> Result<Vec<Vec<B>>> {
        let merged_inputs = self.merge_input_tensors(signature, batch)?;

        let output_tensor_names: Vec<String> =
            signature.output_tensors().iter().cloned().collect();
        let combined_outputs = self
            .wrapped
            .run(&merged_inputs, &output_tensor_names, &[])
            .await?;

        self.split_output_tensors(signature, &combined_outputs, batch)
    }
}
