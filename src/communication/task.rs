use tokio::sync::oneshot::Sender;

use crate::error::{Result, SessionError};

/// # Task
///
/// One caller's pending request, packaged for inclusion in a batch.
///
/// A task pairs the caller's inputs and requested output names with a oneshot
/// channel on which its terminal result travels back. The channel plays the
/// role of status slot, output slot, and completion handle at once: it is
/// written exactly once, and the write is what releases the blocked caller.
///
/// ## Lifecycle
///
/// 1. The session creates the task on the calling side, after validating the
///    inputs and computing the leading-dimension size
/// 2. The scheduler holds the task until it closes a batch containing it
/// 3. The batch processor consumes the task, sending either the task's output
///    tensors or the batch's shared failure status
/// 4. The caller, having awaited the paired receiver, observes the result
pub struct Task<B> {
    /// The caller's `(name, tensor)` input pairs
    inputs: Vec<(String, B)>,

    /// The output names the caller asked for, in the caller's order
    output_tensor_names: Vec<String>,

    /// Number of examples this task contributes to a batch
    zeroth_dim_size: usize,

    /// Channel for delivering the terminal result to the caller
    sender: Sender<Result<Vec<B>>>,
}

impl<B> Task<B> {
    pub(crate) fn new(
        inputs: Vec<(String, B)>,
        output_tensor_names: Vec<String>,
        zeroth_dim_size: usize,
        sender: Sender<Result<Vec<B>>>,
    ) -> Self {
        Self {
            inputs,
            output_tensor_names,
            zeroth_dim_size,
            sender,
        }
    }

    /// The caller's input pairs.
    pub fn inputs(&self) -> &[(String, B)] {
        &self.inputs
    }

    /// The output names the caller requested, in the caller's order.
    pub fn output_tensor_names(&self) -> &[String] {
        &self.output_tensor_names
    }

    /// The number of examples this task contributes to a batch, as computed
    /// from its input tensors at submission time.
    pub fn size(&self) -> usize {
        self.zeroth_dim_size
    }

    /// Delivers the terminal result and releases the waiting caller.
    ///
    /// Consumes the task, so a task cannot complete twice. A send failure
    /// means the caller's receiver is gone; there is nobody left to inform.
    pub(crate) fn complete(self, result: Result<Vec<B>>) {
        let _ = self.sender.send(result);
    }

    /// Convenience for failing a task with a cloned batch status.
    pub(crate) fn fail(self, status: SessionError) {
        self.complete(Err(status));
    }
}
