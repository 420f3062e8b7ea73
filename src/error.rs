use thiserror::Error;

/// Terminal status of a batching-session call.
///
/// The error is `Clone` because a single batch-level failure is delivered to
/// every task that travelled in that batch. Statuses produced by the wrapped
/// engine pass through to callers unmodified; the variants below cover the
/// failures the batching layer itself can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The call or the session construction was configured in a way the
    /// batching layer cannot serve (e.g. target nodes were requested, or the
    /// allowed batch sizes disagree with the scheduler's maximum).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The submitted request is malformed (no inputs, a rank-0 input tensor,
    /// or input tensors that disagree on their leading-dimension size).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The wrapped engine produced outputs that cannot be split back into
    /// per-task rows.
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// An invariant the submission path should have enforced did not hold by
    /// the time the batch was processed.
    #[error("internal: {0}")]
    Internal(String),

    /// The scheduler's queue is full; the request was rejected without being
    /// enqueued.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// A failure originating inside the wrapped engine.
    #[error("engine: {0}")]
    Engine(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_kind_and_message() {
        let err = SessionError::InvalidArgument("no inputs".to_string());
        assert_eq!(err.to_string(), "invalid argument: no inputs");

        let err = SessionError::Unavailable("batch queue is full".to_string());
        assert_eq!(err.to_string(), "unavailable: batch queue is full");
    }

    #[test]
    fn test_clone_preserves_equality() {
        let err = SessionError::Engine("model exploded".to_string());
        assert_eq!(err.clone(), err);
    }
}
