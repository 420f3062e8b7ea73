//! # Request-Batching Session Layer
//!
//! A session layer that sits in front of a single-request inference engine
//! and transparently coalesces concurrent calls into larger batched
//! invocations.
//!
//! ## Overview
//!
//! Inference engines are substantially more efficient per example when run on
//! a batch, but callers arrive with independent, latency-sensitive requests
//! of varying sizes. This crate presents the same per-request call contract
//! as the underlying engine while internally grouping, padding, dispatching,
//! and demultiplexing:
//!
//! - Each call derives a [`TensorSignature`] (its input/output name sets) and
//!   is routed to the batch scheduler declared for that signature
//! - The scheduler groups concurrent tasks into a batch by row count and age
//! - A batch processor concatenates the tasks' inputs along the batch
//!   dimension, pads up to an allowed batch size, runs the wrapped engine
//!   once, and slices the combined outputs back out to each caller
//! - Calls whose signature was not declared pass through to the wrapped
//!   engine unbatched, preserving correctness for ad-hoc requests
//!
//! ## Architecture
//!
//! The crate is built around a few seams:
//!
//! ### Backend Trait
//!
//! The [`Backend`] trait is the tensor abstraction the batching logic is
//! written against. Any tensor type with shape inspection, concatenation,
//! and leading-dimension slicing can be batched.
//!
//! ### Session Trait
//!
//! The [`Session`] trait captures the engine call contract. The wrapped
//! engine implements it; [`BatchingSession`] implements it too, so the
//! batching layer composes anywhere a session is expected.
//!
//! ### Scheduler Contract
//!
//! Batch formation policy lives behind the [`BatchScheduler`] trait. A
//! scheduler is constructed around a process-batch callback and decides only
//! *when* a group of tasks becomes a batch; [`BasicBatchScheduler`] closes
//! batches by row count or queue age.
//!
//! ## Concurrency
//!
//! Callers suspend exactly once per call, on their task's completion
//! channel. Batches are processed on scheduler-owned workers; the completion
//! channel provides the happens-before edge between the processor's writes
//! and the caller's reads, so no further locking is involved.

mod communication;
mod tensor;

pub mod backend;
pub mod error;
pub mod scheduler;
pub mod session;
pub mod signature;

pub use backend::Backend;
pub use communication::Task;
pub use error::SessionError;
pub use scheduler::{
    BasicBatchScheduler, BasicSchedulerOptions, Batch, BatchScheduler, ProcessBatchCallback,
    SchedulerCreator,
};
pub use session::{
    create_basic_batching_session, BatchingSession, BatchingSessionOptions, Session,
    SignatureWithSchedulerCreator,
};
pub use signature::{SignatureDef, TensorInfo, TensorSignature};
