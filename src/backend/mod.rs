//! # Tensor Backend
//!
//! This module provides a unified interface over tensor implementations,
//! allowing the batching session to merge and split request tensors in a
//! backend-agnostic manner.
//!
//! ## Usage
//!
//! Users of this crate can work with tensors in a backend-agnostic way by:
//!
//! 1. Importing the [`Backend`] trait
//! 2. Implementing it for their tensor type (only three operations are
//!    required: shape inspection, concatenation, and slicing)
//! 3. Instantiating the session types with that tensor type
//!
//! The batching layer only ever manipulates the leading (batch) dimension, so
//! any tensor representation with cheap leading-dimension slicing works well.

mod core_trait;

// Re-export the core trait for convenient imports
pub use core_trait::*;

#[cfg(test)]
/// Mock tensor implementation.
///
/// Operates on simple row-major vector tensors
pub(crate) mod mock_tensor;
