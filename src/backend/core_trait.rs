use std::fmt::Debug;

/// The trait that must be fulfilled by any tensor type to support batching
pub trait Backend: Debug + Clone + Send + Sync + 'static {
    /// Return the shape of this tensor
    fn shape(&self) -> Vec<usize>;

    /// Concatenate several tensors to each other along dimension `dim`, in the order supplied
    fn cat(tensors: &[Self], dim: usize) -> Self;

    /// Slice `len` entries along `dim` starting at `start`.
    ///
    /// Implementations are encouraged to make the leading-dimension case a
    /// zero-copy view; the batching layer uses it to build padding rows.
    fn slice(&self, dim: usize, start: usize, len: usize) -> Self;
}
