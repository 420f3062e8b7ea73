use crate::backend::Backend;
use super::constant::BATCH_DIM;

/// Concatenates per-task tensors (plus any padding rows) into one batch tensor.
///
/// # Parameters
///
/// * `tensors` - Tensors of shape `(n_i, ...)` with matching trailing shapes
///
/// # Returns
///
/// A tensor of shape `(sum n_i, ...)` with the inputs stacked in the order
/// supplied.
pub(crate) fn cat_rows<B>(tensors: &[B]) -> B
where B: Backend
{
    B::cat(tensors, BATCH_DIM)
}

/// Produces a single valid example row to use as batch padding.
///
/// The row is the first example of `tensor`, taken as a leading-dimension
/// slice so that backends with view semantics pay no copy.
pub(crate) fn padding_row<B>(tensor: &B) -> B
where B: Backend
{
    tensor.slice(BATCH_DIM, 0, 1)
}

/// Splits a batched tensor into consecutive pieces of the given
/// leading-dimension sizes.
///
/// # Parameters
///
/// * `tensor` - Tensor of shape `(sum sizes, ...)` to divide
/// * `sizes` - Leading-dimension size of each piece, in order
///
/// # Returns
///
/// One tensor per entry of `sizes`, sliced from consecutive row ranges.
pub(crate) fn split_rows<B>(tensor: &B, sizes: &[usize]) -> Vec<B>
where B: Backend
{
    let mut pieces = Vec::with_capacity(sizes.len());
    let mut offset = 0;
    for &size in sizes {
        pieces.push(tensor.slice(BATCH_DIM, offset, size));
        offset += size;
    }
    pieces
}
