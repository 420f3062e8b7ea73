use crate::backend::Backend;

// A simple row-major tensor over f32 data, for testing the batching paths
// with real values.
#[derive(Clone, Debug, PartialEq)]
pub struct MockTensor {
    pub(crate) shape: Vec<usize>,
    pub(crate) data: Vec<f32>,
}

impl MockTensor {
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        let numel: usize = shape.iter().product();
        assert_eq!(numel, data.len(), "shape {:?} does not match {} elements", shape, data.len());
        Self { shape, data }
    }

    /// A rank-0 tensor holding a single value.
    pub fn scalar(value: f32) -> Self {
        Self { shape: vec![], data: vec![value] }
    }

    /// A `[rows.len(), width]` tensor from per-row slices of equal width.
    pub fn from_rows(rows: &[&[f32]]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Self::new(vec![rows.len(), width], data)
    }

    /// Number of elements per leading-dimension entry.
    fn row_numel(&self) -> usize {
        self.shape[1..].iter().product()
    }
}

impl Backend for MockTensor {
    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn cat(tensors: &[Self], dim: usize) -> Self {
        assert_eq!(dim, 0, "mock tensor only concatenates along the batch dimension");
        let mut shape = tensors[0].shape.clone();
        shape[0] = tensors.iter().map(|t| t.shape[0]).sum();
        let data = tensors.iter().flat_map(|t| t.data.iter().copied()).collect();
        MockTensor::new(shape, data)
    }

    fn slice(&self, dim: usize, start: usize, len: usize) -> Self {
        assert_eq!(dim, 0, "mock tensor only slices along the batch dimension");
        let width = self.row_numel();
        let mut shape = self.shape.clone();
        shape[0] = len;
        let data = self.data[start * width..(start + len) * width].to_vec();
        MockTensor::new(shape, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cat_sums_leading_dimension() {
        let a = MockTensor::from_rows(&[&[1.0], &[2.0]]);
        let b = MockTensor::from_rows(&[&[3.0]]);

        let merged = MockTensor::cat(&[a, b], 0);

        assert_eq!(merged.shape(), vec![3, 1]);
        assert_eq!(merged.data, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_slice_copies_requested_rows() {
        let t = MockTensor::from_rows(&[&[1.0, 1.5], &[2.0, 2.5], &[3.0, 3.5]]);

        let middle = t.slice(0, 1, 2);

        assert_eq!(middle.shape(), vec![2, 2]);
        assert_eq!(middle.data, vec![2.0, 2.5, 3.0, 3.5]);
    }

    #[test]
    fn test_scalar_has_no_dimensions() {
        let s = MockTensor::scalar(7.0);
        assert!(s.shape().is_empty());
    }
}
