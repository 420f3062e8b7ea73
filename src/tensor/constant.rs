/// The tensor dimension along which independent examples are stacked.
pub(crate) const BATCH_DIM: usize = 0;
