use super::{Preprocessor, normalize_intensity};
use candle_core::{Result, Tensor};

const MEMORY_SHAPE: [usize; 1] = [128];

/// Normalizes a 128 byte memory dump elementwise. No batch axis is added, stacking the rank one
/// output is left to the batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStatePreprocessor;

impl Preprocessor for MemoryStatePreprocessor {
    fn shape(&self) -> Option<&[usize]> {
        Some(&MEMORY_SHAPE)
    }

    fn transform(&self, observation: &Tensor) -> Result<Tensor> {
        normalize_intensity(observation)
    }
}
