pub mod memory_state_preprocessor;
pub mod pixel_frame_preprocessor;

use candle_core::{DType, Result, Tensor};
use enum_dispatch::enum_dispatch;
use memory_state_preprocessor::MemoryStatePreprocessor;
use pixel_frame_preprocessor::PixelFramePreprocessor;

/// A stateless mapping from a raw observation to a normalized tensor.
#[enum_dispatch]
pub trait Preprocessor {
    /// Shape of a single transformed observation without the batch axis. `None` means the
    /// output shape follows the input and nothing can be assumed up front.
    fn shape(&self) -> Option<&[usize]>;
    fn transform(&self, observation: &Tensor) -> Result<Tensor>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoPreprocessor;

impl Preprocessor for NoPreprocessor {
    fn shape(&self) -> Option<&[usize]> {
        None
    }

    fn transform(&self, observation: &Tensor) -> Result<Tensor> {
        observation.unsqueeze(0)
    }
}

#[enum_dispatch(Preprocessor)]
#[derive(Debug, Clone)]
pub enum PreprocessorKind {
    NoPreprocessor(NoPreprocessor),
    PixelFrame(PixelFramePreprocessor),
    MemoryState(MemoryStatePreprocessor),
}

impl Default for PreprocessorKind {
    fn default() -> Self {
        Self::NoPreprocessor(NoPreprocessor)
    }
}

/// Maps [0, 255] intensities to roughly [-1, 1] via `(value - 128) / 128`. Integer inputs come
/// out as F32.
pub(crate) fn normalize_intensity(observation: &Tensor) -> Result<Tensor> {
    let observation = if observation.dtype().is_float() {
        observation.clone()
    } else {
        observation.to_dtype(DType::F32)?
    };
    observation.affine(1. / 128., -1.)
}
