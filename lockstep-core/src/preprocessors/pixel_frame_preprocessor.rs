use super::{Preprocessor, normalize_intensity};
use candle_core::{Result, Tensor};

const CROP_ROWS: usize = 25;
const FRAME_SHAPE: [usize; 3] = [80, 80, 3];

/// Downsamples full (210, 160, 3) pixel frames to (1, 80, 80, 3).
///
/// The crop offsets assume the frame layout of arcade-style simulators. Other frame sizes only
/// work if the cropped height and the width are both even, and they will not match `shape`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelFramePreprocessor;

impl Preprocessor for PixelFramePreprocessor {
    fn shape(&self) -> Option<&[usize]> {
        Some(&FRAME_SHAPE)
    }

    fn transform(&self, observation: &Tensor) -> Result<Tensor> {
        let (height, width, channels) = observation.dims3()?;
        let rows = height.saturating_sub(2 * CROP_ROWS);
        // keeping every second row and column is the same as splitting both axes in pairs and
        // taking the first element of each pair
        let frame = observation
            .narrow(0, CROP_ROWS, rows)?
            .reshape((rows / 2, 2, width / 2, 2, channels))?
            .narrow(1, 0, 1)?
            .narrow(3, 0, 1)?
            .reshape((rows / 2, width / 2, channels))?
            .unsqueeze(0)?;
        normalize_intensity(&frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn mid_gray_frame_becomes_zero() -> Result<()> {
        let frame = Tensor::full(128u8, (210, 160, 3), &Device::Cpu)?;
        let transformed = PixelFramePreprocessor.transform(&frame)?;
        assert_eq!(transformed.dims(), &[1, 80, 80, 3]);
        assert_eq!(&transformed.dims()[1..], PixelFramePreprocessor.shape().unwrap());
        assert_eq!(transformed.dtype(), DType::F32);
        let max = transformed.abs()?.flatten_all()?.max(0)?.to_scalar::<f32>()?;
        assert_eq!(max, 0.);
        Ok(())
    }

    #[test]
    fn keeps_even_rows_and_columns_after_crop() -> Result<()> {
        // pixel value encodes (row + col) % 256 so the picked positions can be checked
        let data = (0..210usize)
            .flat_map(|row| (0..160usize).flat_map(move |col| [((row + col) % 256) as f32; 3]))
            .collect::<Vec<_>>();
        let frame = Tensor::from_vec(data, (210, 160, 3), &Device::Cpu)?;
        let transformed = PixelFramePreprocessor.transform(&frame)?;
        let pixels = transformed.get(0)?.to_vec3::<f32>()?;
        for (row, col) in [(0usize, 0usize), (0, 79), (79, 0), (41, 17), (79, 79)] {
            let source = (25 + 2 * row + 2 * col) % 256;
            let expected = (source as f32 - 128.) / 128.;
            assert_eq!(pixels[row][col], [expected; 3]);
        }
        Ok(())
    }

    #[test]
    fn rejects_frames_without_channel_axis() {
        let frame = Tensor::zeros((210, 160), DType::U8, &Device::Cpu).unwrap();
        assert!(PixelFramePreprocessor.transform(&frame).is_err());
    }
}
