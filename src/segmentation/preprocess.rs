use crate::error::{ExtractError, Result};
use image::{imageops, GrayImage, Luma, RgbaImage};
use ndarray::Array4;

/// Converts frames into model input tensors and model output back into
/// confidence mattes
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    pub fn target_size(&self) -> (u32, u32) {
        (self.target_width, self.target_height)
    }

    /// Preprocess an RGBA frame into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Drop alpha, convert to float and normalize to [0, 1]
    /// 3. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbaImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized;
        let source = if image.dimensions() != (self.target_width, self.target_height) {
            resized = imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Triangle,
            );
            &resized
        } else {
            image
        };

        let (width, height) = source.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in source.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            tensor[[0, 0, y, x]] = pixel[0] as f32 / 255.0;
            tensor[[0, 1, y, x]] = pixel[1] as f32 / 255.0;
            tensor[[0, 2, y, x]] = pixel[2] as f32 / 255.0;
        }

        tensor
    }

    /// Convert a flattened [0, 1] matte into an 8-bit confidence image.
    ///
    /// Out-of-range model output is clamped.
    pub fn matte_to_gray(matte: &[f32], width: u32, height: u32) -> Result<GrayImage> {
        let expected = width as usize * height as usize;
        if matte.len() < expected {
            return Err(ExtractError::Segmentation(format!(
                "matte has {} values, {}x{} needs {}",
                matte.len(),
                width,
                height,
                expected
            )));
        }

        Ok(GrayImage::from_fn(width, height, |x, y| {
            let idx = (y * width + x) as usize;
            Luma([(matte[idx] * 255.0).round().clamp(0.0, 255.0) as u8])
        }))
    }
}
