use crate::error::{ExtractError, Result};
use image::RgbaImage;

/// One decoded video frame, 4 channels x 8 bits, tightly packed RGBA.
///
/// A frame is owned by exactly one pipeline invocation and dropped when
/// that invocation returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    image: RgbaImage,
}

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Build a frame from a raw RGBA buffer whose rows may be padded.
    ///
    /// `stride` is the number of bytes between the starts of two rows and
    /// must be at least `width * 4`.
    pub fn from_raw_strided(width: u32, height: u32, stride: usize, data: &[u8]) -> Result<Self> {
        let row_bytes = width as usize * 4;
        if stride < row_bytes {
            return Err(ExtractError::Source(format!(
                "row stride {} is smaller than {} bytes for width {}",
                stride, row_bytes, width
            )));
        }
        let needed = if height == 0 {
            0
        } else {
            stride * (height as usize - 1) + row_bytes
        };
        if data.len() < needed {
            return Err(ExtractError::Source(format!(
                "pixel buffer has {} bytes, {}x{} with stride {} needs {}",
                data.len(),
                width,
                height,
                stride,
                needed
            )));
        }

        let mut packed = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            packed.extend_from_slice(&data[start..start + row_bytes]);
        }

        let image = RgbaImage::from_raw(width, height, packed)
            .ok_or_else(|| ExtractError::Source("pixel buffer size mismatch".to_string()))?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

impl From<RgbaImage> for Frame {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_strided_drops_padding() {
        // 2x2 frame, each row padded to 12 bytes
        let mut data = vec![0u8; 24];
        data[0..8].copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
        data[12..20].copy_from_slice(&[9, 10, 11, 12, 13, 14, 15, 16]);

        let frame = Frame::from_raw_strided(2, 2, 12, &data).unwrap();
        assert_eq!(frame.dimensions(), (2, 2));
        assert_eq!(frame.image().get_pixel(1, 0).0, [5, 6, 7, 8]);
        assert_eq!(frame.image().get_pixel(0, 1).0, [9, 10, 11, 12]);
    }

    #[test]
    fn test_from_raw_strided_rejects_short_stride() {
        let data = vec![0u8; 16];
        assert!(Frame::from_raw_strided(2, 2, 4, &data).is_err());
    }

    #[test]
    fn test_from_raw_strided_rejects_short_buffer() {
        let data = vec![0u8; 10];
        assert!(Frame::from_raw_strided(2, 2, 8, &data).is_err());
    }
}
