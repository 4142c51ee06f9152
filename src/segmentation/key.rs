use super::labels::{label_instances, LabelParams};
use super::types::{InstanceObservation, SegmentationEngine};
use crate::error::{ExtractError, Result};
use crate::frame::Frame;
use image::{imageops, GrayImage, Luma, Rgba, RgbaImage};
use std::fmt;
use std::str::FromStr;

/// An RGB key color, parsed from "rrggbb" or "#rrggbb"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColor(pub [u8; 3]);

impl FromStr for KeyColor {
    type Err = ExtractError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ExtractError::Config(format!(
                "key color must be six hex digits, got \"{}\"",
                s
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| ExtractError::Config(format!("invalid key color \"{}\": {}", s, e)))
        };
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}

impl fmt::Display for KeyColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b] = self.0;
        write!(f, "{:02x}{:02x}{:02x}", r, g, b)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct KeyParams {
    pub color: KeyColor,
    /// RGB distance at or below which a pixel is pure background
    pub tolerance: f32,
    /// Width of the ramp above `tolerance` before a pixel is fully foreground
    pub softness: f32,
    /// Long side of the working resolution; larger frames are downscaled
    pub working_size: u32,
}

impl Default for KeyParams {
    fn default() -> Self {
        Self {
            color: KeyColor([0, 255, 0]),
            tolerance: 60.0,
            softness: 20.0,
            working_size: 512,
        }
    }
}

/// Model-free engine: everything that is not close to the key color is
/// foreground.
pub struct KeySegmenter {
    params: KeyParams,
    labelling: LabelParams,
}

impl KeySegmenter {
    pub fn new(params: KeyParams, labelling: LabelParams) -> Self {
        tracing::info!(
            "Key segmenter: color #{}, tolerance {}, softness {}",
            params.color,
            params.tolerance,
            params.softness
        );
        Self { params, labelling }
    }

    fn working_image(&self, image: &RgbaImage) -> Option<RgbaImage> {
        let (width, height) = image.dimensions();
        let long_side = width.max(height);
        if self.params.working_size == 0 || long_side <= self.params.working_size {
            return None;
        }
        let scale = self.params.working_size as f32 / long_side as f32;
        let w = ((width as f32 * scale).round() as u32).max(1);
        let h = ((height as f32 * scale).round() as u32).max(1);
        Some(imageops::resize(image, w, h, imageops::FilterType::Triangle))
    }

    fn confidence(&self, pixel: &Rgba<u8>) -> u8 {
        let [kr, kg, kb] = self.params.color.0;
        let dr = pixel[0] as f32 - kr as f32;
        let dg = pixel[1] as f32 - kg as f32;
        let db = pixel[2] as f32 - kb as f32;
        let distance = (dr * dr + dg * dg + db * db).sqrt();

        if distance <= self.params.tolerance {
            0
        } else if self.params.softness <= 0.0 || distance >= self.params.tolerance + self.params.softness {
            255
        } else {
            let t = (distance - self.params.tolerance) / self.params.softness;
            (t * 255.0).round().clamp(1.0, 255.0) as u8
        }
    }
}

impl SegmentationEngine for KeySegmenter {
    fn segment(&mut self, frame: &Frame) -> Result<InstanceObservation> {
        let _span = tracing::debug_span!("key_segment").entered();

        let scaled = self.working_image(frame.image());
        let source = scaled.as_ref().unwrap_or(frame.image());

        let confidence = GrayImage::from_fn(source.width(), source.height(), |x, y| {
            Luma([self.confidence(source.get_pixel(x, y))])
        });

        label_instances(confidence, &self.labelling)
    }

    fn name(&self) -> &str {
        "key"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> KeySegmenter {
        KeySegmenter::new(
            KeyParams {
                softness: 0.0,
                ..KeyParams::default()
            },
            LabelParams {
                threshold: 128,
                min_instance_area: 1,
            },
        )
    }

    #[test]
    fn test_parse_key_color() {
        assert_eq!("#00ff00".parse::<KeyColor>().unwrap(), KeyColor([0, 255, 0]));
        assert_eq!("1a2B3c".parse::<KeyColor>().unwrap(), KeyColor([0x1a, 0x2b, 0x3c]));
        assert!("00ff0".parse::<KeyColor>().is_err());
        assert!("zzzzzz".parse::<KeyColor>().is_err());
        assert_eq!(KeyColor([1, 2, 255]).to_string(), "0102ff");
    }

    #[test]
    fn test_subject_on_green_is_found() {
        let image = RgbaImage::from_fn(16, 8, |x, y| {
            if (4..8).contains(&x) && (2..6).contains(&y) {
                Rgba([200, 50, 50, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        let obs = engine().segment(&Frame::new(image)).unwrap();

        assert_eq!(obs.dimensions(), (16, 8));
        assert_eq!(obs.all_instances().len(), 1);
        assert_eq!(obs.labels().get_pixel(5, 3)[0], 1);
        assert_eq!(obs.labels().get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_uniform_key_frame_fails() {
        let image = RgbaImage::from_pixel(16, 8, Rgba([0, 255, 0, 255]));
        let err = engine().segment(&Frame::new(image)).unwrap_err();
        assert!(matches!(err, ExtractError::Segmentation(_)));
    }

    #[test]
    fn test_large_frames_are_labelled_at_working_size() {
        let mut engine = engine();
        engine.params.working_size = 32;
        let image = RgbaImage::from_fn(128, 64, |x, _| {
            if x < 64 {
                Rgba([255, 255, 255, 255])
            } else {
                Rgba([0, 255, 0, 255])
            }
        });
        let obs = engine.segment(&Frame::new(image)).unwrap();
        assert_eq!(obs.dimensions(), (32, 16));
    }
}
