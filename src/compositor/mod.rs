mod cpu;
mod effect;
mod render;

pub use cpu::CpuFilterEngine;
pub use effect::Effect;
pub use render::{Compositor, CompositeImage, HIGHLIGHT_EV};

use crate::error::Result;
use crate::segmentation::Mask;
use image::RgbaImage;

/// Parameters of the ring-shaped bokeh blur
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BokehParams {
    /// Kernel radius in pixels
    pub radius: f32,
    /// Width of the bright rim at the kernel edge
    pub ring_size: f32,
    /// Extra weight of the rim relative to the disc interior
    pub ring_amount: f32,
    /// Gaussian sigma applied after the ring blur; 0 disables it
    pub softness: f32,
}

impl Default for BokehParams {
    fn default() -> Self {
        Self {
            radius: 20.0,
            ring_size: 1.0,
            ring_amount: 1.0,
            softness: 1.0,
        }
    }
}

/// Trait for image filter backends
/// Allows swapping the CPU implementation for another native image library
pub trait FilterEngine {
    /// Scale linear light by `2^ev`; alpha is untouched
    fn exposure_adjust(&self, image: &RgbaImage, ev: f32) -> Result<RgbaImage>;

    /// Desaturated, contrasty black and white rendering
    fn noir(&self, image: &RgbaImage) -> Result<RgbaImage>;

    /// Ring-kernel blur of a (possibly transparent) image
    fn bokeh_blur(&self, image: &RgbaImage, params: &BokehParams) -> Result<RgbaImage>;

    /// Per-pixel mix: `foreground` where the mask is 255, `background`
    /// where it is 0, linear in between
    fn blend_with_mask(
        &self,
        foreground: &RgbaImage,
        background: &RgbaImage,
        mask: &Mask,
    ) -> Result<RgbaImage>;
}
