use super::{BokehParams, FilterEngine};
use crate::error::{ExtractError, Result};
use crate::segmentation::{Mask, MASK_MAX, MASK_MIN};
use image::imageops::{self, FilterType};
use image::{Rgba, Rgba32FImage, RgbaImage};
use imageproc::filter::{gaussian_blur_f32, Kernel};
use std::borrow::Cow;

/// Largest kernel radius the bokeh convolution runs at. Bigger radii are
/// handled by blurring a downscaled copy.
const MAX_KERNEL_RADIUS: f32 = 8.0;

/// Luminance weights (Rec. 709)
const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// How far the noir tone curve is pulled towards a smoothstep
const NOIR_CONTRAST: f32 = 0.6;

/// Ring-shaped convolution kernel
#[derive(Debug, Clone)]
struct RingKernel {
    params: BokehParams,
    scale: u32,
    reach: u32,
    /// (2 * reach + 1)^2 weights, row-major
    weights: Vec<f32>,
}

impl RingKernel {
    fn new(params: BokehParams) -> Self {
        // bokeh_blur rejects these; keep construction bounded regardless
        let full_radius = if params.radius.is_finite() {
            params.radius.max(0.0)
        } else {
            0.0
        };
        let scale = (full_radius / MAX_KERNEL_RADIUS).ceil().max(1.0) as u32;
        let radius = full_radius / scale as f32;
        let ring_size = (params.ring_size / scale as f32).max(0.5);
        let reach = radius.ceil() as u32;
        let side = 2 * reach as i32 + 1;

        let mut weights = Vec::with_capacity((side * side) as usize);
        for dy in -(reach as i32)..=reach as i32 {
            for dx in -(reach as i32)..=reach as i32 {
                let d = ((dx * dx + dy * dy) as f32).sqrt();
                // antialiased disc edge
                let coverage = (radius + 0.5 - d).clamp(0.0, 1.0);
                let rim = if d >= radius - ring_size {
                    1.0 + params.ring_amount
                } else {
                    1.0
                };
                weights.push(coverage * rim);
            }
        }

        let total: f32 = weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            weights.iter_mut().for_each(|w| *w /= total);
            Self {
                params,
                scale,
                reach,
                weights,
            }
        } else {
            Self {
                params,
                scale,
                reach: 0,
                weights: vec![1.0],
            }
        }
    }

    fn side(&self) -> u32 {
        2 * self.reach + 1
    }

    /// Convolve a premultiplied image. Light falling outside the image is
    /// lost instead of piling up on the border.
    fn apply(&self, image: &Rgba32FImage) -> Rgba32FImage {
        let (width, height) = image.dimensions();
        let pad = self.reach;

        let mut padded = Rgba32FImage::new(width + 2 * pad, height + 2 * pad);
        imageops::replace(&mut padded, image, pad as i64, pad as i64);

        let blurred: Rgba32FImage = Kernel::new(&self.weights, self.side(), self.side())
            .filter(&padded, |channel, acc: f32| *channel = acc);
        imageops::crop_imm(&blurred, pad, pad, width, height).to_image()
    }
}

/// CPU implementation of the filter stages.
///
/// One instance is built at startup and shared by every frame. It only
/// caches data derived from its construction parameters, so it is safe to
/// keep using after any failed frame.
#[derive(Debug, Clone)]
pub struct CpuFilterEngine {
    kernel: RingKernel,
    to_linear: [f32; 256],
}

impl CpuFilterEngine {
    pub fn new(bokeh: BokehParams) -> Self {
        let mut to_linear = [0.0f32; 256];
        for (v, slot) in to_linear.iter_mut().enumerate() {
            *slot = srgb_to_linear(v as f32 / 255.0);
        }
        Self {
            kernel: RingKernel::new(bokeh),
            to_linear,
        }
    }

    fn kernel_for(&self, params: &BokehParams) -> Cow<'_, RingKernel> {
        if self.kernel.params == *params {
            Cow::Borrowed(&self.kernel)
        } else {
            Cow::Owned(RingKernel::new(*params))
        }
    }
}

impl Default for CpuFilterEngine {
    fn default() -> Self {
        Self::new(BokehParams::default())
    }
}

impl FilterEngine for CpuFilterEngine {
    fn exposure_adjust(&self, image: &RgbaImage, ev: f32) -> Result<RgbaImage> {
        let _span = tracing::debug_span!("exposure_adjust", ev).entered();

        let gain = 2f32.powf(ev);
        let mut lut = [0u8; 256];
        for (v, slot) in lut.iter_mut().enumerate() {
            *slot = to_u8(linear_to_srgb(self.to_linear[v] * gain));
        }

        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            for c in 0..3 {
                pixel[c] = lut[pixel[c] as usize];
            }
        }
        Ok(out)
    }

    fn noir(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let _span = tracing::debug_span!("noir").entered();

        let mut out = image.clone();
        for pixel in out.pixels_mut() {
            let luma = (LUMA[0] * pixel[0] as f32 + LUMA[1] * pixel[1] as f32 + LUMA[2] * pixel[2] as f32)
                / 255.0;
            let curved = luma * luma * (3.0 - 2.0 * luma);
            let toned = luma + NOIR_CONTRAST * (curved - luma);
            let value = to_u8(toned);
            pixel[0] = value;
            pixel[1] = value;
            pixel[2] = value;
        }
        Ok(out)
    }

    fn bokeh_blur(&self, image: &RgbaImage, params: &BokehParams) -> Result<RgbaImage> {
        let _span = tracing::debug_span!("bokeh_blur", radius = params.radius).entered();

        if !(params.radius.is_finite() && params.radius >= 0.0) {
            return Err(ExtractError::Rendering(format!(
                "invalid bokeh radius {}",
                params.radius
            )));
        }

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Ok(image.clone());
        }

        let kernel = self.kernel_for(params);
        let premultiplied = premultiply(image);

        let blurred = if kernel.scale > 1 {
            let small = imageops::resize(
                &premultiplied,
                width.div_ceil(kernel.scale),
                height.div_ceil(kernel.scale),
                FilterType::Triangle,
            );
            imageops::resize(&kernel.apply(&small), width, height, FilterType::Triangle)
        } else {
            kernel.apply(&premultiplied)
        };

        let mut packed = RgbaImage::from_fn(width, height, |x, y| {
            let p = blurred.get_pixel(x, y);
            Rgba([to_u8(p[0]), to_u8(p[1]), to_u8(p[2]), to_u8(p[3])])
        });
        if params.softness > 0.0 {
            packed = gaussian_blur_f32(&packed, params.softness);
        }

        Ok(unpremultiply(packed))
    }

    fn blend_with_mask(
        &self,
        foreground: &RgbaImage,
        background: &RgbaImage,
        mask: &Mask,
    ) -> Result<RgbaImage> {
        let _span = tracing::debug_span!("blend_with_mask").entered();

        let dims = foreground.dimensions();
        if background.dimensions() != dims || mask.dimensions() != dims {
            return Err(ExtractError::Rendering(format!(
                "blend size mismatch: foreground {:?}, background {:?}, mask {:?}",
                dims,
                background.dimensions(),
                mask.dimensions()
            )));
        }

        let mut out = RgbaImage::new(dims.0, dims.1);
        for (((dst, fg), bg), m) in out
            .pixels_mut()
            .zip(foreground.pixels())
            .zip(background.pixels())
            .zip(mask.as_image().pixels())
        {
            *dst = match m[0] {
                MASK_MAX => *fg,
                MASK_MIN => *bg,
                weight => mix_premultiplied(fg, bg, weight as f32 / 255.0),
            };
        }
        Ok(out)
    }
}

/// Linear interpolation of two straight-alpha pixels in premultiplied space
fn mix_premultiplied(fg: &Rgba<u8>, bg: &Rgba<u8>, t: f32) -> Rgba<u8> {
    let fa = fg[3] as f32 / 255.0;
    let ba = bg[3] as f32 / 255.0;
    let alpha = fa * t + ba * (1.0 - t);
    if alpha <= 0.0 {
        return Rgba([0, 0, 0, 0]);
    }

    let mut out = [0u8; 4];
    for c in 0..3 {
        let premultiplied = fg[c] as f32 / 255.0 * fa * t + bg[c] as f32 / 255.0 * ba * (1.0 - t);
        out[c] = to_u8(premultiplied / alpha);
    }
    out[3] = to_u8(alpha);
    Rgba(out)
}

fn premultiply(image: &RgbaImage) -> Rgba32FImage {
    Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let p = image.get_pixel(x, y);
        let a = p[3] as f32 / 255.0;
        Rgba([
            p[0] as f32 / 255.0 * a,
            p[1] as f32 / 255.0 * a,
            p[2] as f32 / 255.0 * a,
            a,
        ])
    })
}

fn unpremultiply(mut image: RgbaImage) -> RgbaImage {
    for pixel in image.pixels_mut() {
        let a = pixel[3];
        if a == 0 {
            *pixel = Rgba([0, 0, 0, 0]);
            continue;
        }
        for c in 0..3 {
            let v = (pixel[c] as u32 * 255 + a as u32 / 2) / a as u32;
            pixel[c] = v.min(255) as u8;
        }
    }
    image
}

fn srgb_to_linear(v: f32) -> f32 {
    if v <= 0.04045 {
        v / 12.92
    } else {
        ((v + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(v: f32) -> f32 {
    let v = v.clamp(0.0, 1.0);
    if v <= 0.003_130_8 {
        v * 12.92
    } else {
        1.055 * v.powf(1.0 / 2.4) - 0.055
    }
}

fn to_u8(v: f32) -> u8 {
    (v * 255.0).round().clamp(0.0, 255.0) as u8
}
