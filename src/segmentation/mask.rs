use super::types::{InstanceObservation, InstanceSet, Mask};
use crate::error::{ExtractError, Result};
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// Rasterize the selected instances and scale the result to frame size.
///
/// A pixel keeps the engine's confidence when its label is selected and is
/// zero otherwise. Selected pixels never drop to zero, so the mask covers
/// every labelled pixel of the selection. The scaled mask always has
/// exactly `width` x `height` pixels.
///
/// When scaling, the selection's footprint is upscaled nearest-neighbour and
/// the smoothly scaled confidence only shades pixels inside it. Pixels
/// outside the footprint are zero, so no other instance bleeds in.
pub fn generate_scaled_mask(
    observation: &InstanceObservation,
    instances: &InstanceSet,
    width: u32,
    height: u32,
) -> Result<Mask> {
    let _span = tracing::debug_span!("generate_mask").entered();

    if instances.is_empty() {
        return Err(ExtractError::MaskGeneration("no instances selected".to_string()));
    }
    if width == 0 || height == 0 {
        return Err(ExtractError::MaskGeneration(format!(
            "cannot scale mask to {}x{}",
            width, height
        )));
    }

    let labels = observation.labels();
    let confidence = observation.confidence();
    let (mask_width, mask_height) = labels.dimensions();

    let raw = GrayImage::from_fn(mask_width, mask_height, |x, y| {
        if instances.contains(labels.get_pixel(x, y)[0]) {
            Luma([confidence.get_pixel(x, y)[0].max(1)])
        } else {
            Luma([0])
        }
    });

    // If dimensions match, no resize needed
    if (mask_width, mask_height) == (width, height) {
        return Ok(Mask::new(raw));
    }

    tracing::debug!(
        "Scaling mask {}x{} -> {}x{}",
        mask_width,
        mask_height,
        width,
        height
    );
    let support = imageops::resize(&raw, width, height, FilterType::Nearest);
    let mut scaled = imageops::resize(&raw, width, height, FilterType::Triangle);
    for (value, inside) in scaled.pixels_mut().zip(support.pixels()) {
        value[0] = if inside[0] > 0 { value[0].max(1) } else { 0 };
    }
    Ok(Mask::new(scaled))
}
