use super::{BokehParams, Effect, FilterEngine};
use crate::error::{ExtractError, Result};
use crate::frame::Frame;
use crate::segmentation::Mask;
use image::{Rgba, RgbaImage};
use std::borrow::Cow;

/// Final output raster, same size as the source frame
pub type CompositeImage = RgbaImage;

/// Exposure change used by [`Effect::Highlight`], in stops
pub const HIGHLIGHT_EV: f32 = -3.0;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Renders background treatments and blends the subject over them.
///
/// Borrows the shared filter context; holds no per-frame state, so the same
/// inputs always give the same output.
pub struct Compositor<'a> {
    filters: &'a dyn FilterEngine,
    bokeh: BokehParams,
}

impl<'a> Compositor<'a> {
    pub fn new(filters: &'a dyn FilterEngine, bokeh: BokehParams) -> Self {
        Self { filters, bokeh }
    }

    /// Blend `frame` over the treated background using `mask` as weight.
    pub fn composite(&self, frame: &Frame, mask: &Mask, effect: Effect) -> Result<CompositeImage> {
        let _span = tracing::debug_span!("composite", %effect).entered();

        if mask.dimensions() != frame.dimensions() {
            return Err(ExtractError::Rendering(format!(
                "mask is {:?} but frame is {:?}",
                mask.dimensions(),
                frame.dimensions()
            )));
        }

        let background = self.background_of(frame.image(), mask, effect)?;
        self.filters
            .blend_with_mask(frame.image(), &background, mask)
    }

    /// Render the background for `effect`.
    pub fn background_of<'f>(
        &self,
        frame: &'f RgbaImage,
        mask: &Mask,
        effect: Effect,
    ) -> Result<Cow<'f, RgbaImage>> {
        let background = match effect {
            Effect::None => Cow::Borrowed(frame),
            Effect::Highlight => Cow::Owned(self.filters.exposure_adjust(frame, HIGHLIGHT_EV)?),
            Effect::Noir => Cow::Owned(self.filters.noir(frame)?),
            Effect::BokehHalo => {
                let silhouette = self.render_silhouette(frame, mask)?;
                Cow::Owned(self.apply_bokeh(&silhouette)?)
            }
            Effect::Cut => Cow::Owned(RgbaImage::from_pixel(
                frame.width(),
                frame.height(),
                TRANSPARENT,
            )),
        };
        Ok(background)
    }

    /// White canvas over the frame's extent, cut out by the mask.
    pub fn render_silhouette(&self, frame: &RgbaImage, mask: &Mask) -> Result<RgbaImage> {
        let (width, height) = frame.dimensions();
        let white = RgbaImage::from_pixel(width, height, WHITE);
        let clear = RgbaImage::from_pixel(width, height, TRANSPARENT);
        self.filters.blend_with_mask(&white, &clear, mask)
    }

    /// Spread a silhouette into a soft halo.
    pub fn apply_bokeh(&self, silhouette: &RgbaImage) -> Result<RgbaImage> {
        self.filters.bokeh_blur(silhouette, &self.bokeh)
    }
}
