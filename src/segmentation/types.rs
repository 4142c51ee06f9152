use crate::error::Result;
use crate::frame::Frame;
use image::{GrayImage, ImageBuffer, Luma};
use std::collections::BTreeSet;

/// Per-pixel instance labels at the engine's working resolution.
/// 0 is background; every positive value names one instance.
pub type InstanceLabelBuffer = ImageBuffer<Luma<u32>, Vec<u32>>;

/// Fully opaque mask value.
pub const MASK_MAX: u8 = u8::MAX;
/// Fully transparent mask value.
pub const MASK_MIN: u8 = 0;

/// Set of positive instance identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceSet(BTreeSet<u32>);

impl InstanceSet {
    pub fn single(id: u32) -> Self {
        Self(BTreeSet::from([id]))
    }

    pub fn contains(&self, id: u32) -> bool {
        id != 0 && self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u32> for InstanceSet {
    /// Zero is dropped: it is reserved for background.
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().filter(|&id| id != 0).collect())
    }
}

/// Result of one segmentation call.
///
/// `labels` and `confidence` share the same resolution, which is whatever
/// the engine works at and usually smaller than the frame.
#[derive(Debug, Clone)]
pub struct InstanceObservation {
    labels: InstanceLabelBuffer,
    confidence: GrayImage,
    instances: InstanceSet,
}

impl InstanceObservation {
    pub fn new(labels: InstanceLabelBuffer, confidence: GrayImage, instances: InstanceSet) -> Self {
        debug_assert_eq!(labels.dimensions(), confidence.dimensions());
        Self {
            labels,
            confidence,
            instances,
        }
    }

    pub fn labels(&self) -> &InstanceLabelBuffer {
        &self.labels
    }

    pub fn confidence(&self) -> &GrayImage {
        &self.confidence
    }

    /// Every instance the engine found in this frame.
    pub fn all_instances(&self) -> &InstanceSet {
        &self.instances
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.labels.dimensions()
    }
}

/// Alpha mask at frame resolution: 0 = background, 255 = subject
#[derive(Debug, Clone, PartialEq)]
pub struct Mask(GrayImage);

impl Mask {
    pub fn new(image: GrayImage) -> Self {
        Self(image)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.0.dimensions()
    }

    pub fn value(&self, x: u32, y: u32) -> u8 {
        self.0.get_pixel(x, y)[0]
    }

    pub fn as_image(&self) -> &GrayImage {
        &self.0
    }
}

/// Trait for segmentation engines
/// Allows swapping between different backends (ONNX models, color keying, test doubles)
pub trait SegmentationEngine {
    /// Segment a single frame into instances.
    ///
    /// Returns `ExtractError::Segmentation` when nothing was found or when
    /// the backend failed; backend errors never escape in raw form.
    fn segment(&mut self, frame: &Frame) -> Result<InstanceObservation>;

    /// Short name used in logs
    fn name(&self) -> &str;

    /// The engine's fixed working resolution, if it has one.
    ///
    /// Returns (width, height)
    fn input_size(&self) -> Option<(u32, u32)> {
        None
    }
}

impl<E: SegmentationEngine + ?Sized> SegmentationEngine for Box<E> {
    fn segment(&mut self, frame: &Frame) -> Result<InstanceObservation> {
        (**self).segment(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        (**self).input_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_set_ignores_background() {
        let set: InstanceSet = [0, 3, 1, 3].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert!(!set.contains(0));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
    }

    struct FixedSize;

    impl SegmentationEngine for FixedSize {
        fn segment(&mut self, _frame: &Frame) -> Result<InstanceObservation> {
            Err(crate::ExtractError::Segmentation("no model".to_string()))
        }

        fn name(&self) -> &str {
            "fixed-size"
        }

        fn input_size(&self) -> Option<(u32, u32)> {
            Some((512, 288))
        }
    }

    #[test]
    fn test_boxed_engine_forwards_input_size() {
        let engine: Box<dyn SegmentationEngine> = Box::new(FixedSize);
        assert_eq!(engine.name(), "fixed-size");
        assert_eq!(engine.input_size(), Some((512, 288)));
    }
}
