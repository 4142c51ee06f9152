//! Shared test doubles for the integration tests

#![allow(dead_code)]

use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::collections::VecDeque;
use subject_extractor::output::OutputSink;
use subject_extractor::segmentation::{InstanceLabelBuffer, InstanceObservation, SegmentationEngine};
use subject_extractor::source::FrameSource;
use subject_extractor::{ExtractError, Frame};

/// Frames served from memory
pub struct MemorySource {
    frames: VecDeque<anyhow::Result<Frame>>,
    resolution: (u32, u32),
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        let resolution = frames.first().map(|f| f.dimensions()).unwrap_or((0, 0));
        Self {
            frames: frames.into_iter().map(Ok).collect(),
            resolution,
        }
    }

    /// Fail with a read error after `good` frames
    pub fn failing_after(frames: Vec<Frame>, good: usize) -> Self {
        let mut source = Self::new(frames.into_iter().take(good).collect());
        source
            .frames
            .push_back(Err(anyhow::anyhow!("decoder went away")));
        source
    }
}

impl FrameSource for MemorySource {
    fn next_frame(&mut self) -> anyhow::Result<Option<Frame>> {
        self.frames.pop_front().transpose()
    }

    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }
}

/// Keeps written frames in memory
#[derive(Default)]
pub struct MemorySink {
    pub frames: Vec<(u64, RgbaImage)>,
}

impl OutputSink for MemorySink {
    fn write_frame(&mut self, index: u64, frame: &RgbaImage) -> anyhow::Result<()> {
        self.frames.push((index, frame.clone()));
        Ok(())
    }
}

/// Returns the same observation for every frame
pub struct FixedEngine {
    pub observation: InstanceObservation,
    pub calls: usize,
}

impl FixedEngine {
    pub fn new(observation: InstanceObservation) -> Self {
        Self {
            observation,
            calls: 0,
        }
    }
}

impl SegmentationEngine for FixedEngine {
    fn segment(&mut self, _frame: &Frame) -> subject_extractor::Result<InstanceObservation> {
        self.calls += 1;
        Ok(self.observation.clone())
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Fails on the listed call numbers (0-based), otherwise defers to `inner`
pub struct FlakyEngine<E> {
    pub inner: E,
    pub fail_on: Vec<usize>,
    calls: usize,
}

impl<E> FlakyEngine<E> {
    pub fn new(inner: E, fail_on: Vec<usize>) -> Self {
        Self {
            inner,
            fail_on,
            calls: 0,
        }
    }
}

impl<E: SegmentationEngine> SegmentationEngine for FlakyEngine<E> {
    fn segment(&mut self, frame: &Frame) -> subject_extractor::Result<InstanceObservation> {
        let call = self.calls;
        self.calls += 1;
        if self.fail_on.contains(&call) {
            return Err(ExtractError::Segmentation("model raised an internal error".to_string()));
        }
        self.inner.segment(frame)
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

/// Rectangle as (x, y, width, height)
pub type Rect = (u32, u32, u32, u32);

pub fn in_rect(x: u32, y: u32, rect: Rect) -> bool {
    let (rx, ry, rw, rh) = rect;
    x >= rx && x < rx + rw && y >= ry && y < ry + rh
}

pub const BACKGROUND: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Solid key-colored frame with opaque subjects painted in
pub fn frame_with_subjects(width: u32, height: u32, subjects: &[(Rect, Rgba<u8>)]) -> Frame {
    Frame::new(RgbaImage::from_fn(width, height, |x, y| {
        subjects
            .iter()
            .find(|(rect, _)| in_rect(x, y, *rect))
            .map(|(_, color)| *color)
            .unwrap_or(BACKGROUND)
    }))
}

/// A textured frame so that every pixel differs
pub fn gradient_frame(width: u32, height: u32) -> Frame {
    Frame::new(RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) * 5 % 256) as u8, 255])
    }))
}

/// Observation with one instance per rectangle, labelled 1, 2, ... in order
pub fn observation_with_rects(width: u32, height: u32, rects: &[Rect]) -> InstanceObservation {
    let labels = InstanceLabelBuffer::from_fn(width, height, |x, y| {
        let label = rects
            .iter()
            .position(|r| in_rect(x, y, *r))
            .map(|i| i as u32 + 1)
            .unwrap_or(0);
        Luma([label])
    });
    let confidence = GrayImage::from_fn(width, height, |x, y| {
        Luma([if labels.get_pixel(x, y)[0] > 0 { 255 } else { 0 }])
    });
    InstanceObservation::new(labels, confidence, (1..=rects.len() as u32).collect())
}
