mod ffmpeg;
mod sequence;

pub use ffmpeg::FfmpegSource;
pub use sequence::ImageSequenceSource;

use crate::frame::Frame;
use anyhow::Result;
use std::path::Path;

/// Trait for decoded frame sources
pub trait FrameSource {
    /// Next frame in playback order, `None` once the source is exhausted
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Get the resolution of delivered frames
    fn resolution(&self) -> (u32, u32);
}

/// Open a directory of stills or, for anything else, a video through ffmpeg
pub fn open(path: &Path) -> Result<Box<dyn FrameSource>> {
    if path.is_dir() {
        Ok(Box::new(ImageSequenceSource::new(path)?))
    } else {
        Ok(Box::new(FfmpegSource::new(path)?))
    }
}
