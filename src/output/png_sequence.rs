use super::OutputSink;
use anyhow::{Context, Result};
use image::{ImageFormat, RgbaImage};
use std::path::{Path, PathBuf};

/// Writes frames as `<dir>/<index>.png`
pub struct PngSequenceWriter {
    dir: PathBuf,
}

impl PngSequenceWriter {
    /// Create the output directory (and parents) if needed
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        tracing::info!("Writing frames to {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("{}.png", index))
    }
}

impl OutputSink for PngSequenceWriter {
    fn write_frame(&mut self, index: u64, frame: &RgbaImage) -> Result<()> {
        let path = self.frame_path(index);
        frame
            .save_with_format(&path, ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}
