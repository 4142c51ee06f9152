use super::FrameSource;
use crate::frame::Frame;
use anyhow::{bail, Context, Result};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Reads a directory of still images as consecutive frames.
///
/// Files are ordered by the number in their name when they have one
/// (`2.png` before `10.png`), then by name.
pub struct ImageSequenceSource {
    files: VecDeque<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageSequenceSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?
        {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && path.is_file() {
                files.push(path);
            }
        }

        if files.is_empty() {
            bail!("No frames found in {}", dir.display());
        }
        files.sort_by_key(|p| sort_key(p));

        let (width, height) = image::image_dimensions(&files[0])
            .with_context(|| format!("Failed to read {}", files[0].display()))?;

        tracing::info!(
            "Opening image sequence {} ({} frames, {}x{})",
            dir.display(),
            files.len(),
            width,
            height
        );

        Ok(Self {
            files: files.into(),
            width,
            height,
        })
    }
}

fn sort_key(path: &Path) -> (u64, String) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string();
    let number = stem.parse::<u64>().unwrap_or(u64::MAX);
    (number, stem)
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.files.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .with_context(|| format!("Failed to decode {}", path.display()))?
            .into_rgba8();
        Ok(Some(Frame::new(image)))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_frames_are_read_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("10.png", 30u8), ("2.png", 20), ("1.png", 10)] {
            RgbaImage::from_pixel(4, 3, Rgba([shade, 0, 0, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut source = ImageSequenceSource::new(dir.path()).unwrap();
        assert_eq!(source.resolution(), (4, 3));

        let mut shades = Vec::new();
        while let Some(frame) = source.next_frame().unwrap() {
            shades.push(frame.image().get_pixel(0, 0)[0]);
        }
        assert_eq!(shades, vec![10, 20, 30]);
    }

    #[test]
    fn test_empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequenceSource::new(dir.path()).is_err());
    }
}
