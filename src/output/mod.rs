mod png_sequence;

pub use png_sequence::PngSequenceWriter;

use anyhow::Result;
use chrono::NaiveDate;
use image::RgbaImage;
use std::path::{Path, PathBuf};

/// Trait for output destinations
pub trait OutputSink {
    /// Write the composite for the `index`-th successful frame
    fn write_frame(&mut self, index: u64, frame: &RgbaImage) -> Result<()>;
}

/// Prefix of the dated directory results are grouped under
pub const OUTPUT_DIR_PREFIX: &str = "subjects";

/// Where the frames of `input` go.
///
/// `<root>/subjects_<yyMMdd>/<input stem>`, with `root` defaulting to the
/// directory containing the input.
pub fn output_dir_for(input: &Path, root: Option<&Path>, date: NaiveDate) -> PathBuf {
    let root = root
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    let stem = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());

    root.join(format!("{}_{}", OUTPUT_DIR_PREFIX, date.format("%y%m%d")))
        .join(stem)
}
