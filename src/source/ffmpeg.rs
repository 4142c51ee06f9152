use super::FrameSource;
use crate::frame::Frame;
use anyhow::{anyhow, bail, Context, Result};
use std::ffi::OsString;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Decodes a video file by piping raw RGBA frames out of an `ffmpeg` child.
///
/// Frame size comes from `ffprobe`. Only the first video stream is read, and
/// rotation metadata is ignored.
pub struct FfmpegSource {
    path: PathBuf,
    child: Child,
    stdout: ChildStdout,
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    finished: bool,
}

impl FfmpegSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("File does not exist: {}", path.display());
        }

        let (width, height) = query_dimensions(path)?;
        tracing::info!("Opening {} ({}x{})", path.display(), width, height);

        let mut child = Command::new("ffmpeg")
            .args(decode_args(path))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .context("Failed to spawn ffmpeg command")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to open ffmpeg stdout"))?;

        Ok(Self {
            path: path.to_path_buf(),
            child,
            stdout,
            width,
            height,
            buffer: vec![0u8; width as usize * height as usize * 4],
            finished: false,
        })
    }
}

impl FrameSource for FfmpegSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let complete = read_frame(&mut self.stdout, &mut self.buffer)
            .with_context(|| format!("Failed to read frame from {}", self.path.display()))?;
        if complete {
            let frame = Frame::from_raw_strided(self.width, self.height, self.width as usize * 4, &self.buffer)?;
            return Ok(Some(frame));
        }

        self.finished = true;
        let status = self.child.wait().context("Failed to wait on ffmpeg")?;
        if !status.success() {
            bail!("ffmpeg exited with {} while decoding {}", status, self.path.display());
        }
        Ok(None)
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Arguments for decoding the first video stream of `path` to raw RGBA on
/// stdout.
///
/// Frames stay in coded orientation so that they match the size ffprobe
/// reports, even for clips carrying rotation metadata.
fn decode_args(path: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "error", "-nostdin", "-noautorotate", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.extend(
        ["-map", "0:v:0", "-f", "rawvideo", "-pix_fmt", "rgba", "-"]
            .iter()
            .map(OsString::from),
    );
    args
}

/// Ask ffprobe for the size of the first video stream.
fn query_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .arg("-v")
        .arg("error")
        .arg("-select_streams")
        .arg("v:0")
        .arg("-show_entries")
        .arg("stream=width,height")
        .arg("-of")
        .arg("csv=p=0:s=x")
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .context("Failed to run ffprobe")?;

    if !output.status.success() {
        bail!("ffprobe could not read {}", path.display());
    }

    let text = String::from_utf8_lossy(&output.stdout);
    parse_dimensions(&text).ok_or_else(|| anyhow!("Not a video file: {}", path.display()))
}

/// Parse ffprobe's "WIDTHxHEIGHT" line
fn parse_dimensions(text: &str) -> Option<(u32, u32)> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;
    let (w, h) = line.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().trim_end_matches('x').parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Fill `buffer` with one frame. Returns false on a clean end of stream.
/// A trailing partial frame is dropped with a warning.
fn read_frame<R: Read>(reader: &mut R, buffer: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    if filled == buffer.len() {
        Ok(true)
    } else {
        if filled > 0 {
            tracing::warn!("Dropping truncated frame ({} of {} bytes)", filled, buffer.len());
        }
        Ok(false)
    }
}
