use crate::compositor::{CompositeImage, Compositor, Effect};
use crate::error::{ExtractError, Result};
use crate::frame::Frame;
use crate::output::OutputSink;
use crate::segmentation::{generate_scaled_mask, select_instances, SegmentationEngine, SelectionPoint};
use crate::source::FrameSource;
use anyhow::Context;
use std::time::{Duration, Instant};

/// Progress is logged every this many frames
const LOG_INTERVAL: u64 = 30;

/// Accumulated time spent in each stage
#[derive(Debug, Clone, Copy, Default)]
pub struct StageTimings {
    pub segment: Duration,
    pub mask: Duration,
    pub composite: Duration,
}

/// Per-input outcome of [`run_video`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_read: u64,
    pub frames_written: u64,
    pub frames_skipped: u64,
    pub elapsed: Duration,
}

/// Segment, select, mask and composite one frame at a time.
///
/// Built once per run and reused for every frame of every input. The
/// engine and the compositor's filter context carry no frame state, so a
/// failed frame leaves the extractor ready for the next one.
pub struct SubjectExtractor<'a, E: SegmentationEngine> {
    engine: E,
    compositor: Compositor<'a>,
    effect: Effect,
    point: Option<SelectionPoint>,
    timings: StageTimings,
}

impl<'a, E: SegmentationEngine> SubjectExtractor<'a, E> {
    pub fn new(
        engine: E,
        compositor: Compositor<'a>,
        effect: Effect,
        point: Option<SelectionPoint>,
    ) -> Self {
        tracing::info!(
            "Extractor: engine={}, effect={}, point={}",
            engine.name(),
            effect,
            point.map(|p| p.to_string()).unwrap_or_else(|| "none".to_string())
        );
        if let Some((width, height)) = engine.input_size() {
            tracing::info!("Engine works at {}x{}", width, height);
        }
        Self {
            engine,
            compositor,
            effect,
            point,
            timings: StageTimings::default(),
        }
    }

    pub fn timings(&self) -> StageTimings {
        self.timings
    }

    pub fn reset_timings(&mut self) {
        self.timings = StageTimings::default();
    }

    /// Run the whole pipeline on one frame.
    ///
    /// Takes the frame by value: it and every intermediate buffer (labels,
    /// mask, background) are released when this returns, on success and on
    /// every error path, before the caller pulls the next frame.
    pub fn process_frame(&mut self, frame: Frame) -> Result<CompositeImage> {
        let (width, height) = frame.dimensions();

        let start = Instant::now();
        let observation = self.engine.segment(&frame)?;
        self.timings.segment += start.elapsed();

        let start = Instant::now();
        let instances = select_instances(&observation, self.point);
        let mask = generate_scaled_mask(&observation, &instances, width, height)?;
        drop(observation);
        self.timings.mask += start.elapsed();

        let start = Instant::now();
        let composite = self.compositor.composite(&frame, &mask, self.effect)?;
        self.timings.composite += start.elapsed();

        Ok(composite)
    }
}

/// Drive one input through the extractor.
///
/// Frames that fail inside the pipeline are skipped and do not consume an
/// output index, so written frames are numbered 0, 1, 2, ... without gaps.
/// Errors from the source or the sink abort this input.
pub fn run_video<E, S, O>(
    extractor: &mut SubjectExtractor<'_, E>,
    source: &mut S,
    sink: &mut O,
) -> anyhow::Result<RunSummary>
where
    E: SegmentationEngine,
    S: FrameSource + ?Sized,
    O: OutputSink + ?Sized,
{
    let started = Instant::now();
    let mut summary = RunSummary::default();
    extractor.reset_timings();

    let (width, height) = source.resolution();
    tracing::info!("Processing {}x{} frames...", width, height);

    while let Some(frame) = source.next_frame().context("Failed to read frame")? {
        summary.frames_read += 1;

        match extractor.process_frame(frame) {
            Ok(composite) => {
                sink.write_frame(summary.frames_written, &composite)
                    .with_context(|| format!("Failed to write frame {}", summary.frames_written))?;
                summary.frames_written += 1;
            }
            Err(e) if e.is_frame_local() => {
                summary.frames_skipped += 1;
                match &e {
                    ExtractError::Segmentation(_) => {
                        tracing::debug!("Skipping frame {}: {}", summary.frames_read - 1, e)
                    }
                    _ => tracing::warn!("Skipping frame {}: {}", summary.frames_read - 1, e),
                }
            }
            Err(e) => return Err(e.into()),
        }

        if summary.frames_read % LOG_INTERVAL == 0 {
            log_progress(&summary, &extractor.timings());
        }
    }

    summary.elapsed = started.elapsed();
    Ok(summary)
}

fn log_progress(summary: &RunSummary, timings: &StageTimings) {
    let n = summary.frames_read as f64;
    let avg_ms = |d: Duration| d.as_secs_f64() * 1000.0 / n;
    tracing::info!(
        "Frame {}: written={}, skipped={}, segment={:.1}ms, mask={:.1}ms, composite={:.1}ms",
        summary.frames_read,
        summary.frames_written,
        summary.frames_skipped,
        avg_ms(timings.segment),
        avg_ms(timings.mask),
        avg_ms(timings.composite)
    );
}
