//! Extract foreground subjects from video frames and composite them over a
//! chosen background treatment.
//!
//! Per frame: a [`segmentation::SegmentationEngine`] labels instances,
//! [`segmentation::select_instances`] narrows them, a mask is scaled to the
//! frame and the [`compositor::Compositor`] blends the frame over the
//! treated background. [`pipeline::run_video`] drives a
//! [`source::FrameSource`] into an [`output::OutputSink`].

pub mod compositor;
pub mod config;
pub mod error;
pub mod frame;
pub mod output;
pub mod pipeline;
pub mod segmentation;
pub mod source;

pub use compositor::{BokehParams, CompositeImage, Compositor, CpuFilterEngine, Effect, FilterEngine};
pub use config::{EngineConfig, ExtractorConfig};
pub use error::{ExtractError, Result};
pub use frame::Frame;
pub use pipeline::{run_video, RunSummary, SubjectExtractor};
