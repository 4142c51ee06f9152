use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use subject_extractor::compositor::{BokehParams, Compositor, CpuFilterEngine, Effect};
use subject_extractor::config::{parse_radius, parse_size, EngineConfig, ExtractorConfig};
use subject_extractor::output::{output_dir_for, PngSequenceWriter};
use subject_extractor::pipeline::{run_video, SubjectExtractor};
use subject_extractor::segmentation::{
    self, KeyColor, KeyParams, LabelParams, SegmentationEngine, SelectionPoint,
};
use subject_extractor::source;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Videos (or directories of frames) to process
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Background treatment
    #[arg(short, long, value_enum, default_value_t = Effect::Cut)]
    effect: Effect,

    /// Keep only the subject under this normalized "x,y" point (top-left origin)
    #[arg(short, long)]
    point: Option<SelectionPoint>,

    /// Path to segmentation model (ONNX file)
    /// If not provided, subjects are found by color keying
    #[arg(long)]
    model: Option<PathBuf>,

    /// Model input size
    #[arg(long, default_value = "512x512", value_parser = parse_model_size)]
    model_size: (u32, u32),

    /// Background key color for the model-free engine
    #[arg(long, default_value = "00ff00")]
    key_color: KeyColor,

    /// RGB distance from the key color still treated as background
    #[arg(long, default_value_t = 60.0)]
    tolerance: f32,

    /// Minimum foreground confidence (0-255)
    #[arg(long, default_value_t = 128)]
    threshold: u8,

    /// Drop subjects smaller than this many pixels (at engine resolution)
    #[arg(long, default_value_t = 16)]
    min_area: u32,

    /// Bokeh halo radius in pixels
    #[arg(long, default_value_t = 20.0, value_parser = parse_bokeh_radius)]
    bokeh_radius: f32,

    /// Root directory for results (default: next to each input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_model_size(s: &str) -> std::result::Result<(u32, u32), String> {
    parse_size(s).map_err(|e| e.to_string())
}

fn parse_bokeh_radius(s: &str) -> std::result::Result<f32, String> {
    parse_radius(s).map_err(|e| e.to_string())
}

impl Args {
    fn to_config(&self) -> ExtractorConfig {
        let engine = match &self.model {
            Some(model) => EngineConfig::Onnx {
                model: model.clone(),
                input_size: self.model_size,
            },
            None => EngineConfig::Key(KeyParams {
                color: self.key_color,
                tolerance: self.tolerance,
                ..KeyParams::default()
            }),
        };

        ExtractorConfig {
            effect: self.effect,
            point: self.point,
            engine,
            labelling: LabelParams {
                threshold: self.threshold,
                min_instance_area: self.min_area,
            },
            bokeh: BokehParams {
                radius: self.bokeh_radius,
                ..BokehParams::default()
            },
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    tracing::info!("Subject extractor starting");

    let config = args.to_config();

    let engine = segmentation::create_engine(&config.engine, config.labelling)
        .context("Failed to initialize segmentation engine")?;

    // Shared by every frame of every input
    let filters = CpuFilterEngine::new(config.bokeh);
    let compositor = Compositor::new(&filters, config.bokeh);
    let mut extractor = SubjectExtractor::new(engine, compositor, config.effect, config.point);

    let today = chrono::Local::now().date_naive();
    let mut failed = 0usize;

    for (i, input) in args.inputs.iter().enumerate() {
        tracing::info!("------- {} of {}: {} -------", i + 1, args.inputs.len(), input.display());
        let output_dir = output_dir_for(input, args.output.as_deref(), today);

        if let Err(e) = process_input(&mut extractor, input, &output_dir) {
            tracing::error!("Skipping {}: {:#}", input.display(), e);
            failed += 1;
        }
    }

    if failed > 0 {
        bail!("{} of {} inputs failed", failed, args.inputs.len());
    }
    Ok(())
}

fn process_input<E: SegmentationEngine>(
    extractor: &mut SubjectExtractor<'_, E>,
    input: &Path,
    output_dir: &Path,
) -> Result<()> {
    let mut frames = source::open(input)?;
    let mut writer = PngSequenceWriter::new(output_dir)?;

    let summary = run_video(extractor, frames.as_mut(), &mut writer)?;

    tracing::info!(
        "Done: {} frames written to {} ({} read, {} skipped, {:.1}s)",
        summary.frames_written,
        writer.dir().display(),
        summary.frames_read,
        summary.frames_skipped,
        summary.elapsed.as_secs_f64()
    );
    Ok(())
}
