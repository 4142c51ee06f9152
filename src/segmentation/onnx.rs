use super::labels::{label_instances, LabelParams};
use super::preprocess::Preprocessor;
use super::types::{InstanceObservation, SegmentationEngine};
use crate::error::{ExtractError, Result};
use crate::frame::Frame;
use anyhow::{anyhow, Context};
use image::GrayImage;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;

/// Foreground segmentation backed by an ONNX matting or saliency model.
///
/// The model takes a `[1, 3, H, W]` RGB tensor in [0, 1] and produces a
/// single-channel foreground probability map. Instances are the connected
/// regions of that map, so the label buffer has the model's output
/// resolution. Nothing is carried over between frames.
pub struct OnnxSegmenter {
    session: Session,
    preprocessor: Preprocessor,
    labelling: LabelParams,
}

impl OnnxSegmenter {
    /// Load a model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `input_size` - (width, height) the model expects, e.g. 512x512
    /// * `labelling` - how the probability map is split into instances
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        input_size: (u32, u32),
        labelling: LabelParams,
    ) -> anyhow::Result<Self> {
        let path = model_path.as_ref();

        tracing::info!("Loading segmentation model from {}", path.display());

        let session = Session::builder()
            .context("Failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(4)
            .context("Failed to set intra-op threads")?
            .commit_from_file(path)
            .with_context(|| format!("Failed to load model from {}", path.display()))?;

        tracing::info!(
            "Segmentation model loaded, input {}x{}",
            input_size.0,
            input_size.1
        );

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(input_size.0, input_size.1),
            labelling,
        })
    }

    fn infer(&mut self, frame: &Frame) -> anyhow::Result<GrayImage> {
        let input = self.preprocessor.preprocess(frame.image());
        let (width, height) = self.preprocessor.target_size();
        let shape = [1usize, 3, height as usize, width as usize];
        let (data, _offset) = input.into_raw_vec_and_offset();
        let tensor = Tensor::from_array((shape, data.into_boxed_slice()))
            .context("Failed to create input tensor")?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("Failed to run inference")?;

        // The foreground map is the first output shaped [1, 1, h, w], [1, h, w] or [h, w]
        for (name, value) in outputs.iter() {
            let Ok((shape, data)) = value.try_extract_tensor::<f32>() else {
                continue;
            };
            let dims: Vec<i64> = shape.iter().copied().collect();
            let single_channel = match dims.len() {
                4 => dims[0] == 1 && dims[1] == 1,
                3 => dims[0] == 1,
                2 => true,
                _ => false,
            };
            if !single_channel {
                continue;
            }

            let matte_height = dims[dims.len() - 2];
            let matte_width = dims[dims.len() - 1];
            if matte_width <= 0 || matte_height <= 0 {
                continue;
            }
            tracing::debug!("Using output '{}' ({}x{})", name, matte_width, matte_height);
            let matte = Preprocessor::matte_to_gray(data, matte_width as u32, matte_height as u32)?;
            return Ok(matte);
        }

        Err(anyhow!("model produced no single-channel foreground output"))
    }
}

impl SegmentationEngine for OnnxSegmenter {
    fn segment(&mut self, frame: &Frame) -> Result<InstanceObservation> {
        let _span = tracing::debug_span!("onnx_segment").entered();

        let confidence = self
            .infer(frame)
            .map_err(|e| ExtractError::Segmentation(format!("{:#}", e)))?;

        label_instances(confidence, &self.labelling)
    }

    fn name(&self) -> &str {
        "onnx"
    }

    fn input_size(&self) -> Option<(u32, u32)> {
        Some(self.preprocessor.target_size())
    }
}
