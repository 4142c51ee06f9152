mod key;
mod labels;
mod mask;
mod onnx;
mod preprocess;
mod selection;
pub mod types;

pub use key::{KeyColor, KeyParams, KeySegmenter};
pub use labels::{label_instances, LabelParams};
pub use mask::generate_scaled_mask;
pub use onnx::OnnxSegmenter;
pub use preprocess::Preprocessor;
pub use selection::{select_instances, SelectionPoint};
pub use types::{
    InstanceLabelBuffer, InstanceObservation, InstanceSet, Mask, SegmentationEngine, MASK_MAX,
    MASK_MIN,
};

use crate::config::EngineConfig;
use anyhow::Result;

/// Build the engine selected on the command line
pub fn create_engine(
    engine: &EngineConfig,
    labelling: LabelParams,
) -> Result<Box<dyn SegmentationEngine>> {
    match engine {
        EngineConfig::Onnx { model, input_size } => {
            let model = OnnxSegmenter::new(model, *input_size, labelling)?;
            Ok(Box::new(model))
        }
        EngineConfig::Key(params) => Ok(Box::new(KeySegmenter::new(*params, labelling))),
    }
}
