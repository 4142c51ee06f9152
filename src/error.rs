//! Error types for the extraction pipeline

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The engine found no subject, or inference itself failed.
    #[error("Segmentation failed: {0}")]
    Segmentation(String),

    #[error("Mask generation failed: {0}")]
    MaskGeneration(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),

    #[error("Frame source error: {0}")]
    Source(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("ONNX Runtime error: {0}")]
    Ort(String),
}

impl ExtractError {
    /// Failures scoped to a single frame. The driving loop skips the frame
    /// and keeps going; anything else aborts the current input.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            ExtractError::Segmentation(_)
                | ExtractError::MaskGeneration(_)
                | ExtractError::Rendering(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExtractError::Segmentation("no subject".to_string());
        assert!(err.to_string().contains("Segmentation failed"));
        assert!(err.to_string().contains("no subject"));
    }

    #[test]
    fn test_frame_local_kinds() {
        assert!(ExtractError::Segmentation("a".into()).is_frame_local());
        assert!(ExtractError::MaskGeneration("b".into()).is_frame_local());
        assert!(ExtractError::Rendering("c".into()).is_frame_local());
        assert!(!ExtractError::Source("d".into()).is_frame_local());
        assert!(!ExtractError::Output("e".into()).is_frame_local());
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        match ExtractError::from(io_err) {
            ExtractError::Io(_) => {}
            other => panic!("Expected Io error, got {other:?}"),
        }
    }
}
