use crate::compositor::{BokehParams, Effect};
use crate::error::ExtractError;
use crate::segmentation::{KeyParams, LabelParams, SelectionPoint};
use std::path::PathBuf;

/// Which segmentation engine to run
#[derive(Debug, Clone)]
pub enum EngineConfig {
    Onnx {
        model: PathBuf,
        /// (width, height) the model expects
        input_size: (u32, u32),
    },
    Key(KeyParams),
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig::Key(KeyParams::default())
    }
}

/// Settings fixed for a whole run
#[derive(Debug, Clone, Default)]
pub struct ExtractorConfig {
    pub effect: Effect,
    /// Same point for every frame of every video
    pub point: Option<SelectionPoint>,
    pub engine: EngineConfig,
    pub labelling: LabelParams,
    pub bokeh: BokehParams,
}

/// Parse "WIDTHxHEIGHT"
pub fn parse_size(s: &str) -> Result<(u32, u32), ExtractError> {
    let invalid = || ExtractError::Config(format!("expected WIDTHxHEIGHT, got \"{}\"", s));
    let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let w: u32 = w.parse().map_err(|_| invalid())?;
    let h: u32 = h.parse().map_err(|_| invalid())?;
    if w == 0 || h == 0 {
        return Err(invalid());
    }
    Ok((w, h))
}

/// Parse a bokeh radius in pixels: finite and not negative
pub fn parse_radius(s: &str) -> Result<f32, ExtractError> {
    let radius: f32 = s
        .trim()
        .parse()
        .map_err(|_| ExtractError::Config(format!("expected a radius in pixels, got \"{}\"", s)))?;
    if !radius.is_finite() || radius < 0.0 {
        return Err(ExtractError::Config(format!(
            "bokeh radius must be finite and at least 0, got {}",
            radius
        )));
    }
    Ok(radius)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExtractorConfig::default();
        assert_eq!(config.effect, Effect::Cut);
        assert!(config.point.is_none());
        assert!(matches!(config.engine, EngineConfig::Key(_)));
        assert_eq!(config.bokeh.radius, 20.0);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("512x512").unwrap(), (512, 512));
        assert_eq!(parse_size("320X240").unwrap(), (320, 240));
        assert!(parse_size("512").is_err());
        assert!(parse_size("0x10").is_err());
        assert!(parse_size("axb").is_err());
    }

    #[test]
    fn test_parse_radius() {
        assert_eq!(parse_radius("20").unwrap(), 20.0);
        assert_eq!(parse_radius(" 0 ").unwrap(), 0.0);
        for bad in ["inf", "-inf", "NaN", "-1", "big"] {
            assert!(
                matches!(parse_radius(bad), Err(ExtractError::Config(_))),
                "{} accepted",
                bad
            );
        }
    }
}
