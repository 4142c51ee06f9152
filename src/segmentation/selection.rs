use super::types::{InstanceObservation, InstanceSet};
use crate::error::ExtractError;
use std::fmt;
use std::str::FromStr;

/// A point normalized to [0, 1] on both axes, origin at the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPoint {
    pub x: f32,
    pub y: f32,
}

impl SelectionPoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Map onto a `width` x `height` pixel grid.
    ///
    /// Uses `round(v * (dimension - 1))` per axis, so 1.0 lands on the last
    /// pixel. Both the point and the grid have a top-left origin, so rows
    /// count down from the top. Callers are expected to pass coordinates in
    /// [0, 1]; anything else is clamped onto the edge only to keep the
    /// lookup in bounds.
    pub fn to_pixel(&self, width: u32, height: u32) -> (u32, u32) {
        (
            scale_axis(self.x, width),
            scale_axis(self.y, height),
        )
    }
}

fn scale_axis(value: f32, dimension: u32) -> u32 {
    let last = dimension.saturating_sub(1);
    let scaled = (value * last as f32).round();
    if scaled <= 0.0 {
        0
    } else {
        (scaled as u32).min(last)
    }
}

impl FromStr for SelectionPoint {
    type Err = ExtractError;

    /// Parse "x,y"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| ExtractError::Config(format!("expected \"x,y\", got \"{}\"", s)))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f32>()
                .map_err(|e| ExtractError::Config(format!("invalid coordinate \"{}\": {}", v, e)))
        };
        let point = Self::new(parse(x)?, parse(y)?);
        if !(0.0..=1.0).contains(&point.x) || !(0.0..=1.0).contains(&point.y) {
            return Err(ExtractError::Config(format!(
                "selection point {} is outside [0, 1]",
                point
            )));
        }
        Ok(point)
    }
}

impl fmt::Display for SelectionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Pick which instances of an observation take part in the mask.
///
/// Without a point every instance is kept. With a point, the label under it
/// is looked up in the label buffer (not the frame); background selects
/// every instance, any other label selects just that one.
pub fn select_instances(
    observation: &InstanceObservation,
    point: Option<SelectionPoint>,
) -> InstanceSet {
    let Some(point) = point else {
        return observation.all_instances().clone();
    };

    let (width, height) = observation.dimensions();
    let (px, py) = point.to_pixel(width, height);
    let label = observation.labels().get_pixel(px, py)[0];
    tracing::debug!("Point {} -> label pixel ({}, {}) = {}", point, px, py, label);

    if label == 0 {
        observation.all_instances().clone()
    } else {
        InstanceSet::single(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::types::InstanceLabelBuffer;
    use image::{GrayImage, Luma};

    /// 4x3 buffer, instance 1 in the left column, instance 2 in the right column
    fn observation() -> InstanceObservation {
        let labels = InstanceLabelBuffer::from_fn(4, 3, |x, _| match x {
            0 => Luma([1]),
            3 => Luma([2]),
            _ => Luma([0]),
        });
        let confidence = GrayImage::from_fn(4, 3, |x, y| {
            Luma([if labels.get_pixel(x, y)[0] > 0 { 255 } else { 0 }])
        });
        InstanceObservation::new(labels, confidence, [1, 2].into_iter().collect())
    }

    #[test]
    fn test_no_point_selects_everything() {
        let obs = observation();
        assert_eq!(select_instances(&obs, None), *obs.all_instances());
    }

    #[test]
    fn test_point_on_instance_selects_only_it() {
        let obs = observation();
        let set = select_instances(&obs, Some(SelectionPoint::new(1.0, 0.5)));
        assert_eq!(set, InstanceSet::single(2));
    }

    #[test]
    fn test_point_on_background_selects_everything() {
        let obs = observation();
        let set = select_instances(&obs, Some(SelectionPoint::new(0.5, 0.5)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_to_pixel_uses_last_index() {
        let p = SelectionPoint::new(1.0, 1.0);
        assert_eq!(p.to_pixel(640, 480), (639, 479));
        let p = SelectionPoint::new(0.0, 0.0);
        assert_eq!(p.to_pixel(640, 480), (0, 0));
        let p = SelectionPoint::new(0.5, 0.5);
        // 0.5 * 3 = 1.5 rounds away from zero
        assert_eq!(p.to_pixel(4, 4), (2, 2));
    }

    #[test]
    fn test_parse_point() {
        let p: SelectionPoint = "0.25, 0.75".parse().unwrap();
        assert_eq!(p, SelectionPoint::new(0.25, 0.75));
        assert!("1.5,0".parse::<SelectionPoint>().is_err());
        assert!("0.5".parse::<SelectionPoint>().is_err());
        assert!("a,b".parse::<SelectionPoint>().is_err());
    }
}
