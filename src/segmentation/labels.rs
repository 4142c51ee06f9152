use super::types::{InstanceLabelBuffer, InstanceObservation, InstanceSet};
use crate::error::{ExtractError, Result};
use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

/// How a confidence matte is split into instances
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelParams {
    /// Minimum confidence (0-255) for a pixel to count as foreground
    pub threshold: u8,
    /// Components with fewer pixels than this are dropped as noise
    pub min_instance_area: u32,
}

impl Default for LabelParams {
    fn default() -> Self {
        Self {
            threshold: 128,
            min_instance_area: 16,
        }
    }
}

/// Split a foreground confidence matte into numbered instances.
///
/// Foreground pixels are grouped into 8-connected components. Components
/// below `min_instance_area` are discarded and the survivors are numbered
/// 1..=n in raster order of their first pixel.
pub fn label_instances(confidence: GrayImage, params: &LabelParams) -> Result<InstanceObservation> {
    let _span = tracing::debug_span!("label_instances").entered();

    let threshold = params.threshold.max(1);
    let (width, height) = confidence.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractError::Segmentation("empty confidence matte".to_string()));
    }

    let foreground = GrayImage::from_fn(width, height, |x, y| {
        if confidence.get_pixel(x, y)[0] >= threshold {
            Luma([255])
        } else {
            Luma([0])
        }
    });

    let components = connected_components(&foreground, Connectivity::Eight, Luma([0u8]));

    let max_label = components.pixels().map(|p| p[0]).max().unwrap_or(0) as usize;
    let mut areas = vec![0u32; max_label + 1];
    for p in components.pixels() {
        areas[p[0] as usize] += 1;
    }

    // 0 = not yet assigned, u32::MAX = dropped
    let mut remap = vec![0u32; max_label + 1];
    let mut next_id = 1u32;
    let mut labels = InstanceLabelBuffer::new(width, height);
    for (x, y, p) in components.enumerate_pixels() {
        let component = p[0] as usize;
        if component == 0 {
            continue;
        }
        if remap[component] == 0 {
            remap[component] = if areas[component] >= params.min_instance_area {
                next_id += 1;
                next_id - 1
            } else {
                u32::MAX
            };
        }
        if remap[component] != u32::MAX {
            labels.put_pixel(x, y, Luma([remap[component]]));
        }
    }

    if next_id == 1 {
        return Err(ExtractError::Segmentation("no subject observations found".to_string()));
    }

    let instances: InstanceSet = (1..next_id).collect();
    tracing::debug!("Found {} instance(s) at {}x{}", instances.len(), width, height);

    Ok(InstanceObservation::new(labels, confidence, instances))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matte_with_rects(width: u32, height: u32, rects: &[(u32, u32, u32, u32)]) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let inside = rects
                .iter()
                .any(|&(rx, ry, rw, rh)| x >= rx && x < rx + rw && y >= ry && y < ry + rh);
            Luma([if inside { 255 } else { 0 }])
        })
    }

    #[test]
    fn test_two_disjoint_regions_become_two_instances() {
        let matte = matte_with_rects(20, 10, &[(1, 1, 5, 5), (12, 2, 6, 6)]);
        let params = LabelParams {
            threshold: 128,
            min_instance_area: 1,
        };
        let obs = label_instances(matte, &params).unwrap();

        assert_eq!(obs.all_instances().iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(obs.labels().get_pixel(2, 2)[0], 1);
        assert_eq!(obs.labels().get_pixel(13, 3)[0], 2);
        assert_eq!(obs.labels().get_pixel(9, 9)[0], 0);
    }

    #[test]
    fn test_small_components_are_dropped() {
        let matte = matte_with_rects(20, 10, &[(0, 0, 1, 1), (10, 2, 5, 5)]);
        let params = LabelParams {
            threshold: 128,
            min_instance_area: 4,
        };
        let obs = label_instances(matte, &params).unwrap();

        assert_eq!(obs.all_instances().len(), 1);
        assert_eq!(obs.labels().get_pixel(0, 0)[0], 0);
        assert_eq!(obs.labels().get_pixel(11, 3)[0], 1);
    }

    #[test]
    fn test_empty_matte_is_a_segmentation_failure() {
        let matte = GrayImage::new(8, 8);
        let err = label_instances(matte, &LabelParams::default()).unwrap_err();
        assert!(matches!(err, ExtractError::Segmentation(_)));
    }

    #[test]
    fn test_zero_threshold_does_not_select_background() {
        let matte = matte_with_rects(8, 8, &[(2, 2, 4, 4)]);
        let params = LabelParams {
            threshold: 0,
            min_instance_area: 1,
        };
        let obs = label_instances(matte, &params).unwrap();
        assert_eq!(obs.labels().get_pixel(0, 0)[0], 0);
        assert_eq!(obs.all_instances().len(), 1);
    }
}
