use serde::{Deserialize, Serialize};
use stitchkit_features::HarrisParams;

/// Robust homography estimation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacParams {
    /// Reprojection distance (pixels, B frame) below which a match is an inlier.
    pub inlier_threshold: f32,
    /// Iteration budget.
    pub max_iters: usize,
    /// Stop as soon as a candidate has more inliers than this.
    pub cutoff: usize,
}

impl Default for RansacParams {
    fn default() -> Self {
        Self {
            inlier_threshold: 2.0,
            max_iters: 10_000,
            cutoff: 30,
        }
    }
}

/// Canvas compositing settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeParams {
    /// Weight of image A where both images have content: `b * (1 - blend) + a * blend`.
    pub blend: f32,
    /// Refuse canvases wider or taller than this; usually a sign of a bad homography.
    pub max_canvas_side: usize,
    /// Refuse canvases with more pixels than this.
    pub max_canvas_pixels: usize,
}

impl Default for CompositeParams {
    fn default() -> Self {
        Self {
            blend: 0.5,
            max_canvas_side: 20_000,
            max_canvas_pixels: 40_000_000,
        }
    }
}

/// Re-projection applied to both inputs before detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Cylindrical { focal: f32 },
    Spherical { focal: f32 },
}

/// Everything the two-image stitcher needs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanoramaParams {
    pub harris: HarrisParams,
    pub ransac: RansacParams,
    pub composite: CompositeParams,
    pub projection: Option<Projection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projection_uses_tagged_json() {
        let p: Projection = serde_json::from_str(r#"{ "kind": "cylindrical", "focal": 500.0 }"#)
            .expect("parse");
        assert_eq!(p, Projection::Cylindrical { focal: 500.0 });
    }

    #[test]
    fn empty_json_gives_defaults() {
        let p: PanoramaParams = serde_json::from_str("{}").expect("parse");
        assert_eq!(p, PanoramaParams::default());
        assert_eq!(p.ransac.cutoff, 30);
        assert!(p.projection.is_none());
    }
}
