//! JSON configuration and report helpers for panorama stitching.

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use stitchkit_features::HarrisParams;

use crate::params::{CompositeParams, PanoramaParams, Projection, RansacParams};
use crate::pipeline::{PanoramaError, PanoramaResult};

#[derive(thiserror::Error, Debug)]
pub enum PanoramaIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Configuration for one two-image stitch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanoramaConfig {
    pub image_a: String,
    pub image_b: String,
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub report_path: Option<String>,
    /// Seed for RANSAC sampling.
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub harris: Option<HarrisParams>,
    #[serde(default)]
    pub ransac: Option<RansacParams>,
    #[serde(default)]
    pub composite: Option<CompositeParams>,
    #[serde(default)]
    pub projection: Option<Projection>,
}

impl PanoramaConfig {
    pub fn new(image_a: impl Into<String>, image_b: impl Into<String>) -> Self {
        Self {
            image_a: image_a.into(),
            image_b: image_b.into(),
            output_path: None,
            report_path: None,
            seed: 0,
            harris: None,
            ransac: None,
            composite: None,
            projection: None,
        }
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PanoramaIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PanoramaIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output image path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("panorama.png"))
    }

    /// Stitcher parameters: defaults with the config's overrides applied.
    pub fn build_params(&self) -> PanoramaParams {
        let mut params = PanoramaParams::default();
        if let Some(harris) = self.harris.clone() {
            params.harris = harris;
        }
        if let Some(ransac) = self.ransac.clone() {
            params.ransac = ransac;
        }
        if let Some(composite) = self.composite.clone() {
            params.composite = composite;
        }
        if self.projection.is_some() {
            params.projection = self.projection;
        }
        params
    }
}

/// Summary of one stitch, written next to the output image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanoramaReport {
    pub image_a: String,
    pub image_b: String,
    pub seed: u64,
    pub params: PanoramaParams,
    #[serde(default)]
    pub corners_a: usize,
    #[serde(default)]
    pub corners_b: usize,
    #[serde(default)]
    pub matches: usize,
    #[serde(default)]
    pub inliers: Vec<usize>,
    #[serde(default)]
    pub ransac_iterations: usize,
    #[serde(default)]
    pub ransac_early_exit: bool,
    /// Row-major homography mapping A-frame points to B-frame points.
    #[serde(default)]
    pub homography: Option<[[f64; 3]; 3]>,
    #[serde(default)]
    pub panorama_size: Option<[usize; 2]>,
    #[serde(default)]
    pub error: Option<String>,
}

impl PanoramaReport {
    pub fn new(cfg: &PanoramaConfig, params: &PanoramaParams) -> Self {
        Self {
            image_a: cfg.image_a.clone(),
            image_b: cfg.image_b.clone(),
            seed: cfg.seed,
            params: params.clone(),
            corners_a: 0,
            corners_b: 0,
            matches: 0,
            inliers: Vec::new(),
            ransac_iterations: 0,
            ransac_early_exit: false,
            homography: None,
            panorama_size: None,
            error: None,
        }
    }

    /// Populate report fields from a successful stitch.
    pub fn set_result(&mut self, res: &PanoramaResult) {
        self.corners_a = res.corners_a;
        self.corners_b = res.corners_b;
        self.matches = res.correspondences.len();
        self.inliers = res.ransac.inliers.clone();
        self.ransac_iterations = res.ransac.iterations;
        self.ransac_early_exit = res.ransac.early_exit;
        self.homography = Some(res.homography.to_array());
        self.panorama_size = Some([res.panorama.width(), res.panorama.height()]);
        self.error = None;
    }

    /// Record a stitching error.
    pub fn set_error(&mut self, err: &PanoramaError) {
        self.error = Some(err.to_string());
    }

    /// Load a report from JSON on disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PanoramaIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), PanoramaIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_replace_defaults() {
        let raw = r#"{
            "image_a": "left.png",
            "image_b": "right.png",
            "seed": 17,
            "ransac": { "max_iters": 250 },
            "projection": { "kind": "spherical", "focal": 800.0 }
        }"#;
        let cfg: PanoramaConfig = serde_json::from_str(raw).expect("parse");
        let params = cfg.build_params();
        assert_eq!(cfg.seed, 17);
        assert_eq!(params.ransac.max_iters, 250);
        assert_eq!(params.ransac.cutoff, RansacParams::default().cutoff);
        assert_eq!(params.harris, HarrisParams::default());
        assert_eq!(params.projection, Some(Projection::Spherical { focal: 800.0 }));
        assert_eq!(cfg.output_path(), PathBuf::from("panorama.png"));
    }

    #[test]
    fn report_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("report.json");

        let cfg = PanoramaConfig::new("a.png", "b.png");
        let mut report = PanoramaReport::new(&cfg, &cfg.build_params());
        report.matches = 12;
        report.inliers = vec![0, 3, 7];
        report.homography = Some([[1.0, 0.0, 4.0], [0.0, 1.0, -2.0], [0.0, 0.0, 1.0]]);
        report.write_json(&path).expect("write");

        let loaded = PanoramaReport::load_json(&path).expect("load");
        assert_eq!(loaded, report);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = PanoramaConfig::load_json("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PanoramaIoError::Io(_)));
    }
}
