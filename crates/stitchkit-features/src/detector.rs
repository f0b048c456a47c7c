use nalgebra::Point2;
use stitchkit_core::Image;

use crate::descriptor::{describe_index, DescriptorSet};
use crate::nms::{extract_corners, non_max_suppression};
use crate::params::{HarrisParams, HarrisParamsError};
use crate::response::{cornerness, structure_tensor, ScoreMap};

/// Harris corner detector producing patch descriptors.
#[derive(Clone, Debug)]
pub struct HarrisDetector {
    params: HarrisParams,
}

impl HarrisDetector {
    pub fn new(params: HarrisParams) -> Result<Self, HarrisParamsError> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &HarrisParams {
        &self.params
    }

    /// Raw cornerness before suppression.
    pub fn response_map(&self, image: &Image) -> ScoreMap {
        let tensor = structure_tensor(image, self.params.sigma);
        cornerness(&tensor, self.params.method)
    }

    /// Cornerness after non-max suppression.
    pub fn suppressed_map(&self, image: &Image) -> ScoreMap {
        non_max_suppression(&self.response_map(image), self.params.nms_radius)
    }

    /// Corner locations without descriptors.
    pub fn corner_points(&self, image: &Image) -> Vec<Point2<f32>> {
        extract_corners(&self.suppressed_map(image), self.params.threshold)
            .into_iter()
            .map(|(x, y)| Point2::new(x as f32, y as f32))
            .collect()
    }

    /// Detect corners and describe each one on the input image (all channels).
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(w = image.width(), h = image.height()))
    )]
    pub fn detect(&self, image: &Image) -> DescriptorSet {
        let nms = self.suppressed_map(image);
        let corners = extract_corners(&nms, self.params.threshold);
        log::debug!(
            "{} corners above threshold {} in {}x{} image",
            corners.len(),
            self.params.threshold,
            image.width(),
            image.height()
        );
        DescriptorSet::from_descriptors(
            corners
                .into_iter()
                .map(|(x, y)| describe_index(image, x, y, self.params.window))
                .collect(),
        )
    }
}
