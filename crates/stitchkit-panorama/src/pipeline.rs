use std::borrow::Cow;

use rand::Rng;
use stitchkit_core::{Correspondence, Homography, Image};
use stitchkit_features::{
    match_descriptors, resolve_matches, DescriptorSet, HarrisDetector, HarrisParamsError, Match,
};

use crate::compositor::{combine_images, CompositeError};
use crate::params::{PanoramaParams, Projection};
use crate::projection::project;
use crate::ransac::{ransac, RansacResult};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PanoramaError {
    #[error(transparent)]
    Harris(#[from] HarrisParamsError),
    #[error(transparent)]
    Composite(#[from] CompositeError),
    #[error("inlier threshold must be finite and positive, got {0}")]
    InvalidInlierThreshold(f32),
    #[error("projection focal length must be finite and positive, got {0}")]
    InvalidFocal(f32),
    #[error("images have different channel counts ({a} vs {b})")]
    ChannelMismatch { a: usize, b: usize },
}

/// Descriptors of both images and their mutual matches.
#[derive(Clone, Debug)]
pub struct MatchSet {
    pub a: DescriptorSet,
    pub b: DescriptorSet,
    pub matches: Vec<Match>,
}

impl MatchSet {
    /// Matches as A-frame → B-frame point pairs, in match order.
    pub fn correspondences(&self) -> Vec<Correspondence> {
        resolve_matches(&self.a, &self.b, &self.matches)
    }
}

/// Everything produced by one [`PanoramaStitcher::stitch`] call.
#[derive(Clone, Debug)]
pub struct PanoramaResult {
    pub panorama: Image,
    /// Maps A-frame points (after any projection) to B-frame points.
    pub homography: Homography,
    pub ransac: RansacResult,
    pub corners_a: usize,
    pub corners_b: usize,
    pub correspondences: Vec<Correspondence>,
}

/// Two-image stitcher: detect, describe, match, estimate, composite.
#[derive(Clone, Debug)]
pub struct PanoramaStitcher {
    params: PanoramaParams,
    detector: HarrisDetector,
}

impl PanoramaStitcher {
    pub fn new(params: PanoramaParams) -> Result<Self, PanoramaError> {
        let detector = HarrisDetector::new(params.harris.clone())?;
        let thr = params.ransac.inlier_threshold;
        if !thr.is_finite() || thr <= 0.0 {
            return Err(PanoramaError::InvalidInlierThreshold(thr));
        }
        if !(0.0..=1.0).contains(&params.composite.blend) {
            return Err(CompositeError::InvalidBlend(params.composite.blend).into());
        }
        if let Some(Projection::Cylindrical { focal } | Projection::Spherical { focal }) =
            params.projection
        {
            if !focal.is_finite() || focal <= 0.0 {
                return Err(PanoramaError::InvalidFocal(focal));
            }
        }
        Ok(Self { params, detector })
    }

    pub fn params(&self) -> &PanoramaParams {
        &self.params
    }

    pub fn detector(&self) -> &HarrisDetector {
        &self.detector
    }

    /// Input after the configured projection, if any.
    pub fn prepare<'a>(&self, image: &'a Image) -> Cow<'a, Image> {
        match self.params.projection {
            Some(p) => Cow::Owned(project(image, p)),
            None => Cow::Borrowed(image),
        }
    }

    /// Detect and describe both images, then match them. No projection is
    /// applied; pass prepared images if one is configured.
    pub fn find_matches(&self, a: &Image, b: &Image) -> MatchSet {
        let da = self.detector.detect(a);
        let db = self.detector.detect(b);
        let matches = match_descriptors(&da, &db);
        MatchSet {
            a: da,
            b: db,
            matches,
        }
    }

    /// Stitch `b` onto `a`. The RNG drives RANSAC sampling; a seeded RNG
    /// makes the result reproducible.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "info", skip_all, fields(a_w = a.width(), b_w = b.width()))
    )]
    pub fn stitch<R: Rng + ?Sized>(
        &self,
        a: &Image,
        b: &Image,
        rng: &mut R,
    ) -> Result<PanoramaResult, PanoramaError> {
        if a.channels() != b.channels() {
            return Err(PanoramaError::ChannelMismatch {
                a: a.channels(),
                b: b.channels(),
            });
        }
        let a = self.prepare(a);
        let b = self.prepare(b);

        let set = self.find_matches(&a, &b);
        let correspondences = set.correspondences();
        log::info!(
            "{} + {} corners, {} mutual matches",
            set.a.len(),
            set.b.len(),
            correspondences.len()
        );

        let ransac = ransac(&correspondences, &self.params.ransac, rng);
        log::info!(
            "homography supported by {} of {} matches",
            ransac.inliers.len(),
            correspondences.len()
        );

        let panorama = combine_images(&a, &b, &ransac.homography, &self.params.composite)?;
        Ok(PanoramaResult {
            panorama,
            homography: ransac.homography,
            corners_a: set.a.len(),
            corners_b: set.b.len(),
            correspondences,
            ransac,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{CompositeParams, RansacParams};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut params = PanoramaParams::default();
        params.ransac.inlier_threshold = 0.0;
        assert_eq!(
            PanoramaStitcher::new(params).unwrap_err(),
            PanoramaError::InvalidInlierThreshold(0.0)
        );

        let params = PanoramaParams {
            composite: CompositeParams {
                blend: -0.1,
                ..CompositeParams::default()
            },
            ..PanoramaParams::default()
        };
        assert!(matches!(
            PanoramaStitcher::new(params),
            Err(PanoramaError::Composite(CompositeError::InvalidBlend(_)))
        ));

        let params = PanoramaParams {
            projection: Some(Projection::Cylindrical { focal: -1.0 }),
            ..PanoramaParams::default()
        };
        assert!(matches!(
            PanoramaStitcher::new(params),
            Err(PanoramaError::InvalidFocal(_))
        ));
    }

    #[test]
    fn featureless_images_degrade_to_identity() {
        let stitcher = PanoramaStitcher::new(PanoramaParams {
            ransac: RansacParams {
                max_iters: 10,
                ..RansacParams::default()
            },
            ..PanoramaParams::default()
        })
        .expect("valid");
        let a = Image::filled(16, 12, 3, 0.5);
        let result = stitcher
            .stitch(&a, &a, &mut StdRng::seed_from_u64(1))
            .expect("stitch");
        assert_eq!(result.corners_a, 0);
        assert!(result.ransac.insufficient);
        assert_eq!(result.homography, Homography::identity());
        assert_eq!(
            (result.panorama.width(), result.panorama.height()),
            (16, 12)
        );
    }

    #[test]
    fn channel_mismatch_is_an_error() {
        let stitcher = PanoramaStitcher::new(PanoramaParams::default()).expect("valid");
        let err = stitcher
            .stitch(
                &Image::new(4, 4, 1),
                &Image::new(4, 4, 3),
                &mut StdRng::seed_from_u64(0),
            )
            .unwrap_err();
        assert_eq!(err, PanoramaError::ChannelMismatch { a: 1, b: 3 });
    }
}
