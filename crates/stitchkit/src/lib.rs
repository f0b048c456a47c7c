//! Feature-based two-image panorama stitching.
//!
//! This crate re-exports the `stitchkit-*` workspace crates under short
//! module names and, behind the `image` feature, converts between
//! [`image`](https://docs.rs/image) buffers and the planar [`Image`] used by
//! the pipeline.
//!
//! ## Quickstart
//!
//! ```no_run
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//! use stitchkit::convert::{load_image, save_image};
//! use stitchkit::{PanoramaParams, PanoramaStitcher};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let a = load_image("left.png")?;
//! let b = load_image("right.png")?;
//! let stitcher = PanoramaStitcher::new(PanoramaParams::default())?;
//! let result = stitcher.stitch(&a, &b, &mut StdRng::seed_from_u64(0))?;
//! println!("{} inliers", result.ransac.inliers.len());
//! save_image(&result.panorama, "panorama.png")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `stitchkit::core`: planar images, filters, homographies, logging.
//! - `stitchkit::features`: Harris corners, patch descriptors, matching.
//! - `stitchkit::panorama`: RANSAC, compositing, projections, the end-to-end stitcher.
//! - `stitchkit::convert` (feature `image`): load/save through the `image` crate.

pub use stitchkit_core as core;
pub use stitchkit_features as features;
pub use stitchkit_panorama as panorama;

pub use stitchkit_core::{Correspondence, Homography, Image, Point2};
pub use stitchkit_features::{DescriptorSet, HarrisDetector, HarrisParams, Match};
pub use stitchkit_panorama::{
    PanoramaConfig, PanoramaError, PanoramaParams, PanoramaReport, PanoramaResult,
    PanoramaStitcher, RansacParams, RansacResult,
};

#[cfg(feature = "image")]
pub mod convert;
