//! Two-image panorama stitching.
//!
//! [`ransac`] estimates the homography between matched corners of two images
//! in the presence of outliers; [`combine_images`] warps the second image
//! into the first one's frame, blends the overlap and trims the canvas.
//! [`PanoramaStitcher`] runs the whole chain from two [`Image`]s, with
//! corner detection and matching provided by `stitchkit-features`.
//!
//! [`Image`]: stitchkit_core::Image

mod compositor;
mod draw;
mod io;
mod params;
mod pipeline;
mod projection;
mod ransac;

pub use compositor::{canvas_bounds, combine_images, trim_image, CanvasBounds, CompositeError};
pub use draw::{draw_inliers, draw_matches, side_by_side};
pub use io::{PanoramaConfig, PanoramaIoError, PanoramaReport};
pub use params::{CompositeParams, PanoramaParams, Projection, RansacParams};
pub use pipeline::{MatchSet, PanoramaError, PanoramaResult, PanoramaStitcher};
pub use projection::{cylindrical_project, project, spherical_project};
pub use ransac::{estimate_homography_ransac, model_inliers, ransac, shuffle, RansacResult};
