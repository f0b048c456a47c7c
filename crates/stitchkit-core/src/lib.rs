//! Core types for feature-based image stitching.
//!
//! This crate holds the pieces every stage shares: a planar `f32` image
//! buffer, border-clamped filtering, and planar homographies with a
//! normalized DLT solver. It does not know about corners, descriptors or
//! image file formats.

mod filter;
mod homography;
mod image;
mod logger;

pub use filter::{convolve, gaussian_kernel_1d, gx_kernel, gy_kernel, smooth, Kernel};
pub use homography::{
    compute_homography, point_distance, reprojection_error, try_compute_homography,
    Correspondence, Homography, HomographyError,
};
pub use image::Image;

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_verbosity};

pub use nalgebra::Point2;
