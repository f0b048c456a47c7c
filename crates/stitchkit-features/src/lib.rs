//! Harris corner detection, patch descriptors and descriptor matching.
//!
//! Pipeline:
//! - [`structure_tensor`] and [`cornerness`] turn an image into a response map.
//! - [`non_max_suppression`] thins it; [`extract_corners`] thresholds it.
//! - [`describe_index`] samples a centre-subtracted patch at each corner.
//! - [`match_descriptors`] pairs descriptors that are each other's nearest
//!   neighbour under L1 distance.
//!
//! [`HarrisDetector`] bundles the first three steps behind [`HarrisParams`].

mod descriptor;
mod detector;
mod draw;
mod matcher;
mod nms;
mod params;
mod response;

pub use descriptor::{describe_index, Descriptor, DescriptorKey, DescriptorSet, SetId};
pub use detector::HarrisDetector;
pub use draw::mark_corners;
pub use matcher::{l1_distance, match_descriptors, nearest_neighbors, resolve_matches, Match};
pub use nms::{extract_corners, non_max_suppression};
pub use params::{CornerMethod, HarrisParams, HarrisParamsError};
pub use response::{cornerness, structure_tensor, Score, ScoreMap, StructureTensor};
