//! Random sample consensus over point correspondences.

use rand::Rng;
use stitchkit_core::{reprojection_error, try_compute_homography, Correspondence, Homography};
use stitchkit_features::{resolve_matches, DescriptorSet, Match};

use crate::params::RansacParams;

const MIN_SAMPLE: usize = 4;

/// Outcome of [`ransac`].
#[derive(Clone, Debug, PartialEq)]
pub struct RansacResult {
    /// Best model found (identity when nothing could be fitted).
    pub homography: Homography,
    /// Indices of the correspondences within threshold of `homography`.
    pub inliers: Vec<usize>,
    /// Support of the winning minimal-sample candidate; the score the search maximised.
    pub inlier_count: usize,
    /// Iterations actually run.
    pub iterations: usize,
    /// True when the search stopped on the cutoff.
    pub early_exit: bool,
    /// True when fewer than four correspondences were supplied.
    pub insufficient: bool,
}

/// Uniform in-place Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Indices of correspondences whose projected source lies strictly closer
/// than `threshold` to the destination. Points that cannot be projected are
/// never inliers.
pub fn model_inliers(
    h: &Homography,
    correspondences: &[Correspondence],
    threshold: f32,
) -> Vec<usize> {
    correspondences
        .iter()
        .enumerate()
        .filter(|(_, c)| reprojection_error(h, c).is_some_and(|e| e < threshold))
        .map(|(i, _)| i)
        .collect()
}

fn pick(correspondences: &[Correspondence], indices: &[usize]) -> Vec<Correspondence> {
    indices.iter().map(|&i| correspondences[i]).collect()
}

/// Estimate the homography mapping `src` onto `dst` under outliers.
///
/// Each iteration shuffles the whole correspondence list and fits the first
/// four. A candidate with more inliers than the best so far is refit on all of
/// its inliers and becomes the new best. The search stops early once a
/// candidate has more than `params.cutoff` inliers.
///
/// Candidate fits that are degenerate are skipped. With fewer than four
/// correspondences a warning is logged and the identity is returned.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        level = "info",
        skip(correspondences, rng),
        fields(n = correspondences.len(), max_iters = params.max_iters)
    )
)]
pub fn ransac<R: Rng + ?Sized>(
    correspondences: &[Correspondence],
    params: &RansacParams,
    rng: &mut R,
) -> RansacResult {
    let n = correspondences.len();
    if n < MIN_SAMPLE {
        log::warn!("need at least {MIN_SAMPLE} matches for RANSAC, {n} supplied");
        return RansacResult {
            homography: Homography::identity(),
            inliers: Vec::new(),
            inlier_count: 0,
            iterations: 0,
            early_exit: false,
            insufficient: true,
        };
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut best_h = Homography::identity();
    let mut best_count = 0usize;
    let mut iterations = 0usize;
    let mut early_exit = false;
    let mut skipped = 0usize;

    for iter in 0..params.max_iters {
        iterations = iter + 1;
        shuffle(&mut order, rng);

        let sample = pick(correspondences, &order[..MIN_SAMPLE]);
        let candidate = match try_compute_homography(&sample) {
            Ok(h) => h,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let inliers = model_inliers(&candidate, correspondences, params.inlier_threshold);
        if inliers.len() > best_count {
            let refit = match try_compute_homography(&pick(correspondences, &inliers)) {
                Ok(h) => h,
                Err(err) => {
                    log::trace!(
                        "refit on {} inliers failed ({err}); keeping sample fit",
                        inliers.len()
                    );
                    candidate
                }
            };
            log::trace!(
                "iteration {iter}: {} inliers (previous best {best_count})",
                inliers.len()
            );
            best_count = inliers.len();
            best_h = refit;
        }

        if inliers.len() > params.cutoff {
            early_exit = true;
            break;
        }
    }

    if skipped > 0 {
        log::debug!("skipped {skipped} degenerate minimal samples");
    }
    if best_count == 0 {
        log::warn!("RANSAC found no consistent model in {iterations} iterations");
    }

    let inliers = model_inliers(&best_h, correspondences, params.inlier_threshold);
    log::debug!(
        "RANSAC: {} of {n} inliers after {iterations} iterations{}",
        inliers.len(),
        if early_exit { " (early exit)" } else { "" }
    );

    RansacResult {
        homography: best_h,
        inliers,
        inlier_count: best_count,
        iterations,
        early_exit,
        insufficient: false,
    }
}

/// Resolve descriptor matches to point pairs and run [`ransac`] on them.
/// Inlier indices refer to the order of `matches`.
pub fn estimate_homography_ransac<R: Rng + ?Sized>(
    matches: &[Match],
    a: &DescriptorSet,
    b: &DescriptorSet,
    params: &RansacParams,
    rng: &mut R,
) -> RansacResult {
    let correspondences = resolve_matches(a, b, matches);
    ransac(&correspondences, params, rng)
}
