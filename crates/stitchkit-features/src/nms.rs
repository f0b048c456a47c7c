//! Non-maximum suppression and thresholding of score maps.

use crate::response::{Score, ScoreMap};

/// Keep a cell only when no cell in its `(2r + 1) x (2r + 1)` neighbourhood
/// has a strictly greater score. Border neighbours are read clamped.
///
/// Ties survive together, and already suppressed cells stay suppressed, so
/// running the filter twice gives the same map as running it once.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(map), fields(w = map.width(), h = map.height()))
)]
pub fn non_max_suppression(map: &ScoreMap, radius: usize) -> ScoreMap {
    let (w, h) = (map.width(), map.height());
    let r = radius as i64;
    let mut out = Vec::with_capacity(w * h);

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let current = map.get(x, y);
            let beaten = (-r..=r)
                .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
                .any(|(dx, dy)| map.get(x + dx, y + dy).beats(current));
            out.push(if beaten { Score::Suppressed } else { current });
        }
    }

    ScoreMap::from_scores(w, h, out).unwrap_or_else(|| map.clone())
}

/// Pixel coordinates of every unsuppressed score `>= threshold`, in row-major
/// scan order.
pub fn extract_corners(map: &ScoreMap, threshold: f32) -> Vec<(usize, usize)> {
    let w = map.width();
    map.scores()
        .iter()
        .enumerate()
        .filter(|(_, s)| matches!(s, Score::Response(v) if *v >= threshold))
        .map(|(i, _)| (i % w, i / w))
        .collect()
}
