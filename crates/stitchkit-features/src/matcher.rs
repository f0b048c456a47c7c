//! Brute-force mutual nearest-neighbour matching under L1 distance.

use serde::{Deserialize, Serialize};
use stitchkit_core::Correspondence;

use crate::descriptor::{Descriptor, DescriptorKey, DescriptorSet};

/// A mutually-nearest descriptor pair between set A and set B.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub a: DescriptorKey,
    pub b: DescriptorKey,
    pub distance: f32,
}

/// Sum of absolute differences. Panics when the lengths differ.
#[inline]
pub fn l1_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(
        a.len(),
        b.len(),
        "descriptor length mismatch: {} vs {}",
        a.len(),
        b.len()
    );
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// For every descriptor in `from`, the index of its nearest descriptor in
/// `to`, with `distance`. Ties keep the first candidate in scan order.
fn nearest_with_distance(from: &[Descriptor], to: &[Descriptor]) -> Vec<Option<(usize, f32)>> {
    from.iter()
        .map(|d| {
            let mut best: Option<(usize, f32)> = None;
            for (j, e) in to.iter().enumerate() {
                let dist = l1_distance(&d.data, &e.data);
                if best.map_or(true, |(_, b)| dist < b) {
                    best = Some((j, dist));
                }
            }
            best
        })
        .collect()
}

/// Nearest neighbour in `to` for every descriptor in `from`; `None` only
/// when `to` is empty.
pub fn nearest_neighbors(from: &[Descriptor], to: &[Descriptor]) -> Vec<Option<usize>> {
    nearest_with_distance(from, to)
        .into_iter()
        .map(|n| n.map(|(j, _)| j))
        .collect()
}

/// Pairs `(i, j)` where `j` is nearest to `i` in B and `i` is nearest to `j`
/// in A. The result follows A's order and every descriptor appears at most
/// once.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip_all, fields(a = a.len(), b = b.len()))
)]
pub fn match_descriptors(a: &DescriptorSet, b: &DescriptorSet) -> Vec<Match> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let a2b = nearest_with_distance(a.descriptors(), b.descriptors());
    let b2a = nearest_neighbors(b.descriptors(), a.descriptors());

    let matches: Vec<Match> = a2b
        .iter()
        .enumerate()
        .filter_map(|(i, nn)| {
            let (j, distance) = (*nn)?;
            (b2a[j] == Some(i)).then(|| Match {
                a: a.key(i),
                b: b.key(j),
                distance,
            })
        })
        .collect();

    log::debug!(
        "{} mutual matches from {} x {} descriptors",
        matches.len(),
        a.len(),
        b.len()
    );
    matches
}

/// Resolve matches into A-frame → B-frame point pairs. Matches whose keys do
/// not belong to `a` and `b` are dropped.
pub fn resolve_matches(
    a: &DescriptorSet,
    b: &DescriptorSet,
    matches: &[Match],
) -> Vec<Correspondence> {
    matches
        .iter()
        .filter_map(|m| {
            let src = a.get(m.a)?;
            let dst = b.get(m.b)?;
            Some(Correspondence::new(src.point, dst.point))
        })
        .collect()
}
