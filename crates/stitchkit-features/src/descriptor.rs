//! Patch descriptors and the per-image descriptor arena.

use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use stitchkit_core::Image;

static NEXT_SET_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique identity of a [`DescriptorSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SetId(u32);

impl SetId {
    fn fresh() -> Self {
        SetId(NEXT_SET_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Stable handle to one descriptor of one set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorKey {
    pub set: SetId,
    pub index: usize,
}

/// A corner location with its appearance vector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub point: Point2<f32>,
    pub data: Vec<f32>,
}

/// Sample a `window x window` patch around `(x, y)` in every channel.
///
/// Per channel the patch is walked column by column (outer `dx`, inner `dy`)
/// and each sample has the centre value subtracted. Samples outside the image
/// are clamped to the border. The result has `channels * window^2` entries.
pub fn describe_index(image: &Image, x: usize, y: usize, window: usize) -> Descriptor {
    assert!(window % 2 == 1, "descriptor window must be odd, got {window}");
    let r = (window / 2) as i64;
    let (cx, cy) = (x as i64, y as i64);

    let mut data = Vec::with_capacity(image.channels() * window * window);
    for c in 0..image.channels() {
        let centre = image.get(cx, cy, c);
        for dx in -r..=r {
            for dy in -r..=r {
                data.push(image.get(cx + dx, cy + dy, c) - centre);
            }
        }
    }

    Descriptor {
        point: Point2::new(x as f32, y as f32),
        data,
    }
}

/// Append-only collection of descriptors from one image.
///
/// Matches refer into a set by [`DescriptorKey`]; the set id guards against
/// resolving a key against the wrong image.
#[derive(Clone, Debug)]
pub struct DescriptorSet {
    id: SetId,
    descriptors: Vec<Descriptor>,
}

impl Default for DescriptorSet {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorSet {
    pub fn new() -> Self {
        Self {
            id: SetId::fresh(),
            descriptors: Vec::new(),
        }
    }

    pub fn from_descriptors(descriptors: Vec<Descriptor>) -> Self {
        Self {
            id: SetId::fresh(),
            descriptors,
        }
    }

    #[inline]
    pub fn id(&self) -> SetId {
        self.id
    }

    pub fn push(&mut self, descriptor: Descriptor) -> DescriptorKey {
        self.descriptors.push(descriptor);
        self.key(self.descriptors.len() - 1)
    }

    #[inline]
    pub fn key(&self, index: usize) -> DescriptorKey {
        DescriptorKey {
            set: self.id,
            index,
        }
    }

    /// Resolve a key; `None` if it belongs to another set or is out of range.
    pub fn get(&self, key: DescriptorKey) -> Option<&Descriptor> {
        if key.set != self.id {
            return None;
        }
        self.descriptors.get(key.index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    #[inline]
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn iter(&self) -> impl Iterator<Item = (DescriptorKey, &Descriptor)> {
        self.descriptors
            .iter()
            .enumerate()
            .map(move |(i, d)| (self.key(i), d))
    }
}
