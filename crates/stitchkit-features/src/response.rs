//! Structure tensor and per-pixel cornerness.

use std::cmp::Ordering;

use stitchkit_core::{convolve, gx_kernel, gy_kernel, smooth, Image};

use crate::params::CornerMethod;

/// Trace below which a pixel is treated as flat and scores zero.
const MIN_TRACE: f32 = 1e-12;

/// Gaussian-weighted second-moment matrix per pixel.
#[derive(Clone, Debug)]
pub struct StructureTensor {
    /// Three channels: `Ix^2`, `Iy^2`, `Ix*Iy`.
    pub tensor: Image,
}

impl StructureTensor {
    #[inline]
    pub fn width(&self) -> usize {
        self.tensor.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.tensor.height()
    }

    /// `(Ixx, Iyy, Ixy)` at an in-bounds pixel.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> (f32, f32, f32) {
        (
            self.tensor.at(x, y, 0),
            self.tensor.at(x, y, 1),
            self.tensor.at(x, y, 2),
        )
    }
}

/// Sobel gradients of the grayscale image, their products, smoothed with `sigma`.
///
/// Colour input is converted to luma first. Two-channel images are rejected.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(image), fields(w = image.width(), h = image.height()))
)]
pub fn structure_tensor(image: &Image, sigma: f32) -> StructureTensor {
    let gray = image.to_grayscale();
    let ix = convolve(&gray, &gx_kernel(), false);
    let iy = convolve(&gray, &gy_kernel(), false);

    let (w, h) = (gray.width(), gray.height());
    let mut s = Image::new(w, h, 3);
    for y in 0..h {
        for x in 0..w {
            let gx = ix.at(x, y, 0);
            let gy = iy.at(x, y, 0);
            *s.pixel_mut(x, y, 0) = gx * gx;
            *s.pixel_mut(x, y, 1) = gy * gy;
            *s.pixel_mut(x, y, 2) = gx * gy;
        }
    }

    StructureTensor {
        tensor: smooth(&s, sigma),
    }
}

/// Response at one cell of a score map. `Suppressed` orders below every
/// response, so it can never pass a threshold.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub enum Score {
    Suppressed,
    Response(f32),
}

impl Score {
    #[inline]
    pub fn value(self) -> Option<f32> {
        match self {
            Score::Response(v) => Some(v),
            Score::Suppressed => None,
        }
    }

    #[inline]
    pub fn is_suppressed(self) -> bool {
        matches!(self, Score::Suppressed)
    }

    /// Strictly greater than `other`. NaN responses never compare greater.
    #[inline]
    pub fn beats(self, other: Score) -> bool {
        self.partial_cmp(&other) == Some(Ordering::Greater)
    }
}

/// Single-channel grid of scores, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ScoreMap {
    width: usize,
    height: usize,
    scores: Vec<Score>,
}

impl ScoreMap {
    pub fn from_scores(width: usize, height: usize, scores: Vec<Score>) -> Option<Self> {
        (scores.len() == width * height).then_some(Self {
            width,
            height,
            scores,
        })
    }

    /// Map built from raw responses, nothing suppressed.
    pub fn from_responses(width: usize, height: usize, values: &[f32]) -> Option<Self> {
        Self::from_scores(
            width,
            height,
            values.iter().copied().map(Score::Response).collect(),
        )
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn scores(&self) -> &[Score] {
        &self.scores
    }

    #[inline]
    pub fn at(&self, x: usize, y: usize) -> Score {
        self.scores[y * self.width + x]
    }

    /// Clamp-to-border read.
    #[inline]
    pub fn get(&self, x: i64, y: i64) -> Score {
        if self.width == 0 || self.height == 0 {
            return Score::Suppressed;
        }
        let x = x.clamp(0, self.width as i64 - 1) as usize;
        let y = y.clamp(0, self.height as i64 - 1) as usize;
        self.at(x, y)
    }

    /// Largest unsuppressed finite response.
    pub fn max_response(&self) -> Option<f32> {
        self.scores
            .iter()
            .filter_map(|s| s.value())
            .filter(|v| v.is_finite())
            .reduce(f32::max)
    }
}

#[inline]
fn pixel_cornerness(xx: f32, yy: f32, xy: f32, method: CornerMethod) -> f32 {
    let trace = xx + yy;
    if trace <= MIN_TRACE {
        return 0.0;
    }
    match method {
        CornerMethod::DetOverTrace => (xx * yy - xy * xy) / trace,
        CornerMethod::SmallestEigenvalue => {
            let diff = xx - yy;
            0.5 * (trace - (diff * diff + 4.0 * xy * xy).sqrt())
        }
    }
}

/// Cornerness of every pixel of the tensor.
pub fn cornerness(tensor: &StructureTensor, method: CornerMethod) -> ScoreMap {
    let (w, h) = (tensor.width(), tensor.height());
    let mut scores = Vec::with_capacity(w * h);
    for y in 0..h {
        for x in 0..w {
            let (xx, yy, xy) = tensor.at(x, y);
            scores.push(Score::Response(pixel_cornerness(xx, yy, xy, method)));
        }
    }
    ScoreMap {
        width: w,
        height: h,
        scores,
    }
}
