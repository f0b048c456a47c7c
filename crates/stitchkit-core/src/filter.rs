//! Border-clamped 2D convolution and separable Gaussian smoothing.
//!
//! Work is split per output row; with the `rayon` feature the rows are
//! processed in parallel.

use crate::Image;

/// Dense 2D filter kernel, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Kernel {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl Kernel {
    /// Returns `None` when the size is zero, even, or disagrees with `data`.
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || width % 2 == 0 || height % 2 == 0 {
            return None;
        }
        if data.len() != width * height {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    fn from_rows<const W: usize, const H: usize>(rows: [[f32; W]; H]) -> Self {
        Self {
            width: W,
            height: H,
            data: rows.iter().flatten().copied().collect(),
        }
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
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// Horizontal Sobel derivative.
pub fn gx_kernel() -> Kernel {
    Kernel::from_rows([[-1.0, 0.0, 1.0], [-2.0, 0.0, 2.0], [-1.0, 0.0, 1.0]])
}

/// Vertical Sobel derivative.
pub fn gy_kernel() -> Kernel {
    Kernel::from_rows([[-1.0, -2.0, -1.0], [0.0, 0.0, 0.0], [1.0, 2.0, 1.0]])
}

/// Normalized 1D Gaussian taps. The length is `floor(6 * sigma)` bumped to
/// the next odd number; non-positive sigma yields the identity tap.
pub fn gaussian_kernel_1d(sigma: f32) -> Vec<f32> {
    if sigma.is_nan() || sigma <= 0.0 {
        return vec![1.0];
    }
    let mut len = (6.0 * sigma) as usize;
    if len % 2 == 0 {
        len += 1;
    }
    let half = (len / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let mut taps: Vec<f32> = (0..len)
        .map(|i| {
            let q = i as f32 - half;
            (-(q * q) / denom).exp()
        })
        .collect();
    let sum: f32 = taps.iter().sum();
    for t in &mut taps {
        *t /= sum;
    }
    taps
}

fn for_each_row<F>(out: &mut [f32], width: usize, f: F)
where
    F: Fn(usize, &mut [f32]) + Send + Sync,
{
    if width == 0 || out.is_empty() {
        return;
    }
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        out.par_chunks_mut(width)
            .enumerate()
            .for_each(|(k, row)| f(k, row));
    }
    #[cfg(not(feature = "rayon"))]
    {
        out.chunks_mut(width)
            .enumerate()
            .for_each(|(k, row)| f(k, row));
    }
}

/// Convolve with clamp-to-border sampling.
///
/// With `preserve_channels` each channel is filtered on its own. Otherwise
/// the responses of all channels are summed into a single output channel.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "trace", skip(image, kernel), fields(w = image.width(), h = image.height()))
)]
pub fn convolve(image: &Image, kernel: &Kernel, preserve_channels: bool) -> Image {
    let (w, h) = (image.width(), image.height());
    let out_channels = if preserve_channels {
        image.channels()
    } else {
        1
    };
    let mut out = Image::new(w, h, out_channels);
    let kx_half = (kernel.width / 2) as i64;
    let ky_half = (kernel.height / 2) as i64;

    let filter_row = |c: usize, y: usize, row: &mut [f32]| {
        for (x, dst) in row.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for j in 0..kernel.height {
                let sy = y as i64 + j as i64 - ky_half;
                for i in 0..kernel.width {
                    let sx = x as i64 + i as i64 - kx_half;
                    acc += kernel.get(i, j) * image.get(sx, sy, c);
                }
            }
            *dst += acc;
        }
    };

    for_each_row(out.data_mut(), w, |k, row| {
        let (c, y) = (k / h, k % h);
        if preserve_channels {
            filter_row(c, y, row);
        } else {
            for c in 0..image.channels() {
                filter_row(c, y, row);
            }
        }
    });
    out
}

/// Separable Gaussian blur of every channel.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "trace", skip(image), fields(w = image.width(), h = image.height()))
)]
pub fn smooth(image: &Image, sigma: f32) -> Image {
    let taps = gaussian_kernel_1d(sigma);
    if taps.len() == 1 || image.is_empty() {
        return image.clone();
    }
    let half = (taps.len() / 2) as i64;
    let (w, h) = (image.width(), image.height());

    let mut horizontal = Image::new(w, h, image.channels());
    for_each_row(horizontal.data_mut(), w, |k, row| {
        let (c, y) = (k / h, (k % h) as i64);
        for (x, dst) in row.iter_mut().enumerate() {
            *dst = taps
                .iter()
                .enumerate()
                .map(|(i, t)| t * image.get(x as i64 + i as i64 - half, y, c))
                .sum();
        }
    });

    let mut out = Image::new(w, h, image.channels());
    let src = &horizontal;
    for_each_row(out.data_mut(), w, |k, row| {
        let (c, y) = (k / h, (k % h) as i64);
        for (x, dst) in row.iter_mut().enumerate() {
            *dst = taps
                .iter()
                .enumerate()
                .map(|(j, t)| t * src.get(x as i64, y + j as i64 - half, c))
                .sum();
        }
    });
    out
}
