//! Match visualisation on a side-by-side canvas.

use nalgebra::{Point2, Vector2};
use stitchkit_core::{Correspondence, Homography, Image};

use crate::ransac::model_inliers;

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];

/// `a` and `b` next to each other, `b` starting at column `a.width()`.
pub fn side_by_side(a: &Image, b: &Image) -> Image {
    assert_eq!(
        a.channels(),
        b.channels(),
        "side_by_side needs equal channel counts ({} vs {})",
        a.channels(),
        b.channels()
    );
    let mut both = Image::new(
        a.width() + b.width(),
        a.height().max(b.height()),
        a.channels(),
    );
    for c in 0..a.channels() {
        for y in 0..a.height() {
            for x in 0..a.width() {
                *both.pixel_mut(x, y, c) = a.at(x, y, c);
            }
        }
        for y in 0..b.height() {
            for x in 0..b.width() {
                *both.pixel_mut(x + a.width(), y, c) = b.at(x, y, c);
            }
        }
    }
    both
}

fn draw_line(image: &mut Image, from: Point2<f32>, to: Point2<f32>, colour: [f32; 3]) {
    let d = to - from;
    let steps = d.x.abs().max(d.y.abs()).ceil().max(1.0) as usize;
    for s in 0..=steps {
        let t = s as f32 / steps as f32;
        let p = from + d * t;
        let (x, y) = (p.x.round() as i64, p.y.round() as i64);
        for (c, &v) in colour.iter().enumerate() {
            image.set(x, y, c, v);
        }
    }
}

/// Side-by-side canvas with a red line per correspondence and a green line
/// over each index listed in `inliers`.
pub fn draw_matches(
    a: &Image,
    b: &Image,
    correspondences: &[Correspondence],
    inliers: &[usize],
) -> Image {
    let mut both = side_by_side(a, b);
    let offset = Vector2::new(a.width() as f32, 0.0);
    for c in correspondences {
        draw_line(&mut both, c.src, c.dst + offset, RED);
    }
    for c in inliers.iter().filter_map(|&i| correspondences.get(i)) {
        draw_line(&mut both, c.src, c.dst + offset, GREEN);
    }
    both
}

/// [`draw_matches`] with the inliers of `h` at `threshold` highlighted.
pub fn draw_inliers(
    a: &Image,
    b: &Image,
    h: &Homography,
    correspondences: &[Correspondence],
    threshold: f32,
) -> Image {
    let inliers = model_inliers(h, correspondences, threshold);
    draw_matches(a, b, correspondences, &inliers)
}
