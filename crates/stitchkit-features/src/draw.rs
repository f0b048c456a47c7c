use nalgebra::Point2;
use stitchkit_core::Image;

const CROSS_HALF: i64 = 9;
const MAGENTA: [f32; 3] = [1.0, 0.0, 1.0];

/// Copy of `image` with a 19 px magenta cross centred on each point.
/// Single-channel images get a white cross.
pub fn mark_corners(image: &Image, points: &[Point2<f32>]) -> Image {
    let mut out = image.clone();
    for p in points {
        let (x, y) = (p.x as i64, p.y as i64);
        for i in -CROSS_HALF..=CROSS_HALF {
            for (c, &v) in MAGENTA.iter().enumerate() {
                out.set(x + i, y, c, v);
                out.set(x, y + i, c, v);
            }
        }
    }
    out
}
