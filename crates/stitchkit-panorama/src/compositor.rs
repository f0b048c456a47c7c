//! Warping image B into image A's frame and blending both onto one canvas.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use stitchkit_core::{Homography, Image};

use crate::params::CompositeParams;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CompositeError {
    #[error("canvas of {width}x{height} exceeds the configured side or area limit")]
    CanvasTooLarge { width: usize, height: usize },
    #[error("blend coefficient must lie in [0, 1], got {0}")]
    InvalidBlend(f32),
}

/// Canvas placement in A's frame: canvas pixel `(0, 0)` is A-frame `(dx, dy)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanvasBounds {
    pub dx: i64,
    pub dy: i64,
    pub width: usize,
    pub height: usize,
}

/// Bounding box of A together with B's corners pulled back into A's frame.
///
/// `h_ab` maps A-frame points to B-frame points. Returns `None` when `h_ab`
/// is singular or a corner of B cannot be pulled back.
pub fn canvas_bounds(a: &Image, b: &Image, h_ab: &Homography) -> Option<CanvasBounds> {
    let h_ba = h_ab.inverse()?;
    let (bw, bh) = (b.width() as f32, b.height() as f32);
    let corners = [
        Point2::new(0.0, 0.0),
        Point2::new(bw - 1.0, 0.0),
        Point2::new(0.0, bh - 1.0),
        Point2::new(bw - 1.0, bh - 1.0),
    ];

    // Extents stay in f64 so far-away corners cannot overflow; the casts
    // below saturate and the caller's size guard rejects the result.
    let mut min_x = 0.0f64;
    let mut min_y = 0.0f64;
    let mut max_x = a.width() as f64 - 1.0;
    let mut max_y = a.height() as f64 - 1.0;
    for c in corners {
        let p = h_ba.apply(c)?;
        let (x, y) = ((p.x as f64).round(), (p.y as f64).round());
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    Some(CanvasBounds {
        dx: min_x as i64,
        dy: min_y as i64,
        width: (max_x - min_x + 1.0).max(0.0) as usize,
        height: (max_y - min_y + 1.0).max(0.0) as usize,
    })
}

/// Whether a nearest-neighbour lookup at `p` stays inside `image`.
#[inline]
fn covers(image: &Image, p: Point2<f32>) -> bool {
    p.x >= -0.5
        && p.y >= -0.5
        && p.x < image.width() as f32 - 0.5
        && p.y < image.height() as f32 - 0.5
}

/// Stitch `b` onto `a` given `h_ab` mapping A-frame points to B-frame points.
///
/// A is pasted first. Every canvas pixel whose forward projection lands in B
/// takes B's nearest sample: blended as `b * (1 - blend) + a * blend` when
/// both sides have content, written as-is over empty canvas, and ignored when
/// B's sample is zero in every channel. The result is trimmed to its non-zero
/// bounding box.
///
/// A singular `h_ab` cannot place B; the result is then a trimmed copy of A.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "info", skip(a, b, h_ab), fields(blend = params.blend))
)]
pub fn combine_images(
    a: &Image,
    b: &Image,
    h_ab: &Homography,
    params: &CompositeParams,
) -> Result<Image, CompositeError> {
    assert_eq!(
        a.channels(),
        b.channels(),
        "cannot composite a {}-channel image with a {}-channel image",
        a.channels(),
        b.channels()
    );
    if !(0.0..=1.0).contains(&params.blend) {
        return Err(CompositeError::InvalidBlend(params.blend));
    }

    let Some(bounds) = canvas_bounds(a, b, h_ab) else {
        log::warn!("homography cannot place image B; returning image A alone");
        return Ok(trim_image(a));
    };
    if bounds.width > params.max_canvas_side
        || bounds.height > params.max_canvas_side
        || bounds.width.saturating_mul(bounds.height) > params.max_canvas_pixels
    {
        return Err(CompositeError::CanvasTooLarge {
            width: bounds.width,
            height: bounds.height,
        });
    }
    log::debug!(
        "canvas {}x{} at offset ({}, {})",
        bounds.width,
        bounds.height,
        bounds.dx,
        bounds.dy
    );

    let channels = a.channels();
    let mut canvas = Image::new(bounds.width, bounds.height, channels);
    for c in 0..channels {
        for y in 0..a.height() {
            for x in 0..a.width() {
                canvas.set(x as i64 - bounds.dx, y as i64 - bounds.dy, c, a.at(x, y, c));
            }
        }
    }

    let blend = params.blend;
    let mut b_px = vec![0.0f32; channels];
    for cy in 0..bounds.height {
        for cx in 0..bounds.width {
            let p = Point2::new(
                (cx as i64 + bounds.dx) as f32,
                (cy as i64 + bounds.dy) as f32,
            );
            let Some(q) = h_ab.apply(p) else {
                continue;
            };
            if !covers(b, q) {
                continue;
            }

            for (c, v) in b_px.iter_mut().enumerate() {
                *v = b.sample_nearest(q.x, q.y, c);
            }
            let b_total: f32 = b_px.iter().sum();
            if b_total == 0.0 {
                continue;
            }
            let a_total = canvas.channel_sum(cx, cy);
            for (c, &bv) in b_px.iter().enumerate() {
                let dst = canvas.pixel_mut(cx, cy, c);
                *dst = if a_total != 0.0 {
                    bv * (1.0 - blend) + *dst * blend
                } else {
                    bv
                };
            }
        }
    }

    Ok(trim_image(&canvas))
}

/// Crop to the bounding box of pixels with any non-zero channel. An all-zero
/// image is returned unchanged.
pub fn trim_image(image: &Image) -> Image {
    let (w, h) = (image.width(), image.height());
    let mut min_x = usize::MAX;
    let mut min_y = usize::MAX;
    let mut max_x = 0usize;
    let mut max_y = 0usize;
    for y in 0..h {
        for x in 0..w {
            if !image.is_empty_pixel(x, y) {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
    }
    if min_x > max_x || min_y > max_y {
        return image.clone();
    }

    let mut out = Image::new(max_x - min_x + 1, max_y - min_y + 1, image.channels());
    for c in 0..image.channels() {
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                *out.pixel_mut(x - min_x, y - min_y, c) = image.at(x, y, c);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn translated_pair_blends_the_overlap() {
        let a = Image::filled(20, 10, 3, 0.5);
        let b = Image::filled(20, 10, 3, 0.8);
        // A-frame x maps to B-frame x - 10.
        let h = Homography::translation(-10.0, 0.0);
        let out = combine_images(&a, &b, &h, &CompositeParams::default()).expect("composite");

        assert_eq!((out.width(), out.height(), out.channels()), (30, 10, 3));
        for c in 0..3 {
            for y in 0..10 {
                assert_abs_diff_eq!(out.at(0, y, c), 0.5, epsilon = 1e-6);
                assert_abs_diff_eq!(out.at(9, y, c), 0.5, epsilon = 1e-6);
                assert_abs_diff_eq!(out.at(10, y, c), 0.65, epsilon = 1e-6);
                assert_abs_diff_eq!(out.at(19, y, c), 0.65, epsilon = 1e-6);
                assert_abs_diff_eq!(out.at(20, y, c), 0.8, epsilon = 1e-6);
                assert_abs_diff_eq!(out.at(29, y, c), 0.8, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn b_to_the_left_shifts_the_canvas_origin() {
        let a = Image::filled(8, 4, 1, 0.25);
        let b = Image::filled(8, 4, 1, 1.0);
        // B sits 5 px to the left of A.
        let h = Homography::translation(5.0, 0.0);
        let bounds = canvas_bounds(&a, &b, &h).expect("invertible");
        assert_eq!(
            bounds,
            CanvasBounds {
                dx: -5,
                dy: 0,
                width: 13,
                height: 4
            }
        );
        let out = combine_images(
            &a,
            &b,
            &h,
            &CompositeParams {
                blend: 1.0,
                ..CompositeParams::default()
            },
        )
        .expect("composite");
        assert_eq!(out.width(), 13);
        assert_abs_diff_eq!(out.at(0, 0, 0), 1.0, epsilon = 1e-6);
        // blend = 1 keeps A wherever A has content.
        assert_abs_diff_eq!(out.at(5, 0, 0), 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(out.at(12, 3, 0), 0.25, epsilon = 1e-6);
    }

    #[test]
    fn zero_b_samples_do_not_overwrite_a() {
        let a = Image::filled(6, 6, 3, 0.4);
        let b = Image::new(6, 6, 3);
        let out = combine_images(&a, &b, &Homography::identity(), &CompositeParams::default())
            .expect("composite");
        assert_eq!(out, a);
    }

    #[test]
    fn identical_images_with_identity_reproduce_the_input() {
        let mut a = Image::filled(7, 5, 1, 0.3);
        *a.pixel_mut(3, 2, 0) = 0.9;
        let out = combine_images(&a, &a, &Homography::identity(), &CompositeParams::default())
            .expect("composite");
        assert_eq!(out.width(), 7);
        assert_eq!(out.height(), 5);
        for (x, y) in [(0, 0), (3, 2), (6, 4)] {
            assert_abs_diff_eq!(out.at(x, y, 0), a.at(x, y, 0), epsilon = 1e-6);
        }
    }

    #[test]
    fn oversized_canvas_is_rejected() {
        let a = Image::filled(4, 4, 1, 1.0);
        let b = Image::filled(4, 4, 1, 1.0);
        let h = Homography::translation(-1.0e6, 0.0);
        let err = combine_images(&a, &b, &h, &CompositeParams::default()).unwrap_err();
        assert!(matches!(err, CompositeError::CanvasTooLarge { .. }));
    }

    #[test]
    fn extreme_scale_is_rejected_instead_of_overflowing() {
        let a = Image::filled(4, 4, 1, 1.0);
        let b = Image::filled(4, 4, 1, 1.0);
        let h = Homography::from_array([[1e-20, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

        let bounds = canvas_bounds(&a, &b, &h).expect("invertible");
        assert!(bounds.width > CompositeParams::default().max_canvas_side);
        assert_eq!(bounds.height, 4);

        let err = combine_images(&a, &b, &h, &CompositeParams::default()).unwrap_err();
        assert!(matches!(err, CompositeError::CanvasTooLarge { height: 4, .. }));
    }

    #[test]
    fn canvas_area_limit_is_enforced() {
        let a = Image::filled(30, 30, 1, 1.0);
        let params = CompositeParams {
            max_canvas_pixels: 899,
            ..CompositeParams::default()
        };
        assert_eq!(
            combine_images(&a, &a, &Homography::identity(), &params),
            Err(CompositeError::CanvasTooLarge {
                width: 30,
                height: 30
            })
        );
        let params = CompositeParams {
            max_canvas_pixels: 900,
            ..CompositeParams::default()
        };
        assert!(combine_images(&a, &a, &Homography::identity(), &params).is_ok());
    }

    #[test]
    fn singular_homography_keeps_a_only() {
        let a = Image::filled(5, 5, 1, 0.6);
        let b = Image::filled(5, 5, 1, 0.1);
        let h = Homography::from_array([[1.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        let out = combine_images(&a, &b, &h, &CompositeParams::default()).expect("composite");
        assert_eq!(out, a);
    }

    #[test]
    fn invalid_blend_is_rejected() {
        let a = Image::filled(2, 2, 1, 1.0);
        let params = CompositeParams {
            blend: 1.5,
            ..CompositeParams::default()
        };
        assert_eq!(
            combine_images(&a, &a, &Homography::identity(), &params),
            Err(CompositeError::InvalidBlend(1.5))
        );
    }

    #[test]
    fn trim_crops_to_content() {
        let mut img = Image::new(10, 8, 2);
        *img.pixel_mut(3, 2, 1) = 0.5;
        *img.pixel_mut(6, 5, 0) = 0.7;
        let out = trim_image(&img);
        assert_eq!((out.width(), out.height(), out.channels()), (4, 4, 2));
        assert_eq!(out.at(0, 0, 1), 0.5);
        assert_eq!(out.at(3, 3, 0), 0.7);
    }

    #[test]
    fn trim_keeps_all_zero_images() {
        let img = Image::new(5, 3, 3);
        assert_eq!(trim_image(&img), img);
    }
}
