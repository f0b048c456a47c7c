//! Cylindrical and spherical re-projection of a single image.
//!
//! Both map each output pixel to a ray on the cylinder (or sphere) of radius
//! `focal` around the image centre, then sample the planar input where that
//! ray hits it. Output pixels whose ray misses the input stay zero, which the
//! compositor treats as "no content".

use stitchkit_core::Image;

use crate::params::Projection;

fn reproject<F>(image: &Image, focal: f32, ray: F) -> Image
where
    F: Fn(f32, f32) -> Option<(f32, f32)>,
{
    assert!(
        focal.is_finite() && focal > 0.0,
        "focal length must be positive, got {focal}"
    );
    let (w, h) = (image.width(), image.height());
    let xc = (w / 2) as f32;
    let yc = (h / 2) as f32;
    let mut out = Image::new(w, h, image.channels());

    for j in 0..h {
        for i in 0..w {
            let theta = (i as f32 - xc) / focal;
            let height = (j as f32 - yc) / focal;
            let Some((x, y)) = ray(theta, height) else {
                continue;
            };
            let sx = focal * x + xc;
            let sy = focal * y + yc;
            if sx < -0.5 || sy < -0.5 || sx >= w as f32 - 0.5 || sy >= h as f32 - 0.5 {
                continue;
            }
            for c in 0..image.channels() {
                *out.pixel_mut(i, j, c) = image.sample_bilinear(sx, sy, c);
            }
        }
    }
    out
}

/// Wrap the image onto a cylinder of radius `focal` and flatten it.
pub fn cylindrical_project(image: &Image, focal: f32) -> Image {
    reproject(image, focal, |theta, height| {
        let z = theta.cos();
        (z > 0.0).then(|| (theta.sin() / z, height / z))
    })
}

/// Wrap the image onto a sphere of radius `focal` and flatten it.
pub fn spherical_project(image: &Image, focal: f32) -> Image {
    reproject(image, focal, |theta, phi| {
        let z = theta.cos() * phi.cos();
        (z > 0.0).then(|| (theta.sin() * phi.cos() / z, phi.sin() / z))
    })
}

/// Apply `projection` to `image`.
pub fn project(image: &Image, projection: Projection) -> Image {
    match projection {
        Projection::Cylindrical { focal } => cylindrical_project(image, focal),
        Projection::Spherical { focal } => spherical_project(image, focal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn gradient(w: usize, h: usize) -> Image {
        let data = (0..w * h)
            .map(|i| 0.1 + 0.8 * (i % w) as f32 / w as f32)
            .collect();
        Image::from_planar(w, h, 1, data).expect("sized")
    }

    #[test]
    fn centre_pixel_is_fixed() {
        let img = gradient(41, 31);
        for out in [cylindrical_project(&img, 60.0), spherical_project(&img, 60.0)] {
            assert_abs_diff_eq!(out.at(20, 15, 0), img.at(20, 15, 0), epsilon = 1e-5);
        }
    }

    #[test]
    fn long_focal_length_is_nearly_identity() {
        let img = gradient(32, 24);
        let out = cylindrical_project(&img, 1.0e5);
        for (x, y) in [(0, 0), (10, 5), (31, 23)] {
            assert_abs_diff_eq!(out.at(x, y, 0), img.at(x, y, 0), epsilon = 1e-3);
        }
    }

    #[test]
    fn short_focal_length_blanks_the_corners() {
        let img = Image::filled(64, 48, 3, 0.5);
        let out = cylindrical_project(&img, 20.0);
        assert!(out.is_empty_pixel(0, 0));
        assert!(!out.is_empty_pixel(32, 24));
        let sph = spherical_project(&img, 20.0);
        assert!(sph.is_empty_pixel(63, 47));
    }

    #[test]
    #[should_panic(expected = "focal length must be positive")]
    fn zero_focal_length_panics() {
        cylindrical_project(&Image::new(4, 4, 1), 0.0);
    }

    #[test]
    fn projection_enum_dispatches() {
        let img = gradient(16, 16);
        assert_eq!(
            project(&img, Projection::Spherical { focal: 30.0 }),
            spherical_project(&img, 30.0)
        );
    }
}
