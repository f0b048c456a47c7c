use nalgebra::Point2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use stitchkit_core::Image;
use stitchkit_features::{HarrisDetector, HarrisParams};
use stitchkit_panorama::{PanoramaParams, PanoramaStitcher};

const SCENE_W: usize = 200;
const SCENE_H: usize = 120;
const SHIFT: usize = 50;
const CROP_W: usize = 120;

/// Grey background scattered with flat rectangles of random intensity.
fn scene(seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut img = Image::filled(SCENE_W, SCENE_H, 3, 0.1);
    for _ in 0..45 {
        let w = rng.gen_range(6..20);
        let h = rng.gen_range(6..20);
        let x0 = rng.gen_range(0..SCENE_W - w);
        let y0 = rng.gen_range(0..SCENE_H - h);
        let colour: [f32; 3] = [
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
            rng.gen_range(0.2..1.0),
        ];
        for (c, &v) in colour.iter().enumerate() {
            for y in y0..y0 + h {
                for x in x0..x0 + w {
                    *img.pixel_mut(x, y, c) = v;
                }
            }
        }
    }
    img
}

fn crop(img: &Image, x0: usize, width: usize) -> Image {
    let mut out = Image::new(width, img.height(), img.channels());
    for c in 0..img.channels() {
        for y in 0..img.height() {
            for x in 0..width {
                *out.pixel_mut(x, y, c) = img.at(x0 + x, y, c);
            }
        }
    }
    out
}

fn relative_threshold(image: &Image, fraction: f32) -> f32 {
    let detector = HarrisDetector::new(HarrisParams::default()).expect("default params");
    let max = detector
        .response_map(image)
        .max_response()
        .expect("textured scene has a response");
    fraction * max
}

#[test]
fn recovers_a_horizontal_translation_and_composites_the_scene() {
    let full = scene(7);
    let a = crop(&full, 0, CROP_W);
    let b = crop(&full, SHIFT, CROP_W);

    let mut params = PanoramaParams::default();
    params.harris.threshold = relative_threshold(&a, 0.05);
    let stitcher = PanoramaStitcher::new(params).expect("valid params");

    let result = stitcher
        .stitch(&a, &b, &mut StdRng::seed_from_u64(3))
        .expect("stitch");

    assert!(!result.ransac.insufficient);
    assert!(
        result.ransac.inliers.len() >= 8,
        "only {} inliers of {} matches",
        result.ransac.inliers.len(),
        result.correspondences.len()
    );

    for p in [Point2::new(60.0, 60.0), Point2::new(100.0, 10.0)] {
        let q = result.homography.apply(p).expect("finite");
        assert!(
            (q.x - (p.x - SHIFT as f32)).abs() < 0.5 && (q.y - p.y).abs() < 0.5,
            "{p:?} mapped to {q:?}"
        );
    }

    let pano = &result.panorama;
    assert_eq!((pano.width(), pano.height()), (SHIFT + CROP_W, SCENE_H));

    let mut diff = 0.0;
    for c in 0..3 {
        for y in 0..SCENE_H {
            for x in 0..SHIFT + CROP_W {
                diff += (pano.at(x, y, c) - full.at(x, y, c)).abs();
            }
        }
    }
    let mean = diff / (3 * SCENE_H * (SHIFT + CROP_W)) as f32;
    assert!(mean < 0.02, "mean abs difference {mean}");
}

#[test]
fn same_seed_gives_the_same_panorama() {
    let full = scene(11);
    let a = crop(&full, 0, CROP_W);
    let b = crop(&full, SHIFT, CROP_W);

    let mut params = PanoramaParams::default();
    params.harris.threshold = relative_threshold(&a, 0.05);
    let stitcher = PanoramaStitcher::new(params).expect("valid params");

    let first = stitcher
        .stitch(&a, &b, &mut StdRng::seed_from_u64(21))
        .expect("stitch");
    let second = stitcher
        .stitch(&a, &b, &mut StdRng::seed_from_u64(21))
        .expect("stitch");
    assert_eq!(first.homography, second.homography);
    assert_eq!(first.ransac.inliers, second.ransac.inliers);
    assert_eq!(first.panorama, second.panorama);
}
