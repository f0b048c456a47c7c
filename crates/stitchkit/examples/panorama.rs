use rand::rngs::StdRng;
use rand::SeedableRng;
use stitchkit::convert::{load_image, save_image};
use stitchkit::panorama::draw_inliers;
use stitchkit::{PanoramaParams, PanoramaStitcher};

#[cfg(feature = "tracing")]
use stitchkit::core::init_tracing;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(feature = "tracing")]
    init_tracing(false);
    #[cfg(not(feature = "tracing"))]
    stitchkit::core::init_with_level(log::LevelFilter::Info)?;

    let mut args = std::env::args().skip(1);
    let (Some(a), Some(b)) = (args.next(), args.next()) else {
        eprintln!("Usage: panorama <left_image> <right_image> [out_dir]");
        return Ok(());
    };
    let out_dir = args.next().unwrap_or_else(|| ".".to_string());

    let a = load_image(a)?;
    let b = load_image(b)?;
    let stitcher = PanoramaStitcher::new(PanoramaParams::default())?;
    let result = stitcher.stitch(&a, &b, &mut StdRng::seed_from_u64(0))?;

    let threshold = stitcher.params().ransac.inlier_threshold;
    let vis = draw_inliers(&a, &b, &result.homography, &result.correspondences, threshold);
    save_image(&vis, format!("{out_dir}/matches.png"))?;
    save_image(&result.panorama, format!("{out_dir}/panorama.png"))?;

    println!(
        "{} matches, {} inliers, panorama {}x{}",
        result.correspondences.len(),
        result.ransac.inliers.len(),
        result.panorama.width(),
        result.panorama.height()
    );
    Ok(())
}
