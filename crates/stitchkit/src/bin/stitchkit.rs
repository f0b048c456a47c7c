//! stitchkit CLI: corner detection, match visualisation and two-image panoramas.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use stitchkit::convert::{load_image, save_image};
use stitchkit::features::{mark_corners, HarrisDetector, HarrisParams};
use stitchkit::panorama::{
    draw_matches, ransac, PanoramaConfig, PanoramaParams, PanoramaReport, PanoramaStitcher,
    Projection,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "stitchkit")]
#[command(about = "Detect Harris corners, match them across images and stitch panoramas")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON-formatted tracing spans instead of plain log lines.
    #[cfg(feature = "tracing")]
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect corners and write the image with each corner marked.
    Corners(CornersArgs),

    /// Match corners between two images and draw the matches side by side.
    Matches(MatchesArgs),

    /// Stitch two overlapping images into one panorama.
    Panorama(PanoramaArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct HarrisArgs {
    /// Gaussian sigma for structure-tensor smoothing.
    #[arg(long)]
    sigma: Option<f32>,

    /// Minimum cornerness for a corner to be kept.
    #[arg(long)]
    threshold: Option<f32>,

    /// Descriptor window side (odd).
    #[arg(long)]
    window: Option<usize>,

    /// Non-max suppression radius in pixels.
    #[arg(long)]
    nms: Option<usize>,
}

impl HarrisArgs {
    fn apply(&self, params: &mut HarrisParams) {
        if let Some(sigma) = self.sigma {
            params.sigma = sigma;
        }
        if let Some(threshold) = self.threshold {
            params.threshold = threshold;
        }
        if let Some(window) = self.window {
            params.window = window;
        }
        if let Some(nms) = self.nms {
            params.nms_radius = nms;
        }
    }
}

#[derive(Debug, Clone, Args)]
struct CornersArgs {
    /// Input image.
    image: PathBuf,

    /// Output image with corners marked.
    #[arg(short, long)]
    out: PathBuf,

    #[command(flatten)]
    harris: HarrisArgs,
}

#[derive(Debug, Clone, Args)]
struct MatchesArgs {
    /// First (left) image.
    a: PathBuf,

    /// Second (right) image.
    b: PathBuf,

    /// Output side-by-side visualisation.
    #[arg(short, long)]
    out: PathBuf,

    /// Seed for RANSAC sampling; inliers are drawn green.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    #[command(flatten)]
    harris: HarrisArgs,
}

#[derive(Debug, Clone, Args)]
struct PanoramaArgs {
    /// First (reference) image.
    a: PathBuf,

    /// Second image, warped onto the first.
    b: PathBuf,

    /// Output panorama.
    #[arg(short, long)]
    out: PathBuf,

    /// JSON config with parameter overrides; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report of the run.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Seed for RANSAC sampling.
    #[arg(long)]
    seed: Option<u64>,

    #[command(flatten)]
    harris: HarrisArgs,

    /// RANSAC inlier distance in pixels.
    #[arg(long)]
    inlier_thresh: Option<f32>,

    /// Maximum RANSAC iterations.
    #[arg(long)]
    iters: Option<usize>,

    /// Stop RANSAC once a model has more inliers than this.
    #[arg(long)]
    cutoff: Option<usize>,

    /// Weight of the first image where both images have content.
    #[arg(long)]
    blend: Option<f32>,

    /// Re-project both images onto a cylinder of this focal length first.
    #[arg(long, conflicts_with = "spherical")]
    cylindrical: Option<f32>,

    /// Re-project both images onto a sphere of this focal length first.
    #[arg(long)]
    spherical: Option<f32>,
}

impl PanoramaArgs {
    fn to_config(&self) -> CliResult<PanoramaConfig> {
        let mut cfg = match &self.config {
            Some(path) => PanoramaConfig::load_json(path)
                .map_err(|e| -> CliError { format!("{}: {e}", path.display()).into() })?,
            None => PanoramaConfig::new(path_string(&self.a), path_string(&self.b)),
        };
        cfg.image_a = path_string(&self.a);
        cfg.image_b = path_string(&self.b);
        cfg.output_path = Some(path_string(&self.out));
        if let Some(report) = &self.report {
            cfg.report_path = Some(path_string(report));
        }
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        Ok(cfg)
    }

    fn apply(&self, params: &mut PanoramaParams) {
        self.harris.apply(&mut params.harris);
        if let Some(thr) = self.inlier_thresh {
            params.ransac.inlier_threshold = thr;
        }
        if let Some(iters) = self.iters {
            params.ransac.max_iters = iters;
        }
        if let Some(cutoff) = self.cutoff {
            params.ransac.cutoff = cutoff;
        }
        if let Some(blend) = self.blend {
            params.composite.blend = blend;
        }
        if let Some(focal) = self.cylindrical {
            params.projection = Some(Projection::Cylindrical { focal });
        }
        if let Some(focal) = self.spherical {
            params.projection = Some(Projection::Spherical { focal });
        }
    }
}

fn path_string(path: &Path) -> String {
    path.display().to_string()
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match cli.command {
        Commands::Corners(args) => run_corners(&args),
        Commands::Matches(args) => run_matches(&args),
        Commands::Panorama(args) => run_panorama(&args),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(cli: &Cli) {
    // RUST_LOG picks the level when tracing is enabled.
    let _ = cli.verbose;
    stitchkit::core::init_tracing(cli.json_logs);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(cli: &Cli) {
    let level = stitchkit::core::level_from_verbosity(cli.verbose);
    if let Err(e) = stitchkit::core::init_with_level(level) {
        eprintln!("failed to install logger: {e}");
    }
}

fn detector(harris: &HarrisArgs) -> CliResult<HarrisDetector> {
    let mut params = HarrisParams::default();
    harris.apply(&mut params);
    Ok(HarrisDetector::new(params)?)
}

fn run_corners(args: &CornersArgs) -> CliResult<()> {
    let image = load_image(&args.image)?;
    log::info!(
        "loaded {} ({}x{})",
        args.image.display(),
        image.width(),
        image.height()
    );
    let corners = detector(&args.harris)?.corner_points(&image);
    save_image(&mark_corners(&image, &corners), &args.out)?;
    println!("{} corners", corners.len());
    log::info!("marked image written to {}", args.out.display());
    Ok(())
}

fn run_matches(args: &MatchesArgs) -> CliResult<()> {
    let a = load_image(&args.a)?;
    let b = load_image(&args.b)?;
    if a.channels() != b.channels() {
        return Err(format!(
            "images have different channel counts ({} vs {})",
            a.channels(),
            b.channels()
        )
        .into());
    }

    let mut params = PanoramaParams::default();
    args.harris.apply(&mut params.harris);
    let stitcher = PanoramaStitcher::new(params)?;
    let set = stitcher.find_matches(&a, &b);
    let correspondences = set.correspondences();
    let fit = ransac(
        &correspondences,
        &stitcher.params().ransac,
        &mut StdRng::seed_from_u64(args.seed),
    );

    save_image(
        &draw_matches(&a, &b, &correspondences, &fit.inliers),
        &args.out,
    )?;
    println!(
        "{} + {} corners, {} matches, {} inliers",
        set.a.len(),
        set.b.len(),
        correspondences.len(),
        fit.inliers.len()
    );
    Ok(())
}

fn run_panorama(args: &PanoramaArgs) -> CliResult<()> {
    let cfg = args.to_config()?;
    let mut params = cfg.build_params();
    args.apply(&mut params);

    let a = load_image(&args.a)?;
    let b = load_image(&args.b)?;

    let mut report = PanoramaReport::new(&cfg, &params);
    let outcome = PanoramaStitcher::new(params)
        .and_then(|s| s.stitch(&a, &b, &mut StdRng::seed_from_u64(cfg.seed)));

    let result = match outcome {
        Ok(result) => {
            report.set_result(&result);
            Ok(result)
        }
        Err(e) => {
            report.set_error(&e);
            Err(e)
        }
    };

    if let Some(path) = &cfg.report_path {
        report.write_json(path)?;
        log::info!("report written to {path}");
    }

    let result = result?;
    save_image(&result.panorama, cfg.output_path())?;
    println!(
        "{}x{} panorama, {} of {} matches are inliers",
        result.panorama.width(),
        result.panorama.height(),
        result.ransac.inliers.len(),
        result.correspondences.len()
    );
    Ok(())
}
