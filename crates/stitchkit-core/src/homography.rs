use nalgebra::{DMatrix, DVector, Matrix3, Point2, Vector3};
use serde::{Deserialize, Serialize};

/// Smallest `|w|` accepted when dehomogenizing a projected point.
const MIN_PROJECTIVE_W: f64 = 1e-12;
/// Relative singular value below which the DLT system is treated as rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("need at least 4 correspondences for a homography, {supplied} supplied")]
    InsufficientCorrespondences { supplied: usize },
    #[error("correspondences are degenerate (collinear or coincident points)")]
    NumericDegeneracy,
}

/// One point pair: `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correspondence {
    pub src: Point2<f32>,
    pub dst: Point2<f32>,
}

impl Correspondence {
    pub fn new(src: Point2<f32>, dst: Point2<f32>) -> Self {
        Self { src, dst }
    }
}

/// 3x3 projective transform acting on homogeneous column vectors `(x, y, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    pub fn identity() -> Self {
        Self::new(Matrix3::identity())
    }

    pub fn translation(dx: f64, dy: f64) -> Self {
        Self::new(Matrix3::new(
            1.0, 0.0, dx, //
            0.0, 1.0, dy, //
            0.0, 0.0, 1.0,
        ))
    }

    pub fn from_array(rows: [[f64; 3]; 3]) -> Self {
        Self::new(Matrix3::from_row_slice(&[
            rows[0][0], rows[0][1], rows[0][2], rows[1][0], rows[1][1], rows[1][2], rows[2][0],
            rows[2][1], rows[2][2],
        ]))
    }

    pub fn to_array(&self) -> [[f64; 3]; 3] {
        [
            [self.h[(0, 0)], self.h[(0, 1)], self.h[(0, 2)]],
            [self.h[(1, 0)], self.h[(1, 1)], self.h[(1, 2)]],
            [self.h[(2, 0)], self.h[(2, 1)], self.h[(2, 2)]],
        ]
    }

    /// Project a point. Returns `None` when the homogeneous coordinate is
    /// (numerically) zero or the result is not finite.
    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Option<Point2<f32>> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        let w = v[2];
        if !w.is_finite() || w.abs() < MIN_PROJECTIVE_W {
            return None;
        }
        let q = Point2::new((v[0] / w) as f32, (v[1] / w) as f32);
        (q.x.is_finite() && q.y.is_finite()).then_some(q)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(Self::new)
    }

    pub fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }
}

/// Euclidean distance between two points.
#[inline]
pub fn point_distance(p: Point2<f32>, q: Point2<f32>) -> f32 {
    (p - q).norm()
}

/// Distance between `H * src` and `dst`, or `None` if `src` cannot be projected.
#[inline]
pub fn reprojection_error(h: &Homography, c: &Correspondence) -> Option<f32> {
    h.apply(c.src).map(|p| point_distance(p, c.dst))
}

fn hartley_normalization(cx: f64, cy: f64, mean_dist: f64) -> Matrix3<f64> {
    let s = if mean_dist > 1e-12 {
        (2.0_f64).sqrt() / mean_dist
    } else {
        1.0
    };

    Matrix3::<f64>::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0)
}

// Translate to the centroid and scale so the mean distance is sqrt(2).
fn normalize_points(
    pts: impl Iterator<Item = Point2<f32>> + Clone,
) -> (Vec<Point2<f64>>, Matrix3<f64>) {
    let mut n = 0usize;
    let (mut cx, mut cy) = (0.0, 0.0);
    for p in pts.clone() {
        cx += p.x as f64;
        cy += p.y as f64;
        n += 1;
    }
    let n = n.max(1) as f64;
    cx /= n;
    cy /= n;

    let mean_dist = pts
        .clone()
        .map(|p| (p.x as f64 - cx).hypot(p.y as f64 - cy))
        .sum::<f64>()
        / n;

    let t = hartley_normalization(cx, cy, mean_dist);
    let out = pts
        .map(|p| {
            let v = t * Vector3::new(p.x as f64, p.y as f64, 1.0);
            Point2::new(v[0], v[1])
        })
        .collect();
    (out, t)
}

fn normalize_homography(h: Matrix3<f64>) -> Option<Matrix3<f64>> {
    let s = h[(2, 2)];
    if !s.is_finite() || s.abs() < 1e-12 {
        return None;
    }
    Some(h / s)
}

fn denormalize_homography(
    hn: Matrix3<f64>,
    t_src: Matrix3<f64>,
    t_dst: Matrix3<f64>,
) -> Option<Matrix3<f64>> {
    let t_dst_inv = t_dst.try_inverse()?;
    Some(t_dst_inv * hn * t_src)
}

/// Least-squares DLT with `h33 = 1`.
///
/// Exactly 4 correspondences give an exact fit; more are solved in the
/// least-squares sense. Points are Hartley-normalized before solving.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "trace", skip(correspondences), fields(n = correspondences.len()))
)]
pub fn try_compute_homography(
    correspondences: &[Correspondence],
) -> Result<Homography, HomographyError> {
    let n = correspondences.len();
    if n < 4 {
        return Err(HomographyError::InsufficientCorrespondences { supplied: n });
    }

    let (src, t_src) = normalize_points(correspondences.iter().map(|c| c.src));
    let (dst, t_dst) = normalize_points(correspondences.iter().map(|c| c.dst));

    // Unknowns: [h11 h12 h13 h21 h22 h23 h31 h32]
    // h11 x + h12 y + h13 - u h31 x - u h32 y = u
    // h21 x + h22 y + h23 - v h31 x - v h32 y = v
    let mut a = DMatrix::<f64>::zeros(2 * n, 8);
    let mut b = DVector::<f64>::zeros(2 * n);
    for (k, (s, d)) in src.iter().zip(&dst).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        let r0 = 2 * k;
        a[(r0, 0)] = x;
        a[(r0, 1)] = y;
        a[(r0, 2)] = 1.0;
        a[(r0, 6)] = -u * x;
        a[(r0, 7)] = -u * y;
        b[r0] = u;

        let r1 = 2 * k + 1;
        a[(r1, 3)] = x;
        a[(r1, 4)] = y;
        a[(r1, 5)] = 1.0;
        a[(r1, 6)] = -v * x;
        a[(r1, 7)] = -v * y;
        b[r1] = v;
    }

    if a.iter().chain(b.iter()).any(|v| !v.is_finite()) {
        return Err(HomographyError::NumericDegeneracy);
    }

    let svd = a.svd(true, true);
    let max_sv = svd.singular_values.max();
    let min_sv = svd.singular_values.min();
    if max_sv.is_nan() || max_sv <= 0.0 || min_sv / max_sv < RANK_TOLERANCE {
        return Err(HomographyError::NumericDegeneracy);
    }
    let x = svd
        .solve(&b, 0.0)
        .map_err(|_| HomographyError::NumericDegeneracy)?;

    let hn = Matrix3::<f64>::new(
        x[0], x[1], x[2], //
        x[3], x[4], x[5], //
        x[6], x[7], 1.0,
    );

    let h = denormalize_homography(hn, t_src, t_dst)
        .and_then(normalize_homography)
        .map(Homography::new)
        .filter(Homography::is_finite)
        .ok_or(HomographyError::NumericDegeneracy)?;
    Ok(h)
}

/// Like [`try_compute_homography`], but logs a warning and returns the
/// identity when no homography can be fitted.
pub fn compute_homography(correspondences: &[Correspondence]) -> Homography {
    match try_compute_homography(correspondences) {
        Ok(h) => h,
        Err(err) => {
            log::warn!("homography fit failed: {err}; falling back to identity");
            Homography::identity()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_close(a: Point2<f32>, b: Point2<f32>, tol: f32) {
        let dx = (a.x - b.x).abs();
        let dy = (a.y - b.y).abs();
        assert!(
            dx < tol && dy < tol,
            "expected ({:.6},{:.6}) ~ ({:.6},{:.6}) within {}",
            a.x,
            a.y,
            b.x,
            b.y,
            tol
        );
    }

    fn project(h: &Homography, p: Point2<f32>) -> Point2<f32> {
        h.apply(p).expect("projectable")
    }

    fn pairs(h: &Homography, src: &[Point2<f32>]) -> Vec<Correspondence> {
        src.iter()
            .map(|&p| Correspondence::new(p, project(h, p)))
            .collect()
    }

    #[test]
    fn identity_and_translation_project_as_expected() {
        let p = Point2::new(12.5_f32, -3.0);
        assert_eq!(Homography::identity().apply(p), Some(p));
        assert_close(
            project(&Homography::translation(4.0, 2.0), p),
            Point2::new(16.5, -1.0),
            1e-6,
        );
    }

    #[test]
    fn apply_rejects_points_at_infinity() {
        // Row 3 = (1, 0, 0): w == x, so x == 0 lands at infinity.
        let h = Homography::from_array([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]]);
        assert!(h.apply(Point2::new(0.0, 5.0)).is_none());
        assert!(h.apply(Point2::new(2.0, 5.0)).is_some());
    }

    #[test]
    fn inverse_round_trips_points() {
        let h = Homography::new(Matrix3::new(
            1.2, 0.1, 5.0, //
            -0.05, 0.9, 3.0, //
            0.001, 0.0005, 1.0,
        ));
        let inv = h.inverse().expect("invertible");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(50.0_f32, -20.0),
            Point2::new(320.0_f32, 200.0),
        ] {
            let back = project(&inv, project(&h, p));
            assert_close(back, p, 1e-3);
        }
    }

    #[test]
    fn four_points_recover_h_exactly() {
        let ground_truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));

        let src = [
            Point2::new(0.0_f32, 0.0),
            Point2::new(180.0_f32, 0.0),
            Point2::new(180.0_f32, 130.0),
            Point2::new(0.0_f32, 130.0),
        ];
        let recovered = try_compute_homography(&pairs(&ground_truth, &src)).expect("recoverable");

        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(150.0, 120.0),
        ] {
            assert_close(project(&recovered, p), project(&ground_truth, p), 1e-3);
        }

        let (got, want) = (recovered.to_array(), ground_truth.to_array());
        assert_eq!(got[2][2], 1.0);
        for r in 0..3 {
            for c in 0..3 {
                assert_relative_eq!(got[r][c], want[r][c], epsilon = 1e-6, max_relative = 1e-3);
            }
        }
    }

    #[test]
    fn dlt_handles_overdetermined_case() {
        let ground_truth = Homography::new(Matrix3::new(
            1.0, 0.2, 12.0, //
            -0.1, 0.9, 6.0, //
            0.0006, 0.0004, 1.0,
        ));

        let src: Vec<Point2<f32>> = (0..3)
            .flat_map(|y| (0..3).map(move |x| Point2::new(x as f32 * 40.0, y as f32 * 50.0)))
            .collect();

        let estimated = try_compute_homography(&pairs(&ground_truth, &src)).expect("estimate");
        for p in [
            Point2::new(0.0_f32, 0.0),
            Point2::new(60.0, 40.0),
            Point2::new(80.0, 90.0),
            Point2::new(80.0, 100.0),
        ] {
            assert_close(project(&estimated, p), project(&ground_truth, p), 1e-3);
        }
    }

    #[test]
    fn too_few_correspondences_fail() {
        let c = [Correspondence::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)); 3];
        assert_eq!(
            try_compute_homography(&c),
            Err(HomographyError::InsufficientCorrespondences { supplied: 3 })
        );
        assert_eq!(compute_homography(&c), Homography::identity());
        assert_eq!(compute_homography(&[]), Homography::identity());
    }

    #[test]
    fn collinear_points_are_degenerate() {
        let c: Vec<Correspondence> = (0..6)
            .map(|i| {
                let p = Point2::new(i as f32 * 10.0, i as f32 * 5.0);
                Correspondence::new(p, p)
            })
            .collect();
        assert_eq!(
            try_compute_homography(&c),
            Err(HomographyError::NumericDegeneracy)
        );
    }

    #[test]
    fn reprojection_error_measures_pixel_distance() {
        let c = Correspondence::new(Point2::new(1.0, 1.0), Point2::new(4.0, 5.0));
        let err = reprojection_error(&Homography::identity(), &c).expect("finite");
        assert!((err - 5.0).abs() < 1e-6);
    }
}
