use serde::{Deserialize, Serialize};

/// Cornerness formula applied to the smoothed structure tensor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CornerMethod {
    /// `det(S) / trace(S)`.
    #[default]
    DetOverTrace,
    /// Exact smaller eigenvalue of the 2x2 tensor.
    SmallestEigenvalue,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HarrisParamsError {
    #[error("descriptor window must be odd and positive, got {0}")]
    InvalidWindow(usize),
    #[error("smoothing sigma must be finite and positive, got {0}")]
    InvalidSigma(f32),
    #[error("corner threshold must be finite, got {0}")]
    InvalidThreshold(f32),
}

/// Harris detection and description settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarrisParams {
    /// Gaussian sigma for integrating the structure tensor.
    pub sigma: f32,
    /// Minimum cornerness kept after non-max suppression.
    pub threshold: f32,
    /// Side of the square descriptor patch (odd).
    pub window: usize,
    /// Non-max suppression radius; the neighbourhood is `(2r + 1)^2`.
    pub nms_radius: usize,
    pub method: CornerMethod,
}

impl Default for HarrisParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            threshold: 1.0,
            window: 5,
            nms_radius: 3,
            method: CornerMethod::DetOverTrace,
        }
    }
}

impl HarrisParams {
    pub fn validate(&self) -> Result<(), HarrisParamsError> {
        if self.window == 0 || self.window % 2 == 0 {
            return Err(HarrisParamsError::InvalidWindow(self.window));
        }
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(HarrisParamsError::InvalidSigma(self.sigma));
        }
        if !self.threshold.is_finite() {
            return Err(HarrisParamsError::InvalidThreshold(self.threshold));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(HarrisParams::default().validate(), Ok(()));
    }

    #[test]
    fn even_window_is_rejected() {
        let params = HarrisParams {
            window: 4,
            ..HarrisParams::default()
        };
        assert_eq!(params.validate(), Err(HarrisParamsError::InvalidWindow(4)));
    }

    #[test]
    fn bad_sigma_is_rejected() {
        for sigma in [0.0, -1.0, f32::NAN] {
            let params = HarrisParams {
                sigma,
                ..HarrisParams::default()
            };
            assert!(matches!(
                params.validate(),
                Err(HarrisParamsError::InvalidSigma(_))
            ));
        }
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let params: HarrisParams =
            serde_json::from_str(r#"{ "sigma": 1.5, "method": "smallest_eigenvalue" }"#)
                .expect("parse");
        assert_eq!(params.sigma, 1.5);
        assert_eq!(params.method, CornerMethod::SmallestEigenvalue);
        assert_eq!(params.window, HarrisParams::default().window);
    }
}
