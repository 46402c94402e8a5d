//! Two-dimensional Gaussian kernel density estimate with Scott's bandwidth.

use std::f64::consts::PI;

use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone)]
pub struct GaussianKde {
    points: Vec<(f64, f64)>,
    // inverse of the kernel covariance
    inv: [[f64; 2]; 2],
    norm: f64,
}

impl GaussianKde {
    /// The kernel covariance is the sample covariance scaled by
    /// `n^(-2/(d+4))`. Fails on fewer than three points or a singular covariance.
    pub fn fit(points: &[(f64, f64)]) -> AnalysisResult<Self> {
        let n = points.len();
        if n < 3 {
            return Err(AnalysisError::fit_failure(format!(
                "density estimate needs at least 3 points, got {n}"
            )));
        }
        if points.iter().any(|(x, z)| !x.is_finite() || !z.is_finite()) {
            return Err(AnalysisError::fit_failure("non-finite location"));
        }

        let nf = n as f64;
        let mx = points.iter().map(|p| p.0).sum::<f64>() / nf;
        let mz = points.iter().map(|p| p.1).sum::<f64>() / nf;
        let (mut sxx, mut szz, mut sxz) = (0.0, 0.0, 0.0);
        for &(x, z) in points {
            sxx += (x - mx) * (x - mx);
            szz += (z - mz) * (z - mz);
            sxz += (x - mx) * (z - mz);
        }
        let factor = nf.powf(-1.0 / 6.0);
        let scale = factor * factor / (nf - 1.0);
        let (cxx, czz, cxz) = (sxx * scale, szz * scale, sxz * scale);

        let det = cxx * czz - cxz * cxz;
        if !(det > 1e-14 * (cxx * czz).max(f64::MIN_POSITIVE)) || !det.is_finite() {
            return Err(AnalysisError::fit_failure(
                "singular covariance in density estimate",
            ));
        }

        Ok(Self {
            points: points.to_vec(),
            inv: [[czz / det, -cxz / det], [-cxz / det, cxx / det]],
            norm: 1.0 / (nf * 2.0 * PI * det.sqrt()),
        })
    }

    pub fn density(&self, x: f64, z: f64) -> f64 {
        let [[a, b], [_, d]] = self.inv;
        let sum: f64 = self
            .points
            .iter()
            .map(|&(px, pz)| {
                let dx = x - px;
                let dz = z - pz;
                (-0.5 * (a * dx * dx + 2.0 * b * dx * dz + d * dz * dz)).exp()
            })
            .sum();
        sum * self.norm
    }
}
