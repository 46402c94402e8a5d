//! L2-penalised logistic regression fitted by Newton's method.

use crate::config::LogisticConfig;
use crate::error::{AnalysisError, AnalysisResult};

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    pub intercept: f64,
    pub coef: Vec<f64>,
}

impl LogisticModel {
    /// Fit `P(y = 1 | x) = sigmoid(b0 + w·x)`.
    ///
    /// Minimises `0.5·‖w‖² + C·Σ logloss`; the intercept is unpenalised.
    /// Fails when there is only one class, when rows have inconsistent width,
    /// or when the Hessian becomes singular.
    pub fn fit(x: &[Vec<f64>], y: &[bool], cfg: &LogisticConfig) -> AnalysisResult<Self> {
        if x.len() != y.len() {
            return Err(AnalysisError::fit_failure(format!(
                "feature rows ({}) and labels ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if x.is_empty() {
            return Err(AnalysisError::fit_failure("no observations"));
        }
        let n_feat = x[0].len();
        if x.iter().any(|row| row.len() != n_feat) {
            return Err(AnalysisError::fit_failure("ragged feature matrix"));
        }
        let positives = y.iter().filter(|&&v| v).count();
        if positives == 0 || positives == y.len() {
            return Err(AnalysisError::fit_failure(
                "labels contain a single class",
            ));
        }
        if x.iter().flatten().any(|v| !v.is_finite()) {
            return Err(AnalysisError::fit_failure("non-finite feature value"));
        }

        let dim = n_feat + 1;
        let lambda = 1.0 / cfg.c;
        let mut beta = vec![0.0; dim];
        let mut loss = objective(x, y, &beta, lambda);

        for _ in 0..cfg.max_iter {
            let mut grad = vec![0.0; dim];
            let mut hess = vec![vec![0.0; dim]; dim];

            for (row, &label) in x.iter().zip(y) {
                let p = sigmoid(linear(&beta, row));
                let r = p - if label { 1.0 } else { 0.0 };
                let w = p * (1.0 - p);
                for a in 0..dim {
                    let xa = feature(row, a);
                    grad[a] += r * xa;
                    for b in a..dim {
                        hess[a][b] += w * xa * feature(row, b);
                    }
                }
            }
            for a in 0..dim {
                for b in 0..a {
                    hess[a][b] = hess[b][a];
                }
            }
            for j in 1..dim {
                grad[j] += lambda * beta[j];
                hess[j][j] += lambda;
            }

            let step = solve(hess, grad)?;

            // Backtrack until the penalised objective decreases.
            let mut t = 1.0;
            let mut next = beta.clone();
            let mut next_loss = loss;
            let mut accepted = false;
            for _ in 0..30 {
                for j in 0..dim {
                    next[j] = beta[j] - t * step[j];
                }
                next_loss = objective(x, y, &next, lambda);
                if next_loss <= loss + 1e-12 {
                    accepted = true;
                    break;
                }
                t *= 0.5;
            }
            if !accepted {
                break;
            }

            let max_change = step.iter().map(|s| (s * t).abs()).fold(0.0, f64::max);
            beta = next.clone();
            loss = next_loss;
            if max_change < cfg.tolerance {
                break;
            }
        }

        if beta.iter().any(|b| !b.is_finite()) {
            return Err(AnalysisError::fit_failure("coefficients diverged"));
        }

        Ok(Self {
            intercept: beta[0],
            coef: beta[1..].to_vec(),
        })
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let z = self.intercept + self.coef.iter().zip(row).map(|(w, v)| w * v).sum::<f64>();
        sigmoid(z)
    }

    /// Hard label at the 0.5 decision boundary.
    pub fn predict(&self, row: &[f64]) -> bool {
        self.predict_proba(row) > 0.5
    }

    /// In-sample classification accuracy.
    pub fn accuracy(&self, x: &[Vec<f64>], y: &[bool]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter()
            .zip(y)
            .filter(|(row, &label)| self.predict(row) == label)
            .count();
        correct as f64 / x.len() as f64
    }
}

/// `[x, z, x², z², x·z]`
pub fn quadratic_features(x: f64, z: f64) -> Vec<f64> {
    vec![x, z, x * x, z * z, x * z]
}

pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn feature(row: &[f64], idx: usize) -> f64 {
    if idx == 0 {
        1.0
    } else {
        row[idx - 1]
    }
}

fn linear(beta: &[f64], row: &[f64]) -> f64 {
    beta[0] + beta[1..].iter().zip(row).map(|(b, v)| b * v).sum::<f64>()
}

fn objective(x: &[Vec<f64>], y: &[bool], beta: &[f64], lambda: f64) -> f64 {
    let nll: f64 = x
        .iter()
        .zip(y)
        .map(|(row, &label)| {
            let z = linear(beta, row);
            // log(1 + e^z) - y·z, computed without overflow
            let softplus = if z > 0.0 {
                z + (-z).exp().ln_1p()
            } else {
                z.exp().ln_1p()
            };
            softplus - if label { z } else { 0.0 }
        })
        .sum();
    let penalty: f64 = beta[1..].iter().map(|b| b * b).sum::<f64>() * 0.5 * lambda;
    nll + penalty
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> AnalysisResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 || !a[pivot][col].is_finite() {
            return Err(AnalysisError::fit_failure("singular feature matrix"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut out = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * out[k]).sum();
        out[row] = (b[row] - tail) / a[row][row];
    }
    Ok(out)
}
