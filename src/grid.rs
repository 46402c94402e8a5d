//! Fixed-resolution lattice over the home-plate region and the probability
//! surfaces evaluated on it.

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    /// Points per axis; the lattice is `resolution × resolution`.
    pub resolution: usize,
    pub x_min: f64,
    pub x_max: f64,
    pub z_min: f64,
    pub z_max: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            resolution: 50,
            x_min: -1.5,
            x_max: 1.5,
            z_min: 1.0,
            z_max: 4.5,
        }
    }
}

/// Axis values of the lattice. Row `i` of every surface sits at `z[i]`,
/// column `j` at `x[j]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub x: Vec<f64>,
    pub z: Vec<f64>,
}

impl Grid {
    /// Build the lattice. Pure function of the config.
    pub fn new(cfg: &GridConfig) -> Self {
        Self {
            x: linspace(cfg.x_min, cfg.x_max, cfg.resolution),
            z: linspace(cfg.z_min, cfg.z_max, cfg.resolution),
        }
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn nz(&self) -> usize {
        self.z.len()
    }

    pub fn len(&self) -> usize {
        self.nx() * self.nz()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cell as `(x, z)`, row-major.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.z
            .iter()
            .flat_map(move |&z| self.x.iter().map(move |&x| (x, z)))
    }

    /// Evaluate `f` at every cell.
    pub fn surface_from(&self, mut f: impl FnMut(f64, f64) -> f64) -> Surface {
        let values = self.points().map(|(x, z)| f(x, z)).collect();
        Surface::from_values(self.nx(), self.nz(), values)
    }

    pub fn zeros(&self) -> Surface {
        Surface::from_values(self.nx(), self.nz(), vec![0.0; self.len()])
    }
}

fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as f64;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

/// Row-major grid of cell values.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    nx: usize,
    nz: usize,
    values: Vec<f64>,
}

impl Surface {
    pub fn from_values(nx: usize, nz: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), nx * nz);
        Self { nx, nz, values }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nz, self.nx)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, iz: usize, ix: usize) -> f64 {
        self.values[iz * self.nx + ix]
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn map(&self, mut f: impl FnMut(f64) -> f64) -> Surface {
        Surface::from_values(self.nx, self.nz, self.values.iter().map(|&v| f(v)).collect())
    }

    pub fn clamp_unit(&self) -> Surface {
        self.map(|v| v.clamp(0.0, 1.0))
    }

    /// Divide by `max + eps`. An all-zero surface stays all-zero.
    pub fn normalize_by_max(&self, eps: f64) -> Surface {
        let denom = self.max().max(0.0) + eps;
        if denom <= 0.0 {
            return self.clone();
        }
        self.map(|v| v / denom)
    }

    /// Nested rows for serialisation (`rows[iz][ix]`).
    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.values.chunks(self.nx.max(1)).map(|r| r.to_vec()).collect()
    }

    /// Separable Gaussian blur with half-sample symmetric edges and a kernel
    /// truncated at four standard deviations.
    pub fn gaussian_blur(&self, sigma: f64) -> Surface {
        if sigma <= 0.0 || self.values.is_empty() {
            return self.clone();
        }
        let kernel = gaussian_kernel(sigma);
        let radius = (kernel.len() / 2) as isize;

        let mut rows = vec![0.0; self.values.len()];
        for iz in 0..self.nz {
            for ix in 0..self.nx {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let j = reflect(ix as isize + k as isize - radius, self.nx);
                    acc += w * self.values[iz * self.nx + j];
                }
                rows[iz * self.nx + ix] = acc;
            }
        }

        let mut out = vec![0.0; self.values.len()];
        for iz in 0..self.nz {
            for ix in 0..self.nx {
                let mut acc = 0.0;
                for (k, w) in kernel.iter().enumerate() {
                    let i = reflect(iz as isize + k as isize - radius, self.nz);
                    acc += w * rows[i * self.nx + ix];
                }
                out[iz * self.nx + ix] = acc;
            }
        }
        Surface::from_values(self.nx, self.nz, out)
    }
}

fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut weights: Vec<f64> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f64 / sigma).powi(2)).exp())
        .collect();
    let total: f64 = weights.iter().sum();
    for w in &mut weights {
        *w /= total;
    }
    weights
}

// (d c b a | a b c d | d c b a)
fn reflect(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    if n == 1 {
        return 0;
    }
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - i - 1;
        } else {
            return i as usize;
        }
    }
}
