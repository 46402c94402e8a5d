//! Zone Modeler: textbook, umpire-called and batter-swing probability surfaces
//! over a shared grid.

use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::error::AnalysisResult;
use crate::grid::{Grid, Surface};
use crate::kde::GaussianKde;
use crate::logistic::{quadratic_features, LogisticModel};
use crate::pitch::{PitchRecord, DEFAULT_SZ_BOT, DEFAULT_SZ_TOP};

/// 17 inches.
pub const PLATE_WIDTH: f64 = 17.0 / 12.0;
/// Baseball radius, about 1.45 inches.
pub const BALL_RADIUS: f64 = 1.45 / 12.0;

const TEXTBOOK_SIGMA: f64 = 0.5;
const BATTER_FALLBACK_SIGMA: f64 = 2.0;
const NORMALIZE_EPS: f64 = 1e-6;
const MIN_KDE_POSITIVES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Fewer observations than the surface-fit threshold.
    InsufficientSamples { required: usize, observed: usize },
    /// The classifier could not be fitted; density of called strikes used instead.
    ClassifierFitFailed,
    /// Not even the density estimate could be built; the surface is all zero.
    DensityFitFailed,
}

/// A surface together with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceOutcome {
    Fitted(Surface),
    Fallback(Surface, FallbackReason),
}

impl SurfaceOutcome {
    pub fn surface(&self) -> &Surface {
        match self {
            SurfaceOutcome::Fitted(s) | SurfaceOutcome::Fallback(s, _) => s,
        }
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, SurfaceOutcome::Fitted(_))
    }

    pub fn provenance(&self) -> SurfaceProvenance {
        match self {
            SurfaceOutcome::Fitted(_) => SurfaceProvenance {
                source: SurfaceSource::Fitted,
                reason: None,
            },
            SurfaceOutcome::Fallback(_, reason) => SurfaceProvenance {
                source: SurfaceSource::Fallback,
                reason: Some(*reason),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceSource {
    Fitted,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SurfaceProvenance {
    pub source: SurfaceSource,
    pub reason: Option<FallbackReason>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneBounds {
    pub sz_top: f64,
    pub sz_bot: f64,
}

impl ZoneBounds {
    /// Unweighted mean of per-pitch bounds; defaults when there are no pitches.
    pub fn mean_of<'a>(records: impl IntoIterator<Item = &'a PitchRecord>) -> Self {
        let (mut top, mut bot, mut n) = (0.0, 0.0, 0usize);
        for r in records {
            top += r.sz_top;
            bot += r.sz_bot;
            n += 1;
        }
        if n == 0 {
            return Self {
                sz_top: DEFAULT_SZ_TOP,
                sz_bot: DEFAULT_SZ_BOT,
            };
        }
        Self {
            sz_top: top / n as f64,
            sz_bot: bot / n as f64,
        }
    }

    pub fn mid(&self) -> f64 {
        (self.sz_top + self.sz_bot) / 2.0
    }
}

/// All three surfaces from one modeler call; they share `grid`.
#[derive(Debug, Clone)]
pub struct ZoneModels {
    pub grid: Grid,
    pub bounds: ZoneBounds,
    pub textbook: Surface,
    pub umpire: SurfaceOutcome,
    pub batter: SurfaceOutcome,
}

pub struct ZoneModeler<'a> {
    cfg: &'a AnalysisConfig,
    grid: Grid,
}

impl<'a> ZoneModeler<'a> {
    pub fn new(cfg: &'a AnalysisConfig) -> Self {
        Self {
            grid: Grid::new(&cfg.grid),
            cfg,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn model(&self, records: &[PitchRecord]) -> ZoneModels {
        let bounds = ZoneBounds::mean_of(records);
        let textbook = textbook_surface(&self.grid, bounds);

        let takes: Vec<&PitchRecord> = records.iter().filter(|r| r.is_take()).collect();
        let swings: Vec<&PitchRecord> = records.iter().filter(|r| r.is_swing()).collect();

        let umpire = self.umpire_surface(&takes, &textbook);
        let batter = self.batter_surface(&swings, &textbook);
        debug!(
            "zone models built from {} takes / {} swings (umpire fitted={}, batter fitted={})",
            takes.len(),
            swings.len(),
            umpire.is_fitted(),
            batter.is_fitted()
        );

        ZoneModels {
            grid: self.grid.clone(),
            bounds,
            textbook,
            umpire,
            batter,
        }
    }

    /// P(called strike | location) from a degree-2 logistic fit on takes.
    pub fn umpire_surface(&self, takes: &[&PitchRecord], textbook: &Surface) -> SurfaceOutcome {
        let required = self.cfg.thresholds.min_surface_samples;
        if takes.len() < required {
            warn!(
                "umpire surface: {} takes below threshold {}, using perturbed textbook zone",
                takes.len(),
                required
            );
            let noisy = self.perturb(textbook);
            return SurfaceOutcome::Fallback(
                noisy,
                FallbackReason::InsufficientSamples {
                    required,
                    observed: takes.len(),
                },
            );
        }

        match self.fit_umpire(takes) {
            Ok(surface) => SurfaceOutcome::Fitted(surface),
            Err(e) => {
                warn!("umpire surface: {e}; falling back to called-strike density");
                let strikes: Vec<(f64, f64)> = takes
                    .iter()
                    .filter(|r| r.is_called_strike())
                    .map(|r| r.location())
                    .collect();
                if strikes.len() < MIN_KDE_POSITIVES {
                    return SurfaceOutcome::Fallback(self.grid.zeros(), FallbackReason::DensityFitFailed);
                }
                match density_surface(&self.grid, &strikes) {
                    Ok(s) => SurfaceOutcome::Fallback(s, FallbackReason::ClassifierFitFailed),
                    Err(_) => SurfaceOutcome::Fallback(self.grid.zeros(), FallbackReason::DensityFitFailed),
                }
            }
        }
    }

    /// Swing density rescaled to [0, 1].
    pub fn batter_surface(&self, swings: &[&PitchRecord], textbook: &Surface) -> SurfaceOutcome {
        let required = self.cfg.thresholds.min_surface_samples;
        if swings.len() < required {
            warn!(
                "batter surface: {} swings below threshold {}, using blurred textbook zone",
                swings.len(),
                required
            );
            let blurred = textbook
                .gaussian_blur(BATTER_FALLBACK_SIGMA)
                .normalize_by_max(NORMALIZE_EPS);
            return SurfaceOutcome::Fallback(
                blurred,
                FallbackReason::InsufficientSamples {
                    required,
                    observed: swings.len(),
                },
            );
        }

        let locations: Vec<(f64, f64)> = swings.iter().map(|r| r.location()).collect();
        match density_surface(&self.grid, &locations) {
            Ok(s) => SurfaceOutcome::Fitted(s),
            Err(e) => {
                warn!("batter surface: {e}");
                SurfaceOutcome::Fallback(self.grid.zeros(), FallbackReason::DensityFitFailed)
            }
        }
    }

    fn fit_umpire(&self, takes: &[&PitchRecord]) -> AnalysisResult<Surface> {
        let x: Vec<Vec<f64>> = takes
            .iter()
            .map(|r| quadratic_features(r.plate_x, r.plate_z))
            .collect();
        let y: Vec<bool> = takes.iter().map(|r| r.is_called_strike()).collect();
        let model = LogisticModel::fit(&x, &y, &self.cfg.logistic)?;
        Ok(self
            .grid
            .surface_from(|gx, gz| model.predict_proba(&quadratic_features(gx, gz))))
    }

    // textbook × (1 + σ·N(0, 1)), clipped to [0, 1]
    fn perturb(&self, textbook: &Surface) -> Surface {
        let mut rng = match self.cfg.fallback_noise.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let sigma = self.cfg.fallback_noise.sigma;
        textbook
            .map(|v| {
                let noise: f64 = rng.sample(StandardNormal);
                v * (1.0 + sigma * noise)
            })
            .clamp_unit()
    }
}

/// Rulebook zone: the plate half-width plus a ball radius horizontally, the
/// batter's bounds widened by a ball radius vertically, lightly blurred.
pub fn textbook_surface(grid: &Grid, bounds: ZoneBounds) -> Surface {
    let half_plate = PLATE_WIDTH / 2.0 + BALL_RADIUS;
    let bottom = bounds.sz_bot - BALL_RADIUS;
    let top = bounds.sz_top + BALL_RADIUS;
    grid.surface_from(|x, z| {
        if x >= -half_plate && x <= half_plate && z >= bottom && z <= top {
            1.0
        } else {
            0.0
        }
    })
    .gaussian_blur(TEXTBOOK_SIGMA)
}

fn density_surface(grid: &Grid, points: &[(f64, f64)]) -> AnalysisResult<Surface> {
    let kde = GaussianKde::fit(points)?;
    Ok(grid
        .surface_from(|x, z| kde.density(x, z))
        .normalize_by_max(NORMALIZE_EPS))
}
