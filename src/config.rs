use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::grid::GridConfig;

/// Minimum-sample gates for every analysis.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Thresholds {
    /// Observations needed to fit the umpire or batter surface.
    pub min_surface_samples: usize,
    /// Pitches in a plate appearance for it to count as a "long" at-bat.
    pub min_long_at_bat_pitches: usize,
    /// Qualifying takes needed to run the influence regression.
    pub min_regression_takes: usize,
    /// Edge-zone takes needed before the median split is attempted.
    pub min_edge_takes: usize,
    /// Non-first-pitch edge takes needed inside the median split.
    pub min_edge_split_takes: usize,
    /// Takes needed in each half of the median split.
    pub min_edge_group: usize,
    /// Pitches a filtered table needs before an alignment score is computed.
    pub min_alignment_pitches: usize,
    /// Pitches a batter needs to appear in the roster listing.
    pub min_roster_pitches: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            min_surface_samples: 50,
            min_long_at_bat_pitches: 4,
            min_regression_takes: 20,
            min_edge_takes: 15,
            min_edge_split_takes: 10,
            min_edge_group: 5,
            min_alignment_pitches: 50,
            min_roster_pitches: 100,
        }
    }
}

/// Swing-rate cutoffs for the freeswinger / patient labels.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TendencyThresholds {
    pub freeswinger: f64,
    pub patient: f64,
}

impl Default for TendencyThresholds {
    fn default() -> Self {
        Self {
            freeswinger: 0.55,
            patient: 0.45,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LogisticConfig {
    /// Inverse L2 regularisation strength; the intercept is never penalised.
    pub c: f64,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for LogisticConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tolerance: 1e-8,
        }
    }
}

/// Noise applied to the textbook surface when the umpire surface cannot be fitted.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FallbackNoise {
    pub sigma: f64,
    /// Fixed seed for reproducible fallbacks; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for FallbackNoise {
    fn default() -> Self {
        Self {
            sigma: 0.1,
            seed: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub grid: GridConfig,
    pub thresholds: Thresholds,
    pub tendency: TendencyThresholds,
    pub logistic: LogisticConfig,
    pub fallback_noise: FallbackNoise,
    /// Cohort size when no batter ids are given.
    pub default_cohort_size: usize,
    /// Long at-bats a batter needs to be listed as eligible for influence analysis.
    pub default_min_long_abs: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            thresholds: Thresholds::default(),
            tendency: TendencyThresholds::default(),
            logistic: LogisticConfig::default(),
            fallback_noise: FallbackNoise::default(),
            default_cohort_size: 5,
            default_min_long_abs: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        let cfg: AnalysisConfig = serde_json::from_str(&data)
            .with_context(|| format!("invalid config JSON in {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let g = &self.grid;
        if g.resolution < 2 {
            bail!("grid resolution must be at least 2, got {}", g.resolution);
        }
        if !(g.x_min < g.x_max) || !(g.z_min < g.z_max) {
            bail!(
                "grid bounds are inverted: x [{}, {}], z [{}, {}]",
                g.x_min,
                g.x_max,
                g.z_min,
                g.z_max
            );
        }
        if self.tendency.patient > self.tendency.freeswinger {
            bail!(
                "patient cutoff {} is above freeswinger cutoff {}",
                self.tendency.patient,
                self.tendency.freeswinger
            );
        }
        if self.logistic.c <= 0.0 {
            bail!("logistic C must be positive, got {}", self.logistic.c);
        }
        Ok(())
    }
}
