//! Influence Analyzer: does a batter's swing tendency earlier in the plate
//! appearance predict the umpire's call on a taken pitch?

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::alignment::round_to;
use crate::config::{AnalysisConfig, LogisticConfig, TendencyThresholds};
use crate::error::{AnalysisError, AnalysisResult, Requirement};
use crate::history::{SwingHistory, TrackedPitch};
use crate::logistic::LogisticModel;
use crate::names::NameLookup;
use crate::pitch::PitchRecord;
use crate::table::{Column, PitchTable, AT_BAT_TRACKING};
use crate::zone::ZoneBounds;

/// |coefficient| below this reads as no influence.
pub const MINIMAL_COEFFICIENT: f64 = 0.1;
const MEANINGFUL_IMPROVEMENT: f64 = 0.02;
const SUBTLE_IMPROVEMENT: f64 = 0.005;

const INSIDE_X: f64 = -0.5;
const OUTSIDE_X: f64 = 0.5;
const HIGH_LOW_OFFSET: f64 = 0.5;
const EDGE_X_INNER: f64 = 0.6;
const EDGE_X_OUTER: f64 = 1.0;
const EDGE_Z_BAND: f64 = 0.3;

/// One taken pitch as the regression sees it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TakeObservation {
    pub plate_x: f64,
    pub plate_z: f64,
    pub prior_swing_rate: f64,
    pub called_strike: bool,
}

impl From<&TrackedPitch<'_>> for TakeObservation {
    fn from(p: &TrackedPitch<'_>) -> Self {
        Self {
            plate_x: p.record.plate_x,
            plate_z: p.record.plate_z,
            prior_swing_rate: p.prior_swing_rate,
            called_strike: p.record.is_called_strike(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfluenceDirection {
    Positive,
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceRegression {
    pub baseline_accuracy: f64,
    pub swing_model_accuracy: f64,
    pub accuracy_improvement: f64,
    pub swing_rate_coefficient: f64,
    pub odds_ratio: f64,
    pub influence_direction: InfluenceDirection,
    pub takes_analyzed: usize,
    pub interpretation: String,
}

/// Fit location-only and location + prior-swing-rate classifiers and compare.
pub fn fit_influence(
    takes: &[TakeObservation],
    min_takes: usize,
    cfg: &LogisticConfig,
) -> AnalysisResult<InfluenceRegression> {
    if takes.len() < min_takes {
        return Err(AnalysisError::insufficient(
            Requirement::RegressionTakes,
            min_takes,
            takes.len(),
        ));
    }

    let x_location: Vec<Vec<f64>> = takes.iter().map(|t| vec![t.plate_x, t.plate_z]).collect();
    let x_swing: Vec<Vec<f64>> = takes
        .iter()
        .map(|t| vec![t.plate_x, t.plate_z, t.prior_swing_rate])
        .collect();
    let y: Vec<bool> = takes.iter().map(|t| t.called_strike).collect();

    let baseline = LogisticModel::fit(&x_location, &y, cfg)?;
    let with_swing = LogisticModel::fit(&x_swing, &y, cfg)?;

    let baseline_accuracy = baseline.accuracy(&x_location, &y);
    let swing_accuracy = with_swing.accuracy(&x_swing, &y);
    let coef = with_swing.coef[2];
    let odds_ratio = coef.exp();
    let improvement = swing_accuracy - baseline_accuracy;

    Ok(InfluenceRegression {
        baseline_accuracy: round_to(baseline_accuracy, 4),
        swing_model_accuracy: round_to(swing_accuracy, 4),
        accuracy_improvement: round_to(improvement, 4),
        swing_rate_coefficient: round_to(coef, 4),
        odds_ratio: round_to(odds_ratio, 4),
        influence_direction: if coef > 0.0 {
            InfluenceDirection::Positive
        } else {
            InfluenceDirection::Negative
        },
        takes_analyzed: takes.len(),
        interpretation: interpret_influence(coef, odds_ratio, improvement),
    })
}

/// Regression block of a batter result. A classifier that cannot be fitted on
/// the batter's takes leaves the rest of the result intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InfluenceOutcome {
    Fitted(InfluenceRegression),
    Unfitted {
        error: AnalysisError,
        takes_analyzed: usize,
    },
}

impl InfluenceOutcome {
    pub fn regression(&self) -> Option<&InfluenceRegression> {
        match self {
            InfluenceOutcome::Fitted(r) => Some(r),
            InfluenceOutcome::Unfitted { .. } => None,
        }
    }
}

pub fn interpret_influence(coef: f64, odds_ratio: f64, improvement: f64) -> String {
    let direction = if coef.abs() < MINIMAL_COEFFICIENT {
        "Minimal evidence of umpire influence from batter swing behavior.".to_string()
    } else if coef > 0.0 {
        format!(
            "Positive correlation: Batters with higher swing rates see MORE called strikes \
             (odds ratio: {odds_ratio:.2}x)."
        )
    } else {
        format!(
            "Negative correlation: Batters with higher swing rates see FEWER called strikes \
             (odds ratio: {odds_ratio:.2}x). This supports the 'freeswinger took it = must be ball' theory."
        )
    };
    let significance = if improvement > MEANINGFUL_IMPROVEMENT {
        "Model improvement suggests the effect may be meaningful."
    } else if improvement > SUBTLE_IMPROVEMENT {
        "Small model improvement - effect may exist but is subtle."
    } else {
        "Negligible model improvement - effect likely not meaningful."
    };
    format!("{direction} {significance}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLabel {
    Heart,
    Inside,
    Outside,
    High,
    Low,
}

/// Coarse location label. Vertical labels take precedence over horizontal.
pub fn classify_zone(x: f64, z: f64, zone_mid: f64) -> ZoneLabel {
    if z < zone_mid - HIGH_LOW_OFFSET {
        ZoneLabel::Low
    } else if z > zone_mid + HIGH_LOW_OFFSET {
        ZoneLabel::High
    } else if x > OUTSIDE_X {
        ZoneLabel::Outside
    } else if x < INSIDE_X {
        ZoneLabel::Inside
    } else {
        ZoneLabel::Heart
    }
}

/// Borderline pitch: near the plate's horizontal edge, or within a band
/// around the top or bottom of the batter's zone. Each clause is a
/// conjunction; the three clauses are OR-ed.
pub fn is_edge(x: f64, z: f64, sz_top: f64, sz_bot: f64) -> bool {
    let ax = x.abs();
    (ax > EDGE_X_INNER && ax < EDGE_X_OUTER)
        || (z > sz_top - EDGE_Z_BAND && z < sz_top + EDGE_Z_BAND)
        || (z > sz_bot - EDGE_Z_BAND && z < sz_bot + EDGE_Z_BAND)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeSplit {
    pub high_swing_batters_strike_rate: f64,
    pub low_swing_batters_strike_rate: f64,
    pub difference: f64,
    pub high_swing_count: usize,
    pub low_swing_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EdgeOutcome {
    Split(EdgeSplit),
    Insufficient { error: AnalysisError },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeAnalysis {
    pub count: usize,
    #[serde(flatten)]
    pub outcome: EdgeOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<EdgeAnalysis>,
    pub zone_distribution: BTreeMap<ZoneLabel, usize>,
}

fn median(values: &mut [f64]) -> f64 {
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

fn called_strike_rate(group: &[&TrackedPitch<'_>]) -> f64 {
    group.iter().filter(|t| t.record.is_called_strike()).count() as f64 / group.len() as f64
}

/// Called-strike rate above vs. at-or-below the median prior swing rate.
pub fn median_split(
    takes: &[&TrackedPitch<'_>],
    min_takes: usize,
    min_group: usize,
) -> AnalysisResult<EdgeSplit> {
    let with_history: Vec<&TrackedPitch<'_>> =
        takes.iter().copied().filter(|t| t.has_history()).collect();
    if with_history.len() < min_takes {
        return Err(AnalysisError::insufficient(
            Requirement::EdgeTakes,
            min_takes,
            with_history.len(),
        ));
    }

    let mut rates: Vec<f64> = with_history.iter().map(|t| t.prior_swing_rate).collect();
    let cut = median(&mut rates);
    let (high, low): (Vec<&TrackedPitch<'_>>, Vec<&TrackedPitch<'_>>) = with_history
        .into_iter()
        .partition(|t| t.prior_swing_rate > cut);

    let smaller = high.len().min(low.len());
    if smaller < min_group {
        return Err(AnalysisError::insufficient(
            Requirement::EdgeSplitGroup,
            min_group,
            smaller,
        ));
    }

    let high_rate = called_strike_rate(&high);
    let low_rate = called_strike_rate(&low);
    Ok(EdgeSplit {
        high_swing_batters_strike_rate: round_to(high_rate, 4),
        low_swing_batters_strike_rate: round_to(low_rate, 4),
        difference: round_to(high_rate - low_rate, 4),
        high_swing_count: high.len(),
        low_swing_count: low.len(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatterStats {
    pub overall_swing_rate: f64,
    pub long_ab_swing_rate: f64,
    pub total_swings: usize,
    pub total_takes: usize,
    pub is_freeswinger: bool,
    pub is_patient: bool,
}

fn swing_rate<'r>(records: impl Iterator<Item = &'r PitchRecord>) -> (usize, usize, f64) {
    let (mut swings, mut takes) = (0, 0);
    for r in records {
        if r.is_swing() {
            swings += 1;
        } else if r.is_take() {
            takes += 1;
        }
    }
    let total = swings + takes;
    let rate = if total > 0 {
        swings as f64 / total as f64
    } else {
        0.0
    };
    (swings, takes, rate)
}

pub fn batter_stats(
    all: &[&PitchRecord],
    history: &SwingHistory<'_>,
    tendency: &TendencyThresholds,
) -> BatterStats {
    let (total_swings, total_takes, overall) = swing_rate(all.iter().copied());
    let (_, _, long_rate) = swing_rate(history.pitches().map(|p| p.record));
    BatterStats {
        overall_swing_rate: round_to(overall, 4),
        long_ab_swing_rate: round_to(long_rate, 4),
        total_swings,
        total_takes,
        is_freeswinger: overall > tendency.freeswinger,
        is_patient: overall < tendency.patient,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub total_pitches: usize,
    pub total_at_bats: usize,
    pub long_at_bats: usize,
    pub pitches_in_long_abs: usize,
    pub takes_analyzed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatterInfluence {
    pub batter_id: u32,
    pub batter_name: String,
    pub influence_analysis: InfluenceOutcome,
    pub zone_analysis: ZoneAnalysis,
    pub batter_stats: BatterStats,
    pub data_summary: DataSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatterFailure {
    pub batter_id: u32,
    pub batter_name: String,
    pub error: AnalysisError,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CohortEntry {
    Analyzed(BatterInfluence),
    Failed(BatterFailure),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortAggregate {
    pub average_coefficient: f64,
    pub coefficient_std: f64,
    pub average_odds_ratio: f64,
    pub coefficients: Vec<f64>,
    pub n_freeswingers: usize,
    pub n_patient_batters: usize,
    pub overall_interpretation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedReason {
    pub batter_id: u32,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortSummary {
    pub batters_analyzed: usize,
    pub successful_analyses: usize,
    pub failed_analyses: usize,
    pub failed_reasons: Vec<FailedReason>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceCohortResult {
    pub individual_results: Vec<CohortEntry>,
    pub aggregate_analysis: Option<CohortAggregate>,
    pub summary: CohortSummary,
}

/// Mean and population standard deviation of the per-batter coefficients.
/// Batters without a fitted regression are left out.
pub fn aggregate(results: &[&BatterInfluence]) -> Option<CohortAggregate> {
    let fitted: Vec<(&InfluenceRegression, &BatterStats)> = results
        .iter()
        .filter_map(|r| r.influence_analysis.regression().map(|reg| (reg, &r.batter_stats)))
        .collect();
    if fitted.is_empty() {
        return None;
    }
    let n = fitted.len() as f64;
    let coefficients: Vec<f64> = fitted.iter().map(|(reg, _)| reg.swing_rate_coefficient).collect();
    let mean = coefficients.iter().sum::<f64>() / n;
    let std = (coefficients.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n).sqrt();
    let mean_odds = fitted.iter().map(|(reg, _)| reg.odds_ratio).sum::<f64>() / n;

    Some(CohortAggregate {
        average_coefficient: round_to(mean, 4),
        coefficient_std: round_to(std, 4),
        average_odds_ratio: round_to(mean_odds, 4),
        coefficients,
        n_freeswingers: fitted.iter().filter(|(_, s)| s.is_freeswinger).count(),
        n_patient_batters: fitted.iter().filter(|(_, s)| s.is_patient).count(),
        overall_interpretation: interpret_aggregate(mean),
    })
}

pub fn interpret_aggregate(mean_coef: f64) -> String {
    if mean_coef.abs() < MINIMAL_COEFFICIENT {
        "Across batters analyzed, there is minimal evidence that umpires are influenced by batter swing behavior."
            .to_string()
    } else if mean_coef < -MINIMAL_COEFFICIENT {
        "Across batters analyzed, there is evidence supporting the 'freeswinger effect': \
         when batters with higher swing tendencies take pitches, umpires may be more likely to call them balls."
            .to_string()
    } else {
        "Across batters analyzed, there is evidence that batters with higher swing tendencies \
         see more called strikes, contrary to the 'freeswinger effect' hypothesis."
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CohortSelection {
    Batters(Vec<u32>),
    TopByPitches(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EligibleBatter {
    pub batter_id: u32,
    pub name: String,
    pub long_at_bats: usize,
    pub total_pitches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfluenceStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub total_pitches: usize,
    pub has_at_bat_number: bool,
    pub has_pitch_number: bool,
}

pub fn influence_status(table: &PitchTable) -> InfluenceStatus {
    let cols = table.columns();
    let has_at_bat = cols.has(Column::AtBatNumber);
    let has_pitch = cols.has(Column::PitchNumber);
    let reason = if table.is_empty() {
        Some("No data loaded".to_string())
    } else if let Err(e) = cols.require(&AT_BAT_TRACKING) {
        Some(e.to_string())
    } else {
        None
    };
    InfluenceStatus {
        available: reason.is_none(),
        reason,
        total_pitches: table.len(),
        has_at_bat_number: has_at_bat,
        has_pitch_number: has_pitch,
    }
}

pub struct InfluenceAnalyzer<'a> {
    cfg: &'a AnalysisConfig,
    names: &'a dyn NameLookup,
}

impl<'a> InfluenceAnalyzer<'a> {
    pub fn new(cfg: &'a AnalysisConfig, names: &'a dyn NameLookup) -> Self {
        Self { cfg, names }
    }

    pub fn analyze_batter(&self, table: &PitchTable, batter_id: u32) -> AnalysisResult<BatterInfluence> {
        table.columns().require(&AT_BAT_TRACKING)?;
        let th = &self.cfg.thresholds;

        let records = table.batter_records(batter_id);
        if records.is_empty() {
            return Err(AnalysisError::insufficient(Requirement::BatterPitches, 1, 0));
        }
        info!("analyzing batter {} ({} pitches)", batter_id, records.len());

        let history = SwingHistory::build(&records, th.min_long_at_bat_pitches);
        if history.untracked() > 0 {
            debug!(
                "batter {}: {} pitches lack plate-appearance tracking",
                batter_id,
                history.untracked()
            );
        }
        if history.long_count() == 0 {
            return Err(AnalysisError::insufficient(Requirement::LongAtBats, 1, 0));
        }

        let takes = history.takes();
        if takes.len() < th.min_regression_takes {
            return Err(AnalysisError::insufficient(
                Requirement::Takes,
                th.min_regression_takes,
                takes.len(),
            ));
        }

        let observations: Vec<TakeObservation> = takes
            .iter()
            .filter(|t| t.has_history())
            .map(|t| TakeObservation::from(*t))
            .collect();
        let influence = match fit_influence(&observations, th.min_regression_takes, &self.cfg.logistic) {
            Ok(regression) => InfluenceOutcome::Fitted(regression),
            Err(error @ AnalysisError::NumericalFitFailure { .. }) => {
                warn!("batter {batter_id}: {error}; reporting without regression");
                InfluenceOutcome::Unfitted {
                    error,
                    takes_analyzed: observations.len(),
                }
            }
            Err(error) => return Err(error),
        };

        Ok(BatterInfluence {
            batter_id,
            batter_name: self.names.display_name(batter_id),
            influence_analysis: influence,
            zone_analysis: self.zone_analysis(&takes),
            batter_stats: batter_stats(&records, &history, &self.cfg.tendency),
            data_summary: DataSummary {
                total_pitches: records.len(),
                total_at_bats: history.total_appearances(),
                long_at_bats: history.long_count(),
                pitches_in_long_abs: history.pitch_count(),
                takes_analyzed: observations.len(),
            },
        })
    }

    pub fn zone_analysis(&self, takes: &[&TrackedPitch<'_>]) -> ZoneAnalysis {
        let th = &self.cfg.thresholds;
        let zone_mid = ZoneBounds::mean_of(takes.iter().map(|t| t.record)).mid();

        let mut zone_distribution = BTreeMap::new();
        for t in takes {
            let label = classify_zone(t.record.plate_x, t.record.plate_z, zone_mid);
            *zone_distribution.entry(label).or_insert(0) += 1;
        }

        let edge_takes: Vec<&TrackedPitch<'_>> = takes
            .iter()
            .copied()
            .filter(|t| is_edge(t.record.plate_x, t.record.plate_z, t.record.sz_top, t.record.sz_bot))
            .collect();
        let edge = (edge_takes.len() >= th.min_edge_takes).then(|| EdgeAnalysis {
            count: edge_takes.len(),
            outcome: match median_split(&edge_takes, th.min_edge_split_takes, th.min_edge_group) {
                Ok(split) => EdgeOutcome::Split(split),
                Err(error) => EdgeOutcome::Insufficient { error },
            },
        });

        ZoneAnalysis {
            edge,
            zone_distribution,
        }
    }

    pub fn analyze_cohort(&self, table: &PitchTable, selection: &CohortSelection) -> InfluenceCohortResult {
        let batter_ids = match selection {
            CohortSelection::Batters(ids) => ids.clone(),
            CohortSelection::TopByPitches(n) => table.top_batters(*n),
        };

        let individual_results: Vec<CohortEntry> = batter_ids
            .iter()
            .map(|&id| match self.analyze_batter(table, id) {
                Ok(result) => CohortEntry::Analyzed(result),
                Err(error) => {
                    warn!("batter {id}: {error}");
                    CohortEntry::Failed(BatterFailure {
                        batter_id: id,
                        batter_name: self.names.display_name(id),
                        message: error.to_string(),
                        error,
                    })
                }
            })
            .collect();

        let successes: Vec<&BatterInfluence> = individual_results
            .iter()
            .filter_map(|e| match e {
                CohortEntry::Analyzed(r) => Some(r),
                CohortEntry::Failed(_) => None,
            })
            .collect();
        let failed_reasons: Vec<FailedReason> = individual_results
            .iter()
            .filter_map(|e| match e {
                CohortEntry::Failed(f) => Some(FailedReason {
                    batter_id: f.batter_id,
                    error: f.message.clone(),
                }),
                CohortEntry::Analyzed(_) => None,
            })
            .collect();

        let aggregate_analysis = aggregate(&successes);
        let summary = CohortSummary {
            batters_analyzed: batter_ids.len(),
            successful_analyses: successes.len(),
            failed_analyses: failed_reasons.len(),
            failed_reasons,
        };
        info!(
            "cohort analysis: {} batters, {} ok, {} failed",
            summary.batters_analyzed, summary.successful_analyses, summary.failed_analyses
        );

        InfluenceCohortResult {
            individual_results,
            aggregate_analysis,
            summary,
        }
    }

    /// Batters with at least `min_long_abs` long at-bats, most first.
    pub fn available_batters(&self, table: &PitchTable, min_long_abs: usize) -> AnalysisResult<Vec<EligibleBatter>> {
        table
            .columns()
            .require(&[Column::GamePk, Column::AtBatNumber])?;
        let min_pitches = self.cfg.thresholds.min_long_at_bat_pitches;

        let mut appearance_sizes: HashMap<(u32, u64, u32), usize> = HashMap::new();
        for r in table.records() {
            if let Some(pa) = r.plate_appearance() {
                *appearance_sizes.entry((r.batter_id, pa.game_id, pa.at_bat)).or_insert(0) += 1;
            }
        }
        let mut long_by_batter: HashMap<u32, usize> = HashMap::new();
        for ((batter, _, _), size) in appearance_sizes {
            if size >= min_pitches {
                *long_by_batter.entry(batter).or_insert(0) += 1;
            }
        }
        let totals = table.pitch_counts_by_batter();

        let mut out: Vec<EligibleBatter> = long_by_batter
            .into_iter()
            .filter(|&(_, long)| long >= min_long_abs)
            .map(|(id, long)| EligibleBatter {
                batter_id: id,
                name: self.names.display_name(id),
                long_at_bats: long,
                total_pitches: totals.get(&id).copied().unwrap_or(0),
            })
            .collect();
        out.sort_by(|a, b| b.long_at_bats.cmp(&a.long_at_bats).then(a.batter_id.cmp(&b.batter_id)));
        Ok(out)
    }
}
