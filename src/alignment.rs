//! Alignment Scorer: overlap and divergence between zone surfaces, reduced to
//! a single composite score.

use serde::Serialize;

use crate::config::AnalysisConfig;
use crate::grid::{Grid, Surface};
use crate::pitch::PitchRecord;
use crate::zone::{SurfaceProvenance, ZoneBounds, ZoneModeler, ZoneModels, PLATE_WIDTH};

const IOU_THRESHOLD: f64 = 0.5;

/// Centroid reported for an all-zero surface: plate center, mid-zone height.
pub const SENTINEL_CENTROID: Centroid = Centroid { x: 0.0, z: 2.5 };

/// Intersection over union of the cells at or above 0.5. Zero for an empty union.
pub fn iou(a: &Surface, b: &Surface) -> f64 {
    let (mut inter, mut union) = (0usize, 0usize);
    for (&va, &vb) in a.values().iter().zip(b.values()) {
        let ia = va >= IOU_THRESHOLD;
        let ib = vb >= IOU_THRESHOLD;
        if ia && ib {
            inter += 1;
        }
        if ia || ib {
            union += 1;
        }
    }
    if union == 0 {
        0.0
    } else {
        inter as f64 / union as f64
    }
}

/// Mean absolute per-cell difference.
pub fn divergence(a: &Surface, b: &Surface) -> f64 {
    let n = a.values().len();
    if n == 0 {
        return 0.0;
    }
    a.values()
        .iter()
        .zip(b.values())
        .map(|(x, y)| (x - y).abs())
        .sum::<f64>()
        / n as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Centroid {
    pub x: f64,
    pub z: f64,
}

/// Surface-weighted mean grid coordinate.
pub fn centroid(surface: &Surface, grid: &Grid) -> Centroid {
    let total = surface.sum();
    if total == 0.0 {
        return SENTINEL_CENTROID;
    }
    let (mut sx, mut sz) = (0.0, 0.0);
    for ((x, z), w) in grid.points().zip(surface.values()) {
        sx += w * x;
        sz += w * z;
    }
    Centroid {
        x: round_to(sx / total, 3),
        z: round_to(sz / total, 3),
    }
}

/// Correction for batter-driven bias in the umpire's calls. At the aggregate
/// level no influence is detectable, so the correction is zero.
pub fn influence_bias(_takes: &[&PitchRecord], _swings: &[&PitchRecord]) -> f64 {
    0.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Centroids {
    pub textbook: Centroid,
    pub umpire: Centroid,
    pub batter: Centroid,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PitchCounts {
    pub total: usize,
    pub takes: usize,
    pub swings: usize,
    pub called_strikes: usize,
    pub balls: usize,
    pub unclassified: usize,
}

impl PitchCounts {
    pub fn tally(records: &[PitchRecord]) -> Self {
        let mut c = PitchCounts {
            total: records.len(),
            ..Default::default()
        };
        for r in records {
            let d = &r.description;
            if d.is_take() {
                c.takes += 1;
                if d.is_called_strike() {
                    c.called_strikes += 1;
                }
                if d.is_ball() {
                    c.balls += 1;
                }
            } else if d.is_swing() {
                c.swings += 1;
            } else {
                c.unclassified += 1;
            }
        }
        c
    }
}

/// How the two empirical surfaces were produced.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct ModelProvenance {
    pub umpire: SurfaceProvenance,
    pub batter: SurfaceProvenance,
}

impl ModelProvenance {
    fn of(models: &ZoneModels) -> Self {
        Self {
            umpire: models.umpire.provenance(),
            batter: models.batter.provenance(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlignmentResult {
    pub score: f64,
    pub iou_textbook_umpire: f64,
    pub iou_textbook_batter: f64,
    pub iou_umpire_batter: f64,
    pub divergence_umpire: f64,
    pub divergence_batter: f64,
    pub influence_bias: f64,
    pub centroids: Centroids,
    pub zone_bounds: ZoneBounds,
    pub counts: PitchCounts,
    pub models: ModelProvenance,
    pub interpretation: String,
}

pub fn calculate_alignment(records: &[PitchRecord], cfg: &AnalysisConfig) -> AlignmentResult {
    let models = ZoneModeler::new(cfg).model(records);
    score_models(&models, records)
}

pub fn score_models(models: &ZoneModels, records: &[PitchRecord]) -> AlignmentResult {
    let textbook = &models.textbook;
    let umpire = models.umpire.surface();
    let batter = models.batter.surface();

    let iou_tu = iou(textbook, umpire);
    let iou_tb = iou(textbook, batter);
    let iou_ub = iou(umpire, batter);

    let takes: Vec<&PitchRecord> = records.iter().filter(|r| r.is_take()).collect();
    let swings: Vec<&PitchRecord> = records.iter().filter(|r| r.is_swing()).collect();
    let bias = influence_bias(&takes, &swings);

    let score = (iou_tu + iou_tb + iou_ub) / 3.0 * (1.0 - bias.abs());

    AlignmentResult {
        score: round_to(score, 4),
        iou_textbook_umpire: round_to(iou_tu, 4),
        iou_textbook_batter: round_to(iou_tb, 4),
        iou_umpire_batter: round_to(iou_ub, 4),
        divergence_umpire: round_to(divergence(textbook, umpire), 4),
        divergence_batter: round_to(divergence(textbook, batter), 4),
        influence_bias: round_to(bias, 4),
        centroids: Centroids {
            textbook: centroid(textbook, &models.grid),
            umpire: centroid(umpire, &models.grid),
            batter: centroid(batter, &models.grid),
        },
        zone_bounds: ZoneBounds {
            sz_top: round_to(models.bounds.sz_top, 3),
            sz_bot: round_to(models.bounds.sz_bot, 3),
        },
        counts: PitchCounts::tally(records),
        models: ModelProvenance::of(models),
        interpretation: interpret(score, iou_tu, iou_tb),
    }
}

pub fn interpret(score: f64, iou_umpire: f64, iou_batter: f64) -> String {
    let band = if score >= 0.8 {
        "Excellent zone alignment - all three zones are highly consistent."
    } else if score >= 0.6 {
        "Good zone alignment - moderate consistency across zones."
    } else if score >= 0.4 {
        "Fair zone alignment - some divergence between zones."
    } else {
        "Poor zone alignment - significant divergence between zones."
    };
    let closer = if iou_umpire > iou_batter {
        "Umpire zone aligns better with textbook than batter zone."
    } else {
        "Batter zone aligns better with textbook than umpire zone."
    };
    format!("{band} {closer}")
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SurfaceBounds {
    pub sz_top: f64,
    pub sz_bot: f64,
    pub plate_left: f64,
    pub plate_right: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TakeLocations {
    pub x: Vec<f64>,
    pub z: Vec<f64>,
    pub is_strike: Vec<bool>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SwingLocations {
    pub x: Vec<f64>,
    pub z: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitchLocations {
    pub takes: TakeLocations,
    pub swings: SwingLocations,
}

/// Everything a heatmap overlay needs.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ZoneSurfaceResult {
    pub x_values: Vec<f64>,
    pub z_values: Vec<f64>,
    pub textbook_zone: Vec<Vec<f64>>,
    pub umpire_zone: Vec<Vec<f64>>,
    pub batter_zone: Vec<Vec<f64>>,
    pub zone_bounds: SurfaceBounds,
    pub pitch_locations: PitchLocations,
    pub models: ModelProvenance,
}

pub fn zone_surfaces(records: &[PitchRecord], cfg: &AnalysisConfig) -> ZoneSurfaceResult {
    let models = ZoneModeler::new(cfg).model(records);

    let mut takes = TakeLocations {
        x: Vec::new(),
        z: Vec::new(),
        is_strike: Vec::new(),
    };
    let mut swings = SwingLocations {
        x: Vec::new(),
        z: Vec::new(),
    };
    for r in records {
        if r.is_take() {
            takes.x.push(r.plate_x);
            takes.z.push(r.plate_z);
            takes.is_strike.push(r.is_called_strike());
        } else if r.is_swing() {
            swings.x.push(r.plate_x);
            swings.z.push(r.plate_z);
        }
    }

    ZoneSurfaceResult {
        x_values: models.grid.x.clone(),
        z_values: models.grid.z.clone(),
        textbook_zone: models.textbook.to_rows(),
        umpire_zone: models.umpire.surface().to_rows(),
        batter_zone: models.batter.surface().to_rows(),
        zone_bounds: SurfaceBounds {
            sz_top: round_to(models.bounds.sz_top, 3),
            sz_bot: round_to(models.bounds.sz_bot, 3),
            plate_left: -PLATE_WIDTH / 2.0,
            plate_right: PLATE_WIDTH / 2.0,
        },
        pitch_locations: PitchLocations { takes, swings },
        models: ModelProvenance::of(&models),
    }
}

pub fn round_to(v: f64, digits: i32) -> f64 {
    let p = 10f64.powi(digits);
    (v * p).round() / p
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surf(values: &[f64]) -> Surface {
        Surface::from_values(values.len(), 1, values.to_vec())
    }

    #[test]
    fn iou_of_surface_with_itself_is_one() {
        let a = surf(&[0.9, 0.6, 0.1, 0.5]);
        assert_eq!(iou(&a, &a), 1.0);
    }

    #[test]
    fn iou_is_symmetric() {
        let a = surf(&[0.9, 0.6, 0.1, 0.5, 0.0]);
        let b = surf(&[0.2, 0.7, 0.8, 0.5, 0.0]);
        assert_eq!(iou(&a, &b), iou(&b, &a));
        assert!((iou(&a, &b) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn iou_of_empty_union_is_zero() {
        let a = surf(&[0.1, 0.2]);
        assert_eq!(iou(&a, &a), 0.0);
    }

    #[test]
    fn divergence_is_mean_abs_difference() {
        let a = surf(&[1.0, 0.0, 0.5]);
        let b = surf(&[0.0, 0.0, 0.25]);
        assert!((divergence(&a, &b) - 1.25 / 3.0).abs() < 1e-12);
        assert_eq!(divergence(&a, &a), 0.0);
    }

    #[test]
    fn centroid_of_zero_surface_is_sentinel() {
        let grid = Grid::new(&Default::default());
        assert_eq!(centroid(&grid.zeros(), &grid), SENTINEL_CENTROID);
    }

    #[test]
    fn centroid_of_symmetric_surface_is_centered() {
        let grid = Grid::new(&Default::default());
        let s = grid.surface_from(|x, z| if x.abs() < 0.5 && (z - 2.75).abs() < 0.5 { 1.0 } else { 0.0 });
        let c = centroid(&s, &grid);
        assert!(c.x.abs() < 1e-3);
        assert!((c.z - 2.75).abs() < 0.05);
    }

    #[test]
    fn interpretation_bands() {
        assert!(interpret(0.85, 0.9, 0.8).starts_with("Excellent"));
        assert!(interpret(0.65, 0.9, 0.8).starts_with("Good"));
        assert!(interpret(0.45, 0.9, 0.8).starts_with("Fair"));
        assert!(interpret(0.1, 0.2, 0.8).starts_with("Poor"));
        assert!(interpret(0.1, 0.2, 0.8).ends_with("Batter zone aligns better with textbook than umpire zone."));
        assert!(interpret(0.1, 0.9, 0.8).ends_with("Umpire zone aligns better with textbook than batter zone."));
    }

    #[test]
    fn round_to_digits() {
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(2.0004, 3), 2.0);
    }

    #[test]
    fn hit_by_pitch_is_counted_but_neither_take_nor_swing() {
        use crate::pitch::{Description, Umpire};

        let row = |x: f64, z: f64, desc: &str| PitchRecord {
            batter_id: 1,
            pitcher_id: None,
            game_id: Some(1),
            game_date: None,
            at_bat: Some(1),
            pitch_seq: Some(1),
            side: None,
            umpire: Umpire::unknown(),
            plate_x: x,
            plate_z: z,
            sz_top: 3.5,
            sz_bot: 1.5,
            description: Description::parse(desc),
        };
        let mut recs = vec![
            row(0.0, 2.5, "called_strike"),
            row(1.5, 2.5, "ball"),
            row(0.2, 2.8, "swinging_strike"),
            row(-0.3, 2.2, "foul"),
        ];
        let mut cfg = AnalysisConfig::default();
        cfg.fallback_noise.seed = Some(7);
        let before = calculate_alignment(&recs, &cfg);

        recs.push(row(-1.2, 2.0, "hit_by_pitch"));
        let after = calculate_alignment(&recs, &cfg);

        assert_eq!(after.counts.total, 5);
        assert_eq!(after.counts.unclassified, 1);
        assert_eq!(after.counts.takes, before.counts.takes);
        assert_eq!(after.counts.swings, before.counts.swings);
        assert_eq!(after.counts.takes, 2);
        assert_eq!(after.counts.swings, 2);
        assert_eq!(after.influence_bias, before.influence_bias);
    }
}
