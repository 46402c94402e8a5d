/// End-to-end checks for alignment scoring and swing-influence analysis
///
/// Run with: cargo test --test integration_tests -- --nocapture

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::{BTreeMap, HashMap};

use szas_backend::alignment::iou;
use szas_backend::history::SwingHistory;
use szas_backend::influence::{
    aggregate, fit_influence, BatterInfluence, BatterStats, DataSummary, InfluenceDirection,
    InfluenceOutcome, InfluenceRegression, TakeObservation, ZoneAnalysis, MINIMAL_COEFFICIENT,
};
use szas_backend::pitch::{BatSide, Description, Umpire};
use szas_backend::zone::{textbook_surface, SurfaceSource, ZoneBounds, ZoneModeler};
use szas_backend::{
    calculate_alignment, AnalysisConfig, AnalysisError, CohortSelection, InfluenceAnalyzer,
    PitchRecord, PitchTable, Requirement,
};

const ZONE_X: f64 = 17.0 / 24.0 + 1.45 / 12.0;
const ZONE_BOT: f64 = 1.5 - 1.45 / 12.0;
const ZONE_TOP: f64 = 3.5 + 1.45 / 12.0;

fn pitch(batter: u32, game: u64, at_bat: u32, seq: u32, x: f64, z: f64, desc: Description) -> PitchRecord {
    PitchRecord {
        batter_id: batter,
        pitcher_id: Some(500),
        game_id: Some(game),
        game_date: Some("2024-06-01".into()),
        at_bat: Some(at_bat),
        pitch_seq: Some(seq),
        side: Some(BatSide::R),
        umpire: Umpire {
            id: 11,
            name: "Test Umpire".into(),
        },
        plate_x: x,
        plate_z: z,
        sz_top: 3.5,
        sz_bot: 1.5,
        description: desc,
    }
}

fn in_textbook_zone(x: f64, z: f64) -> bool {
    x.abs() <= ZONE_X && (ZONE_BOT..=ZONE_TOP).contains(&z)
}

fn scenario_a_records(seed: u64) -> Vec<PitchRecord> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut recs = Vec::new();
    let mut ab = 0;
    while recs.len() < 200 {
        let x = rng.gen_range(-ZONE_X..ZONE_X);
        let z = rng.gen_range(ZONE_BOT..ZONE_TOP);
        ab += 1;
        recs.push(pitch(1, 1, ab, 1, x, z, Description::CalledStrike));
    }
    while recs.len() < 400 {
        let x = rng.gen_range(-1.5..1.5);
        let z = rng.gen_range(1.0..4.5);
        if in_textbook_zone(x, z) {
            continue;
        }
        ab += 1;
        recs.push(pitch(1, 1, ab, 1, x, z, Description::Ball));
    }
    recs
}

fn influence_stub(batter_id: u32, coef: f64) -> BatterInfluence {
    BatterInfluence {
        batter_id,
        batter_name: format!("Player {batter_id}"),
        influence_analysis: InfluenceOutcome::Fitted(InfluenceRegression {
            baseline_accuracy: 0.75,
            swing_model_accuracy: 0.75,
            accuracy_improvement: 0.0,
            swing_rate_coefficient: coef,
            odds_ratio: coef.exp(),
            influence_direction: if coef > 0.0 {
                InfluenceDirection::Positive
            } else {
                InfluenceDirection::Negative
            },
            takes_analyzed: 40,
            interpretation: String::new(),
        }),
        zone_analysis: ZoneAnalysis {
            edge: None,
            zone_distribution: BTreeMap::new(),
        },
        batter_stats: BatterStats {
            overall_swing_rate: 0.5,
            long_ab_swing_rate: 0.5,
            total_swings: 20,
            total_takes: 20,
            is_freeswinger: false,
            is_patient: false,
        },
        data_summary: DataSummary {
            total_pitches: 40,
            total_at_bats: 10,
            long_at_bats: 10,
            pitches_in_long_abs: 40,
            takes_analyzed: 20,
        },
    }
}

/// Long at-bats where swings and calls both depend only on location.
fn realistic_batter(batter: u32, at_bats: u32, rng: &mut StdRng) -> Vec<PitchRecord> {
    let mut recs = Vec::new();
    for ab in 1..=at_bats {
        for seq in 1..=6 {
            let x = rng.gen_range(-1.4..1.4);
            let z = rng.gen_range(1.1..4.3);
            let inside = in_textbook_zone(x, z);
            let desc = if rng.gen_bool(if inside { 0.6 } else { 0.25 }) {
                if rng.gen_bool(0.5) {
                    Description::Foul
                } else {
                    Description::SwingingStrike
                }
            } else if rng.gen_bool(if inside { 0.85 } else { 0.1 }) {
                Description::CalledStrike
            } else {
                Description::Ball
            };
            recs.push(pitch(batter, 7, ab, seq, x, z, desc));
        }
    }
    recs
}

#[test]
fn test_umpire_surface_tracks_textbook_zone() {
    println!("\n=== Test: Umpire Surface Tracks Textbook Zone ===");
    let cfg = AnalysisConfig::default();
    let recs = scenario_a_records(7);
    let models = ZoneModeler::new(&cfg).model(&recs);

    assert!(models.umpire.is_fitted(), "umpire surface should come from the classifier");
    let overlap = iou(&models.textbook, models.umpire.surface());
    println!("✓ IoU(textbook, umpire) = {:.3}", overlap);
    assert!(overlap > 0.7, "umpire surface should track the textbook zone, got {overlap}");
}

#[test]
fn test_alignment_result_on_synthetic_takes() {
    println!("\n=== Test: Alignment Result ===");
    let cfg = AnalysisConfig::default();
    let recs = scenario_a_records(11);
    let result = calculate_alignment(&recs, &cfg);

    assert_eq!(result.counts.takes, 400);
    assert_eq!(result.counts.swings, 0);
    assert_eq!(result.models.umpire.source, SurfaceSource::Fitted);
    // no swings at all, so the batter surface must be the blurred fallback
    assert_eq!(result.models.batter.source, SurfaceSource::Fallback);
    assert!(result.iou_textbook_umpire > 0.7);
    assert!(!result.interpretation.is_empty());
    println!("✓ score={:.4} interpretation={}", result.score, result.interpretation);
}

#[test]
fn test_surfaces_share_shape_and_textbook_ignores_pitches() {
    println!("\n=== Test: Surface Shapes ===");
    let cfg = AnalysisConfig::default();
    let modeler = ZoneModeler::new(&cfg);

    let a = modeler.model(&scenario_a_records(1));
    let b = modeler.model(&scenario_a_records(2));
    let shape = a.textbook.shape();
    assert_eq!(a.umpire.surface().shape(), shape);
    assert_eq!(a.batter.surface().shape(), shape);
    assert_eq!(a.grid.x, b.grid.x);
    assert_eq!(a.grid.z, b.grid.z);

    // identical bounds, different samples
    assert_eq!(a.textbook, b.textbook);
    let direct = textbook_surface(modeler.grid(), ZoneBounds::mean_of(&[] as &[PitchRecord]));
    assert_eq!(a.textbook, direct);
    println!("✓ shape {:?}", shape);
}

#[test]
fn test_iou_identity_and_symmetry() {
    let cfg = AnalysisConfig::default();
    let models = ZoneModeler::new(&cfg).model(&scenario_a_records(3));
    let t = &models.textbook;
    let u = models.umpire.surface();
    assert_eq!(iou(t, t), 1.0);
    assert_eq!(iou(u, u), 1.0);
    assert_eq!(iou(t, u), iou(u, t));
}

#[test]
fn test_prior_swing_rate_sequence() {
    println!("\n=== Test: Prior Swing Rates ===");
    // swings at pitches 2 and 4 of a five-pitch appearance
    let descs = [
        Description::Ball,
        Description::Foul,
        Description::Ball,
        Description::SwingingStrike,
        Description::CalledStrike,
    ];
    let recs: Vec<PitchRecord> = descs
        .iter()
        .enumerate()
        .map(|(i, d)| pitch(3, 1, 1, i as u32 + 1, 0.0, 2.5, d.clone()))
        .collect();
    let refs: Vec<&PitchRecord> = recs.iter().collect();
    let history = SwingHistory::build(&refs, 4);
    let rates: Vec<f64> = history.pitches().map(|p| p.prior_swing_rate).collect();

    assert_eq!(rates.len(), 5);
    assert_eq!(rates[0], 0.5);
    assert_eq!(rates[1], 0.0);
    assert_eq!(rates[2], 0.5);
    assert!((rates[3] - 1.0 / 3.0).abs() < 1e-12);
    println!("✓ rates {:?}", rates);
}

#[test]
fn test_eligible_batters_excludes_thin_samples() {
    println!("\n=== Test: Eligible Batters ===");
    let mut rng = StdRng::seed_from_u64(5);
    // 30 pitches in five long at-bats
    let mut recs = realistic_batter(20, 5, &mut rng);
    recs.extend(realistic_batter(21, 12, &mut rng));
    let table = PitchTable::from_records(recs);
    let cfg = AnalysisConfig::default();
    let names: HashMap<u32, String> = [(21, "Deep Count".to_string())].into();

    let eligible = InfluenceAnalyzer::new(&cfg, &names)
        .available_batters(&table, 10)
        .unwrap();
    assert_eq!(eligible.len(), 1);
    assert_eq!(eligible[0].batter_id, 21);
    assert_eq!(eligible[0].name, "Deep Count");
    assert_eq!(eligible[0].long_at_bats, 12);
    assert_eq!(eligible[0].total_pitches, 72);
    println!("✓ {} eligible batter(s)", eligible.len());
}

#[test]
fn test_cohort_aggregate_minimal_band() {
    println!("\n=== Test: Cohort Aggregate ===");
    let a = influence_stub(1, 0.05);
    let b = influence_stub(2, -0.02);
    let c = influence_stub(3, 0.01);
    let agg = aggregate(&[&a, &b, &c]).unwrap();

    assert!((agg.average_coefficient - 0.0133).abs() < 1e-9);
    assert_eq!(agg.coefficients, vec![0.05, -0.02, 0.01]);
    assert!(agg.overall_interpretation.contains("minimal evidence"));
    println!("✓ mean={} std={}", agg.average_coefficient, agg.coefficient_std);
}

#[test]
fn test_null_influence_is_minimal() {
    println!("\n=== Test: Null Influence ===");
    let cfg = AnalysisConfig::default();
    let mut minimal = 0;
    for seed in 0..5u64 {
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        let takes: Vec<TakeObservation> = (0..40_000)
            .map(|_| TakeObservation {
                plate_x: rng.gen_range(-1.5..1.5),
                plate_z: rng.gen_range(1.0..4.5),
                prior_swing_rate: rng.gen_range(0.0..1.0),
                called_strike: rng.gen_bool(0.5),
            })
            .collect();
        let fit = fit_influence(&takes, cfg.thresholds.min_regression_takes, &cfg.logistic).unwrap();
        println!("  seed {}: coef={:.4}", seed, fit.swing_rate_coefficient);
        if fit.swing_rate_coefficient.abs() < MINIMAL_COEFFICIENT {
            minimal += 1;
        }
    }
    assert!(minimal >= 4, "expected minimal coefficients, got {minimal}/5");
    println!("✓ {minimal}/5 trials minimal");
}

#[test]
fn test_full_cohort_analysis() {
    println!("\n=== Test: Full Cohort ===");
    let mut rng = StdRng::seed_from_u64(42);
    let mut recs = realistic_batter(30, 60, &mut rng);
    recs.extend(realistic_batter(31, 60, &mut rng));
    // too few pitches to say anything
    recs.push(pitch(32, 9, 1, 1, 0.0, 2.5, Description::Ball));
    let table = PitchTable::from_records(recs);
    let cfg = AnalysisConfig::default();
    let names: HashMap<u32, String> = HashMap::new();
    let analyzer = InfluenceAnalyzer::new(&cfg, &names);

    let single = analyzer.analyze_batter(&table, 30).unwrap();
    assert_eq!(single.data_summary.total_pitches, 360);
    assert_eq!(single.data_summary.long_at_bats, 60);
    assert_eq!(single.data_summary.total_at_bats, 60);
    assert!(single.data_summary.takes_analyzed >= 20);
    let distributed: usize = single.zone_analysis.zone_distribution.values().sum();
    assert_eq!(distributed, single.batter_stats.total_takes);

    let result = analyzer.analyze_cohort(&table, &CohortSelection::Batters(vec![30, 31, 32]));
    assert_eq!(result.summary.batters_analyzed, 3);
    assert_eq!(result.summary.successful_analyses, 2);
    assert_eq!(result.summary.failed_analyses, 1);
    assert_eq!(result.summary.failed_reasons[0].batter_id, 32);
    let agg = result.aggregate_analysis.expect("two batters succeeded");
    assert_eq!(agg.coefficients.len(), 2);

    let top = analyzer.analyze_cohort(&table, &CohortSelection::TopByPitches(2));
    assert_eq!(top.summary.batters_analyzed, 2);
    assert_eq!(top.summary.successful_analyses, 2);
    println!("✓ cohort mean coefficient {:.4}", agg.average_coefficient);
}

#[test]
fn test_below_threshold_inputs_report_counts() {
    let cfg = AnalysisConfig::default();
    let takes = vec![
        TakeObservation {
            plate_x: 0.0,
            plate_z: 2.5,
            prior_swing_rate: 0.0,
            called_strike: false,
        };
        19
    ];
    assert_eq!(
        fit_influence(&takes, 20, &cfg.logistic).unwrap_err(),
        AnalysisError::insufficient(Requirement::RegressionTakes, 20, 19)
    );

    // four long at-bats with only one take each
    let mut recs = Vec::new();
    for ab in 1..=4 {
        recs.push(pitch(40, 1, ab, 1, 0.0, 2.5, Description::Ball));
        for seq in 2..=4 {
            recs.push(pitch(40, 1, ab, seq, 0.0, 2.5, Description::Foul));
        }
    }
    let table = PitchTable::from_records(recs);
    let names: HashMap<u32, String> = HashMap::new();
    let err = InfluenceAnalyzer::new(&cfg, &names)
        .analyze_batter(&table, 40)
        .unwrap_err();
    assert_eq!(err, AnalysisError::insufficient(Requirement::Takes, 20, 4));
}
