use std::collections::BTreeMap;

use crate::pitch::{PitchRecord, PlateAppearanceId};

/// Prior swing rate assigned to the first pitch of a plate appearance.
pub const NO_HISTORY_RATE: f64 = 0.5;

/// Swing rate over strictly earlier pitches, position by position.
///
/// The first entry is always [`NO_HISTORY_RATE`]; entry `k` (0-based, `k > 0`)
/// is the number of swings among `swings[..k]` divided by `k`.
pub fn prior_swing_rates(swings: &[bool]) -> Vec<f64> {
    let mut out = Vec::with_capacity(swings.len());
    let mut seen = 0usize;
    for (k, &swung) in swings.iter().enumerate() {
        out.push(if k == 0 {
            NO_HISTORY_RATE
        } else {
            seen as f64 / k as f64
        });
        if swung {
            seen += 1;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackedPitch<'a> {
    pub record: &'a PitchRecord,
    /// 1-based rank within the plate appearance.
    pub pitch_in_ab: usize,
    pub prior_swing_rate: f64,
}

impl TrackedPitch<'_> {
    pub fn has_history(&self) -> bool {
        self.pitch_in_ab > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlateAppearance<'a> {
    pub id: PlateAppearanceId,
    pub pitches: Vec<TrackedPitch<'a>>,
}

/// Plate appearances of one batch, with the prior swing rate attached to every
/// pitch of the long ones.
#[derive(Debug, Clone)]
pub struct SwingHistory<'a> {
    long: Vec<PlateAppearance<'a>>,
    total_appearances: usize,
    untracked: usize,
}

impl<'a> SwingHistory<'a> {
    /// Group records into plate appearances, order each by pitch sequence
    /// (stable on ties), keep those with at least `min_pitches` pitches.
    /// Records without a game, at-bat or pitch number are skipped.
    pub fn build(records: &[&'a PitchRecord], min_pitches: usize) -> Self {
        let mut groups: BTreeMap<PlateAppearanceId, Vec<&'a PitchRecord>> = BTreeMap::new();
        let mut untracked = 0;
        for &rec in records {
            match (rec.plate_appearance(), rec.pitch_seq) {
                (Some(id), Some(_)) => groups.entry(id).or_default().push(rec),
                _ => untracked += 1,
            }
        }

        let total_appearances = groups.len();
        let long = groups
            .into_iter()
            .filter(|(_, pitches)| pitches.len() >= min_pitches)
            .map(|(id, mut pitches)| {
                pitches.sort_by_key(|r| r.pitch_seq);
                let swings: Vec<bool> = pitches.iter().map(|r| r.is_swing()).collect();
                let rates = prior_swing_rates(&swings);
                let pitches = pitches
                    .into_iter()
                    .zip(rates)
                    .enumerate()
                    .map(|(i, (record, prior_swing_rate))| TrackedPitch {
                        record,
                        pitch_in_ab: i + 1,
                        prior_swing_rate,
                    })
                    .collect();
                PlateAppearance { id, pitches }
            })
            .collect();

        Self {
            long,
            total_appearances,
            untracked,
        }
    }

    pub fn long_appearances(&self) -> &[PlateAppearance<'a>] {
        &self.long
    }

    pub fn long_count(&self) -> usize {
        self.long.len()
    }

    pub fn total_appearances(&self) -> usize {
        self.total_appearances
    }

    /// Records that could not be placed in a plate appearance.
    pub fn untracked(&self) -> usize {
        self.untracked
    }

    pub fn pitches(&self) -> impl Iterator<Item = &TrackedPitch<'a>> {
        self.long.iter().flat_map(|pa| pa.pitches.iter())
    }

    pub fn pitch_count(&self) -> usize {
        self.long.iter().map(|pa| pa.pitches.len()).sum()
    }

    pub fn takes(&self) -> Vec<&TrackedPitch<'a>> {
        self.pitches().filter(|p| p.record.is_take()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pitch::{Description, Umpire};

    fn pitch(at_bat: u32, seq: u32, desc: Description) -> PitchRecord {
        PitchRecord {
            batter_id: 1,
            pitcher_id: None,
            game_id: Some(100),
            game_date: None,
            at_bat: Some(at_bat),
            pitch_seq: Some(seq),
            side: None,
            umpire: Umpire::unknown(),
            plate_x: 0.0,
            plate_z: 2.5,
            sz_top: 3.5,
            sz_bot: 1.5,
            description: desc,
        }
    }

    #[test]
    fn first_pitch_is_neutral() {
        assert_eq!(prior_swing_rates(&[true]), vec![0.5]);
        assert_eq!(prior_swing_rates(&[]), Vec::<f64>::new());
    }

    #[test]
    fn rates_use_only_earlier_pitches() {
        // swings at positions 2 and 4
        let rates = prior_swing_rates(&[false, true, false, true, false]);
        assert_eq!(rates[0], 0.5);
        assert_eq!(rates[1], 0.0);
        assert_eq!(rates[2], 0.5);
        assert!((rates[3] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(rates[4], 0.5);
    }

    #[test]
    fn orders_by_sequence_and_filters_short_appearances() {
        let recs = vec![
            pitch(1, 3, Description::Ball),
            pitch(1, 1, Description::Foul),
            pitch(1, 2, Description::Ball),
            pitch(1, 4, Description::CalledStrike),
            pitch(2, 1, Description::Ball),
            pitch(2, 2, Description::HitIntoPlay),
        ];
        let refs: Vec<&PitchRecord> = recs.iter().collect();
        let history = SwingHistory::build(&refs, 4);
        assert_eq!(history.total_appearances(), 2);
        assert_eq!(history.long_count(), 1);
        let pa = &history.long_appearances()[0];
        let seqs: Vec<u32> = pa.pitches.iter().map(|p| p.record.pitch_seq.unwrap()).collect();
        assert_eq!(seqs, vec![1, 2, 3, 4]);
        let rates: Vec<f64> = pa.pitches.iter().map(|p| p.prior_swing_rate).collect();
        assert_eq!(rates, vec![0.5, 1.0, 0.5, 1.0 / 3.0]);
        assert_eq!(history.takes().len(), 3);
    }

    #[test]
    fn untracked_records_are_counted() {
        let mut r = pitch(1, 1, Description::Ball);
        r.at_bat = None;
        let history = SwingHistory::build(&[&r], 1);
        assert_eq!(history.untracked(), 1);
        assert_eq!(history.total_appearances(), 0);
    }

    #[test]
    fn current_pitch_never_feeds_its_own_rate() {
        let all_swings = prior_swing_rates(&[true; 6]);
        let no_swings = prior_swing_rates(&[false; 6]);
        assert_eq!(all_swings[0], no_swings[0]);
        assert!(all_swings[1..].iter().all(|&r| r == 1.0));
        assert!(no_swings[1..].iter().all(|&r| r == 0.0));
    }
}
