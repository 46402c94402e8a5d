//! Prepared pitch table plus the filters and listings the service exposes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{AnalysisError, AnalysisResult};
use crate::names::NameLookup;
use crate::pitch::{prepare_row, BatSide, Description, DroppedRows, PitchRecord, RawPitchRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    GamePk,
    AtBatNumber,
    PitchNumber,
    Pitcher,
    GameDate,
    Stand,
    Umpire,
}

impl Column {
    pub fn name(&self) -> &'static str {
        match self {
            Column::GamePk => "game_pk",
            Column::AtBatNumber => "at_bat_number",
            Column::PitchNumber => "pitch_number",
            Column::Pitcher => "pitcher",
            Column::GameDate => "game_date",
            Column::Stand => "stand",
            Column::Umpire => "umpire_id",
        }
    }
}

/// Columns needed to rebuild plate appearances.
pub const AT_BAT_TRACKING: [Column; 3] = [Column::GamePk, Column::AtBatNumber, Column::PitchNumber];

/// A column counts as present when at least one raw row carries it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnPresence {
    present: HashSet<Column>,
}

impl ColumnPresence {
    fn observe(&mut self, raw: &RawPitchRow) {
        self.mark([
            (Column::GamePk, raw.game_pk.is_some()),
            (Column::AtBatNumber, raw.at_bat_number.is_some()),
            (Column::PitchNumber, raw.pitch_number.is_some()),
            (Column::Pitcher, raw.pitcher.is_some()),
            (Column::GameDate, raw.game_date.is_some()),
            (Column::Stand, raw.stand.is_some()),
            (Column::Umpire, raw.umpire_id.is_some()),
        ]);
    }

    fn mark(&mut self, checks: [(Column, bool); 7]) {
        for (col, seen) in checks {
            if seen {
                self.present.insert(col);
            }
        }
    }

    pub fn has(&self, col: Column) -> bool {
        self.present.contains(&col)
    }

    pub fn missing(&self, cols: &[Column]) -> Vec<String> {
        cols.iter()
            .filter(|c| !self.has(**c))
            .map(|c| c.name().to_string())
            .collect()
    }

    pub fn require(&self, cols: &[Column]) -> AnalysisResult<()> {
        let missing = self.missing(cols);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::MissingColumns { missing })
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PitchFilter {
    pub batter_id: Option<u32>,
    pub umpire_id: Option<u32>,
    pub bat_side: Option<BatSide>,
}

impl PitchFilter {
    pub fn matches(&self, rec: &PitchRecord) -> bool {
        self.batter_id.map_or(true, |b| rec.batter_id == b)
            && self.umpire_id.map_or(true, |u| rec.umpire.id == u)
            && self.bat_side.map_or(true, |s| rec.side == Some(s))
    }
}

#[derive(Debug, Clone, Default)]
pub struct PitchTable {
    records: Vec<PitchRecord>,
    columns: ColumnPresence,
    dropped: DroppedRows,
}

impl PitchTable {
    /// Pitch Table Preparer: normalise raw rows into canonical records.
    pub fn from_raw(rows: &[RawPitchRow]) -> Self {
        let mut columns = ColumnPresence::default();
        let mut dropped = DroppedRows::default();
        let mut records = Vec::with_capacity(rows.len());
        for raw in rows {
            columns.observe(raw);
            if let Some(rec) = prepare_row(raw, &mut dropped) {
                records.push(rec);
            }
        }
        if dropped.total() > 0 {
            warn!(
                "dropped {} of {} raw rows (batter={}, location={}, description={})",
                dropped.total(),
                rows.len(),
                dropped.missing_batter,
                dropped.missing_location,
                dropped.missing_description
            );
        }
        debug!("prepared {} pitch records", records.len());
        Self {
            records,
            columns,
            dropped,
        }
    }

    /// Wrap already-canonical records; columns count as present when any record carries them.
    pub fn from_records(records: Vec<PitchRecord>) -> Self {
        let mut columns = ColumnPresence::default();
        for rec in &records {
            let checks = [
                (Column::GamePk, rec.game_id.is_some()),
                (Column::AtBatNumber, rec.at_bat.is_some()),
                (Column::PitchNumber, rec.pitch_seq.is_some()),
                (Column::Pitcher, rec.pitcher_id.is_some()),
                (Column::GameDate, rec.game_date.is_some()),
                (Column::Stand, rec.side.is_some()),
                (Column::Umpire, rec.umpire.is_resolved()),
            ];
            columns.mark(checks);
        }
        Self {
            records,
            columns,
            dropped: DroppedRows::default(),
        }
    }

    pub fn records(&self) -> &[PitchRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn columns(&self) -> &ColumnPresence {
        &self.columns
    }

    pub fn dropped(&self) -> DroppedRows {
        self.dropped
    }

    pub fn filter(&self, f: &PitchFilter) -> PitchTable {
        PitchTable {
            records: self.records.iter().filter(|r| f.matches(r)).cloned().collect(),
            columns: self.columns.clone(),
            dropped: self.dropped,
        }
    }

    pub fn count_matching(&self, f: &PitchFilter) -> usize {
        self.records.iter().filter(|r| f.matches(r)).count()
    }

    pub fn batter_records(&self, batter_id: u32) -> Vec<&PitchRecord> {
        self.records
            .iter()
            .filter(|r| r.batter_id == batter_id)
            .collect()
    }

    pub fn pitch_counts_by_batter(&self) -> HashMap<u32, usize> {
        let mut counts = HashMap::new();
        for r in &self.records {
            *counts.entry(r.batter_id).or_insert(0) += 1;
        }
        counts
    }

    /// Batters with the most pitches, ties broken by id.
    pub fn top_batters(&self, n: usize) -> Vec<u32> {
        let mut counts: Vec<(u32, usize)> = self.pitch_counts_by_batter().into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts.into_iter().take(n).map(|(id, _)| id).collect()
    }

    pub fn summary(&self) -> TableSummary {
        let mut s = TableSummary {
            total_pitches: self.records.len(),
            ..Default::default()
        };
        let mut batters = HashSet::new();
        let mut umpires = HashSet::new();
        let mut dates: BTreeSet<&str> = BTreeSet::new();
        for r in &self.records {
            batters.insert(r.batter_id);
            if r.umpire.is_resolved() {
                umpires.insert(r.umpire.id);
            }
            if let Some(d) = r.game_date.as_deref() {
                dates.insert(d);
            }
            let d = &r.description;
            if d.is_take() {
                s.takes += 1;
            } else if d.is_swing() {
                s.swings += 1;
            } else {
                s.unclassified += 1;
            }
            if d.is_called_strike() {
                s.outcomes.called_strikes += 1;
            }
            if d.is_ball() {
                s.outcomes.balls += 1;
            }
            match d {
                Description::SwingingStrike => s.outcomes.swinging_strikes += 1,
                Description::Foul => s.outcomes.foul += 1,
                _ => {}
            }
            if d.is_in_play() {
                s.outcomes.in_play += 1;
            }
        }
        s.unique_batters = batters.len();
        s.unique_umpires = umpires.len();
        s.date_range = match (dates.first(), dates.last()) {
            (Some(a), Some(b)) => Some(DateRange {
                start: a.to_string(),
                end: b.to_string(),
            }),
            _ => None,
        };
        s
    }

    /// Position players (never seen pitching) with at least `min_pitches` pitches.
    pub fn batter_roster(&self, min_pitches: usize, names: &dyn NameLookup) -> Vec<BatterListing> {
        let pitchers: HashSet<u32> = self.records.iter().filter_map(|r| r.pitcher_id).collect();
        let mut by_batter: HashMap<u32, (usize, BTreeSet<BatSide>)> = HashMap::new();
        for r in &self.records {
            let entry = by_batter.entry(r.batter_id).or_default();
            entry.0 += 1;
            if let Some(side) = r.side {
                entry.1.insert(side);
            }
        }
        let mut out: Vec<BatterListing> = by_batter
            .into_iter()
            .filter(|(id, (count, _))| !pitchers.contains(id) && *count >= min_pitches)
            .map(|(id, (count, sides))| BatterListing {
                batter_id: id,
                name: names.display_name(id),
                pitch_count: count,
                is_switch_hitter: sides.len() > 1,
                bat_sides: sides.into_iter().collect(),
            })
            .collect();
        out.sort_by(|a, b| b.pitch_count.cmp(&a.pitch_count).then(a.batter_id.cmp(&b.batter_id)));
        out
    }

    /// Resolved home-plate umpires, busiest first.
    pub fn umpire_roster(&self) -> Vec<UmpireListing> {
        let mut by_umpire: HashMap<u32, (String, usize)> = HashMap::new();
        for r in self.records.iter().filter(|r| r.umpire.is_resolved()) {
            by_umpire
                .entry(r.umpire.id)
                .or_insert_with(|| (r.umpire.name.clone(), 0))
                .1 += 1;
        }
        let mut out: Vec<UmpireListing> = by_umpire
            .into_iter()
            .map(|(id, (name, count))| UmpireListing {
                umpire_id: id,
                name,
                pitch_count: count,
            })
            .collect();
        out.sort_by(|a, b| b.pitch_count.cmp(&a.pitch_count).then(a.umpire_id.cmp(&b.umpire_id)));
        out
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct OutcomeBreakdown {
    pub called_strikes: usize,
    pub balls: usize,
    pub swinging_strikes: usize,
    pub foul: usize,
    pub in_play: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TableSummary {
    pub total_pitches: usize,
    pub takes: usize,
    pub swings: usize,
    pub unclassified: usize,
    pub unique_batters: usize,
    pub unique_umpires: usize,
    pub date_range: Option<DateRange>,
    pub outcomes: OutcomeBreakdown,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BatterListing {
    pub batter_id: u32,
    pub name: String,
    pub pitch_count: usize,
    pub bat_sides: Vec<BatSide>,
    pub is_switch_hitter: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UmpireListing {
    pub umpire_id: u32,
    pub name: String,
    pub pitch_count: usize,
}
