//! Canonical pitch records and the preparer that builds them from raw rows.

use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SZ_TOP: f64 = 3.5;
pub const DEFAULT_SZ_BOT: f64 = 1.5;
pub const UNKNOWN_UMPIRE_ID: u32 = 0;
pub const UNKNOWN_UMPIRE_NAME: &str = "Unknown";

/// One row as delivered by the acquisition layer. Every column is optional so
/// the preparer can report what is missing instead of failing to parse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawPitchRow {
    pub batter: Option<u32>,
    pub pitcher: Option<u32>,
    pub game_pk: Option<u64>,
    pub game_date: Option<String>,
    pub at_bat_number: Option<u32>,
    pub pitch_number: Option<u32>,
    #[serde(alias = "px")]
    pub plate_x: Option<f64>,
    #[serde(alias = "pz")]
    pub plate_z: Option<f64>,
    pub sz_top: Option<f64>,
    pub sz_bot: Option<f64>,
    pub description: Option<String>,
    pub stand: Option<String>,
    pub umpire_id: Option<u32>,
    pub umpire_name: Option<String>,
}

/// Pitch outcome. Anything outside the known take and swing sets lands in
/// `Unclassified` and carries neither flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Description {
    CalledStrike,
    Ball,
    BlockedBall,
    Pitchout,
    SwingingStrike,
    SwingingStrikeBlocked,
    Foul,
    FoulTip,
    FoulBunt,
    MissedBunt,
    HitIntoPlay,
    HitIntoPlayScore,
    HitIntoPlayNoOut,
    Unclassified(String),
}

impl Description {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "called_strike" => Description::CalledStrike,
            "ball" => Description::Ball,
            "blocked_ball" => Description::BlockedBall,
            "pitchout" => Description::Pitchout,
            "swinging_strike" => Description::SwingingStrike,
            "swinging_strike_blocked" => Description::SwingingStrikeBlocked,
            "foul" => Description::Foul,
            "foul_tip" => Description::FoulTip,
            "foul_bunt" => Description::FoulBunt,
            "missed_bunt" => Description::MissedBunt,
            "hit_into_play" => Description::HitIntoPlay,
            "hit_into_play_score" => Description::HitIntoPlayScore,
            "hit_into_play_no_out" => Description::HitIntoPlayNoOut,
            other => Description::Unclassified(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Description::CalledStrike => "called_strike",
            Description::Ball => "ball",
            Description::BlockedBall => "blocked_ball",
            Description::Pitchout => "pitchout",
            Description::SwingingStrike => "swinging_strike",
            Description::SwingingStrikeBlocked => "swinging_strike_blocked",
            Description::Foul => "foul",
            Description::FoulTip => "foul_tip",
            Description::FoulBunt => "foul_bunt",
            Description::MissedBunt => "missed_bunt",
            Description::HitIntoPlay => "hit_into_play",
            Description::HitIntoPlayScore => "hit_into_play_score",
            Description::HitIntoPlayNoOut => "hit_into_play_no_out",
            Description::Unclassified(s) => s,
        }
    }

    pub fn is_take(&self) -> bool {
        matches!(
            self,
            Description::CalledStrike
                | Description::Ball
                | Description::BlockedBall
                | Description::Pitchout
        )
    }

    pub fn is_swing(&self) -> bool {
        matches!(
            self,
            Description::SwingingStrike
                | Description::SwingingStrikeBlocked
                | Description::Foul
                | Description::FoulTip
                | Description::FoulBunt
                | Description::MissedBunt
                | Description::HitIntoPlay
                | Description::HitIntoPlayScore
                | Description::HitIntoPlayNoOut
        )
    }

    pub fn is_called_strike(&self) -> bool {
        *self == Description::CalledStrike
    }

    pub fn is_ball(&self) -> bool {
        *self == Description::Ball
    }

    pub fn is_in_play(&self) -> bool {
        matches!(
            self,
            Description::HitIntoPlay | Description::HitIntoPlayScore | Description::HitIntoPlayNoOut
        )
    }

    pub fn is_unclassified(&self) -> bool {
        matches!(self, Description::Unclassified(_))
    }
}

impl From<String> for Description {
    fn from(s: String) -> Self {
        Description::parse(&s)
    }
}

impl From<Description> for String {
    fn from(d: Description) -> Self {
        d.as_str().to_string()
    }
}

impl fmt::Display for Description {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BatSide {
    L,
    R,
}

impl BatSide {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "L" | "l" => Some(BatSide::L),
            "R" | "r" => Some(BatSide::R),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Umpire {
    pub id: u32,
    pub name: String,
}

impl Umpire {
    pub fn unknown() -> Self {
        Self {
            id: UNKNOWN_UMPIRE_ID,
            name: UNKNOWN_UMPIRE_NAME.to_string(),
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.id != UNKNOWN_UMPIRE_ID && self.name != UNKNOWN_UMPIRE_NAME && !self.name.is_empty()
    }
}

/// Game × at-bat sequence number; unique within a season.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PlateAppearanceId {
    pub game_id: u64,
    pub at_bat: u32,
}

impl fmt::Display for PlateAppearanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.game_id, self.at_bat)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PitchRecord {
    pub batter_id: u32,
    pub pitcher_id: Option<u32>,
    pub game_id: Option<u64>,
    pub game_date: Option<String>,
    pub at_bat: Option<u32>,
    /// 1-based position within the plate appearance as recorded upstream.
    pub pitch_seq: Option<u32>,
    pub side: Option<BatSide>,
    pub umpire: Umpire,
    pub plate_x: f64,
    pub plate_z: f64,
    pub sz_top: f64,
    pub sz_bot: f64,
    pub description: Description,
}

impl PitchRecord {
    pub fn plate_appearance(&self) -> Option<PlateAppearanceId> {
        Some(PlateAppearanceId {
            game_id: self.game_id?,
            at_bat: self.at_bat?,
        })
    }

    pub fn is_take(&self) -> bool {
        self.description.is_take()
    }

    pub fn is_swing(&self) -> bool {
        self.description.is_swing()
    }

    pub fn is_called_strike(&self) -> bool {
        self.description.is_called_strike()
    }

    pub fn is_ball(&self) -> bool {
        self.description.is_ball()
    }

    pub fn location(&self) -> (f64, f64) {
        (self.plate_x, self.plate_z)
    }
}

/// Rows the preparer could not turn into records, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DroppedRows {
    pub missing_batter: usize,
    pub missing_location: usize,
    pub missing_description: usize,
}

impl DroppedRows {
    pub fn total(&self) -> usize {
        self.missing_batter + self.missing_location + self.missing_description
    }
}

/// Normalise one raw row. Returns the reason as a counter bump on rejection.
pub fn prepare_row(raw: &RawPitchRow, dropped: &mut DroppedRows) -> Option<PitchRecord> {
    let Some(batter_id) = raw.batter else {
        dropped.missing_batter += 1;
        return None;
    };
    let (plate_x, plate_z) = match (raw.plate_x, raw.plate_z) {
        (Some(x), Some(z)) if x.is_finite() && z.is_finite() => (x, z),
        _ => {
            dropped.missing_location += 1;
            return None;
        }
    };
    let Some(desc) = raw.description.as_deref() else {
        dropped.missing_description += 1;
        return None;
    };

    let umpire = match (raw.umpire_id, raw.umpire_name.as_deref()) {
        (Some(id), Some(name)) if id != UNKNOWN_UMPIRE_ID && !name.trim().is_empty() => Umpire {
            id,
            name: name.trim().to_string(),
        },
        _ => Umpire::unknown(),
    };

    Some(PitchRecord {
        batter_id,
        pitcher_id: raw.pitcher,
        game_id: raw.game_pk,
        game_date: raw.game_date.clone(),
        at_bat: raw.at_bat_number,
        pitch_seq: raw.pitch_number,
        side: raw.stand.as_deref().and_then(BatSide::parse),
        umpire,
        plate_x,
        plate_z,
        sz_top: finite_or(raw.sz_top, DEFAULT_SZ_TOP),
        sz_bot: finite_or(raw.sz_bot, DEFAULT_SZ_BOT),
        description: Description::parse(desc),
    })
}

fn finite_or(v: Option<f64>, default: f64) -> f64 {
    v.filter(|x| x.is_finite()).unwrap_or(default)
}
