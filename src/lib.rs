//! Strike Zone Alignment Score and swing-influence analysis over a
//! pre-collected pitch table.

pub mod alignment;
pub mod api;
pub mod config;
pub mod error;
pub mod grid;
pub mod history;
pub mod influence;
pub mod kde;
pub mod logistic;
pub mod names;
pub mod pitch;
pub mod table;
pub mod zone;

pub use alignment::{calculate_alignment, zone_surfaces, AlignmentResult, ZoneSurfaceResult};
pub use config::AnalysisConfig;
pub use error::{AnalysisError, AnalysisResult, Requirement};
pub use influence::{CohortSelection, InfluenceAnalyzer};
pub use names::{NameDirectory, NameLookup};
pub use pitch::{PitchRecord, RawPitchRow};
pub use table::{PitchFilter, PitchTable};
