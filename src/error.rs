use serde::Serialize;
use thiserror::Error;

/// Which minimum-sample gate was not met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    /// Pitches needed before an alignment score is worth computing.
    AlignmentPitches,
    /// Pitches the batter must have in the table at all.
    BatterPitches,
    /// At-bats long enough to carry a swing history.
    LongAtBats,
    /// Takes inside long at-bats.
    Takes,
    /// Takes with a defined prior swing rate (pitch index > 1).
    RegressionTakes,
    /// Edge-zone takes for the median split.
    EdgeTakes,
    /// Takes in each half of the median split.
    EdgeSplitGroup,
}

impl Requirement {
    pub fn label(&self) -> &'static str {
        match self {
            Requirement::AlignmentPitches => "pitches for alignment",
            Requirement::BatterPitches => "pitches for batter",
            Requirement::LongAtBats => "long at-bats",
            Requirement::Takes => "takes in long at-bats",
            Requirement::RegressionTakes => "takes for regression analysis",
            Requirement::EdgeTakes => "edge-zone takes",
            Requirement::EdgeSplitGroup => "takes per swing-rate group",
        }
    }
}

/// Errors raised by the analytical core. None of them are fatal to the process.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("insufficient data: need {required} {}, have {observed}", .requirement.label())]
    InsufficientData {
        requirement: Requirement,
        required: usize,
        observed: usize,
    },

    #[error("missing required columns: {}", .missing.join(", "))]
    MissingColumns { missing: Vec<String> },

    #[error("numerical fit failure: {reason}")]
    NumericalFitFailure { reason: String },
}

impl AnalysisError {
    pub fn insufficient(requirement: Requirement, required: usize, observed: usize) -> Self {
        AnalysisError::InsufficientData {
            requirement,
            required,
            observed,
        }
    }

    pub fn fit_failure(msg: impl Into<String>) -> Self {
        AnalysisError::NumericalFitFailure { reason: msg.into() }
    }
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
