//! Error types for grading

use thiserror::Error;

use crate::model::{ConfigError, ScenarioError};
use crate::service::calibration::CalibrationError;
use crate::service::proper_scoring::ProperScoringError;

/// Error type for grading a response or building the grading pipeline
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("scenario {scenario_id} cannot be scored: {source}")]
    InvalidScenario {
        scenario_id: String,
        #[source]
        source: ScenarioError,
    },

    #[error("no scenario with id {0}")]
    UnknownScenario(String),

    #[error("response answers scenario {found} but was graded against {expected}")]
    ScenarioMismatch { expected: String, found: String },

    #[error("proper scoring failed for scenario {scenario_id}: {source}")]
    ProperScoring {
        scenario_id: String,
        #[source]
        source: ProperScoringError,
    },

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("calibration setup failed: {0}")]
    Calibration(#[from] CalibrationError),
}
