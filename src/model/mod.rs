pub mod config;
pub mod estimate;
pub mod report;
pub mod scenario;
pub mod score;

pub use config::{Config, ConfigError, ScoringConfig};
pub use estimate::{CandidateContext, Extraction, Extremes, ProbabilityEstimate};
pub use report::{
    Availability, BatchReport, CalibrationBucket, CalibrationCurve, CalibrationSummary,
    FailureKind, FlagStat, ScenarioEntry, ScenarioFailure,
};
pub use scenario::{
    GroundTruthRange, ResolvedOutcome, Response, Scenario, ScenarioError, ScenarioRecord,
};
pub use score::{Flag, ScoreResult, ScoreValue};
