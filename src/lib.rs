//! Probabilistic judgment scoring
//!
//! Pulls probability estimates out of free-form forecast text and scores
//! them. Unresolved scenarios are graded for range quality against an
//! expert ground-truth range; resolved ones get Brier score and log loss,
//! and a batch of them is summarised with a calibration curve and ECE.
//!
//! ```no_run
//! use judgment_scoring::{Config, Grader, ReportGenerator, Response, Scenario};
//!
//! # use judgment_scoring::GradingError;
//! # fn run(scenarios: Vec<Scenario>, responses: Vec<Response>) -> Result<(), GradingError> {
//! let config = Config::from_env();
//! let grader = Grader::from_config(&config)?;
//! let graded = grader.grade_batch(&scenarios, &responses);
//! let report = ReportGenerator::new(&config.scoring)?.generate(&graded);
//! println!("{} of {} responses scored", report.num_scored, report.num_responses);
//! # Ok(())
//! # }
//! ```
//!
//! Everything here is synchronous and free of I/O apart from
//! [`Config::from_env`]. The crate emits `tracing` events and leaves
//! subscriber setup to the application.

pub mod model;
pub mod service;

pub use model::{
    Availability, BatchReport, CalibrationBucket, CalibrationCurve, CalibrationSummary,
    CandidateContext, Config, ConfigError, Extraction, FailureKind, Flag, FlagStat,
    GroundTruthRange, ProbabilityEstimate, ResolvedOutcome, Response, Scenario, ScenarioEntry,
    ScenarioError, ScenarioFailure, ScenarioRecord, ScoreResult, ScoreValue, ScoringConfig,
};
pub use service::{
    CalibrationAggregator, CalibrationError, GradedResponse, Grader, GradingError,
    ProbabilityExtractor, ProperScoringCalculator, ProperScoringError, RangeQualityScorer,
    ReportGenerator, ResolvedPair, response_digest,
};
