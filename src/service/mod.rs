pub mod calibration;
pub mod digest;
pub mod extraction;
pub mod grading;
pub mod proper_scoring;
pub mod range_quality;
pub mod report;

pub use calibration::{CalibrationAggregator, CalibrationError, ResolvedPair};
pub use digest::response_digest;
pub use extraction::ProbabilityExtractor;
pub use grading::{GradedResponse, Grader, GradingError};
pub use proper_scoring::{
    ProperScore, ProperScoringCalculator, ProperScoringError, brier_score, log_loss,
};
pub use range_quality::{Findings, RangeQualityScorer, RangeScore};
pub use report::ReportGenerator;
