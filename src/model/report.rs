use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Flag, ScoreResult};

/// One bin of a reliability histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationBucket {
    /// Inclusive lower edge
    pub lower: f64,
    /// Exclusive upper edge (inclusive for the last bin)
    pub upper: f64,
    pub count: usize,
    /// Absent for empty buckets
    pub mean_predicted: Option<f64>,
    pub empirical_frequency: Option<f64>,
    /// `|mean_predicted - empirical_frequency|`
    pub gap: Option<f64>,
}

/// Reliability curve and ECE over a set of resolved predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationCurve {
    pub buckets: Vec<CalibrationBucket>,
    pub ece: f64,
    pub total: usize,
    pub mean_predicted: f64,
    pub empirical_frequency: f64,
}

/// A metric that is either computed or explicitly missing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Availability<T> {
    Available { value: T },
    Unavailable { reason: String },
}

impl<T> Availability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Availability::Available { value } => Some(value),
            Availability::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.value().is_some()
    }
}

/// Proper-scoring aggregates over the resolved part of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CalibrationSummary {
    pub resolved_count: usize,
    pub mean_brier: f64,
    pub mean_log_loss: f64,
    pub ece: f64,
    pub curve: CalibrationCurve,
}

/// How often a flag occurred in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FlagStat {
    pub count: usize,
    /// Share of scored responses carrying the flag
    pub fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Scored, but no probability could be extracted
    NoEstimateFound,
    /// Not scored at all
    GradingError,
}

/// A scenario the batch could not grade meaningfully
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScenarioFailure {
    pub scenario_id: String,
    pub kind: FailureKind,
    pub message: String,
}

/// Per-response line of a batch report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScenarioEntry {
    Scored { result: ScoreResult },
    Failed { scenario_id: String, error: String },
}

/// Aggregate of one grading run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BatchReport {
    pub num_responses: usize,
    pub num_scored: usize,
    pub scenarios: Vec<ScenarioEntry>,
    pub mean_range_quality: Availability<f64>,
    /// Share of scored responses whose final estimate is a numeric range
    pub range_acknowledgment_rate: Availability<f64>,
    pub flags: BTreeMap<Flag, FlagStat>,
    pub critical_flag_count: usize,
    pub failures: Vec<ScenarioFailure>,
    pub calibration: Availability<CalibrationSummary>,
}

impl BatchReport {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn flag_count(&self, flag: Flag) -> usize {
        self.flags.get(&flag).map(|s| s.count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_serializes_with_reason() {
        let metric: Availability<f64> = Availability::unavailable("no resolved outcomes");
        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["status"], "unavailable");
        assert_eq!(value["reason"], "no resolved outcomes");
        assert!(value.get("value").is_none());
        assert!(!metric.is_available());
    }

    #[test]
    fn test_batch_report_schema() {
        let schema = schemars::schema_for!(BatchReport);
        let value = serde_json::to_value(&schema).unwrap();
        let properties = &value["properties"];
        for field in ["num_scored", "mean_range_quality", "flags", "failures", "calibration"] {
            assert!(properties.get(field).is_some(), "missing {field}");
        }
        let text = value.to_string();
        assert!(text.contains("ScoreResult"));
        assert!(text.contains("range_quality"));
        assert!(text.contains("proper_scoring"));
    }

    #[test]
    fn test_available_serializes_value() {
        let metric = Availability::Available { value: 1.5 };
        let value = serde_json::to_value(&metric).unwrap();
        assert_eq!(value["status"], "available");
        assert_eq!(value["value"], 1.5);
        assert_eq!(metric.value(), Some(&1.5));
    }
}
