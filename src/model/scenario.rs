//! Scenario and response descriptors supplied by the calling workflow
//!
//! Scenarios are loaded by an external collaborator; the engine only reads
//! them. A ground-truth range is validated at scoring time so that one bad
//! record surfaces as a per-scenario error instead of a load failure.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Scenario data that cannot be scored against
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ScenarioError {
    #[error("ground-truth bounds must be finite, got [{low}, {high}]")]
    NonFiniteRange { low: f64, high: f64 },

    #[error("ground-truth bounds must lie within [0, 1], got [{low}, {high}]")]
    RangeOutOfBounds { low: f64, high: f64 },

    #[error("ground-truth low bound {low} exceeds high bound {high}")]
    InvertedRange { low: f64, high: f64 },

    #[error("base rate must lie within [0, 1], got {0}")]
    BaseRateOutOfBounds(f64),

    #[error("scenario {0} declares no ground-truth range")]
    MissingGroundTruth(String),

    #[error("resolved outcome must be 0 or 1, got {0}")]
    InvalidOutcome(u8),
}

/// Expert-defensible probability interval for an unresolved event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GroundTruthRange {
    pub low: f64,
    pub high: f64,
    /// Historical frequency the estimate should be anchored to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_rate: Option<f64>,
}

impl GroundTruthRange {
    pub fn new(low: f64, high: f64, base_rate: Option<f64>) -> Result<Self, ScenarioError> {
        let range = Self {
            low,
            high,
            base_rate,
        };
        range.validate()?;
        Ok(range)
    }

    /// Check the scenario-data integrity rules for this range
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let (low, high) = (self.low, self.high);
        if !low.is_finite() || !high.is_finite() {
            return Err(ScenarioError::NonFiniteRange { low, high });
        }
        if !(0.0..=1.0).contains(&low) || !(0.0..=1.0).contains(&high) {
            return Err(ScenarioError::RangeOutOfBounds { low, high });
        }
        if low > high {
            return Err(ScenarioError::InvertedRange { low, high });
        }
        if let Some(base_rate) = self.base_rate
            && !(0.0..=1.0).contains(&base_rate)
        {
            return Err(ScenarioError::BaseRateOutOfBounds(base_rate));
        }
        Ok(())
    }

    /// Inclusive containment, tolerant of float noise from percent parsing
    pub fn contains(&self, p: f64) -> bool {
        p >= self.low - BOUND_EPSILON && p <= self.high + BOUND_EPSILON
    }

    /// Distance from `p` to the nearest bound, zero when inside
    pub fn distance_to(&self, p: f64) -> f64 {
        if self.contains(p) {
            0.0
        } else if p < self.low {
            self.low - p
        } else {
            p - self.high
        }
    }

    /// Length of the intersection with `[low, high]`
    pub fn overlap_with(&self, low: f64, high: f64) -> f64 {
        (self.high.min(high) - self.low.max(low)).max(0.0)
    }
}

/// Tolerance for bound comparisons
pub(crate) const BOUND_EPSILON: f64 = 1e-9;

/// Binary realization of a forecast event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ResolvedOutcome {
    No,
    Yes,
}

impl ResolvedOutcome {
    pub fn as_f64(self) -> f64 {
        match self {
            ResolvedOutcome::No => 0.0,
            ResolvedOutcome::Yes => 1.0,
        }
    }
}

impl TryFrom<u8> for ResolvedOutcome {
    type Error = ScenarioError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ResolvedOutcome::No),
            1 => Ok(ResolvedOutcome::Yes),
            other => Err(ScenarioError::InvalidOutcome(other)),
        }
    }
}

impl From<ResolvedOutcome> for u8 {
    fn from(outcome: ResolvedOutcome) -> Self {
        match outcome {
            ResolvedOutcome::No => 0,
            ResolvedOutcome::Yes => 1,
        }
    }
}

impl From<bool> for ResolvedOutcome {
    fn from(happened: bool) -> Self {
        if happened {
            ResolvedOutcome::Yes
        } else {
            ResolvedOutcome::No
        }
    }
}

/// A forecasting scenario as seen by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: String,
    pub ground_truth: GroundTruthRange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_outcome: Option<ResolvedOutcome>,
}

/// A model response answering one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub scenario_id: String,
    pub text: String,
}

impl Response {
    pub fn new(scenario_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            scenario_id: scenario_id.into(),
            text: text.into(),
        }
    }
}

/// Scenario file layout used by the evaluation suites, with ranges in
/// percentage points
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioRecord {
    pub id: String,
    #[serde(default)]
    pub calibration_axes: CalibrationAxes,
    #[serde(default)]
    pub resolved_outcome: Option<ResolvedOutcome>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalibrationAxes {
    #[serde(default)]
    pub probability_estimate: Option<ProbabilityEstimateAxis>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbabilityEstimateAxis {
    /// `[low, high]` in percentage points
    #[serde(default)]
    pub ground_truth_range: Option<[f64; 2]>,
    /// Percentage points
    #[serde(default)]
    pub base_rate: Option<f64>,
}

impl TryFrom<ScenarioRecord> for Scenario {
    type Error = ScenarioError;

    /// Converts percentage points to probabilities. The range itself is not
    /// validated here; that happens when the scenario is scored.
    fn try_from(record: ScenarioRecord) -> Result<Self, Self::Error> {
        let axis = record.calibration_axes.probability_estimate;
        let Some([low, high]) = axis.as_ref().and_then(|a| a.ground_truth_range) else {
            return Err(ScenarioError::MissingGroundTruth(record.id));
        };
        let base_rate = axis.and_then(|a| a.base_rate).map(|b| b / 100.0);

        Ok(Scenario {
            id: record.id,
            ground_truth: GroundTruthRange {
                low: low / 100.0,
                high: high / 100.0,
                base_rate,
            },
            resolved_outcome: record.resolved_outcome,
        })
    }
}
