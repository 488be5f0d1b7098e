use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{ProbabilityEstimate, ResolvedOutcome};

/// Issue detected while grading a response
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    NoEstimateFound,
    Overconfidence,
    FalsePrecision,
    Miscalibrated,
    BaseRateNeglect,
    MarketPriceAnchoring,
}

impl Flag {
    pub const ALL: [Flag; 6] = [
        Flag::NoEstimateFound,
        Flag::Overconfidence,
        Flag::FalsePrecision,
        Flag::Miscalibrated,
        Flag::BaseRateNeglect,
        Flag::MarketPriceAnchoring,
    ];

    /// Flags counted as critical in batch reports
    pub fn is_critical(self) -> bool {
        matches!(
            self,
            Flag::NoEstimateFound | Flag::Overconfidence | Flag::Miscalibrated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::NoEstimateFound => "no_estimate_found",
            Flag::Overconfidence => "overconfidence",
            Flag::FalsePrecision => "false_precision",
            Flag::Miscalibrated => "miscalibrated",
            Flag::BaseRateNeglect => "base_rate_neglect",
            Flag::MarketPriceAnchoring => "market_price_anchoring",
        }
    }
}

impl std::fmt::Display for Flag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headline value of a grading pass, tagged by scoring mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScoreValue {
    /// No outcome recorded yet: 0-3 against the ground-truth range
    RangeQuality {
        score: u8,
        /// Distance of the estimate's central value from the range, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_from_range: Option<f64>,
    },
    /// Outcome recorded: proper scoring rules
    ProperScoring {
        /// Probability that was scored (midpoint for a stated range)
        probability: f64,
        #[schemars(with = "u8")]
        outcome: ResolvedOutcome,
        brier: f64,
        log_loss: f64,
        /// Width of the stated range, kept apart from the scalar scores
        #[serde(default, skip_serializing_if = "Option::is_none")]
        range_width: Option<f64>,
    },
}

/// Result of grading one response against its scenario
///
/// Never mutated once built; a regrade produces a new result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScoreResult {
    pub scenario_id: String,
    #[serde(flatten)]
    pub value: ScoreValue,
    pub flags: BTreeSet<Flag>,
    pub notes: Vec<String>,
    /// Final estimate the score was computed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimate: Option<ProbabilityEstimate>,
    /// Hex SHA-256 of the graded response text
    pub response_digest: String,
}

impl ScoreResult {
    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    /// Range-quality score, when graded in that mode
    pub fn range_quality_score(&self) -> Option<u8> {
        match self.value {
            ScoreValue::RangeQuality { score, .. } => Some(score),
            ScoreValue::ProperScoring { .. } => None,
        }
    }

    /// `(probability, outcome)` pair, when graded against a resolution
    pub fn resolved_pair(&self) -> Option<(f64, ResolvedOutcome)> {
        match self.value {
            ScoreValue::ProperScoring {
                probability,
                outcome,
                ..
            } => Some((probability, outcome)),
            ScoreValue::RangeQuality { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_serializes_snake_case() {
        let json = serde_json::to_string(&Flag::MarketPriceAnchoring).unwrap();
        assert_eq!(json, "\"market_price_anchoring\"");
        for flag in Flag::ALL {
            assert_eq!(
                serde_json::to_string(&flag).unwrap(),
                format!("\"{}\"", flag)
            );
        }
    }

    #[test]
    fn test_mode_is_tagged() {
        let result = ScoreResult {
            scenario_id: "s1".to_string(),
            value: ScoreValue::ProperScoring {
                probability: 0.7,
                outcome: ResolvedOutcome::Yes,
                brier: 0.09,
                log_loss: 0.356,
                range_width: None,
            },
            flags: BTreeSet::new(),
            notes: vec![],
            estimate: None,
            response_digest: "00".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["mode"], "proper_scoring");
        assert_eq!(value["outcome"], 1);
        assert_eq!(result.resolved_pair(), Some((0.7, ResolvedOutcome::Yes)));
        assert_eq!(result.range_quality_score(), None);
    }

    #[test]
    fn test_critical_flags() {
        assert!(Flag::NoEstimateFound.is_critical());
        assert!(Flag::Overconfidence.is_critical());
        assert!(!Flag::BaseRateNeglect.is_critical());
        assert!(!Flag::FalsePrecision.is_critical());
    }
}
