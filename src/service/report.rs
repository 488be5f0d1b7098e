//! Batch report generation
//!
//! A pure reduction over a completed batch. Calibration metrics are only
//! reported when the batch holds resolved outcomes; otherwise they are
//! marked unavailable with a reason.

use std::collections::BTreeMap;

use crate::model::{
    Availability, BatchReport, CalibrationSummary, FailureKind, Flag, FlagStat, ScenarioEntry,
    ScenarioFailure, ScoreResult, ScoreValue, ScoringConfig,
};
use crate::service::calibration::{CalibrationAggregator, ResolvedPair};
use crate::service::grading::{GradedResponse, GradingError};

pub struct ReportGenerator {
    aggregator: CalibrationAggregator,
}

impl ReportGenerator {
    pub fn new(config: &ScoringConfig) -> Result<Self, GradingError> {
        Ok(Self {
            aggregator: CalibrationAggregator::new(config.calibration_bins)?,
        })
    }

    pub fn generate(&self, graded: &[GradedResponse]) -> BatchReport {
        let mut scenarios = Vec::with_capacity(graded.len());
        let mut failures = Vec::new();
        let mut scored: Vec<&ScoreResult> = Vec::new();

        for entry in graded {
            match &entry.outcome {
                Ok(result) => {
                    if result.has_flag(Flag::NoEstimateFound) {
                        failures.push(ScenarioFailure {
                            scenario_id: result.scenario_id.clone(),
                            kind: FailureKind::NoEstimateFound,
                            message: "no numeric probability found in response".to_string(),
                        });
                    }
                    scenarios.push(ScenarioEntry::Scored {
                        result: result.clone(),
                    });
                    scored.push(result);
                }
                Err(e) => {
                    failures.push(ScenarioFailure {
                        scenario_id: entry.scenario_id.clone(),
                        kind: FailureKind::GradingError,
                        message: e.to_string(),
                    });
                    scenarios.push(ScenarioEntry::Failed {
                        scenario_id: entry.scenario_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let range_scores: Vec<f64> = scored
            .iter()
            .filter_map(|r| r.range_quality_score())
            .map(f64::from)
            .collect();
        let mean_range_quality = match mean(&range_scores) {
            Some(value) => Availability::Available { value },
            None => Availability::unavailable("no responses were graded for range quality"),
        };

        let range_acknowledgment_rate = if scored.is_empty() {
            Availability::unavailable("no responses were scored")
        } else {
            let ranged = scored
                .iter()
                .filter(|r| r.estimate.as_ref().is_some_and(|e| e.is_range()))
                .count();
            Availability::Available {
                value: ranged as f64 / scored.len() as f64,
            }
        };

        let flags = flag_stats(&scored);
        let critical_flag_count = scored
            .iter()
            .map(|r| r.flags.iter().filter(|f| f.is_critical()).count())
            .sum();

        let calibration = self.calibration(&scored);

        let report = BatchReport {
            num_responses: graded.len(),
            num_scored: scored.len(),
            scenarios,
            mean_range_quality,
            range_acknowledgment_rate,
            flags,
            critical_flag_count,
            failures,
            calibration,
        };

        tracing::info!(
            responses = report.num_responses,
            scored = report.num_scored,
            failures = report.failure_count(),
            critical_flags = report.critical_flag_count,
            calibration_available = report.calibration.is_available(),
            "Generated batch report"
        );

        report
    }

    fn calibration(&self, scored: &[&ScoreResult]) -> Availability<CalibrationSummary> {
        let mut pairs = Vec::new();
        let mut brier = Vec::new();
        let mut log_loss = Vec::new();

        for result in scored {
            if let ScoreValue::ProperScoring {
                probability,
                outcome,
                brier: b,
                log_loss: l,
                ..
            } = result.value
            {
                pairs.push(ResolvedPair::new(probability, outcome));
                brier.push(b);
                log_loss.push(l);
            }
        }

        if pairs.is_empty() {
            return Availability::unavailable("no resolved outcomes in batch");
        }

        match self.aggregator.aggregate(&pairs) {
            Ok(curve) => Availability::Available {
                value: CalibrationSummary {
                    resolved_count: pairs.len(),
                    mean_brier: mean(&brier).unwrap_or_default(),
                    mean_log_loss: mean(&log_loss).unwrap_or_default(),
                    ece: curve.ece,
                    curve,
                },
            },
            Err(e) => {
                tracing::warn!(error = %e, "Calibration aggregation failed");
                Availability::unavailable(e.to_string())
            }
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

fn flag_stats(scored: &[&ScoreResult]) -> BTreeMap<Flag, FlagStat> {
    Flag::ALL
        .into_iter()
        .map(|flag| {
            let count = scored.iter().filter(|r| r.has_flag(flag)).count();
            let fraction = if scored.is_empty() {
                0.0
            } else {
                count as f64 / scored.len() as f64
            };
            (flag, FlagStat { count, fraction })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroundTruthRange, ResolvedOutcome, Response, Scenario};
    use crate::service::grading::Grader;

    fn scenario(id: &str, low: f64, high: f64, outcome: Option<ResolvedOutcome>) -> Scenario {
        Scenario {
            id: id.to_string(),
            ground_truth: GroundTruthRange {
                low,
                high,
                base_rate: None,
            },
            resolved_outcome: outcome,
        }
    }

    fn run(scenarios: &[Scenario], responses: &[Response]) -> BatchReport {
        let config = ScoringConfig::default();
        let graded = Grader::new(config.clone())
            .unwrap()
            .grade_batch(scenarios, responses);
        ReportGenerator::new(&config).unwrap().generate(&graded)
    }

    #[test]
    fn test_failures_counted_without_aborting() {
        let scenarios = [
            scenario("fda", 0.55, 0.70, None),
            scenario("silent", 0.40, 0.60, None),
            scenario("broken", 0.9, 0.1, None),
        ];
        let responses = [
            Response::new(
                "fda",
                "approximately 70%, though historically base rates suggest 60–65%",
            ),
            Response::new("silent", "It depends on the committee."),
            Response::new("broken", "I estimate 50%."),
        ];
        let report = run(&scenarios, &responses);

        assert_eq!(report.num_responses, 3);
        assert_eq!(report.num_scored, 2);
        assert_eq!(report.scenarios.len(), 3);
        assert_eq!(report.failure_count(), 2);
        assert!(report
            .failures
            .iter()
            .any(|f| f.scenario_id == "silent" && f.kind == FailureKind::NoEstimateFound));
        assert!(report
            .failures
            .iter()
            .any(|f| f.scenario_id == "broken" && f.kind == FailureKind::GradingError));

        assert_eq!(report.mean_range_quality.value(), Some(&1.0));
        assert_eq!(report.flag_count(Flag::NoEstimateFound), 1);
        assert_eq!(report.flag_count(Flag::FalsePrecision), 1);
        assert_eq!(report.critical_flag_count, 1);
        assert_eq!(report.flags[&Flag::NoEstimateFound].fraction, 0.5);
        assert!(!report.calibration.is_available());
    }

    #[test]
    fn test_calibration_unavailable_serializes_explicitly() {
        let report = run(
            &[scenario("a", 0.2, 0.4, None)],
            &[Response::new("a", "I'd put it at 25-35%.")],
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["calibration"]["status"], "unavailable");
        assert!(value["calibration"].get("value").is_none());
        assert_eq!(report.range_acknowledgment_rate.value(), Some(&1.0));
    }

    #[test]
    fn test_resolved_batch_reports_calibration() {
        let scenarios = [
            scenario("yes", 0.55, 0.75, Some(ResolvedOutcome::Yes)),
            scenario("no", 0.10, 0.30, Some(ResolvedOutcome::No)),
            scenario("open", 0.40, 0.60, None),
        ];
        let responses = [
            Response::new("yes", "I estimate 70%."),
            Response::new("no", "I estimate 20%."),
            Response::new("open", "I'd put it at 45-55%."),
        ];
        let report = run(&scenarios, &responses);

        let summary = report.calibration.value().unwrap();
        assert_eq!(summary.resolved_count, 2);
        assert!((summary.mean_brier - 0.065).abs() < 1e-9);
        assert!(summary.mean_log_loss > 0.0);
        assert_eq!(summary.ece, summary.curve.ece);
        assert_eq!(summary.curve.total, 2);
        assert_eq!(report.mean_range_quality.value(), Some(&3.0));
        assert_eq!(report.failure_count(), 0);
    }

    #[test]
    fn test_empty_batch() {
        let report = run(&[], &[]);
        assert_eq!(report.num_responses, 0);
        assert!(!report.mean_range_quality.is_available());
        assert!(!report.range_acknowledgment_rate.is_available());
        assert!(!report.calibration.is_available());
        assert_eq!(report.flags[&Flag::Overconfidence].count, 0);
    }
}
