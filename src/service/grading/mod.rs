//! Grading pipeline: extraction followed by the scoring mode the scenario
//! allows
//!
//! A scenario with a recorded outcome is scored with proper scoring rules;
//! every other scenario gets range-quality scoring. Outcomes are never
//! invented to force a Brier score.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::model::{
    Config, Extraction, Flag, ProbabilityEstimate, ResolvedOutcome, Response, Scenario,
    ScoreResult, ScoreValue, ScoringConfig,
};
use crate::service::digest::response_digest;
use crate::service::extraction::ProbabilityExtractor;
use crate::service::proper_scoring::ProperScoringCalculator;
use crate::service::range_quality::{Findings, RangeQualityScorer};

pub mod error;

pub use error::GradingError;

/// Grading outcome for one response of a batch
#[derive(Debug)]
pub struct GradedResponse {
    pub scenario_id: String,
    pub outcome: Result<ScoreResult, GradingError>,
}

impl GradedResponse {
    pub fn result(&self) -> Option<&ScoreResult> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&GradingError> {
        self.outcome.as_ref().err()
    }
}

/// Scores responses against their scenarios
pub struct Grader {
    config: ScoringConfig,
    extractor: ProbabilityExtractor,
    range_scorer: RangeQualityScorer,
    proper_scorer: ProperScoringCalculator,
}

impl Grader {
    pub fn new(config: ScoringConfig) -> Result<Self, GradingError> {
        config.validate()?;
        Ok(Self {
            extractor: ProbabilityExtractor::new(),
            range_scorer: RangeQualityScorer::new(config.clone()),
            proper_scorer: ProperScoringCalculator::new(config.log_loss_epsilon),
            config,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, GradingError> {
        Self::new(config.scoring.clone())
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn extractor(&self) -> &ProbabilityExtractor {
        &self.extractor
    }

    /// Grade one response against the scenario it answers
    pub fn grade(
        &self,
        scenario: &Scenario,
        response: &Response,
    ) -> Result<ScoreResult, GradingError> {
        if response.scenario_id != scenario.id {
            return Err(GradingError::ScenarioMismatch {
                expected: scenario.id.clone(),
                found: response.scenario_id.clone(),
            });
        }

        if let Err(source) = scenario.ground_truth.validate() {
            tracing::warn!(
                scenario_id = %scenario.id,
                error = %source,
                "Refusing to score against malformed ground truth"
            );
            return Err(GradingError::InvalidScenario {
                scenario_id: scenario.id.clone(),
                source,
            });
        }

        let extraction = self.extractor.extract(&response.text);
        let estimate = extraction.final_estimate();

        let (value, findings) = match (scenario.resolved_outcome, estimate) {
            (Some(outcome), Some(estimate)) => {
                self.proper_score(scenario, &extraction, estimate, outcome)?
            }
            _ => {
                let range = self.range_scorer.score(&extraction, &scenario.ground_truth);
                let value = ScoreValue::RangeQuality {
                    score: range.score,
                    distance_from_range: range.distance_from_range,
                };
                (value, range.findings)
            }
        };

        if findings.contains(Flag::NoEstimateFound) {
            tracing::warn!(scenario_id = %scenario.id, "No probability estimate found in response");
        }

        tracing::debug!(
            scenario_id = %scenario.id,
            value = ?value,
            flags = ?findings.flags,
            "Graded response"
        );

        Ok(ScoreResult {
            scenario_id: scenario.id.clone(),
            value,
            flags: findings.flags,
            notes: findings.notes,
            estimate: estimate.cloned(),
            response_digest: response_digest(&response.text),
        })
    }

    fn proper_score(
        &self,
        scenario: &Scenario,
        extraction: &Extraction,
        estimate: &ProbabilityEstimate,
        outcome: ResolvedOutcome,
    ) -> Result<(ScoreValue, Findings), GradingError> {
        let score = self
            .proper_scorer
            .score_estimate(estimate, outcome)
            .map_err(|source| GradingError::ProperScoring {
                scenario_id: scenario.id.clone(),
                source,
            })?;

        let mut findings = Findings::default();
        if self.range_scorer.is_overconfident(estimate) {
            findings.raise(
                Flag::Overconfidence,
                format!(
                    "estimate '{}' is within {:.0} points of certainty",
                    estimate.source_span,
                    self.config.extreme_band * 100.0
                ),
            );
        }
        if score.clamped {
            findings.note(format!(
                "probability {} clamped to [{:e}, 1 - {:e}] for log loss",
                score.probability, self.config.log_loss_epsilon, self.config.log_loss_epsilon
            ));
        }
        findings.merge(
            self.range_scorer
                .reference_findings(extraction, &scenario.ground_truth),
        );

        let value = ScoreValue::ProperScoring {
            probability: score.probability,
            outcome,
            brier: score.brier,
            log_loss: score.log_loss,
            range_width: score.range_width,
        };
        Ok((value, findings))
    }

    /// Grade every response against its scenario, matched by id
    ///
    /// Responses are graded in parallel and returned in input order. A
    /// failure is recorded against its response and never stops the batch.
    pub fn grade_batch(
        &self,
        scenarios: &[Scenario],
        responses: &[Response],
    ) -> Vec<GradedResponse> {
        let mut by_id: HashMap<&str, &Scenario> = HashMap::with_capacity(scenarios.len());
        for scenario in scenarios {
            if by_id.contains_key(scenario.id.as_str()) {
                tracing::warn!(
                    scenario_id = %scenario.id,
                    "Duplicate scenario id, keeping the first"
                );
                continue;
            }
            by_id.insert(scenario.id.as_str(), scenario);
        }

        let graded: Vec<GradedResponse> = responses
            .par_iter()
            .map(|response| {
                let outcome = match by_id.get(response.scenario_id.as_str()) {
                    Some(scenario) => self.grade(scenario, response),
                    None => {
                        tracing::warn!(
                            scenario_id = %response.scenario_id,
                            "Response refers to an unknown scenario"
                        );
                        Err(GradingError::UnknownScenario(response.scenario_id.clone()))
                    }
                };
                GradedResponse {
                    scenario_id: response.scenario_id.clone(),
                    outcome,
                }
            })
            .collect();

        let failed = graded.iter().filter(|g| g.outcome.is_err()).count();
        tracing::info!(
            responses = graded.len(),
            scored = graded.len() - failed,
            failed,
            "Graded batch"
        );

        graded
    }
}
