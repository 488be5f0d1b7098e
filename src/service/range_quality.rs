//! Range-quality scoring for forecasts that have not resolved yet
//!
//! The headline 0-3 score answers "is the number right"; flags answer "is
//! the number honestly uncertain". The two are kept apart so that a lucky
//! point estimate is not mistaken for a calibrated one.

use std::collections::BTreeSet;

use crate::model::scenario::BOUND_EPSILON;
use crate::model::{
    CandidateContext, Extraction, Flag, GroundTruthRange, ProbabilityEstimate, ScoringConfig,
};

/// Flags raised while grading, each with a human-readable note
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Findings {
    pub flags: BTreeSet<Flag>,
    pub notes: Vec<String>,
}

impl Findings {
    pub fn raise(&mut self, flag: Flag, note: impl Into<String>) {
        self.flags.insert(flag);
        self.notes.push(note.into());
    }

    pub fn note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    pub fn contains(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn merge(&mut self, other: Findings) {
        self.flags.extend(other.flags);
        self.notes.extend(other.notes);
    }
}

/// Outcome of range-quality scoring
#[derive(Debug, Clone, PartialEq)]
pub struct RangeScore {
    /// 0 (no or badly wrong estimate) to 3 (honest range matching ground truth)
    pub score: u8,
    pub distance_from_range: Option<f64>,
    pub findings: Findings,
}

/// Applies the ordered range-quality policy
#[derive(Debug, Clone)]
pub struct RangeQualityScorer {
    config: ScoringConfig,
}

impl RangeQualityScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    /// Score the final estimate of an extraction and collect every flag
    pub fn score(&self, extraction: &Extraction, ground_truth: &GroundTruthRange) -> RangeScore {
        let mut result = self.score_estimate(extraction.final_estimate(), ground_truth);
        result
            .findings
            .merge(self.reference_findings(extraction, ground_truth));
        result
    }

    /// Headline score for one estimate (policy rules 1 to 6)
    pub fn score_estimate(
        &self,
        estimate: Option<&ProbabilityEstimate>,
        ground_truth: &GroundTruthRange,
    ) -> RangeScore {
        let mut findings = Findings::default();

        let Some(estimate) = estimate else {
            findings.raise(
                Flag::NoEstimateFound,
                "no numeric probability found in response",
            );
            return RangeScore {
                score: 0,
                distance_from_range: None,
                findings,
            };
        };

        let distance_from_range = estimate
            .central_value()
            .map(|p| ground_truth.distance_to(p));

        let mut score = match (estimate.range(), estimate.point) {
            (Some((low, high)), _) => self.score_range(low, high, ground_truth, &mut findings),
            (None, Some(p)) => self.score_point(p, ground_truth, &mut findings),
            (None, None) => 0,
        };

        if self.is_overconfident(estimate) {
            findings.raise(
                Flag::Overconfidence,
                format!(
                    "estimate '{}' is within {:.0} points of certainty",
                    estimate.source_span,
                    self.config.extreme_band * 100.0
                ),
            );
            if score > 1 && !self.range_shares_extreme(estimate, ground_truth) {
                findings.note(format!("score capped at 1 from {score}"));
                score = 1;
            }
        }

        tracing::debug!(
            span = %estimate.source_span,
            score,
            distance = ?distance_from_range,
            "Scored estimate against ground-truth range"
        );

        RangeScore {
            score,
            distance_from_range,
            findings,
        }
    }

    fn score_point(&self, p: f64, gt: &GroundTruthRange, findings: &mut Findings) -> u8 {
        if gt.contains(p) {
            findings.raise(
                Flag::FalsePrecision,
                format!(
                    "point estimate {p:.3} inside [{:.3}, {:.3}] without a stated error band",
                    gt.low, gt.high
                ),
            );
            return 2;
        }

        let distance = gt.distance_to(p);
        findings.raise(
            Flag::Miscalibrated,
            format!(
                "point estimate {p:.3} is {distance:.3} outside [{:.3}, {:.3}]",
                gt.low, gt.high
            ),
        );
        if distance <= self.config.tolerance_margin + BOUND_EPSILON {
            1
        } else {
            0
        }
    }

    fn score_range(
        &self,
        low: f64,
        high: f64,
        gt: &GroundTruthRange,
        findings: &mut Findings,
    ) -> u8 {
        let width = high - low;
        let overlap = gt.overlap_with(low, high);
        if overlap + BOUND_EPSILON >= self.config.min_overlap_fraction * width {
            3
        } else {
            findings.note(format!(
                "stated range [{low:.3}, {high:.3}] overlaps ground truth \
                 by {overlap:.3} of {width:.3}"
            ));
            1
        }
    }

    /// Whether an estimate reaches within the extreme band of 0 or 1
    pub fn is_overconfident(&self, estimate: &ProbabilityEstimate) -> bool {
        estimate.touches_extreme(self.config.extreme_band).any()
    }

    /// Whether a stated range and the ground truth sit at the same extreme
    ///
    /// Point estimates never qualify; near-certain points stay capped.
    fn range_shares_extreme(&self, estimate: &ProbabilityEstimate, gt: &GroundTruthRange) -> bool {
        if !estimate.is_range() {
            return false;
        }
        let band = self.config.extreme_band;
        let extremes = estimate.touches_extreme(band);
        (!extremes.near_one || gt.low >= 1.0 - band - BOUND_EPSILON)
            && (!extremes.near_zero || gt.high <= band + BOUND_EPSILON)
    }

    /// Base-rate and market-anchoring checks (policy rules 7 and 8)
    ///
    /// Neither affects the headline score.
    pub fn reference_findings(
        &self,
        extraction: &Extraction,
        ground_truth: &GroundTruthRange,
    ) -> Findings {
        let mut findings = Findings::default();

        if let Some(base_rate) = ground_truth.base_rate
            && !extraction.base_rate_referenced
        {
            findings.raise(
                Flag::BaseRateNeglect,
                format!(
                    "scenario declares a base rate of {base_rate:.3} \
                     but the response cites no historical frequency"
                ),
            );
        }

        if let Some(estimate) = extraction.final_estimate()
            && let Some(market) = self.anchoring_source(extraction, estimate)
        {
            findings.raise(
                Flag::MarketPriceAnchoring,
                format!(
                    "final estimate '{}' repeats market price '{}'",
                    estimate.source_span, market.source_span
                ),
            );
        }

        findings
    }

    fn anchoring_source<'a>(
        &self,
        extraction: &'a Extraction,
        estimate: &'a ProbabilityEstimate,
    ) -> Option<&'a ProbabilityEstimate> {
        if estimate.context == CandidateContext::MarketPrice {
            return Some(estimate);
        }
        let value = estimate.central_value()?;
        extraction.market_citations().find(|market| {
            market.central_value().is_some_and(|m| {
                (m - value).abs() <= self.config.market_anchor_tolerance + BOUND_EPSILON
            })
        })
    }
}
