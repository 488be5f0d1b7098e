//! Proper scoring rules for resolved forecasts

use crate::model::{ProbabilityEstimate, ResolvedOutcome};

/// Error type for proper scoring
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum ProperScoringError {
    #[error("probability must be within [0, 1], got {0}")]
    ProbabilityOutOfBounds(f64),

    #[error("estimate carries neither a point nor a range")]
    EmptyEstimate,
}

/// Brier and log-loss for one resolved prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProperScore {
    /// Probability that was scored (midpoint when only a range was given)
    pub probability: f64,
    pub brier: f64,
    pub log_loss: f64,
    /// Width of the stated range; reported alongside, never folded in
    pub range_width: Option<f64>,
    /// Whether the log-loss clamp changed the probability
    pub clamped: bool,
}

fn check_probability(p: f64) -> Result<(), ProperScoringError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ProperScoringError::ProbabilityOutOfBounds(p))
    }
}

/// Brier score `(p - y)^2`: 0 is perfect, 1 is worst
pub fn brier_score(p: f64, outcome: ResolvedOutcome) -> Result<f64, ProperScoringError> {
    check_probability(p)?;
    Ok((p - outcome.as_f64()).powi(2))
}

/// Log loss `-[y ln p + (1 - y) ln(1 - p)]` with `p` clamped to
/// `[eps, 1 - eps]`
pub fn log_loss(p: f64, outcome: ResolvedOutcome, eps: f64) -> Result<f64, ProperScoringError> {
    check_probability(p)?;
    let p = clamp_probability(p, eps);
    Ok(match outcome {
        ResolvedOutcome::Yes => -p.ln(),
        ResolvedOutcome::No => -(1.0 - p).ln(),
    })
}

pub fn clamp_probability(p: f64, eps: f64) -> f64 {
    p.clamp(eps, 1.0 - eps)
}

/// Scores extracted estimates against recorded outcomes
#[derive(Debug, Clone, Copy)]
pub struct ProperScoringCalculator {
    epsilon: f64,
}

impl ProperScoringCalculator {
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn score_probability(
        &self,
        p: f64,
        outcome: ResolvedOutcome,
    ) -> Result<ProperScore, ProperScoringError> {
        let brier = brier_score(p, outcome)?;
        let log_loss = log_loss(p, outcome, self.epsilon)?;
        let clamped = clamp_probability(p, self.epsilon) != p;

        if clamped {
            tracing::debug!(
                probability = p,
                epsilon = self.epsilon,
                "Clamped probability before taking logarithm"
            );
        }

        Ok(ProperScore {
            probability: p,
            brier,
            log_loss,
            range_width: None,
            clamped,
        })
    }

    /// Score an estimate, using the midpoint when only a range was stated
    pub fn score_estimate(
        &self,
        estimate: &ProbabilityEstimate,
        outcome: ResolvedOutcome,
    ) -> Result<ProperScore, ProperScoringError> {
        let p = estimate
            .central_value()
            .ok_or(ProperScoringError::EmptyEstimate)?;
        let score = self.score_probability(p, outcome)?;
        Ok(ProperScore {
            range_width: estimate.width(),
            ..score
        })
    }
}
