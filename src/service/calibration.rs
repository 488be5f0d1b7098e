//! Reliability binning and Expected Calibration Error
//!
//! Predictions are grouped into fixed-width bins over [0, 1]. Bin `i` of `n`
//! covers `[i/n, (i+1)/n)` and the last bin also takes 1.0. ECE weighs each
//! non-empty bin's gap between mean prediction and observed frequency by its
//! share of the pairs; empty bins stay in the curve but add nothing.

use crate::model::{CalibrationBucket, CalibrationCurve, ResolvedOutcome};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum CalibrationError {
    #[error("insufficient data: calibration needs at least one resolved prediction")]
    InsufficientData,

    #[error("{probabilities} probabilities but {outcomes} outcomes")]
    LengthMismatch { probabilities: usize, outcomes: usize },

    #[error("probability must be within [0, 1], got {0}")]
    ProbabilityOutOfBounds(f64),

    #[error("at least one calibration bin is required")]
    NoBins,
}

/// A prediction paired with how the event turned out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPair {
    pub probability: f64,
    pub outcome: ResolvedOutcome,
}

impl ResolvedPair {
    pub fn new(probability: f64, outcome: ResolvedOutcome) -> Self {
        Self {
            probability,
            outcome,
        }
    }

    /// Pair up parallel lists of predictions and outcomes
    pub fn zip(
        probabilities: &[f64],
        outcomes: &[ResolvedOutcome],
    ) -> Result<Vec<Self>, CalibrationError> {
        if probabilities.len() != outcomes.len() {
            return Err(CalibrationError::LengthMismatch {
                probabilities: probabilities.len(),
                outcomes: outcomes.len(),
            });
        }
        Ok(probabilities
            .iter()
            .zip(outcomes)
            .map(|(&p, &y)| Self::new(p, y))
            .collect())
    }
}

#[derive(Default)]
struct BinAccumulator {
    count: usize,
    predicted_sum: f64,
    positives: usize,
}

/// Builds calibration curves over a fixed number of bins
#[derive(Debug, Clone, Copy)]
pub struct CalibrationAggregator {
    bins: usize,
}

impl CalibrationAggregator {
    pub fn new(bins: usize) -> Result<Self, CalibrationError> {
        if bins == 0 {
            return Err(CalibrationError::NoBins);
        }
        Ok(Self { bins })
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    fn edge(&self, i: usize) -> f64 {
        i as f64 / self.bins as f64
    }

    fn bin_index(&self, p: f64) -> usize {
        let mut idx = ((p * self.bins as f64) as usize).min(self.bins - 1);
        // Multiplication can round across an edge; the edges decide.
        if idx > 0 && p < self.edge(idx) {
            idx -= 1;
        } else if idx + 1 < self.bins && p >= self.edge(idx + 1) {
            idx += 1;
        }
        idx
    }

    pub fn aggregate(&self, pairs: &[ResolvedPair]) -> Result<CalibrationCurve, CalibrationError> {
        if pairs.is_empty() {
            return Err(CalibrationError::InsufficientData);
        }

        let mut acc: Vec<BinAccumulator> =
            (0..self.bins).map(|_| BinAccumulator::default()).collect();

        for pair in pairs {
            let p = pair.probability;
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(CalibrationError::ProbabilityOutOfBounds(p));
            }
            let bin = &mut acc[self.bin_index(p)];
            bin.count += 1;
            bin.predicted_sum += p;
            if pair.outcome == ResolvedOutcome::Yes {
                bin.positives += 1;
            }
        }

        let total = pairs.len();
        let mut ece = 0.0;
        let buckets: Vec<CalibrationBucket> = acc
            .into_iter()
            .enumerate()
            .map(|(i, bin)| {
                let (lower, upper) = (self.edge(i), self.edge(i + 1));
                if bin.count == 0 {
                    return CalibrationBucket {
                        lower,
                        upper,
                        count: 0,
                        mean_predicted: None,
                        empirical_frequency: None,
                        gap: None,
                    };
                }

                let mean_predicted = bin.predicted_sum / bin.count as f64;
                let empirical_frequency = bin.positives as f64 / bin.count as f64;
                let gap = (mean_predicted - empirical_frequency).abs();
                ece += (bin.count as f64 / total as f64) * gap;

                tracing::debug!(
                    lower,
                    upper,
                    count = bin.count,
                    mean_predicted,
                    empirical_frequency,
                    "Calibration bucket"
                );

                CalibrationBucket {
                    lower,
                    upper,
                    count: bin.count,
                    mean_predicted: Some(mean_predicted),
                    empirical_frequency: Some(empirical_frequency),
                    gap: Some(gap),
                }
            })
            .collect();

        let positives = pairs
            .iter()
            .filter(|p| p.outcome == ResolvedOutcome::Yes)
            .count();

        Ok(CalibrationCurve {
            buckets,
            ece,
            total,
            mean_predicted: pairs.iter().map(|p| p.probability).sum::<f64>() / total as f64,
            empirical_frequency: positives as f64 / total as f64,
        })
    }
}
