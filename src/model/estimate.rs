use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What a parsed number is doing in the sentence around it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CandidateContext {
    /// The response's own judgment
    Estimate,
    /// A cited historical frequency
    BaseRate,
    /// A cited market-implied probability
    MarketPrice,
}

/// One probability judgment parsed out of a response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProbabilityEstimate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<f64>,
    /// Whether the response hedges with qualitative uncertainty terms
    pub confidence_language_present: bool,
    /// Substring the value was parsed from
    pub source_span: String,
    /// Byte offset of `source_span` within the response text
    pub offset: usize,
    pub context: CandidateContext,
}

impl ProbabilityEstimate {
    /// The stated range, if the response gave one
    pub fn range(&self) -> Option<(f64, f64)> {
        self.low.zip(self.high)
    }

    pub fn is_range(&self) -> bool {
        self.range().is_some()
    }

    /// Point value, or the midpoint of a stated range
    pub fn central_value(&self) -> Option<f64> {
        self.point
            .or_else(|| self.range().map(|(low, high)| (low + high) / 2.0))
    }

    /// Width of the stated range, if any
    pub fn width(&self) -> Option<f64> {
        self.range().map(|(low, high)| high - low)
    }

    /// Whether the estimate reaches within `band` of 0 or 1
    pub fn touches_extreme(&self, band: f64) -> Extremes {
        let (low, high) = match (self.range(), self.point) {
            (Some(range), _) => range,
            (None, Some(p)) => (p, p),
            (None, None) => return Extremes::default(),
        };
        Extremes {
            near_zero: low <= band + f64::EPSILON,
            near_one: high >= 1.0 - band - f64::EPSILON,
        }
    }
}

/// Which probability extremes an estimate approaches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Extremes {
    pub near_zero: bool,
    pub near_one: bool,
}

impl Extremes {
    pub fn any(&self) -> bool {
        self.near_zero || self.near_one
    }
}

/// Everything the extractor found in one response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Extraction {
    /// Candidates ranked with the final estimate first
    pub candidates: Vec<ProbabilityEstimate>,
    /// Whether the text cites a historical frequency anywhere
    pub base_rate_referenced: bool,
    /// Whether the text hedges with qualitative uncertainty terms
    pub hedging_present: bool,
}

impl Extraction {
    /// The estimate the response ultimately commits to
    pub fn final_estimate(&self) -> Option<&ProbabilityEstimate> {
        self.candidates.first()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Candidates citing a market-implied probability
    pub fn market_citations(&self) -> impl Iterator<Item = &ProbabilityEstimate> {
        self.candidates
            .iter()
            .filter(|c| c.context == CandidateContext::MarketPrice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(point: Option<f64>, range: Option<(f64, f64)>) -> ProbabilityEstimate {
        ProbabilityEstimate {
            point,
            low: range.map(|r| r.0),
            high: range.map(|r| r.1),
            confidence_language_present: false,
            source_span: String::new(),
            offset: 0,
            context: CandidateContext::Estimate,
        }
    }

    #[test]
    fn test_central_value_uses_midpoint_for_range() {
        let e = estimate(None, Some((0.6, 0.8)));
        assert!((e.central_value().unwrap() - 0.7).abs() < 1e-12);
        assert!((e.width().unwrap() - 0.2).abs() < 1e-12);

        let p = estimate(Some(0.42), None);
        assert_eq!(p.central_value(), Some(0.42));
        assert_eq!(p.width(), None);
    }

    #[test]
    fn test_touches_extreme() {
        assert!(estimate(Some(0.999), None).touches_extreme(0.03).near_one);
        assert!(estimate(Some(0.03), None).touches_extreme(0.03).near_zero);
        assert!(!estimate(Some(0.5), None).touches_extreme(0.03).any());
        let wide = estimate(None, Some((0.01, 0.5))).touches_extreme(0.03);
        assert!(wide.near_zero && !wide.near_one);
    }
}
