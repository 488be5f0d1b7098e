//! Probability extraction from free-form response text
//!
//! Parsing is heuristic, so the extractor returns every candidate it finds,
//! ranked with the final estimate first, instead of a single best guess.

use regex::Regex;

use crate::model::scenario::BOUND_EPSILON;
use crate::model::{CandidateContext, Extraction, ProbabilityEstimate};

pub mod terms;

use terms::{
    BASE_RATE_TERMS, HEDGING_TERMS, MARKET_TERMS, OWN_ESTIMATE_TERMS, contains_any,
    nearest_after, nearest_before,
};

/// A regex hit before bounds checking and context classification
#[derive(Debug, Clone)]
struct RawCandidate {
    start: usize,
    end: usize,
    point: Option<f64>,
    range: Option<(f64, f64)>,
}

/// Turns response text into ranked probability candidates
pub struct ProbabilityExtractor {
    percent_range: Regex,
    between_range: Regex,
    decimal_range: Regex,
    percent_point: Regex,
    decimal_point: Regex,
    approximate_number: Regex,
}

impl ProbabilityExtractor {
    pub fn new() -> Self {
        Self {
            percent_range: Regex::new(
                r"(?i)\b(\d{1,3}(?:\.\d+)?)\s*(?:%|percent|per cent)?\s*(?:-|–|—|to)\s*(\d{1,3}(?:\.\d+)?)\s*(?:%|percent\b|per cent\b)",
            )
            .unwrap(),
            between_range: Regex::new(
                r"(?i)\bbetween\s+(\d{1,3}(?:\.\d+)?)\s*(?:%|percent|per cent)?\s+and\s+(\d{1,3}(?:\.\d+)?)\s*(?:%|percent\b|per cent\b)",
            )
            .unwrap(),
            decimal_range: Regex::new(r"\b([01]\.\d+)\s*(?:-|–|—|to)\s*([01]\.\d+)\b").unwrap(),
            percent_point: Regex::new(r"(?i)\b(\d{1,3}(?:\.\d+)?)\s*(?:%|percent\b|per cent\b)")
                .unwrap(),
            // Bare decimals only count after probability wording
            decimal_point: Regex::new(
                r"(?i)\b(?:probability|likelihood|chance|odds|estimate[ds]?)\b[^\d.;!?\n]{0,40}?\b([01]\.\d+)\b",
            )
            .unwrap(),
            approximate_number: Regex::new(r"(?i)\b(?:about|around)\s+\d").unwrap(),
        }
    }

    /// Extract all probability candidates from `text`
    ///
    /// Deterministic: identical text always yields identical output.
    pub fn extract(&self, text: &str) -> Extraction {
        // ASCII lowercasing keeps byte offsets aligned with `text`
        let lower = text.to_ascii_lowercase();
        let hedging_present =
            contains_any(&lower, HEDGING_TERMS) || self.approximate_number.is_match(text);

        let mut raw = self.scan(text);
        raw.sort_by_key(|c| c.start);

        let mut own = Vec::new();
        let mut references = Vec::new();

        for (i, candidate) in raw.iter().enumerate() {
            let prev_end = if i > 0 { raw[i - 1].end } else { 0 };
            let next_start = raw.get(i + 1).map(|c| c.start).unwrap_or(text.len());
            let context = classify_context(&lower, candidate, prev_end, next_start);

            let (point, low, high) = match (candidate.point, candidate.range) {
                (_, Some((low, high))) => (None, Some(low), Some(high)),
                (point, None) => (point, None, None),
            };

            let estimate = ProbabilityEstimate {
                point,
                low,
                high,
                confidence_language_present: hedging_present,
                source_span: text[candidate.start..candidate.end].to_string(),
                offset: candidate.start,
                context,
            };

            tracing::debug!(
                span = %estimate.source_span,
                offset = estimate.offset,
                context = ?estimate.context,
                "Extracted probability candidate"
            );

            match context {
                CandidateContext::Estimate => own.push(estimate),
                CandidateContext::BaseRate | CandidateContext::MarketPrice => {
                    references.push(estimate)
                }
            }
        }

        let base_rate_referenced = contains_any(&lower, BASE_RATE_TERMS)
            || references
                .iter()
                .any(|c| c.context == CandidateContext::BaseRate);

        let candidates = rank_candidates(own, references);

        if candidates.is_empty() {
            tracing::debug!("No probability candidates found in response");
        }

        Extraction {
            candidates,
            base_rate_referenced,
            hedging_present,
        }
    }

    /// Run every pattern, ranges first; later patterns never reuse text
    /// claimed by an earlier match
    fn scan(&self, text: &str) -> Vec<RawCandidate> {
        let mut claimed: Vec<(usize, usize)> = Vec::new();
        let mut found = Vec::new();

        for (pattern, scale) in [
            (&self.percent_range, 100.0),
            (&self.between_range, 100.0),
            (&self.decimal_range, 1.0),
        ] {
            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(0) else { continue };
                if overlaps(&claimed, whole.start(), whole.end()) {
                    continue;
                }
                claimed.push((whole.start(), whole.end()));

                let bounds = parse_scaled(caps.get(1).map(|m| m.as_str()), scale)
                    .zip(parse_scaled(caps.get(2).map(|m| m.as_str()), scale));
                let Some((a, b)) = bounds else { continue };
                if !in_unit_interval(a) || !in_unit_interval(b) {
                    tracing::debug!(
                        span = whole.as_str(),
                        "Rejecting range outside [0, 1]"
                    );
                    continue;
                }

                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                let candidate = if low == high {
                    RawCandidate {
                        start: whole.start(),
                        end: whole.end(),
                        point: Some(low),
                        range: None,
                    }
                } else {
                    RawCandidate {
                        start: whole.start(),
                        end: whole.end(),
                        point: None,
                        range: Some((low, high)),
                    }
                };
                found.push(candidate);
            }
        }

        // The decimal pattern spans its keyword; only the number is claimed
        for (pattern, scale, group) in [
            (&self.percent_point, 100.0, 0),
            (&self.decimal_point, 1.0, 1),
        ] {
            for caps in pattern.captures_iter(text) {
                let Some(whole) = caps.get(group) else { continue };
                if overlaps(&claimed, whole.start(), whole.end()) {
                    continue;
                }
                claimed.push((whole.start(), whole.end()));

                if is_signed_or_embedded(text, whole.start(), whole.end()) {
                    tracing::debug!(span = whole.as_str(), "Skipping signed or embedded number");
                    continue;
                }

                let Some(value) = parse_scaled(caps.get(1).map(|m| m.as_str()), scale) else {
                    continue;
                };
                if !in_unit_interval(value) {
                    tracing::debug!(
                        span = whole.as_str(),
                        value = value,
                        "Rejecting value outside [0, 1]"
                    );
                    continue;
                }

                found.push(RawCandidate {
                    start: whole.start(),
                    end: whole.end(),
                    point: Some(value),
                    range: None,
                });
            }
        }

        found
    }
}

impl Default for ProbabilityExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Order candidates most specific first
///
/// The latest own range is the final estimate, carrying the latest own point
/// that falls inside it. Without an own range, later points revise earlier
/// ones. Remaining own ranges, then own points, then reference citations
/// follow, each latest first.
fn rank_candidates(
    own: Vec<ProbabilityEstimate>,
    references: Vec<ProbabilityEstimate>,
) -> Vec<ProbabilityEstimate> {
    let (mut ranges, mut points): (Vec<_>, Vec<_>) = own.into_iter().partition(|c| c.is_range());
    ranges.reverse();
    points.reverse();

    if let Some(final_range) = ranges.first_mut()
        && let Some((low, high)) = final_range.range()
        && let Some(point) = points
            .iter()
            .filter_map(|c| c.point)
            .find(|p| *p >= low - BOUND_EPSILON && *p <= high + BOUND_EPSILON)
    {
        final_range.point = Some(point);
    }

    ranges
        .into_iter()
        .chain(points)
        .chain(references.into_iter().rev())
        .collect()
}

fn parse_scaled(raw: Option<&str>, scale: f64) -> Option<f64> {
    raw.and_then(|s| s.parse::<f64>().ok()).map(|v| v / scale)
}

fn in_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

fn overlaps(claimed: &[(usize, usize)], start: usize, end: usize) -> bool {
    claimed.iter().any(|&(s, e)| start < e && s < end)
}

/// Negative numbers, currency amounts and dotted version strings are not
/// probabilities
fn is_signed_or_embedded(text: &str, start: usize, end: usize) -> bool {
    let before = text[..start].chars().next_back();
    if matches!(before, Some('-' | '−' | '$' | '€' | '£' | '.')) {
        return true;
    }
    let mut after = text[end..].chars();
    matches!(
        (after.next(), after.next()),
        (Some('.'), Some(c)) if c.is_ascii_digit()
    )
}

/// Whether the character at `idx` ends a clause
fn is_clause_break(lower: &str, idx: usize, c: char) -> bool {
    match c {
        ',' | ';' | '!' | '?' | '\n' => true,
        '.' => lower[idx + 1..]
            .chars()
            .next()
            .is_none_or(char::is_whitespace),
        _ => false,
    }
}

fn clause_start(lower: &str, pos: usize) -> usize {
    lower[..pos]
        .char_indices()
        .filter(|&(i, c)| is_clause_break(lower, i, c))
        .map(|(i, c)| i + c.len_utf8())
        .last()
        .unwrap_or(0)
}

fn clause_end(lower: &str, pos: usize) -> usize {
    lower[pos..]
        .char_indices()
        .find(|&(i, c)| is_clause_break(lower, pos + i, c))
        .map(|(i, _)| pos + i)
        .unwrap_or(lower.len())
}

/// Classify a candidate by the closest telling phrase in its clause
///
/// The window is bounded by clause punctuation and by the neighbouring
/// candidates, so one number's wording never leaks onto another.
fn classify_context(
    lower: &str,
    candidate: &RawCandidate,
    prev_end: usize,
    next_start: usize,
) -> CandidateContext {
    let window_start = clause_start(lower, candidate.start).max(prev_end);
    let window_end = clause_end(lower, candidate.end).min(next_start);
    let prefix = &lower[window_start.min(candidate.start)..candidate.start];
    let suffix = &lower[candidate.end..window_end.max(candidate.end)];

    let distance = |terms: &[&str]| -> Option<usize> {
        match (nearest_before(prefix, terms), nearest_after(suffix, terms)) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    };

    [
        (CandidateContext::Estimate, distance(OWN_ESTIMATE_TERMS)),
        (CandidateContext::BaseRate, distance(BASE_RATE_TERMS)),
        (CandidateContext::MarketPrice, distance(MARKET_TERMS)),
    ]
    .into_iter()
    .filter_map(|(context, d)| d.map(|d| (d, context)))
    .min_by_key(|&(d, _)| d)
    .map(|(_, context)| context)
    .unwrap_or(CandidateContext::Estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Extraction {
        ProbabilityExtractor::new().extract(text)
    }

    #[test]
    fn test_percentage_format() {
        let result = extract("I estimate a 75% probability of approval");
        let estimate = result.final_estimate().unwrap();
        assert!((estimate.point.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(estimate.source_span, "75%");
        assert_eq!(estimate.context, CandidateContext::Estimate);
    }

    #[test]
    fn test_percent_word() {
        let result = extract("approximately 80 percent chance");
        let estimate = result.final_estimate().unwrap();
        assert!((estimate.point.unwrap() - 0.80).abs() < 1e-9);
        assert!(estimate.confidence_language_present);
    }

    #[test]
    fn test_range_with_dash() {
        let result = extract("The probability is 70-80%");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.point, None);
        assert!((estimate.low.unwrap() - 0.70).abs() < 1e-9);
        assert!((estimate.high.unwrap() - 0.80).abs() < 1e-9);
        assert!((estimate.central_value().unwrap() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_range_with_en_dash_and_to() {
        let result = extract("A defensible band is 65–75%.");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.range(), Some((0.65, 0.75)));

        let result = extract("I'd say 65% to 75% is defensible");
        assert!(result.final_estimate().unwrap().is_range());
    }

    #[test]
    fn test_between_range() {
        let result = extract("Approval odds are between 40% and 55% given the panel vote");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.range(), Some((0.40, 0.55)));
        assert_eq!(result.candidates.len(), 1);
    }

    #[test]
    fn test_reversed_range_is_normalized() {
        let result = extract("somewhere in the 80-70% region");
        assert_eq!(result.final_estimate().unwrap().range(), Some((0.70, 0.80)));
    }

    #[test]
    fn test_decimal_format() {
        let result = extract("probability of 0.75 for this outcome");
        let estimate = result.final_estimate().unwrap();
        assert!((estimate.point.unwrap() - 0.75).abs() < 1e-9);

        let result = extract("a range of 0.60-0.70 seems right");
        assert_eq!(result.final_estimate().unwrap().range(), Some((0.60, 0.70)));
    }

    #[test]
    fn test_no_probability() {
        let result = extract("This is a complex situation with many factors");
        assert!(result.is_empty());
        assert!(result.final_estimate().is_none());
    }

    #[test]
    fn test_rejects_values_outside_unit_interval() {
        let result = extract("Revenue grew 150% last year and margins rose 2.5 points");
        assert!(result.is_empty());
    }

    #[test]
    fn test_skips_negative_currency_and_versions() {
        let result = extract("Shares fell -5% to $0.85 after release 1.0.3 shipped");
        assert!(result.is_empty(), "{:?}", result.candidates);
    }

    #[test]
    fn test_last_estimate_wins_but_all_are_kept() {
        let result = extract("My first instinct was 60%. After weighing the data, I estimate 72%.");
        assert_eq!(result.candidates.len(), 2);
        assert!((result.candidates[0].point.unwrap() - 0.72).abs() < 1e-9);
        assert!((result.candidates[1].point.unwrap() - 0.60).abs() < 1e-9);
    }

    #[test]
    fn test_base_rate_citation_does_not_replace_estimate() {
        let result = extract("approximately 70%, though historically base rates suggest 60–65%");
        let estimate = result.final_estimate().unwrap();
        assert!((estimate.point.unwrap() - 0.70).abs() < 1e-9);
        assert!(estimate.confidence_language_present);
        assert!(result.base_rate_referenced);

        let citation = &result.candidates[1];
        assert_eq!(citation.context, CandidateContext::BaseRate);
        assert_eq!(citation.range(), Some((0.60, 0.65)));
    }

    #[test]
    fn test_market_citation_is_classified() {
        let result = extract("Polymarket prices this at 55%, but I think 68% is fairer");
        assert!((result.final_estimate().unwrap().point.unwrap() - 0.68).abs() < 1e-9);
        let citations: Vec<_> = result.market_citations().collect();
        assert_eq!(citations.len(), 1);
        assert!((citations[0].point.unwrap() - 0.55).abs() < 1e-9);
    }

    #[test]
    fn test_nearest_phrase_decides_context() {
        let result = extract("Adjusting from the base rate I estimate 70%");
        assert_eq!(
            result.final_estimate().unwrap().context,
            CandidateContext::Estimate
        );

        let result = extract("60% is the historical base rate for this class");
        assert_eq!(
            result.final_estimate().unwrap().context,
            CandidateContext::BaseRate
        );
    }

    #[test]
    fn test_only_references_fall_back_to_last_citation() {
        let result = extract("The market implies 40%.");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.context, CandidateContext::MarketPrice);
        assert!((estimate.point.unwrap() - 0.40).abs() < 1e-9);
    }

    #[test]
    fn test_hedging_without_numbers() {
        let result = extract("It is likely but deeply uncertain");
        assert!(result.is_empty());
        assert!(result.hedging_present);
    }

    #[test]
    fn test_extreme_values_are_kept() {
        let result = extract("99.9% certain this will happen");
        let estimate = result.final_estimate().unwrap();
        assert!((estimate.point.unwrap() - 0.999).abs() < 1e-9);
        assert!(!estimate.confidence_language_present);
    }

    #[test]
    fn test_stated_range_carries_accompanying_point() {
        let result = extract("I'd estimate a range of 60-70%, with a point estimate of 65%.");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.range(), Some((0.60, 0.70)));
        assert_eq!(estimate.point, Some(0.65));
        assert_eq!(estimate.source_span, "60-70%");
        assert!(estimate.confidence_language_present);

        // The point is still listed on its own
        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.candidates[1].source_span, "65%");
        assert!(!result.candidates[1].is_range());
    }

    #[test]
    fn test_point_outside_range_is_not_merged() {
        let result = extract("I estimate 60-70%. My point estimate is 80%.");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.range(), Some((0.60, 0.70)));
        assert_eq!(estimate.point, None);
    }

    #[test]
    fn test_bare_decimal_needs_probability_wording() {
        let result = extract("I estimate 30%. The ETF flow correlation was 0.85 over the window");
        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.final_estimate().unwrap().source_span, "30%");

        let result = extract("The likelihood is roughly 0.4 in my view");
        let estimate = result.final_estimate().unwrap();
        assert_eq!(estimate.point, Some(0.4));
        assert_eq!(estimate.source_span, "0.4");
    }

    #[test]
    fn test_hedging_needs_uncertainty_wording() {
        assert!(!extract("I estimate 75%").hedging_present);
        assert!(!extract("This is about the FDA panel, 75%").hedging_present);
        assert!(extract("about 75% seems right").hedging_present);
        assert!(extract("It should land around 40 percent").hedging_present);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let extractor = ProbabilityExtractor::new();
        let text = "Market at 45%; base rates near 30%; I'd put it at 35-40%, maybe 0.38.";
        assert_eq!(extractor.extract(text), extractor.extract(text));
    }
}
