//! Vocabulary used to interpret the text around extracted numbers

/// Qualitative uncertainty language
///
/// "about" and "around" only hedge directly before a number, so the
/// extractor matches them with a pattern instead of listing them here.
pub const HEDGING_TERMS: &[&str] = &[
    "likely", // likely, unlikely
    "probably",
    "roughly",
    "approximately",
    "approx",
    "i'd estimate a range of",
    "range of",
    "somewhere between",
    "give or take",
    "ballpark",
    "uncertain", // uncertain, uncertainty
    "plausib",   // plausible, plausibly
    "perhaps",
    "on the order of",
    "best guess",
    "might",
];

/// Phrases that mark a number as the response's own judgment
pub const OWN_ESTIMATE_TERMS: &[&str] = &[
    "i estimate",
    "i'd estimate",
    "i would estimate",
    "my estimate",
    "our estimate",
    "we estimate",
    "final estimate",
    "i'd put",
    "i would put",
    "i put",
    "i assign",
    "i'd assign",
    "i think",
    "i believe",
    "i expect",
    "my forecast",
    "i forecast",
    "my probability",
    "my view",
];

/// Historical-frequency anchors
pub const BASE_RATE_TERMS: &[&str] = &[
    "base rate",
    "base-rate",
    "historical", // historical, historically
    "history",
    "precedent",
    "reference class",
    "in the past",
    "on average",
    "track record",
    "typically",
    "frequency",
    "prior cases",
    "similar cases",
];

/// Market-implied probability references
pub const MARKET_TERMS: &[&str] = &[
    "market",
    "implied",
    "priced",
    "pricing",
    "polymarket",
    "kalshi",
    "predictit",
    "futures",
    "consensus",
    "trading at",
    "bookmaker",
    "betting",
];

/// Whether any of `terms` occurs in already-lowercased text
pub fn contains_any(lower: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| lower.contains(term))
}

/// Distance in bytes from the end of `prefix` back to the closest term
pub fn nearest_before(prefix: &str, terms: &[&str]) -> Option<usize> {
    terms
        .iter()
        .filter_map(|term| prefix.rfind(term).map(|idx| prefix.len() - (idx + term.len())))
        .min()
}

/// Distance in bytes from the start of `suffix` to the closest term
pub fn nearest_after(suffix: &str, terms: &[&str]) -> Option<usize> {
    terms.iter().filter_map(|term| suffix.find(term)).min()
}
