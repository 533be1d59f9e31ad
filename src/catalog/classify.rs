//! Rule-based column role classification.
//! A column's role comes from three signal sources: header keywords, the
//! shape of sampled values, and column position. Every rule that fires
//! contributes weight to a candidate role; the weights normalize into a
//! confidence distribution so callers can audit why a column got its label
//! and what the runners-up were.

use crate::helpers::money::has_currency_marker;
use crate::helpers::money::parse_money;
use crate::sheet::CellValue;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;

/// Weight contributed per matched header keyword
const HEADER_KEYWORD_WEIGHT: f64 = 2.0;

/// Weight scale for strong value shapes (currency, date, zip)
const STRONG_SHAPE_WEIGHT: f64 = 1.5;

/// Weight scale for weak value shapes (bare numbers, code-like text)
const WEAK_SHAPE_WEIGHT: f64 = 1.0;

/// Weight of the leftmost-column identifier prior for unlabeled columns
const POSITIONAL_WEIGHT: f64 = 0.5;

/// Minimum fraction of samples a shape must cover before it fires
const SHAPE_FRACTION_THRESHOLD: f64 = 0.6;

/// Confidence assigned when no rule fires at all
const FALLBACK_CONFIDENCE: f64 = 0.2;

/// Semantic role of a column
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnRole {
    MonetaryAmount,
    Date,
    Identifier,
    ZipCode,
    Quantity,
    Weight,
    FreeText,
}

impl ColumnRole {
    /// Stable preference order for breaking exact weight ties
    const PREFERENCE: [ColumnRole; 7] = [
        ColumnRole::MonetaryAmount,
        ColumnRole::Date,
        ColumnRole::ZipCode,
        ColumnRole::Identifier,
        ColumnRole::Quantity,
        ColumnRole::Weight,
        ColumnRole::FreeText,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::MonetaryAmount => "monetary-amount",
            ColumnRole::Date => "date",
            ColumnRole::Identifier => "identifier",
            ColumnRole::ZipCode => "zip-code",
            ColumnRole::Quantity => "quantity",
            ColumnRole::Weight => "weight",
            ColumnRole::FreeText => "free-text",
        }
    }

    fn preference_rank(&self) -> usize {
        Self::PREFERENCE
            .iter()
            .position(|role| role == self)
            .expect("Hardcode preference order")
    }
}

/// Signal source that produced a winning guess
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifyMethod {
    HeaderTextMatch,
    ValueShapeMatch,
    PositionalDefault,
}

/// Classification result for one column
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnClassification {
    /// Header label exactly as it appears in the sheet
    pub raw_header: String,
    /// Best-guess semantic role
    pub guessed_role: ColumnRole,
    /// Normalized weight of the winning role, always within [0, 1]
    pub confidence: f64,
    /// Remaining candidates, ranked descending by normalized weight
    pub alternatives: Vec<(ColumnRole, f64)>,
    /// Signal source that contributed the most weight to the winner
    pub method: ClassifyMethod,
}

/// Keyword table per role: multi-character keywords match by containment,
/// short tokens by whole-word equality so "paid" never matches "id"
const HEADER_KEYWORDS: [(ColumnRole, &[&str]); 6] = [
    (
        ColumnRole::MonetaryAmount,
        &[
            "charge", "cost", "rate", "amount", "total", "net", "price", "fee", "freight",
            "revenue",
        ],
    ),
    (
        ColumnRole::Date,
        &["date", "day", "month", "year", "period", "pickup", "delivery"],
    ),
    (
        ColumnRole::Identifier,
        &[
            "id", "number", "no", "ref", "reference", "tracking", "invoice", "sku", "code", "pro",
        ],
    ),
    (ColumnRole::ZipCode, &["zip", "zipcode", "postal", "postcode"]),
    (
        ColumnRole::Quantity,
        &["qty", "quantity", "units", "count", "pieces", "pallets", "cartons"],
    ),
    (
        ColumnRole::Weight,
        &["weight", "lbs", "lb", "kg", "tonnage"],
    ),
];

/// Per-role weight contributions, tracked by signal source
#[derive(Default)]
struct Contributions {
    header: f64,
    shape: f64,
    positional: f64,
}

impl Contributions {
    fn total(&self) -> f64 {
        self.header + self.shape + self.positional
    }

    /// Signal source with the largest contribution; header wins ties
    fn dominant_method(&self) -> ClassifyMethod {
        if self.header >= self.shape && self.header >= self.positional {
            ClassifyMethod::HeaderTextMatch
        } else if self.shape >= self.positional {
            ClassifyMethod::ValueShapeMatch
        } else {
            ClassifyMethod::PositionalDefault
        }
    }
}

/// Rule-based column classifier with patterns compiled once
pub struct Classifier {
    zip_pattern: Regex,
    date_pattern: Regex,
    code_pattern: Regex,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier {
    pub fn new() -> Classifier {
        Classifier {
            zip_pattern: Regex::new(r"^\d{5}(-\d{4})?$").expect("Hardcode regex pattern"),
            date_pattern: Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{1,2}[/-]\d{1,2}[/-]\d{2,4})$")
                .expect("Hardcode regex pattern"),
            code_pattern: Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_/-]*$")
                .expect("Hardcode regex pattern"),
        }
    }

    /// Classifies one column from its header label, sampled values, and
    /// ordinal position. Never fails: an unrecognized column degrades to a
    /// low-confidence free-text guess instead of failing the catalog.
    pub fn classify(
        &self,
        header_label: &str,
        samples: &[CellValue],
        ordinal: usize,
    ) -> ColumnClassification {
        let mut candidates = HashMap::<ColumnRole, Contributions>::new();

        self.apply_header_rules(header_label, &mut candidates);
        self.apply_shape_rules(samples, &mut candidates);
        self.apply_positional_rules(header_label, ordinal, &mut candidates);

        self.resolve(header_label, candidates)
    }

    /// Header keyword containment/token matching
    fn apply_header_rules(&self, header_label: &str, candidates: &mut HashMap<ColumnRole, Contributions>) {
        let lowered = header_label.trim().to_lowercase();
        if lowered.is_empty() {
            return;
        }
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|token| !token.is_empty())
            .collect();

        for (role, keywords) in HEADER_KEYWORDS {
            let mut hits = 0usize;
            for keyword in keywords {
                let matched = if keyword.len() < 4 {
                    tokens.iter().any(|token| token == keyword)
                } else {
                    lowered.contains(keyword)
                };
                if matched {
                    hits += 1;
                }
            }
            if hits > 0 {
                candidates.entry(role).or_default().header +=
                    HEADER_KEYWORD_WEIGHT * hits as f64;
            }
        }
    }

    /// Value-shape matching over the non-empty samples
    fn apply_shape_rules(&self, samples: &[CellValue], candidates: &mut HashMap<ColumnRole, Contributions>) {
        let populated: Vec<&CellValue> = samples.iter().filter(|cell| !cell.is_empty()).collect();
        if populated.is_empty() {
            return;
        }
        let count = populated.len() as f64;

        let mut money = 0usize;
        let mut markers = false;
        let mut dates = 0usize;
        let mut zips = 0usize;
        let mut codes = 0usize;
        for cell in &populated {
            match cell {
                CellValue::Number(_) => money += 1,
                CellValue::Date(_) => dates += 1,
                CellValue::Text(text) => {
                    if parse_money(text).is_some() {
                        money += 1;
                        markers = markers || has_currency_marker(text);
                    }
                    if self.date_pattern.is_match(text.trim()) {
                        dates += 1;
                    }
                    if self.zip_pattern.is_match(text.trim()) {
                        zips += 1;
                    }
                    if self.is_code_shaped(text.trim()) {
                        codes += 1;
                    }
                }
                _ => (),
            }
        }

        let money_fraction = money as f64 / count;
        if money_fraction >= SHAPE_FRACTION_THRESHOLD {
            if markers {
                candidates.entry(ColumnRole::MonetaryAmount).or_default().shape +=
                    STRONG_SHAPE_WEIGHT * money_fraction;
            } else {
                candidates.entry(ColumnRole::Quantity).or_default().shape +=
                    WEAK_SHAPE_WEIGHT * money_fraction;
            }
        }

        let date_fraction = dates as f64 / count;
        if date_fraction >= SHAPE_FRACTION_THRESHOLD {
            candidates.entry(ColumnRole::Date).or_default().shape +=
                STRONG_SHAPE_WEIGHT * date_fraction;
        }

        let zip_fraction = zips as f64 / count;
        if zip_fraction >= SHAPE_FRACTION_THRESHOLD {
            candidates.entry(ColumnRole::ZipCode).or_default().shape +=
                STRONG_SHAPE_WEIGHT * zip_fraction;
        }

        let code_fraction = codes as f64 / count;
        if code_fraction >= SHAPE_FRACTION_THRESHOLD {
            candidates.entry(ColumnRole::Identifier).or_default().shape +=
                WEAK_SHAPE_WEIGHT * code_fraction;
        }
    }

    /// Leftmost unlabeled columns in carrier exports are overwhelmingly
    /// reference keys; give them a small identifier prior
    fn apply_positional_rules(
        &self,
        header_label: &str,
        ordinal: usize,
        candidates: &mut HashMap<ColumnRole, Contributions>,
    ) {
        if header_label.trim().is_empty() && ordinal == 0 {
            candidates.entry(ColumnRole::Identifier).or_default().positional += POSITIONAL_WEIGHT;
        }
    }

    /// Code-shaped text mixes letters and digits ("WIDGET-1", "PRO12345")
    fn is_code_shaped(&self, text: &str) -> bool {
        self.code_pattern.is_match(text)
            && text.chars().any(|c| c.is_ascii_alphabetic())
            && text.chars().any(|c| c.is_ascii_digit())
    }

    /// Normalizes fired candidates into the final classification
    fn resolve(
        &self,
        header_label: &str,
        candidates: HashMap<ColumnRole, Contributions>,
    ) -> ColumnClassification {
        let grand_total: f64 = candidates.values().map(Contributions::total).sum();
        if grand_total <= 0.0 {
            return ColumnClassification {
                raw_header: header_label.to_owned(),
                guessed_role: ColumnRole::FreeText,
                confidence: FALLBACK_CONFIDENCE,
                alternatives: Vec::new(),
                method: ClassifyMethod::PositionalDefault,
            };
        }

        let mut ranked: Vec<(ColumnRole, f64, ClassifyMethod)> = candidates
            .iter()
            .map(|(role, contributions)| {
                (
                    *role,
                    contributions.total() / grand_total,
                    contributions.dominant_method(),
                )
            })
            .collect();
        ranked.sort_by(|(role_a, share_a, _), (role_b, share_b, _)| {
            share_b
                .partial_cmp(share_a)
                .expect("Normalized weights are finite")
                .then(role_a.preference_rank().cmp(&role_b.preference_rank()))
        });

        let (guessed_role, confidence, method) = ranked[0];
        let alternatives = ranked[1..]
            .iter()
            .map(|(role, share, _)| (*role, *share))
            .collect();
        ColumnClassification {
            raw_header: header_label.to_owned(),
            guessed_role,
            confidence,
            alternatives,
            method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_samples(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text(v.to_string())).collect()
    }

    #[test]
    fn net_charge_with_currency_samples() {
        let classifier = Classifier::new();
        let samples = text_samples(&["$12.50", "$8.00", "$1,024.99"]);
        let result = classifier.classify("Net Charge", &samples, 2);
        assert_eq!(result.guessed_role, ColumnRole::MonetaryAmount);
        assert_eq!(result.method, ClassifyMethod::HeaderTextMatch);
        assert!(result.confidence > 0.8, "confidence {}", result.confidence);
    }

    #[test]
    fn unlabeled_currency_column_classifies_by_shape() {
        let classifier = Classifier::new();
        let samples = text_samples(&["$12.50", "$8.00"]);
        let result = classifier.classify("", &samples, 3);
        assert_eq!(result.guessed_role, ColumnRole::MonetaryAmount);
        assert_eq!(result.method, ClassifyMethod::ValueShapeMatch);
    }

    #[test]
    fn zip_shape_beats_bare_number_shape() {
        let classifier = Classifier::new();
        let samples = text_samples(&["90210", "10001", "60601-1234"]);
        let result = classifier.classify("Destination", &samples, 4);
        assert_eq!(result.guessed_role, ColumnRole::ZipCode);
        assert_eq!(result.method, ClassifyMethod::ValueShapeMatch);
    }

    #[test]
    fn date_header_and_samples() {
        let classifier = Classifier::new();
        let samples = text_samples(&["01/15/2024", "01/16/2024", "2024-01-17"]);
        let result = classifier.classify("Ship Date", &samples, 1);
        assert_eq!(result.guessed_role, ColumnRole::Date);
        assert!(!result.alternatives.is_empty() || result.confidence == 1.0);
    }

    #[test]
    fn short_keywords_match_tokens_only() {
        let classifier = Classifier::new();
        // "paid" must not match the "id" keyword
        let result = classifier.classify("Paid", &[], 0);
        assert_ne!(result.guessed_role, ColumnRole::Identifier);
        let result = classifier.classify("Shipment ID", &[], 0);
        assert_eq!(result.guessed_role, ColumnRole::Identifier);
    }

    #[test]
    fn unrecognized_column_degrades_to_free_text() {
        let classifier = Classifier::new();
        let samples = text_samples(&["lorem ipsum", "dolor sit amet"]);
        let result = classifier.classify("Remarks", &samples, 6);
        assert_eq!(result.guessed_role, ColumnRole::FreeText);
        assert_eq!(result.method, ClassifyMethod::PositionalDefault);
        assert_eq!(result.confidence, 0.2);
        assert!(result.alternatives.is_empty());
    }

    #[test]
    fn leftmost_unlabeled_column_gets_identifier_prior() {
        let classifier = Classifier::new();
        let result = classifier.classify("", &[], 0);
        assert_eq!(result.guessed_role, ColumnRole::Identifier);
        assert_eq!(result.method, ClassifyMethod::PositionalDefault);
    }

    #[test]
    fn alternatives_rank_descending() {
        let classifier = Classifier::new();
        // "Total Weight" fires both monetary ("total") and weight ("weight")
        let samples: Vec<CellValue> =
            (0..4).map(|i| CellValue::Number(i as f64 * 10.0)).collect();
        let result = classifier.classify("Total Weight", &samples, 5);
        let mut last = result.confidence;
        for (_, share) in &result.alternatives {
            assert!(*share <= last);
            last = *share;
        }
        let total: f64 = result.confidence
            + result.alternatives.iter().map(|(_, share)| share).sum::<f64>();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_bounds_hold() {
        let classifier = Classifier::new();
        let headers = ["", "Net Charge", "???", "Cost Amount Total", "x"];
        let samples = text_samples(&["a", "$1", "2024-01-01", "90210", ""]);
        for header in headers {
            for ordinal in 0..3 {
                let result = classifier.classify(header, &samples, ordinal);
                assert!(result.confidence >= 0.0 && result.confidence <= 1.0);
            }
        }
    }
}
