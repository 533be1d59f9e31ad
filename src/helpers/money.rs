//! Monetary text parsing for carrier cost columns.
//! Carrier exports format the same charge a dozen ways: "$1,234.56", "1234.56 USD",
//! "(42.00)" for credits. Parsing normalizes all of them to a plain f64.

/// Currency symbols recognized in monetary cells
const CURRENCY_SYMBOLS: [char; 4] = ['$', '€', '£', '¥'];

/// ISO-style currency codes recognized as cell prefixes or suffixes
const CURRENCY_CODES: [&str; 5] = ["usd", "eur", "gbp", "cad", "mxn"];

/// Parses a monetary text value into a number.
///
/// Strips currency symbols, currency codes, thousands separators, and
/// surrounding whitespace before coercion. Accounting-style parentheses
/// denote negative amounts. Returns None when no parseable number remains.
pub(crate) fn parse_money(value: &str) -> Option<f64> {
    let mut text = value.trim();
    if text.is_empty() {
        return None;
    }

    let mut negative = false;
    if text.starts_with('(') && text.ends_with(')') {
        negative = true;
        text = text[1..text.len() - 1].trim();
    }

    let lowered = text.to_lowercase();
    let mut trimmed = lowered.as_str();
    for code in CURRENCY_CODES {
        trimmed = trimmed
            .strip_prefix(code)
            .or_else(|| trimmed.strip_suffix(code))
            .unwrap_or(trimmed)
            .trim();
    }

    let cleaned: String = trimmed
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c) && *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    cleaned.parse::<f64>().ok().map(|amount| {
        if negative {
            -amount
        } else {
            amount
        }
    })
}

/// Checks whether a text value carries an explicit currency marker.
/// Distinguishes monetary columns from plain quantity columns during classification.
pub(crate) fn has_currency_marker(value: &str) -> bool {
    let lowered = value.to_lowercase();
    value.chars().any(|c| CURRENCY_SYMBOLS.contains(&c))
        || CURRENCY_CODES
            .iter()
            .any(|code| lowered.starts_with(code) || lowered.ends_with(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_number() {
        assert_eq!(parse_money("1234.56"), Some(1234.56));
    }

    #[test]
    fn symbol_and_thousands_separators() {
        assert_eq!(parse_money("$1,234.56"), Some(1234.56));
        assert_eq!(parse_money("€ 12,345"), Some(12345.0));
    }

    #[test]
    fn currency_code_suffix() {
        assert_eq!(parse_money("1234.56 USD"), Some(1234.56));
        assert_eq!(parse_money("usd 99"), Some(99.0));
    }

    #[test]
    fn accounting_negative() {
        assert_eq!(parse_money("(42.00)"), Some(-42.0));
        assert_eq!(parse_money("($1,000.00)"), Some(-1000.0));
    }

    #[test]
    fn unparseable_values() {
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("   "), None);
        assert_eq!(parse_money("N/A"), None);
        assert_eq!(parse_money("$"), None);
        assert_eq!(parse_money("12-34-56"), None);
    }

    #[test]
    fn currency_markers() {
        assert!(has_currency_marker("$12.00"));
        assert!(has_currency_marker("12.00 USD"));
        assert!(!has_currency_marker("12.00"));
        assert!(!has_currency_marker("FREIGHT"));
    }
}
