//! # Baseline Extraction Module
//!
//! Locates the cost-bearing column of a cataloged file and sums it into a
//! monetary baseline. Exact canonical names are rare across carrier export
//! formats, so resolution runs through an ordered list of independent
//! strategies (exact name, fuzzy keyword, largest numeric sum), stopping at
//! the first success. Absence of a result means "could not determine a
//! baseline", which callers must never conflate with a zero-cost file.

use crate::catalog::detect_header;
use crate::catalog::header::HEADER_SCAN_ROWS;
use crate::catalog::ColumnClassification;
use crate::catalog::ColumnRole;
use crate::catalog::FileCatalog;
use crate::catalog::SheetCatalog;
use crate::helpers::money::parse_money;
use crate::sheet::CellValue;
use crate::sheet::ParsedFile;
use serde::Deserialize;
use serde::Serialize;

/// Header keywords accepted by the fuzzy resolution tier
const FUZZY_KEYWORDS: [&str; 6] = ["charge", "cost", "rate", "amount", "total", "net"];

/// Confidence reported by the exact-name tier
const EXACT_CONFIDENCE: f64 = 0.95;

/// Confidence floor and classifier scaling for the fuzzy tier
const FUZZY_BASE_CONFIDENCE: f64 = 0.55;
const FUZZY_CLASSIFIER_SCALE: f64 = 0.4;

/// Confidence reported by the largest-sum fallback tier
const STATISTICAL_CONFIDENCE: f64 = 0.35;

/// Category of freight export format, driving which canonical
/// cost column names are tried first
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarrierType {
    Parcel,
    Truckload,
    Ltl,
    Other,
}

impl CarrierType {
    /// Parses a caller-supplied carrier hint.
    /// Unrecognized hints map to `Other`, which skips the exact-name tier.
    pub fn parse(name: &str) -> CarrierType {
        match name.trim().to_ascii_uppercase().as_str() {
            "PARCEL" => CarrierType::Parcel,
            "TRUCKLOAD" | "TL" => CarrierType::Truckload,
            "LTL" => CarrierType::Ltl,
            _ => CarrierType::Other,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            CarrierType::Parcel => "PARCEL",
            CarrierType::Truckload => "TRUCKLOAD",
            CarrierType::Ltl => "LTL",
            CarrierType::Other => "OTHER",
        }
    }

    /// Canonical cost column names for this export format, lowercased
    fn canonical_cost_fields(&self) -> &'static [&'static str] {
        match self {
            CarrierType::Parcel => &["net charge", "net charges", "net amount"],
            CarrierType::Truckload => &["gross rate", "line haul", "linehaul charge"],
            CarrierType::Ltl => &["total charge", "net charge", "freight charge"],
            CarrierType::Other => &[],
        }
    }
}

/// Resolution tier that produced a baseline
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    ExactName,
    FuzzyKeyword,
    LargestNumericSum,
}

impl ExtractionMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::ExactName => "exact-name",
            ExtractionMethod::FuzzyKeyword => "fuzzy-keyword",
            ExtractionMethod::LargestNumericSum => "largest-numeric-sum",
        }
    }
}

/// An extracted monetary baseline: a derived fact produced fresh per
/// request, annotated with how it was found and how sure we are
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaselineExtraction {
    pub file_name: String,
    pub sheet_name: String,
    pub column_name: String,
    /// Aggregate of the parsed column values; always >= 0
    pub extracted_amount: f64,
    pub confidence: f64,
    pub method: ExtractionMethod,
    /// Rows actually summed; unparseable rows are excluded
    pub rows_processed: usize,
}

/// A winning column found by one resolution tier
struct TierMatch {
    sheet_name: String,
    column_name: String,
    amount: f64,
    rows_processed: usize,
    confidence: f64,
}

/// One sheet's catalog paired with its post-header data rows
struct SheetView<'a> {
    catalog: &'a SheetCatalog,
    data_rows: &'a [Vec<CellValue>],
}

/// Extracts the monetary baseline for a cataloged file.
///
/// Tiers run in order over every sheet; the first column yielding a
/// positive parseable sum wins. The third tier's "largest column sum"
/// heuristic has a known limitation: a file whose true cost column is
/// small relative to an unrelated large numeric column will pick the
/// wrong one. That behavior is intentional and preserved.
pub fn extract_baseline(
    catalog: &FileCatalog,
    parsed: &ParsedFile,
    carrier_type: CarrierType,
) -> Option<BaselineExtraction> {
    let views = sheet_views(catalog, parsed);

    let tiers: [(ExtractionMethod, fn(&[SheetView], CarrierType) -> Option<TierMatch>); 3] = [
        (ExtractionMethod::ExactName, exact_name_tier),
        (ExtractionMethod::FuzzyKeyword, fuzzy_keyword_tier),
        (ExtractionMethod::LargestNumericSum, largest_sum_tier),
    ];

    for (method, tier) in tiers {
        if let Some(found) = tier(&views, carrier_type) {
            log::debug!(
                "baseline for '{}' via {}: column '{}' on sheet '{}'",
                catalog.file_name,
                method.as_str(),
                found.column_name,
                found.sheet_name
            );
            return Some(BaselineExtraction {
                file_name: catalog.file_name.to_owned(),
                sheet_name: found.sheet_name,
                column_name: found.column_name,
                extracted_amount: found.amount,
                confidence: found.confidence,
                method,
                rows_processed: found.rows_processed,
            });
        }
    }
    log::debug!("no baseline determined for '{}'", catalog.file_name);
    None
}

/// Pairs each cataloged sheet with its raw data rows.
/// Header detection is deterministic, so re-running it reproduces the
/// exact slice the cataloger classified.
fn sheet_views<'a>(catalog: &'a FileCatalog, parsed: &'a ParsedFile) -> Vec<SheetView<'a>> {
    catalog
        .sheets
        .iter()
        .filter_map(|sheet_catalog| {
            let sheet = parsed
                .sheets
                .iter()
                .find(|sheet| sheet.name == sheet_catalog.sheet_name)?;
            let header = detect_header(&sheet.grid, HEADER_SCAN_ROWS)?;
            Some(SheetView {
                catalog: sheet_catalog,
                data_rows: &sheet.grid[header.row_index + 1..],
            })
        })
        .collect()
}

/// Tier 1: exact match against the carrier's canonical cost field names
fn exact_name_tier(views: &[SheetView], carrier_type: CarrierType) -> Option<TierMatch> {
    let canonical = carrier_type.canonical_cost_fields();
    for view in views {
        for (ordinal, column) in view.catalog.columns.iter().enumerate() {
            let header = column.raw_header.trim().to_lowercase();
            if !canonical.contains(&header.as_str()) {
                continue;
            }
            if let Some((amount, rows_processed)) = positive_column_sum(view, ordinal) {
                return Some(TierMatch {
                    sheet_name: view.catalog.sheet_name.to_owned(),
                    column_name: column.raw_header.to_owned(),
                    amount,
                    rows_processed,
                    confidence: EXACT_CONFIDENCE,
                });
            }
        }
    }
    None
}

/// Tier 2: monetary-classified columns whose header carries a cost keyword.
/// Highest classifier confidence wins; leftmost ordinal breaks ties.
fn fuzzy_keyword_tier(views: &[SheetView], _: CarrierType) -> Option<TierMatch> {
    for view in views {
        let mut candidates: Vec<(usize, &ColumnClassification)> = view
            .catalog
            .columns
            .iter()
            .enumerate()
            .filter(|(_, column)| {
                let header = column.raw_header.to_lowercase();
                column.guessed_role == ColumnRole::MonetaryAmount
                    && FUZZY_KEYWORDS.iter().any(|keyword| header.contains(keyword))
            })
            .collect();
        candidates.sort_by(|(ordinal_a, a), (ordinal_b, b)| {
            b.confidence
                .partial_cmp(&a.confidence)
                .expect("Confidence values are finite")
                .then(ordinal_a.cmp(ordinal_b))
        });

        for (ordinal, column) in candidates {
            if let Some((amount, rows_processed)) = positive_column_sum(view, ordinal) {
                let confidence = (FUZZY_BASE_CONFIDENCE
                    + FUZZY_CLASSIFIER_SCALE * column.confidence)
                    .min(EXACT_CONFIDENCE);
                return Some(TierMatch {
                    sheet_name: view.catalog.sheet_name.to_owned(),
                    column_name: column.raw_header.to_owned(),
                    amount,
                    rows_processed,
                    confidence,
                });
            }
        }
    }
    None
}

/// Tier 3: among every monetary-classified column, the largest positive
/// column sum wins. The primary cost column of an unlabeled export tends
/// to dominate surcharges and discounts in aggregate magnitude.
fn largest_sum_tier(views: &[SheetView], _: CarrierType) -> Option<TierMatch> {
    let mut best = None::<TierMatch>;
    for view in views {
        for (ordinal, column) in view.catalog.columns.iter().enumerate() {
            if column.guessed_role != ColumnRole::MonetaryAmount {
                continue;
            }
            if let Some((amount, rows_processed)) = positive_column_sum(view, ordinal) {
                if best.as_ref().map(|found| amount > found.amount).unwrap_or(true) {
                    best = Some(TierMatch {
                        sheet_name: view.catalog.sheet_name.to_owned(),
                        column_name: column.raw_header.to_owned(),
                        amount,
                        rows_processed,
                        confidence: STATISTICAL_CONFIDENCE,
                    });
                }
            }
        }
    }
    best
}

/// Sums one column across every data row.
/// Values failing monetary parsing are excluded and counted as skipped;
/// only a strictly positive sum qualifies.
fn positive_column_sum(view: &SheetView, ordinal: usize) -> Option<(f64, usize)> {
    let mut sum = 0f64;
    let mut summed = 0usize;
    let mut skipped = 0usize;
    for row in view.data_rows {
        match row.get(ordinal) {
            Some(CellValue::Number(value)) => {
                sum += value;
                summed += 1;
            }
            Some(CellValue::Text(text)) => match parse_money(text) {
                Some(value) => {
                    sum += value;
                    summed += 1;
                }
                None if !text.trim().is_empty() => skipped += 1,
                None => (),
            },
            Some(CellValue::Bool(_)) | Some(CellValue::Date(_)) => skipped += 1,
            Some(CellValue::Empty) | None => (),
        }
    }
    if skipped > 0 {
        log::warn!(
            "column {} of sheet '{}': skipped {} unparseable value(s)",
            ordinal,
            view.catalog.sheet_name,
            skipped
        );
    }
    (summed > 0 && sum > 0.0).then_some((sum, summed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::catalog_sheets;
    use crate::sheet::ParsedSheet;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    fn file(sheets: Vec<ParsedSheet>) -> ParsedFile {
        ParsedFile {
            file_name: "rates.xlsx".to_owned(),
            file_size: 2048,
            sheets,
        }
    }

    fn sheet(name: &str, grid: Vec<Vec<CellValue>>) -> ParsedSheet {
        ParsedSheet {
            name: name.to_owned(),
            grid,
        }
    }

    #[test]
    fn parcel_resolves_by_exact_name() {
        let parsed = file(vec![sheet(
            "Charges",
            vec![
                vec![text("SKU"), text("Net Charge")],
                vec![text("W-1"), text("$10.00")],
                vec![text("W-2"), text("$12.50")],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        let baseline = extract_baseline(&catalog, &parsed, CarrierType::Parcel).unwrap();
        assert_eq!(baseline.method, ExtractionMethod::ExactName);
        assert_eq!(baseline.column_name, "Net Charge");
        assert_eq!(baseline.confidence, EXACT_CONFIDENCE);
        assert!((baseline.extracted_amount - 22.5).abs() < 1e-9);
        assert_eq!(baseline.rows_processed, 2);
    }

    #[test]
    fn truckload_without_gross_rate_falls_to_fuzzy() {
        // No canonical "Gross Rate": "Rate Amount" must win via the fuzzy
        // tier, not via the largest-sum fallback
        let parsed = file(vec![sheet(
            "Linehaul",
            vec![
                vec![text("SKU"), text("Rate Amount"), text("Fuel Surcharge")],
                vec![text("W-1"), text("$100.00"), CellValue::Number(900.0)],
                vec![text("W-2"), text("$250.00"), CellValue::Number(950.0)],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        let baseline = extract_baseline(&catalog, &parsed, CarrierType::Truckload).unwrap();
        assert_eq!(baseline.method, ExtractionMethod::FuzzyKeyword);
        assert_eq!(baseline.column_name, "Rate Amount");
        assert!((baseline.extracted_amount - 350.0).abs() < 1e-9);
    }

    #[test]
    fn unlabeled_monetary_columns_fall_to_largest_sum() {
        // Neither header carries a cost keyword; the classifier still marks
        // both monetary by shape, and the dominant column wins
        let parsed = file(vec![sheet(
            "Export",
            vec![
                vec![text("SKU"), text("Spend"), text("Adjustment")],
                vec![text("W-1"), text("$900.00"), text("$1.00")],
                vec![text("W-2"), text("$800.00"), text("$2.00")],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        let baseline = extract_baseline(&catalog, &parsed, CarrierType::Other).unwrap();
        assert_eq!(baseline.method, ExtractionMethod::LargestNumericSum);
        assert_eq!(baseline.column_name, "Spend");
        assert_eq!(baseline.confidence, STATISTICAL_CONFIDENCE);
        assert!((baseline.extracted_amount - 1700.0).abs() < 1e-9);
    }

    #[test]
    fn no_usable_column_yields_none() {
        let parsed = file(vec![sheet(
            "Notes",
            vec![
                vec![text("SKU"), text("Name"), text("Comment")],
                vec![text("W-1"), text("Widget"), text("fragile")],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        assert!(extract_baseline(&catalog, &parsed, CarrierType::Parcel).is_none());
    }

    #[test]
    fn zero_sum_never_qualifies() {
        // A genuinely-zero column must come back undetermined, not zero
        let parsed = file(vec![sheet(
            "Charges",
            vec![
                vec![text("SKU"), text("Net Charge")],
                vec![text("W-1"), text("$0.00")],
                vec![text("W-2"), text("$0.00")],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        assert!(extract_baseline(&catalog, &parsed, CarrierType::Parcel).is_none());
    }

    #[test]
    fn unparseable_rows_are_excluded_from_the_count() {
        let parsed = file(vec![sheet(
            "Charges",
            vec![
                vec![text("SKU"), text("Net Charge")],
                vec![text("W-1"), text("$10.00")],
                vec![text("W-2"), text("N/A")],
                vec![text("W-3"), text("$5.00")],
                vec![text("W-4"), CellValue::Empty],
            ],
        )]);
        let catalog = catalog_sheets(&parsed);
        let baseline = extract_baseline(&catalog, &parsed, CarrierType::Parcel).unwrap();
        assert_eq!(baseline.rows_processed, 2);
        assert!((baseline.extracted_amount - 15.0).abs() < 1e-9);
    }

    #[test]
    fn second_sheet_is_searched() {
        let parsed = file(vec![
            sheet(
                "Summary",
                vec![
                    vec![text("SKU"), text("Name"), text("Count")],
                    vec![text("W-1"), text("Widget"), CellValue::Number(3.0)],
                ],
            ),
            sheet(
                "Detail",
                vec![
                    vec![text("SKU"), text("Net Charge")],
                    vec![text("W-1"), text("$42.00")],
                ],
            ),
        ]);
        let catalog = catalog_sheets(&parsed);
        let baseline = extract_baseline(&catalog, &parsed, CarrierType::Parcel).unwrap();
        assert_eq!(baseline.sheet_name, "Detail");
    }

    #[test]
    fn carrier_hints_parse_leniently() {
        assert_eq!(CarrierType::parse("PARCEL"), CarrierType::Parcel);
        assert_eq!(CarrierType::parse("truckload"), CarrierType::Truckload);
        assert_eq!(CarrierType::parse(" ltl "), CarrierType::Ltl);
        assert_eq!(CarrierType::parse("ocean"), CarrierType::Other);
        assert_eq!(CarrierType::parse(""), CarrierType::Other);
    }
}
