//! # Structural Cataloging Module
//!
//! Builds a structural catalog for an uploaded file: per sheet, the detected
//! header row, every column's semantic role with confidence and ranked
//! alternatives, and row/column counts. No values are extracted here: the
//! catalog only describes structure, for the baseline extractor and for
//! persistence by the caller.

pub(crate) mod classify;
pub(crate) mod header;

pub use classify::ClassifyMethod;
pub use classify::Classifier;
pub use classify::ColumnClassification;
pub use classify::ColumnRole;
pub use header::detect_header;
pub use header::HeaderCandidate;

use crate::error::ResultMessage;
use crate::error::WaybillError;
use crate::sheet::parse_file;
use crate::sheet::CellValue;
use crate::sheet::ParsedFile;
use crate::sheet::ParsedSheet;
use header::HEADER_SCAN_ROWS;
use serde::Deserialize;
use serde::Serialize;

/// Data rows sampled per column for classification.
/// Extraction still walks the full data range; only classification is bounded.
pub(crate) const CLASSIFY_SAMPLE_ROWS: usize = 500;

/// Bounded sample of one column's values, taken once the header row is fixed
#[derive(Clone, Debug)]
pub struct ColumnSample {
    pub header_label: String,
    pub ordinal: usize,
    pub values: Vec<CellValue>,
}

/// Structural catalog of one sheet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SheetCatalog {
    pub sheet_name: String,
    pub columns: Vec<ColumnClassification>,
    /// Data rows below the detected header
    pub row_count: usize,
    /// Always equals `columns.len()`
    pub column_count: usize,
}

/// Structural catalog of one uploaded file; never mutated after creation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FileCatalog {
    pub file_name: String,
    pub file_size: u64,
    pub sheets: Vec<SheetCatalog>,
}

/// Catalogs an uploaded file from its raw bytes and declared name
pub fn catalog_file(bytes: &[u8], file_name: &str) -> Result<FileCatalog, WaybillError> {
    let parsed = parse_file(bytes, file_name).with_prefix(file_name)?;
    Ok(catalog_sheets(&parsed))
}

/// Catalogs every sheet of an already-parsed file.
/// Sheets without a qualifying header row, and sheets whose data rows are
/// all empty, are omitted rather than included as garbage entries.
pub fn catalog_sheets(parsed: &ParsedFile) -> FileCatalog {
    let classifier = Classifier::new();
    let mut sheets = Vec::<SheetCatalog>::new();
    for sheet in &parsed.sheets {
        match catalog_sheet(&classifier, sheet) {
            Some(catalog) => sheets.push(catalog),
            None => log::debug!(
                "skipping sheet '{}' of '{}': no usable header or data",
                sheet.name,
                parsed.file_name
            ),
        }
    }
    FileCatalog {
        file_name: parsed.file_name.to_owned(),
        file_size: parsed.file_size,
        sheets,
    }
}

fn catalog_sheet(classifier: &Classifier, sheet: &ParsedSheet) -> Option<SheetCatalog> {
    let header = detect_header(&sheet.grid, HEADER_SCAN_ROWS)?;
    let header_row = &sheet.grid[header.row_index];
    let data_rows = &sheet.grid[header.row_index + 1..];
    if data_rows.iter().all(|row| row.iter().all(CellValue::is_empty)) {
        return None;
    }
    log::debug!(
        "sheet '{}': header at row {} (score {}), {} data rows",
        sheet.name,
        header.row_index,
        header.score,
        data_rows.len()
    );

    let columns = column_samples(header_row, data_rows)
        .iter()
        .map(|sample| classifier.classify(&sample.header_label, &sample.values, sample.ordinal))
        .collect::<Vec<ColumnClassification>>();
    Some(SheetCatalog {
        sheet_name: sheet.name.to_owned(),
        column_count: columns.len(),
        row_count: data_rows.len(),
        columns,
    })
}

/// Builds one bounded sample per header column
fn column_samples(header_row: &[CellValue], data_rows: &[Vec<CellValue>]) -> Vec<ColumnSample> {
    (0..header_row.len())
        .map(|ordinal| ColumnSample {
            header_label: header_row[ordinal].to_string().trim().to_owned(),
            ordinal,
            values: data_rows
                .iter()
                .take(CLASSIFY_SAMPLE_ROWS)
                .map(|row| row[ordinal].clone())
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> CellValue {
        CellValue::Text(value.to_owned())
    }

    fn invoice_sheet() -> ParsedSheet {
        ParsedSheet {
            name: "Invoice".to_owned(),
            grid: vec![
                vec![CellValue::Empty, text("ACME LOGISTICS"), CellValue::Empty],
                vec![text("SKU"), text("Date"), text("Net Charge")],
                vec![text("W-1"), text("01/02/2024"), text("$10.00")],
                vec![text("W-2"), text("01/03/2024"), text("$12.50")],
                vec![text("W-3"), text("01/04/2024"), text("$8.25")],
            ],
        }
    }

    fn parsed(sheets: Vec<ParsedSheet>) -> ParsedFile {
        ParsedFile {
            file_name: "invoice.xlsx".to_owned(),
            file_size: 1024,
            sheets,
        }
    }

    #[test]
    fn catalogs_past_the_logo_row() {
        let catalog = catalog_sheets(&parsed(vec![invoice_sheet()]));
        assert_eq!(catalog.sheets.len(), 1);
        let sheet = &catalog.sheets[0];
        assert_eq!(sheet.row_count, 3);
        assert_eq!(sheet.column_count, 3);
        assert_eq!(sheet.column_count, sheet.columns.len());
        assert_eq!(sheet.columns[0].raw_header, "SKU");
        assert_eq!(sheet.columns[1].guessed_role, ColumnRole::Date);
        assert_eq!(sheet.columns[2].guessed_role, ColumnRole::MonetaryAmount);
    }

    #[test]
    fn headerless_sheets_are_omitted() {
        let numbers = ParsedSheet {
            name: "Numbers".to_owned(),
            grid: vec![
                vec![CellValue::Number(1.0), CellValue::Number(2.0)],
                vec![CellValue::Number(3.0), CellValue::Number(4.0)],
            ],
        };
        let catalog = catalog_sheets(&parsed(vec![numbers, invoice_sheet()]));
        assert_eq!(catalog.sheets.len(), 1);
        assert_eq!(catalog.sheets[0].sheet_name, "Invoice");
    }

    #[test]
    fn sheets_with_no_data_rows_are_omitted() {
        let empty_below = ParsedSheet {
            name: "HeaderOnly".to_owned(),
            grid: vec![
                vec![text("SKU"), text("Date"), text("Net Charge")],
                vec![CellValue::Empty, CellValue::Empty, CellValue::Empty],
            ],
        };
        let catalog = catalog_sheets(&parsed(vec![empty_below]));
        assert!(catalog.sheets.is_empty());
    }

    #[test]
    fn cataloging_is_idempotent() {
        let file = parsed(vec![invoice_sheet()]);
        let first = serde_json::to_string(&catalog_sheets(&file)).expect("serialize catalog");
        let second = serde_json::to_string(&catalog_sheets(&file)).expect("serialize catalog");
        assert_eq!(first, second);
    }

    #[test]
    fn samples_are_bounded() {
        let header_row = vec![text("Net Charge")];
        let data_rows: Vec<Vec<CellValue>> =
            (0..CLASSIFY_SAMPLE_ROWS + 100).map(|i| vec![CellValue::Number(i as f64)]).collect();
        let samples = column_samples(&header_row, &data_rows);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].values.len(), CLASSIFY_SAMPLE_ROWS);
    }

    #[test]
    fn delimited_end_to_end() -> Result<(), WaybillError> {
        let bytes = b"SKU,Date,Net Charge\nW-1,01/02/2024,$10.00\nW-2,01/03/2024,$12.50\n";
        let catalog = catalog_file(bytes, "export.csv")?;
        assert_eq!(catalog.sheets.len(), 1);
        assert_eq!(catalog.sheets[0].sheet_name, "export");
        assert_eq!(
            catalog.sheets[0].columns[2].guessed_role,
            ColumnRole::MonetaryAmount
        );
        Ok(())
    }
}
