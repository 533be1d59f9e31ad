//! Delimited-text reader for single-sheet carrier exports.
//! Carrier portals disagree on everything: encoding (UTF-8, UTF-16 with BOM,
//! Windows-1252), separator (comma, semicolon, tab, pipe), and quoting. The
//! reader absorbs all of it and produces one implicit sheet.

use crate::error::WaybillError;
use crate::sheet::rectangularize;
use crate::sheet::CellValue;
use crate::sheet::ParsedSheet;
use crate::sheet::RawGrid;
use std::path::Path;

/// Candidate separators, in preference order for ties
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Number of leading lines inspected while sniffing the separator
const SNIFF_LINES: usize = 10;

/// Reads delimited text bytes into a single implicit sheet named after the file
pub(crate) fn read_delimited(
    bytes: &[u8],
    file_name: &str,
) -> Result<Vec<ParsedSheet>, WaybillError> {
    let text = decode_text(bytes);
    let delimiter = sniff_delimiter(&text);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut grid = RawGrid::new();
    for record in reader.records() {
        let record = record?;
        let row = record.iter().map(to_cell_value).collect();
        grid.push(row);
    }

    Ok(vec![ParsedSheet {
        name: sheet_name(file_name),
        grid: rectangularize(grid),
    }])
}

/// Decodes raw bytes to text: BOM-sniffed UTF-8/UTF-16 first,
/// Windows-1252 as the lossless legacy fallback
fn decode_text(bytes: &[u8]) -> String {
    let (text, encoding, had_errors) = encoding_rs::UTF_8.decode(bytes);
    if !had_errors {
        log::debug!("decoded delimited text as {}", encoding.name());
        return text.into_owned();
    }
    let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    log::debug!("decoded delimited text as windows-1252 fallback");
    text.into_owned()
}

/// Picks the separator with the highest count over the leading non-empty lines
fn sniff_delimiter(text: &str) -> u8 {
    let mut counts = [0usize; DELIMITERS.len()];
    for line in text.lines().filter(|line| !line.trim().is_empty()).take(SNIFF_LINES) {
        for (index, delimiter) in DELIMITERS.iter().enumerate() {
            counts[index] += line.bytes().filter(|byte| byte == delimiter).count();
        }
    }
    let mut best = 0usize;
    for index in 1..DELIMITERS.len() {
        if counts[index] > counts[best] {
            best = index;
        }
    }
    DELIMITERS[best]
}

/// Converts one delimited field to a cell value.
/// Numeric-looking fields surface as numbers so delimited data classifies
/// the same way workbook data does.
fn to_cell_value(field: &str) -> CellValue {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        CellValue::Empty
    } else if let Ok(number) = trimmed.parse::<f64>() {
        CellValue::Number(number)
    } else {
        CellValue::Text(trimmed.to_owned())
    }
}

/// Implicit sheet name for a delimited file: the file stem
fn sheet_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| file_name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_separated_round_trip() -> Result<(), WaybillError> {
        let bytes = b"SKU,Net Charge\nWIDGET-1,12.50\nWIDGET-2,8.00\n";
        let sheets = read_delimited(bytes, "export.csv")?;
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].name, "export");
        let grid = &sheets[0].grid;
        assert_eq!(grid.len(), 3);
        assert_eq!(grid[0][0], CellValue::Text("SKU".to_owned()));
        assert_eq!(grid[1][1], CellValue::Number(12.5));
        Ok(())
    }

    #[test]
    fn semicolon_sniffing() -> Result<(), WaybillError> {
        let bytes = b"SKU;Net Charge;Zone\nA;1,50;2\n";
        let sheets = read_delimited(bytes, "export.csv")?;
        let grid = &sheets[0].grid;
        assert_eq!(grid[0].len(), 3);
        assert_eq!(grid[0][2], CellValue::Text("Zone".to_owned()));
        Ok(())
    }

    #[test]
    fn tab_sniffing() -> Result<(), WaybillError> {
        let bytes = b"SKU\tNet Charge\nA\t1.50\n";
        let sheets = read_delimited(bytes, "export.tsv")?;
        assert_eq!(sheets[0].grid[1][1], CellValue::Number(1.5));
        Ok(())
    }

    #[test]
    fn quoted_fields_keep_embedded_separators() -> Result<(), WaybillError> {
        let bytes = b"Carrier,Amount\n\"Acme, Inc.\",5.00\n";
        let sheets = read_delimited(bytes, "export.csv")?;
        let grid = &sheets[0].grid;
        assert_eq!(grid[1][0], CellValue::Text("Acme, Inc.".to_owned()));
        Ok(())
    }

    #[test]
    fn windows_1252_fallback() -> Result<(), WaybillError> {
        // "Qu\xe9bec" is not valid UTF-8; 0xe9 decodes to 'é' in Windows-1252
        let bytes = b"City,Cost\nQu\xe9bec,9.99\n";
        let sheets = read_delimited(bytes, "export.csv")?;
        assert_eq!(
            sheets[0].grid[1][0],
            CellValue::Text("Qu\u{e9}bec".to_owned())
        );
        Ok(())
    }

    #[test]
    fn ragged_rows_are_padded() -> Result<(), WaybillError> {
        let bytes = b"A,B,C\n1,2\n";
        let sheets = read_delimited(bytes, "export.csv")?;
        let grid = &sheets[0].grid;
        assert_eq!(grid[1].len(), 3);
        assert_eq!(grid[1][2], CellValue::Empty);
        Ok(())
    }
}
