//! # Sheet Ingestion Module
//!
//! Reads uploaded carrier cost files into raw cell grids. Two input variants
//! are supported, inferred from the file extension alone: multi-sheet
//! workbooks (`.xlsx`, `.xlsm`) parsed from their ZIP/XML parts, and
//! delimited text exports (`.csv`, `.tsv`, `.txt`). Both produce the same
//! rectangular [`RawGrid`] so downstream cataloging is format-agnostic.

pub(crate) mod delimited;
pub(crate) mod xlsx;

use crate::error::WaybillError;
use chrono::NaiveDateTime;
use std::fmt::Display;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading uploaded file bytes into grids
#[derive(Error, Debug)]
pub enum SheetError {
    /// File extension maps to no supported input variant
    #[error("Cannot detect file format for '{0}'")]
    UnsupportedFormat(String),

    /// Workbook archive contains no worksheets
    #[error("Workbook '{0}' contains no worksheets")]
    EmptyWorkbook(String),

    /// Required workbook part is missing from the archive
    #[error("Workbook part '{0}' is missing")]
    MissingWorkbookPart(String),
}

/// A single raw cell value as read from a source file.
/// Dates appear where workbook number formats mark a cell as a calendar
/// value; delimited text never produces them directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Date(NaiveDateTime),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Native numeric content, if any. Text is never coerced here;
    /// monetary coercion belongs to the extraction layer.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    /// Text content for header labels and classification samples
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Bool(value) => write!(f, "{}", value),
            CellValue::Number(value) => write!(f, "{}", value),
            CellValue::Date(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            CellValue::Text(value) => write!(f, "{}", value),
        }
    }
}

/// An ordered, rectangular grid of raw cell values for one sheet
pub type RawGrid = Vec<Vec<CellValue>>;

/// One sheet read from a source file
#[derive(Clone, Debug)]
pub struct ParsedSheet {
    /// Sheet name; delimited files carry a single implicit sheet named after the file
    pub name: String,
    /// Raw cell grid, immutable once read
    pub grid: RawGrid,
}

/// All sheets read from one uploaded file
#[derive(Clone, Debug)]
pub struct ParsedFile {
    pub file_name: String,
    pub file_size: u64,
    pub sheets: Vec<ParsedSheet>,
}

/// Input variant, inferred from the file extension (never from content sniffing)
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SheetFormat {
    /// Multi-sheet ZIP/XML workbook
    Workbook,
    /// Single-sheet delimited text
    Delimited,
}

impl SheetFormat {
    pub fn from_file_name(file_name: &str) -> Option<SheetFormat> {
        let extension = Path::new(file_name)
            .extension()
            .map(|extension| extension.to_string_lossy().to_lowercase());
        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Some(SheetFormat::Workbook),
            Some("csv") | Some("tsv") | Some("txt") => Some(SheetFormat::Delimited),
            _ => None,
        }
    }
}

/// Reads uploaded file bytes into raw sheet grids.
/// The declared file name selects the parser; the bytes are read exactly once.
pub fn parse_file(bytes: &[u8], file_name: &str) -> Result<ParsedFile, WaybillError> {
    let format = SheetFormat::from_file_name(file_name)
        .ok_or_else(|| SheetError::UnsupportedFormat(file_name.to_owned()))?;
    let sheets = match format {
        SheetFormat::Workbook => xlsx::read_workbook(bytes, file_name)?,
        SheetFormat::Delimited => delimited::read_delimited(bytes, file_name)?,
    };
    log::debug!(
        "parsed '{}': {} bytes, {} sheet(s)",
        file_name,
        bytes.len(),
        sheets.len()
    );
    Ok(ParsedFile {
        file_name: file_name.to_owned(),
        file_size: bytes.len() as u64,
        sheets,
    })
}

/// Pads every row of a grid to the same width
pub(crate) fn rectangularize(mut grid: RawGrid) -> RawGrid {
    let width = grid.iter().map(|row| row.len()).max().unwrap_or(0);
    for row in &mut grid {
        row.resize(width, CellValue::Empty);
    }
    grid
}
