//! Header-row detection within noisy sheet tops.
//! Carrier exports bury the real header under logo rows, address blocks, and
//! blank padding; scoring rows on labeled-text density finds it.

use crate::sheet::CellValue;
use crate::sheet::RawGrid;

/// Rows scanned from the top of each sheet before giving up
pub(crate) const HEADER_SCAN_ROWS: usize = 10;

/// Minimum score a row needs to qualify as a header
const MIN_HEADER_SCORE: u32 = 3;

/// Domain keywords that mark a label cell as header-like
const HEADER_KEYWORDS: [&str; 9] = [
    "date", "cost", "amount", "total", "charge", "net", "id", "name", "sku",
];

/// A scored header-row candidate
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HeaderCandidate {
    /// Zero-based row index within the sheet grid
    pub row_index: usize,
    /// Labeled-text density score with keyword bonus
    pub score: u32,
}

/// Locates the best header row within the first `max_rows_to_scan` rows.
///
/// Row score counts non-empty text cells, with a +2 bonus per cell whose
/// lowercased text contains a domain keyword. Numeric cells never count,
/// so data rows score 0 no matter how wide they are. The strictly highest
/// score wins; ties keep the earliest row, since header rows appearing
/// later are more likely mid-sheet restatements. Rows scoring below the
/// minimum never qualify.
pub fn detect_header(grid: &RawGrid, max_rows_to_scan: usize) -> Option<HeaderCandidate> {
    let mut best = None::<HeaderCandidate>;
    for (row_index, row) in grid.iter().enumerate().take(max_rows_to_scan) {
        let score = score_row(row);
        if score < MIN_HEADER_SCORE {
            continue;
        }
        if best.map(|candidate| score > candidate.score).unwrap_or(true) {
            best = Some(HeaderCandidate { row_index, score });
        }
    }
    best
}

/// Scores one row on labeled-text density
fn score_row(row: &[CellValue]) -> u32 {
    let mut score = 0u32;
    for cell in row {
        if let Some(label) = label_text(cell) {
            score += 1;
            let lowered = label.to_lowercase();
            if HEADER_KEYWORDS.iter().any(|keyword| lowered.contains(keyword)) {
                score += 2;
            }
        }
    }
    score
}

/// Non-empty, non-numeric text content of a cell.
/// Numeric-looking text is excluded so delimited data rows score like
/// native numeric rows.
fn label_text(cell: &CellValue) -> Option<&str> {
    let text = cell.as_text()?.trim();
    if text.is_empty() || text.parse::<f64>().is_ok() {
        None
    } else {
        Some(text)
    }
}
