//! Workbook (.xlsx/.xlsm) reader built directly on the ZIP/XML parts:
//! workbook relationships, shared strings, number-format styles, and
//! per-worksheet cell XML. Only what cataloging needs survives parsing:
//! every cell collapses to a [`CellValue`].

use crate::error::WaybillError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::sheet::rectangularize;
use crate::sheet::CellValue;
use crate::sheet::ParsedSheet;
use crate::sheet::RawGrid;
use crate::sheet::SheetError;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use zip::ZipArchive;

// XML tag names for the workbook parts we read
const TAG_RELATIONSHIP: &[u8] = b"Relationship";
const TAG_SHEET: QName = QName(b"sheet");
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr");
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");
const TAG_FORMAT_INDEX: QName = QName(b"xf");
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");
const TAG_TEXT: QName = QName(b"t");
const TAG_ROW: QName = QName(b"row");
const TAG_CELL: QName = QName(b"c");
const TAG_INLINE_STRING: QName = QName(b"is");
const TAG_VALUE: QName = QName(b"v");

// Worksheet dimension caps; references beyond these are malformed
const MAX_ROWS: usize = 1_048_576;
const MAX_COLS: usize = 16_384;

type WorkbookArchive<'a> = ZipArchive<Cursor<&'a [u8]>>;

/// Interpretation of a cell's `t` attribute while its value is pending
#[derive(Copy, Clone, PartialEq)]
enum PendingKind {
    Number,
    SharedString,
    InlineString,
    Boolean,
    IsoDate,
    Skip,
}

/// Reads every worksheet of a workbook into raw grids
pub(crate) fn read_workbook(
    bytes: &[u8],
    file_name: &str,
) -> Result<Vec<ParsedSheet>, WaybillError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let (sheets, is_1904) = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(SheetError::EmptyWorkbook(file_name.to_owned()))?;
    }

    let date_styles = load_date_styles(&mut zip)?;
    let shared_strings = load_shared_strings(&mut zip)?;

    let mut parsed = Vec::<ParsedSheet>::new();
    for (sheet_name, zip_path) in sheets {
        let grid = read_sheet_grid(&mut zip, &zip_path, &shared_strings, &date_styles, is_1904)?;
        parsed.push(ParsedSheet {
            name: sheet_name,
            grid,
        });
    }
    Ok(parsed)
}

/// Loads worksheet names, their archive paths, and the workbook date system
fn load_workbook(zip: &mut WorkbookArchive<'_>) -> Result<(Vec<(String, String)>, bool), WaybillError> {
    let relationships = load_relationships(zip, "xl/_rels/workbook.xml.rels")?;
    let mut reader = zip
        .xml_reader("xl/workbook.xml")?
        .ok_or_else(|| SheetError::MissingWorkbookPart("xl/workbook.xml".to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.unescape_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.unescape_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&id.to_string()) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads worksheet relationships, mapping relationship IDs to archive paths
fn load_relationships(
    zip: &mut WorkbookArchive<'_>,
    path: &str,
) -> Result<HashMap<String, String>, WaybillError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| SheetError::MissingWorkbookPart(path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships matter here
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path within the archive
fn to_zip_path(path: Cow<'_, str>) -> String {
    if path.starts_with("/xl/") {
        path[1..].to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads the per-style "is this a date format" table from styles.xml.
/// Indexed by the cell `s` attribute; absent styles.xml means no date styles.
fn load_date_styles(zip: &mut WorkbookArchive<'_>) -> Result<Vec<bool>, WaybillError> {
    let mut reader = match zip.xml_reader("xl/styles.xml")? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, bool>::new();
    let mut format_indexes_context = false;
    let mut date_styles = Vec::<bool>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), is_date_format(&format));
            }
        }

        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let is_date = event.get_attribute_value("numFmtId")?
                .map(|id| {
                    custom_formats
                        .get(id.as_ref())
                        .copied()
                        .unwrap_or_else(|| is_builtin_date_format_id(&id))
                })
                .unwrap_or(false);
            date_styles.push(is_date);
        }
    });

    Ok(date_styles)
}

/// Built-in number format IDs that render as calendar dates
fn is_builtin_date_format_id(id: &str) -> bool {
    matches!(id, "14" | "15" | "16" | "17" | "22")
}

/// Scans a custom number format for date codes, skipping escapes,
/// string literals, and color/condition sections. Formats carrying only
/// time codes stay numeric.
fn is_date_format(format: &str) -> bool {
    let mut is_escaped = false;
    let mut is_literal = false;
    let mut is_color = false;
    for character in format.chars() {
        match character {
            _ if is_escaped => is_escaped = false,
            '_' | '\\' if !is_escaped => is_escaped = true,

            '"' if is_literal => is_literal = false,
            '"' if !is_literal && !is_color => is_literal = true,

            ']' if is_color => is_color = false,
            '[' if !is_color && !is_literal => is_color = true,
            _ if is_literal || is_color => (),

            'Y' | 'y' | 'D' | 'd' => return true,
            _ => (),
        }
    }
    false
}

/// Loads the shared string table; items are referenced by index from cells
fn load_shared_strings(zip: &mut WorkbookArchive<'_>) -> Result<Vec<String>, WaybillError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader("xl/sharedStrings.xml")? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            let string = read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?;
            shared_strings.push(string);
        }
    });
    Ok(shared_strings)
}

/// Reads one worksheet's cell XML into a rectangular grid
fn read_sheet_grid(
    zip: &mut WorkbookArchive<'_>,
    zip_path: &str,
    shared_strings: &[String],
    date_styles: &[bool],
    is_1904: bool,
) -> Result<RawGrid, WaybillError> {
    let mut reader = zip
        .xml_reader(zip_path)?
        .ok_or_else(|| SheetError::MissingWorkbookPart(zip_path.to_owned()))?;

    let mut grid = RawGrid::new();
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = PendingKind::Skip;
    let mut is_date_style = false;
    let mut value = String::new();

    match_xml_events!(reader => {
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
            col_count = 0;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            // Position comes from the reference attribute when present,
            // from document order otherwise
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count += 1;
            kind = match event.get_attribute_value("t")?.as_deref() {
                Some("inlineStr") | Some("str") => PendingKind::InlineString,
                Some("s") => PendingKind::SharedString,
                Some("b") => PendingKind::Boolean,
                Some("d") => PendingKind::IsoDate,
                Some("e") => PendingKind::Skip,
                _ => PendingKind::Number,
            };
            is_date_style = event.parse_attribute_value::<usize>("s")?
                .and_then(|index| date_styles.get(index).copied())
                .unwrap_or(false);
            value.clear();
        }
        Event::Start(event) if kind != PendingKind::Skip && event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if kind != PendingKind::Skip && event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if kind != PendingKind::Skip && !value.is_empty() {
                let cell = resolve_cell(kind, &value, is_date_style, shared_strings, is_1904);
                place(&mut grid, row, col, cell);
            }
        }
    });

    Ok(rectangularize(grid))
}

/// Converts a pending cell into its final value
fn resolve_cell(
    kind: PendingKind,
    value: &str,
    is_date_style: bool,
    shared_strings: &[String],
    is_1904: bool,
) -> CellValue {
    match kind {
        PendingKind::InlineString => CellValue::Text(value.to_owned()),
        PendingKind::SharedString => value
            .parse::<usize>()
            .ok()
            .and_then(|index| shared_strings.get(index))
            .map(|string| CellValue::Text(string.to_owned()))
            .unwrap_or_default(),
        PendingKind::Boolean => CellValue::Bool(value == "1"),
        PendingKind::IsoDate => parse_iso_datetime(value)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::Text(value.to_owned())),
        PendingKind::Number => match value.parse::<f64>() {
            Ok(number) if is_date_style => serial_to_datetime(number, is_1904)
                .map(CellValue::Date)
                .unwrap_or(CellValue::Number(number)),
            Ok(number) => CellValue::Number(number),
            Err(_) => CellValue::Text(value.to_owned()),
        },
        PendingKind::Skip => CellValue::Empty,
    }
}

/// Places a cell into the grid, growing rows and columns as needed
fn place(grid: &mut RawGrid, row: usize, col: usize, cell: CellValue) {
    if row >= MAX_ROWS || col >= MAX_COLS {
        log::warn!("cell reference out of worksheet bounds at ({}, {})", row, col);
        return;
    }
    while grid.len() <= row {
        grid.push(Vec::new());
    }
    let record = &mut grid[row];
    if record.len() <= col {
        record.resize(col + 1, CellValue::Empty);
    }
    record[col] = cell;
}

/// Converts an "A1"-style cell reference to zero-based (row, column) indexes
fn reference_to_index(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for letter in letters.chars() {
        if !letter.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (letter as usize - 'A' as usize + 1);
    }
    let row = digits.parse::<usize>().ok().filter(|row| *row > 0)?;
    Some((row - 1, col - 1))
}

/// Converts a workbook serial date to a calendar value.
/// Serial 0 anchors at 1899-12-30 (or 1904-01-01), with the Lotus 1-2-3
/// leap-year offset for serials below 60 in the 1900 system.
fn serial_to_datetime(serial: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let mut days = serial.trunc() as i64;
    if is_1904 {
        days += 1462;
    } else if days < 60 {
        days += 1;
    }
    let date = NaiveDate::from_ymd_opt(1899, 12, 30).expect("Hardcode date literal")
        + Duration::days(days);
    let seconds = (serial.fract() * 86_400f64).round() as i64;
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight + Duration::seconds(seconds))
}

/// Parses ISO date or datetime text as written by the `t="d"` cell type
fn parse_iso_datetime(value: &str) -> Option<NaiveDateTime> {
    if value.contains('T') {
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
    }
}

/// Reads string content from XML, skipping phonetic annotations and
/// handling text nodes, CDATA sections, and character references
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, WaybillError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_bytes_text(&event)?,
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
