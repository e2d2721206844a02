//! Event catalog: startup loading and month filtering.
//!
//! The catalog is read once from an `.xlsx` workbook (first worksheet,
//! header row first) and is immutable for the process lifetime. Each row
//! keeps a stable positional index, which is how cached embedding vectors
//! stay aligned with their records.
//!
//! Workbook parsing walks the OOXML parts directly with `zip` +
//! `quick-xml`: shared strings, inline strings, booleans, and numeric
//! cells are supported; cell positions come from `r="B2"`-style
//! references so sparse rows stay aligned with the header.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::io::Read;
use std::path::Path;

use crate::models::EventRecord;

/// Maximum decompressed bytes read from a single ZIP entry (zip-bomb guard).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// The loaded event catalog.
#[derive(Debug)]
pub struct Catalog {
    records: Vec<EventRecord>,
    columns: Vec<String>,
}

impl Catalog {
    /// Load the catalog from an `.xlsx` workbook.
    ///
    /// The first worksheet is read; its first row is the header. A `Month`
    /// and a `Description` column must be present (matched
    /// case-insensitively); all other columns pass through as opaque
    /// metadata. Missing `Description` cells become empty strings.
    pub fn load(path: &Path) -> Result<Catalog> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        parse_workbook(&bytes)
            .with_context(|| format!("Failed to parse catalog workbook: {}", path.display()))
    }

    /// Build a catalog directly from records, for embedded use and tests.
    pub fn from_records(records: Vec<EventRecord>) -> Catalog {
        let columns = records
            .first()
            .map(|r| r.fields.keys().cloned().collect())
            .unwrap_or_default();
        Catalog { records, columns }
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Description text per record, positionally aligned, for embedding.
    pub fn descriptions(&self) -> Vec<String> {
        self.records.iter().map(|r| r.description.clone()).collect()
    }

    /// Indices of records whose month field contains `month`,
    /// case-insensitively.
    ///
    /// Substring containment, not equality: a record filed under
    /// "November/December" matches a December query. Records with an empty
    /// month field never match. Original positional indices are preserved.
    pub fn filter_by_month(&self, month: &str) -> Vec<usize> {
        let needle = month.to_lowercase();
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.month.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect()
    }
}

fn parse_workbook(bytes: &[u8]) -> Result<Catalog> {
    let mut archive =
        zip::ZipArchive::new(std::io::Cursor::new(bytes)).context("not a valid xlsx archive")?;

    let shared_strings = read_shared_strings(&mut archive)?;
    let sheet_name = first_worksheet_name(&mut archive)?;
    let sheet_xml = read_zip_entry_bounded(&mut archive, &sheet_name)?;
    let rows = parse_sheet_rows(&sheet_xml, &shared_strings)?;

    build_catalog(rows)
}

fn build_catalog(rows: Vec<Vec<Option<Value>>>) -> Result<Catalog> {
    let mut iter = rows.into_iter();
    let header_row = iter.next().ok_or_else(|| anyhow::anyhow!("workbook has no rows"))?;

    let columns: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, cell)| match cell {
            Some(v) => value_to_string(v).trim().to_string(),
            None => format!("Column{}", i + 1),
        })
        .collect();

    let month_col = columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case("month"))
        .ok_or_else(|| anyhow::anyhow!("catalog is missing a 'Month' column (found: {:?})", columns))?;
    let description_col = columns
        .iter()
        .position(|c| c.eq_ignore_ascii_case("description"))
        .ok_or_else(|| {
            anyhow::anyhow!("catalog is missing a 'Description' column (found: {:?})", columns)
        })?;

    let mut records = Vec::new();
    for row in iter {
        if row.iter().all(|c| c.is_none()) {
            continue;
        }

        let mut fields = serde_json::Map::new();
        for (i, name) in columns.iter().enumerate() {
            let value = row.get(i).cloned().flatten().unwrap_or(Value::Null);
            fields.insert(name.clone(), value);
        }

        let month = row
            .get(month_col)
            .cloned()
            .flatten()
            .map(|v| value_to_string(&v))
            .unwrap_or_default();
        let description = row
            .get(description_col)
            .cloned()
            .flatten()
            .map(|v| value_to_string(&v))
            .unwrap_or_default();

        records.push(EventRecord {
            month,
            description,
            fields,
        });
    }

    Ok(Catalog { records, columns })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
) -> Result<Vec<u8>> {
    let entry = archive
        .by_name(name)
        .with_context(|| format!("missing workbook part: {}", name))?;
    let mut out = Vec::new();
    entry.take(MAX_XML_ENTRY_BYTES).read_to_end(&mut out)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        bail!("workbook part {} exceeds size limit", name);
    }
    Ok(out)
}

/// Worksheets sorted by sheet number; the catalog lives in the first one.
fn first_worksheet_name(archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>) -> Result<String> {
    let mut names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("xl/worksheets/sheet") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    names.sort_by_key(|name| {
        name.trim_start_matches("xl/worksheets/sheet")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });
    names
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("workbook contains no worksheets"))
}

/// Shared strings table, absent in workbooks that only use inline cells.
///
/// Rich-text entries are flattened: all `<t>` runs within one `<si>`
/// concatenate into a single table entry so indices stay aligned.
fn read_shared_strings(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
) -> Result<Vec<String>> {
    if archive.by_name("xl/sharedStrings.xml").is_err() {
        return Ok(Vec::new());
    }
    let xml = read_zip_entry_bounded(archive, "xl/sharedStrings.xml")?;

    let mut strings = Vec::new();
    let mut reader = quick_xml::Reader::from_reader(xml.as_slice());
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_si = false;
    let mut in_t = false;
    let mut current = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) if in_t => {
                current.push_str(te.unescape().unwrap_or_default().as_ref());
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_t = false,
                b"si" => {
                    in_si = false;
                    strings.push(std::mem::take(&mut current));
                }
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("invalid sharedStrings.xml: {}", e),
            _ => {}
        }
        buf.clear();
    }
    Ok(strings)
}

/// Cell data types as flagged by the `t` attribute.
#[derive(Clone, Copy, PartialEq)]
enum CellType {
    Number,
    SharedString,
    InlineString,
    FormulaString,
    Boolean,
}

fn parse_sheet_rows(xml: &[u8], shared_strings: &[String]) -> Result<Vec<Vec<Option<Value>>>> {
    let mut rows: Vec<Vec<Option<Value>>> = Vec::new();
    let mut current_row: Vec<Option<Value>> = Vec::new();

    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut cell_type = CellType::Number;
    let mut cell_col: usize = 0;
    let mut cell_value: Option<Value> = None;
    let mut in_v = false;
    let mut in_is = false;
    let mut in_is_t = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => match e.local_name().as_ref() {
                b"row" => current_row.clear(),
                b"c" => {
                    cell_type = CellType::Number;
                    cell_col = current_row.len();
                    cell_value = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => {
                                if let Some(col) = column_index(attr.value.as_ref()) {
                                    cell_col = col;
                                }
                            }
                            b"t" => {
                                cell_type = match attr.value.as_ref() {
                                    b"s" => CellType::SharedString,
                                    b"inlineStr" => CellType::InlineString,
                                    b"str" => CellType::FormulaString,
                                    b"b" => CellType::Boolean,
                                    _ => CellType::Number,
                                };
                            }
                            _ => {}
                        }
                    }
                }
                b"v" => in_v = true,
                b"is" => in_is = true,
                b"t" if in_is => in_is_t = true,
                _ => {}
            },
            Ok(quick_xml::events::Event::Text(te)) => {
                let text = te.unescape().unwrap_or_default();
                if in_v {
                    cell_value = Some(typed_cell_value(cell_type, text.as_ref(), shared_strings));
                } else if in_is_t {
                    let appended = match cell_value.take() {
                        Some(Value::String(mut s)) => {
                            s.push_str(text.as_ref());
                            s
                        }
                        _ => text.into_owned(),
                    };
                    cell_value = Some(Value::String(appended));
                }
            }
            Ok(quick_xml::events::Event::End(e)) => match e.local_name().as_ref() {
                b"v" => in_v = false,
                b"t" => in_is_t = false,
                b"is" => in_is = false,
                b"c" => {
                    if let Some(value) = cell_value.take() {
                        if current_row.len() <= cell_col {
                            current_row.resize(cell_col + 1, None);
                        }
                        current_row[cell_col] = Some(value);
                    }
                }
                b"row" => rows.push(std::mem::take(&mut current_row)),
                _ => {}
            },
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => bail!("invalid worksheet XML: {}", e),
            _ => {}
        }
        buf.clear();
    }

    Ok(rows)
}

fn typed_cell_value(cell_type: CellType, text: &str, shared_strings: &[String]) -> Value {
    match cell_type {
        CellType::SharedString => text
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i))
            .map(|s| Value::String(s.clone()))
            .unwrap_or(Value::Null),
        CellType::InlineString | CellType::FormulaString => Value::String(text.to_string()),
        CellType::Boolean => Value::Bool(text.trim() == "1"),
        CellType::Number => parse_number(text),
    }
}

fn parse_number(text: &str) -> Value {
    let Ok(f) = text.trim().parse::<f64>() else {
        return Value::String(text.to_string());
    };
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Value::Number((f as i64).into())
    } else {
        serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Convert the letter part of an `A1`-style cell reference to a 0-based
/// column index.
fn column_index(cell_ref: &[u8]) -> Option<usize> {
    let mut col: usize = 0;
    let mut seen_letter = false;
    for &b in cell_ref {
        match b {
            b'A'..=b'Z' => {
                col = col * 26 + (b - b'A' + 1) as usize;
                seen_letter = true;
            }
            b'a'..=b'z' => {
                col = col * 26 + (b - b'a' + 1) as usize;
                seen_letter = true;
            }
            _ => break,
        }
    }
    seen_letter.then(|| col - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Build a one-sheet workbook whose cells are inline strings.
    fn workbook(rows: &[&[&str]]) -> Vec<u8> {
        let mut sheet = String::from(
            "<?xml version=\"1.0\"?><worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
        );
        for (ri, row) in rows.iter().enumerate() {
            sheet.push_str(&format!("<row r=\"{}\">", ri + 1));
            for (ci, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                let col_letter = (b'A' + ci as u8) as char;
                sheet.push_str(&format!(
                    "<c r=\"{}{}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    col_letter,
                    ri + 1,
                    cell
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(
                "xl/worksheets/sheet1.xml",
                zip::write::SimpleFileOptions::default(),
            )
            .unwrap();
            zip.write_all(sheet.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    fn load_bytes(bytes: &[u8]) -> Result<Catalog> {
        parse_workbook(bytes)
    }

    #[test]
    fn loads_rows_and_columns() {
        let bytes = workbook(&[
            &["Month", "Description", "Location"],
            &["December", "Winter lights festival", "Harbor"],
            &["June", "Open air concert", "Park"],
        ]);
        let catalog = load_bytes(&bytes).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.columns(), &["Month", "Description", "Location"]);
        assert_eq!(catalog.records()[0].month, "December");
        assert_eq!(catalog.records()[1].description, "Open air concert");
        assert_eq!(
            catalog.records()[0].fields.get("Location"),
            Some(&Value::String("Harbor".into()))
        );
    }

    #[test]
    fn missing_description_cell_becomes_empty() {
        let bytes = workbook(&[
            &["Month", "Description"],
            &["July", ""],
        ]);
        let catalog = load_bytes(&bytes).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].description, "");
        assert_eq!(catalog.records()[0].fields.get("Description"), Some(&Value::Null));
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let bytes = workbook(&[&["Month", "Name"], &["May", "Fair"]]);
        let err = load_bytes(&bytes).unwrap_err();
        assert!(err.to_string().contains("Description"));
    }

    #[test]
    fn shared_strings_and_numbers_parse() {
        let shared = "<?xml version=\"1.0\"?><sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><si><t>Month</t></si><si><t>Description</t></si><si><t>Capacity</t></si><si><t>April</t></si><si><t>Spring market</t></si></sst>";
        let sheet = "<?xml version=\"1.0\"?><worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData><row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>1</v></c><c r=\"C1\" t=\"s\"><v>2</v></c></row><row r=\"2\"><c r=\"A2\" t=\"s\"><v>3</v></c><c r=\"B2\" t=\"s\"><v>4</v></c><c r=\"C2\"><v>1200</v></c></row></sheetData></worksheet>";

        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            let opts = zip::write::SimpleFileOptions::default();
            zip.start_file("xl/sharedStrings.xml", opts).unwrap();
            zip.write_all(shared.as_bytes()).unwrap();
            zip.start_file("xl/worksheets/sheet1.xml", opts).unwrap();
            zip.write_all(sheet.as_bytes()).unwrap();
            zip.finish().unwrap();
        }

        let catalog = load_bytes(&buf).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.records()[0].month, "April");
        assert_eq!(catalog.records()[0].description, "Spring market");
        assert_eq!(
            catalog.records()[0].fields.get("Capacity"),
            Some(&Value::Number(1200.into()))
        );
    }

    #[test]
    fn month_filter_is_substring_and_case_insensitive() {
        let bytes = workbook(&[
            &["Month", "Description"],
            &["November/December", "Holiday market"],
            &["december", "Ice rink"],
            &["June", "Concert"],
            &["", "Undated event"],
        ]);
        let catalog = load_bytes(&bytes).unwrap();
        assert_eq!(catalog.filter_by_month("December"), vec![0, 1]);
        assert_eq!(catalog.filter_by_month("June"), vec![2]);
        assert!(catalog.filter_by_month("August").is_empty());
    }

    #[test]
    fn empty_month_field_never_matches_a_filter() {
        let bytes = workbook(&[
            &["Month", "Description"],
            &["", "Undated event"],
        ]);
        let catalog = load_bytes(&bytes).unwrap();
        assert!(catalog.filter_by_month("January").is_empty());
    }

    #[test]
    fn from_records_preserves_order() {
        let records: Vec<EventRecord> = (0..4)
            .map(|i| EventRecord {
                month: "May".to_string(),
                description: format!("event {}", i),
                fields: serde_json::Map::new(),
            })
            .collect();
        let catalog = Catalog::from_records(records);
        assert_eq!(catalog.filter_by_month("May"), vec![0, 1, 2, 3]);
    }

    #[test]
    fn not_a_zip_is_an_error() {
        assert!(load_bytes(b"not a workbook").is_err());
    }

    #[test]
    fn column_reference_parsing() {
        assert_eq!(column_index(b"A1"), Some(0));
        assert_eq!(column_index(b"B12"), Some(1));
        assert_eq!(column_index(b"AA3"), Some(26));
        assert_eq!(column_index(b"7"), None);
    }
}
