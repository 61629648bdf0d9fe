//! Read-only SpreadsheetML access: sheet names and cell text, row by row.

use crate::utils::error::{PhosphomError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Cursor, Read};
use zip::ZipArchive;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

#[derive(Debug, Clone, PartialEq)]
struct SheetRef {
    name: String,
    part: String,
}

pub struct Workbook {
    archive: ZipArchive<Cursor<Vec<u8>>>,
    sheets: Vec<SheetRef>,
    shared_strings: Vec<String>,
}

impl Workbook {
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let workbook_xml = read_part(&mut archive, WORKBOOK_PART)?.ok_or_else(|| {
            PhosphomError::ReferenceError {
                message: format!("Workbook is missing {}", WORKBOOK_PART),
            }
        })?;
        let rels_xml = read_part(&mut archive, WORKBOOK_RELS_PART)?.unwrap_or_default();
        let sheets = parse_sheets(&workbook_xml, &rels_xml)?;

        let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        tracing::debug!(
            "Opened workbook with {} sheets and {} shared strings",
            sheets.len(),
            shared_strings.len()
        );

        Ok(Self {
            archive,
            sheets,
            shared_strings,
        })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// All non-empty rows of a sheet; short rows are padded to their last cell.
    pub fn read_sheet(&mut self, name: &str) -> Result<Vec<Vec<String>>> {
        let part = self
            .sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.part.clone())
            .ok_or_else(|| PhosphomError::ReferenceError {
                message: format!("Sheet '{}' not found in workbook", name),
            })?;

        let xml = read_part(&mut self.archive, &part)?.ok_or_else(|| {
            PhosphomError::ReferenceError {
                message: format!("Sheet '{}' points at missing part {}", name, part),
            }
        })?;
        parse_sheet(&xml, &self.shared_strings)
    }
}

fn read_part(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Attribute value by local name, ignoring any namespace prefix.
fn attr_value(element: &BytesStart<'_>, local: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == local {
            let value = attr.unescape_value().map_err(quick_xml::Error::from)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn parse_sheets(workbook_xml: &str, rels_xml: &str) -> Result<Vec<SheetRef>> {
    let mut targets: Vec<(String, String)> = Vec::new();
    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attr_value(&e, b"Id")?, attr_value(&e, b"Target")?) {
                    targets.push((id, target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let mut sheets = Vec::new();
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let Some(name) = attr_value(&e, b"name")? else {
                    continue;
                };
                let target = match attr_value(&e, b"id")? {
                    Some(id) => targets.iter().find(|(rid, _)| *rid == id).map(|(_, t)| t.clone()),
                    None => None,
                };
                // Fall back to the conventional part name when relationships are absent
                let part = match target {
                    Some(t) if t.starts_with('/') => t.trim_start_matches('/').to_string(),
                    Some(t) => format!("xl/{}", t),
                    None => format!("xl/worksheets/sheet{}.xml", sheets.len() + 1),
                };
                sheets.push(SheetRef { name, part });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut strings = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.extend(current.take()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(strings)
}

/// Column count of the widest sheet Excel can write (`XFD`).
const MAX_COLUMNS: usize = 16_384;

/// Zero-based column of an A1-style reference such as `AB12`.
fn column_index(reference: &str) -> Result<Option<usize>> {
    let mut col = 0usize;
    let mut seen = false;
    for c in reference.chars().take_while(|c| c.is_ascii_alphabetic()) {
        let digit = c.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|&v| v <= MAX_COLUMNS)
            .ok_or_else(|| PhosphomError::ReferenceError {
                message: format!("Cell reference '{}' is beyond column XFD", reference),
            })?;
        seen = true;
    }
    Ok(seen.then(|| col - 1))
}

#[derive(Default)]
struct CellState {
    col: usize,
    kind: Option<String>,
    value: String,
}

fn parse_sheet(xml: &str, shared_strings: &[String]) -> Result<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut reader = Reader::from_str(xml);
    let mut row: Option<Vec<String>> = None;
    let mut cell: Option<CellState> = None;
    let mut in_value = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"row" => row = Some(Vec::new()),
                b"c" => {
                    let next = row.as_ref().map_or(0, Vec::len);
                    let col = match attr_value(&e, b"r")? {
                        Some(r) => column_index(&r)?.unwrap_or(next),
                        None => next,
                    };
                    cell = Some(CellState {
                        col,
                        kind: attr_value(&e, b"t")?,
                        value: String::new(),
                    });
                }
                b"v" | b"t" => in_value = cell.is_some(),
                _ => {}
            },
            Event::Text(t) if in_value => {
                if let Some(c) = cell.as_mut() {
                    c.value.push_str(&t.unescape().map_err(quick_xml::Error::from)?);
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    if let (Some(c), Some(r)) = (cell.take(), row.as_mut()) {
                        let text = cell_text(&c, shared_strings);
                        if r.len() <= c.col {
                            r.resize(c.col + 1, String::new());
                        }
                        r[c.col] = text;
                    }
                }
                b"row" => {
                    if let Some(r) = row.take() {
                        if r.iter().any(|v| !v.is_empty()) {
                            rows.push(r);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rows)
}

fn cell_text(cell: &CellState, shared_strings: &[String]) -> String {
    match cell.kind.as_deref() {
        Some("s") => cell
            .value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|i| shared_strings.get(i).cloned())
            .unwrap_or_default(),
        Some("b") => match cell.value.trim() {
            "1" => "TRUE".to_string(),
            _ => "FALSE".to_string(),
        },
        _ => cell.value.clone(),
    }
}
