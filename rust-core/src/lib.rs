//! Minimal in-place XLSX editing: the active worksheet and `styles.xml` are
//! patched as raw XML, every other part of the package is copied untouched.

mod files_part;
pub mod style;

use anyhow::{Context, Result};
use quick_xml::{
    Reader, Writer,
    events::{BytesText, Event},
};
use std::path::PathBuf;

pub use files_part::scan;
pub use style::{AlignSpec, HorizAlignment, VertAlignment, col_letter, split_coord};

/// Highest row number a worksheet can address.
pub const MAX_ROW: u32 = 1_048_576;

/// `XlsxEditor` opens a workbook, edits cells and styles of its active sheet
/// and writes the package back out.
pub struct XlsxEditor {
    src_path: PathBuf,
    sheet_path: String,
    sheet_xml: Vec<u8>,
    styles_xml: Vec<u8>,
    styles_dirty: bool,
    shared_strings: Vec<String>,
}

/// Value written into a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<&String> for CellValue {
    fn from(s: &String) -> Self {
        CellValue::Text(s.clone())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<u32> for CellValue {
    fn from(n: u32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl XlsxEditor {
    /// Path of the worksheet part being edited, e.g. `xl/worksheets/sheet1.xml`.
    pub fn sheet_path(&self) -> &str {
        &self.sheet_path
    }

    /// Reads the displayed value of a cell.
    ///
    /// Shared strings and inline strings are resolved to their text, numbers
    /// come back in their stored form and formulas without a cached value as
    /// `=FORMULA`. A missing cell, or one whose text is empty, yields `None`.
    pub fn cell_value(&self, coord: &str) -> Result<Option<String>> {
        let coord = coord.to_ascii_uppercase();
        let (_, row_num) = split_coord(&coord)?;
        let Some(row) = self.row_span(row_num) else {
            return Ok(None);
        };
        let Some(cell) = self.cell_span(&coord, &row)? else {
            return Ok(None);
        };
        read_cell(
            &self.sheet_xml[cell.start..cell.end],
            &self.shared_strings,
        )
        .with_context(|| format!("cannot read cell {coord}"))
    }

    /// Sets the value of a specific cell in the sheet.
    ///
    /// An existing cell is replaced but keeps its style index; a missing cell
    /// (and its row, if needed) is created so that rows and cells stay in
    /// sheet order.
    pub fn set_cell<V: Into<CellValue>>(&mut self, coord: &str, value: V) -> Result<()> {
        let coord = coord.to_ascii_uppercase();
        let (_, row_num) = split_coord(&coord)?;
        let value = value.into();

        let row = self.ensure_row(row_num)?;
        let style = match self.cell_span(&coord, &row)? {
            Some(cell) => {
                let style = tag_attr(&self.sheet_xml[cell.start..cell.tag_end], b"s")?;
                self.sheet_xml.drain(cell.start..cell.end);
                style
            }
            None => None,
        };

        let cell_xml = write_cell(&coord, style.as_deref(), &value)?;
        self.insert_cell(&coord, row_num, cell_xml)
    }

    /// Locates `<row r="N"…>` and its extent.
    pub(crate) fn row_span(&self, row_num: u32) -> Option<RowSpan> {
        let marker = format!("<row r=\"{row_num}\"");
        let start = find_bytes(&self.sheet_xml, marker.as_bytes())?;
        let gt = find_bytes_from(&self.sheet_xml, b">", start)?;
        let open_end = gt + 1;
        if self.sheet_xml[gt - 1] == b'/' {
            return Some(RowSpan {
                start,
                open_end,
                end: open_end,
                self_closing: true,
            });
        }
        let close = find_bytes_from(&self.sheet_xml, b"</row>", open_end)?;
        Some(RowSpan {
            start,
            open_end,
            end: close + "</row>".len(),
            self_closing: false,
        })
    }

    /// Makes sure row `row_num` exists as an open/close pair and returns it.
    pub(crate) fn ensure_row(&mut self, row_num: u32) -> Result<RowSpan> {
        if let Some(row) = self.row_span(row_num) {
            if !row.self_closing {
                return Ok(row);
            }
            // <row r="N" …/>  ->  <row r="N" …></row>
            let slash = row.open_end - 2;
            self.sheet_xml.splice(slash..row.open_end, b"></row>".iter().copied());
            return self
                .row_span(row_num)
                .context("row vanished while expanding it");
        }

        // An empty <sheetData/> has nowhere to put rows yet.
        if let Some(pos) = find_bytes(&self.sheet_xml, b"<sheetData/>") {
            self.sheet_xml.splice(
                pos..pos + "<sheetData/>".len(),
                b"<sheetData></sheetData>".iter().copied(),
            );
        }

        // Rows must stay sorted by `r`, otherwise Excel reports the file as damaged.
        let mut insert_pos: Option<usize> = None;
        let mut search_idx = 0;
        while let Some(abs) = find_bytes_from(&self.sheet_xml, b"<row r=\"", search_idx) {
            let num_start = abs + "<row r=\"".len();
            let end_quote = find_bytes_from(&self.sheet_xml, b"\"", num_start)
                .context("malformed <row> tag")?;
            let existing = std::str::from_utf8(&self.sheet_xml[num_start..end_quote])?
                .parse::<u32>()
                .unwrap_or(0);
            if existing > row_num {
                insert_pos = Some(abs);
                break;
            }
            search_idx = end_quote;
        }
        let pos = match insert_pos {
            Some(p) => p,
            None => rfind_bytes(&self.sheet_xml, b"</sheetData>")
                .context("</sheetData> tag not found")?,
        };

        let new_row = format!("<row r=\"{row_num}\"></row>");
        self.sheet_xml.splice(pos..pos, new_row.bytes());
        self.row_span(row_num)
            .context("freshly inserted row not found")
    }

    /// Locates `<c r="COORD"…>` inside `row`.
    pub(crate) fn cell_span(&self, coord: &str, row: &RowSpan) -> Result<Option<CellSpan>> {
        if row.self_closing {
            return Ok(None);
        }
        let marker = format!("<c r=\"{coord}\"");
        let Some(start) = find_bytes_from(&self.sheet_xml[..row.end], marker.as_bytes(), row.open_end)
        else {
            return Ok(None);
        };
        let gt = find_bytes_from(&self.sheet_xml, b">", start).context("malformed <c> tag")?;
        let tag_end = gt + 1;
        let end = if self.sheet_xml[gt - 1] == b'/' {
            tag_end
        } else {
            find_bytes_from(&self.sheet_xml, b"</c>", tag_end).context("</c> not found")?
                + "</c>".len()
        };
        Ok(Some(CellSpan {
            start,
            tag_end,
            end,
        }))
    }

    /// Inserts ready-made `<c>` XML into an existing row, keeping column order.
    pub(crate) fn insert_cell(&mut self, coord: &str, row_num: u32, cell_xml: Vec<u8>) -> Result<()> {
        let row = self.row_span(row_num).context("target row not found")?;
        let (target_col, _) = split_coord(coord)?;

        let mut insert_pos = row.end - "</row>".len();
        let mut i = row.open_end;
        while let Some(abs) = find_bytes_from(&self.sheet_xml[..row.end], b"<c r=\"", i) {
            let val_start = abs + "<c r=\"".len();
            let end_quote = find_bytes_from(&self.sheet_xml, b"\"", val_start)
                .context("malformed <c> tag")?;
            let existing = std::str::from_utf8(&self.sheet_xml[val_start..end_quote])?;
            if split_coord(existing)?.0 > target_col {
                insert_pos = abs;
                break;
            }
            i = end_quote;
        }

        self.sheet_xml.splice(insert_pos..insert_pos, cell_xml);
        Ok(())
    }
}

/// Byte offsets of one `<row>` element in the sheet XML.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RowSpan {
    pub start: usize,
    pub open_end: usize,
    pub end: usize,
    pub self_closing: bool,
}

/// Byte offsets of one `<c>` element: its start, the end of the opening tag
/// and the end of the whole element.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CellSpan {
    pub start: usize,
    pub tag_end: usize,
    pub end: usize,
}

fn write_cell(coord: &str, style: Option<&str>, value: &CellValue) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    let mut c_elem = writer.create_element("c").with_attribute(("r", coord));
    if let Some(s) = style {
        c_elem = c_elem.with_attribute(("s", s));
    }
    match value {
        CellValue::Text(text) => {
            c_elem
                .with_attribute(("t", "inlineStr"))
                .write_inner_content(|w| {
                    w.create_element("is").write_inner_content(|w2| {
                        let mut t_elem = w2.create_element("t");
                        if text.trim() != text {
                            t_elem = t_elem.with_attribute(("xml:space", "preserve"));
                        }
                        t_elem.write_text_content(BytesText::new(text))?;
                        Ok(())
                    })?;
                    Ok(())
                })?;
        }
        CellValue::Number(n) => {
            c_elem.write_inner_content(|w| {
                w.create_element("v")
                    .write_text_content(BytesText::new(&n.to_string()))?;
                Ok(())
            })?;
        }
    }
    Ok(writer.into_inner())
}

/// Decodes one `<c>…</c>` fragment.
fn read_cell(cell_xml: &[u8], shared_strings: &[String]) -> Result<Option<String>> {
    const VALUE: usize = 0;
    const FORMULA: usize = 1;
    const TEXT: usize = 2;

    let mut reader = Reader::from_reader(cell_xml);
    let mut cell_type: Option<String> = None;
    let mut parts: [String; 3] = Default::default();
    let mut slot: Option<usize> = None;

    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"c" => {
                cell_type = e.attributes().with_checks(false).flatten().find_map(|a| {
                    (a.key.as_ref() == b"t").then(|| String::from_utf8_lossy(&a.value).into_owned())
                });
            }
            Event::Start(ref e) => {
                slot = match e.name().as_ref() {
                    b"v" => Some(VALUE),
                    b"f" => Some(FORMULA),
                    b"t" => Some(TEXT),
                    _ => None,
                };
            }
            Event::End(_) => slot = None,
            Event::Text(ref e) => {
                if let Some(part) = slot.and_then(|i| parts.get_mut(i)) {
                    part.push_str(&String::from_utf8_lossy(e));
                }
            }
            // entity references arrive separately; keep them for unescape()
            Event::GeneralRef(ref e) => {
                if let Some(part) = slot.and_then(|i| parts.get_mut(i)) {
                    part.push('&');
                    part.push_str(&String::from_utf8_lossy(e));
                    part.push(';');
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let [value, formula, text] = parts;
    let raw = match cell_type.as_deref() {
        Some("s") => {
            let idx: usize = value
                .trim()
                .parse()
                .with_context(|| format!("bad shared string index `{value}`"))?;
            return Ok(shared_strings.get(idx).filter(|s| !s.is_empty()).cloned());
        }
        Some("inlineStr") => text,
        _ if !value.is_empty() => value,
        _ if !formula.is_empty() => format!("={formula}"),
        _ => String::new(),
    };
    let decoded = quick_xml::escape::unescape(&raw)?;
    Ok((!decoded.is_empty()).then(|| decoded.into_owned()))
}

/// Reads attribute `name` from the first tag of `xml`.
pub(crate) fn tag_attr(xml: &[u8], name: &[u8]) -> Result<Option<String>> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event()? {
            Event::Start(ref e) | Event::Empty(ref e) => {
                return Ok(e.attributes().with_checks(false).flatten().find_map(|a| {
                    (a.key.as_ref() == name).then(|| String::from_utf8_lossy(&a.value).into_owned())
                }));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

pub(crate) fn find_bytes(hay: &[u8], needle: &[u8]) -> Option<usize> {
    memchr::memmem::find(hay, needle)
}

pub(crate) fn find_bytes_from(hay: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    if start > hay.len() {
        return None;
    }
    memchr::memmem::find(&hay[start..], needle).map(|p| p + start)
}

pub(crate) fn rfind_bytes(hay: &[u8], needle: &[u8]) -> Option<usize> {
    memchr::memmem::rfind(hay, needle)
}

pub(crate) fn bump_count(xml: &mut Vec<u8>, tag: &[u8], attr: &[u8]) -> Result<()> {
    if let Some(pos) = find_bytes(xml, tag) {
        let tag_end = find_bytes_from(xml, b">", pos).context("unterminated tag")?;
        if let Some(a) = find_bytes_from(&xml[..tag_end], attr, pos) {
            let start = a + attr.len();
            let end = find_bytes_from(xml, b"\"", start).context("closing quote not found")?;
            let mut num: u32 = std::str::from_utf8(&xml[start..end])?.parse()?;
            num += 1;
            xml.splice(start..end, num.to_string().bytes());
        }
        // No count attribute: nothing to keep in sync.
        return Ok(());
    }
    Err(anyhow::anyhow!(
        "tag {} not found",
        String::from_utf8_lossy(tag)
    ))
}
