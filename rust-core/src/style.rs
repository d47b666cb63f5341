//! style.rs – alignment and border layer over `styles.xml` `<cellXfs>`

use anyhow::{Context, Result, bail};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};
use regex::Regex;
use std::{fmt, str::FromStr};

use crate::{XlsxEditor, bump_count, find_bytes, find_bytes_from, tag_attr};

/* ========================== ALIGNMENT API ================================= */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizAlignment {
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
    CenterContinuous,
    Distributed,
}
impl fmt::Display for HorizAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HorizAlignment::General => "general",
            HorizAlignment::Left => "left",
            HorizAlignment::Center => "center",
            HorizAlignment::Right => "right",
            HorizAlignment::Fill => "fill",
            HorizAlignment::Justify => "justify",
            HorizAlignment::CenterContinuous => "centerContinuous",
            HorizAlignment::Distributed => "distributed",
        })
    }
}
impl FromStr for HorizAlignment {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "general" => HorizAlignment::General,
            "left" => HorizAlignment::Left,
            "center" => HorizAlignment::Center,
            "right" => HorizAlignment::Right,
            "fill" => HorizAlignment::Fill,
            "justify" => HorizAlignment::Justify,
            "centerContinuous" => HorizAlignment::CenterContinuous,
            "distributed" => HorizAlignment::Distributed,
            _ => bail!("Unknown horizontal alignment: {s}"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertAlignment {
    Top,
    Center,
    Bottom,
    Justify,
    Distributed,
}
impl fmt::Display for VertAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VertAlignment::Top => "top",
            VertAlignment::Center => "center",
            VertAlignment::Bottom => "bottom",
            VertAlignment::Justify => "justify",
            VertAlignment::Distributed => "distributed",
        })
    }
}
impl FromStr for VertAlignment {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "top" => VertAlignment::Top,
            "center" => VertAlignment::Center,
            "bottom" => VertAlignment::Bottom,
            "justify" => VertAlignment::Justify,
            "distributed" => VertAlignment::Distributed,
            _ => bail!("Unknown vertical alignment: {s}"),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlignSpec {
    pub horiz: Option<HorizAlignment>,
    pub vert: Option<VertAlignment>,
    pub wrap: bool,
}

impl AlignSpec {
    pub fn new(horiz: HorizAlignment, vert: VertAlignment) -> Self {
        Self {
            horiz: Some(horiz),
            vert: Some(vert),
            wrap: false,
        }
    }
}

/* ========================== CORE STYLE STRUCT ============================= */

/// One `<xf>` of `<cellXfs>`, reduced to what the editor rewrites.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct StyleParts {
    num_fmt: u32,
    font: u32,
    fill: u32,
    border: u32,
    xf_id: u32,
    align: Option<AlignSpec>,
}

#[derive(Debug, Clone, Default)]
struct StylePatch {
    border: Option<u32>,
    align: Option<AlignSpec>,
}

impl StyleParts {
    fn merged(mut self, patch: &StylePatch) -> Self {
        if let Some(b) = patch.border {
            self.border = b;
        }
        if patch.align.is_some() {
            self.align = patch.align.clone();
        }
        self
    }
}

/// Side styles of one `<border>`; `decorated` marks colours or diagonals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct BorderSides {
    left: Option<String>,
    right: Option<String>,
    top: Option<String>,
    bottom: Option<String>,
    decorated: bool,
}

impl BorderSides {
    fn uniform(style: &str) -> Self {
        Self {
            left: Some(style.to_owned()),
            right: Some(style.to_owned()),
            top: Some(style.to_owned()),
            bottom: Some(style.to_owned()),
            decorated: false,
        }
    }

    fn uniform_style(&self) -> Option<&str> {
        let left = self.left.as_deref()?;
        [&self.right, &self.top, &self.bottom]
            .iter()
            .all(|side| side.as_deref() == Some(left))
            .then_some(left)
    }
}

/* ========================== TARGET PARSER ================================= */

#[derive(Debug)]
enum Target {
    Cell(String),
    Rect { c0: u32, r0: u32, c1: u32, r1: u32 },
}

impl Target {
    fn cells(&self) -> Vec<String> {
        match self {
            Target::Cell(c) => vec![c.clone()],
            Target::Rect { c0, r0, c1, r1 } => (*r0.min(r1)..=*r0.max(r1))
                .flat_map(|r| (*c0.min(c1)..=*c0.max(c1)).map(move |c| format!("{}{}", col_letter(c), r)))
                .collect(),
        }
    }
}

fn parse_target(s: &str) -> Result<Target> {
    let re_cell = Regex::new(r"^([A-Za-z]+)([0-9]+)$")?;
    let re_rect = Regex::new(r"^([A-Za-z]+[0-9]+):([A-Za-z]+[0-9]+)$")?;

    if re_cell.is_match(s) {
        return Ok(Target::Cell(s.to_ascii_uppercase()));
    }
    if let Some(caps) = re_rect.captures(s) {
        let (c0, r0) = split_coord(&caps[1])?;
        let (c1, r1) = split_coord(&caps[2])?;
        return Ok(Target::Rect { c0, r0, c1, r1 });
    }
    bail!("invalid range syntax: {s}");
}

/* ========================== PUBLIC API ==================================== */

impl XlsxEditor {
    /// Puts a border of `border_style` (`thin`, `medium`, …) on all four
    /// sides of every cell in `range`, keeping the rest of each cell's style.
    pub fn set_border(&mut self, range: &str, border_style: &str) -> Result<&mut Self> {
        let border_id = self.ensure_border(border_style)?;
        self.apply_patch(
            range,
            &StylePatch {
                border: Some(border_id),
                ..Default::default()
            },
        )?;
        Ok(self)
    }

    pub fn set_alignment(&mut self, range: &str, align: &AlignSpec) -> Result<&mut Self> {
        self.apply_patch(
            range,
            &StylePatch {
                align: Some(align.clone()),
                ..Default::default()
            },
        )?;
        Ok(self)
    }

    /// Border style shared by all four sides of the cell, if they agree.
    pub fn cell_border(&self, coord: &str) -> Result<Option<String>> {
        let xfs = read_cell_xfs(&self.styles_xml)?;
        let sid = self.cell_style_id(&coord.to_ascii_uppercase())?.unwrap_or(0);
        let Some(xf) = usize::try_from(sid).ok().and_then(|i| xfs.get(i)) else {
            return Ok(None);
        };
        let borders = read_borders(&self.styles_xml)?;
        Ok(usize::try_from(xf.border)
            .ok()
            .and_then(|i| borders.get(i))
            .and_then(|b| b.uniform_style().map(str::to_owned)))
    }

    pub fn cell_alignment(&self, coord: &str) -> Result<Option<AlignSpec>> {
        let xfs = read_cell_xfs(&self.styles_xml)?;
        let sid = self.cell_style_id(&coord.to_ascii_uppercase())?.unwrap_or(0);
        Ok(usize::try_from(sid)
            .ok()
            .and_then(|i| xfs.get(i))
            .and_then(|xf| xf.align.clone()))
    }
}

/* ========================== CORE PATCH ENGINE ============================= */

impl XlsxEditor {
    fn apply_patch(&mut self, range: &str, patch: &StylePatch) -> Result<()> {
        for cell in parse_target(range)?.cells() {
            self.patch_one_cell(&cell, patch)?;
        }
        Ok(())
    }

    fn patch_one_cell(&mut self, coord: &str, patch: &StylePatch) -> Result<()> {
        let xfs = read_cell_xfs(&self.styles_xml)?;
        // an unstyled cell renders with xf 0
        let sid = self.cell_style_id(coord)?.unwrap_or(0);
        let base = usize::try_from(sid)
            .ok()
            .and_then(|i| xfs.get(i))
            .cloned()
            .unwrap_or_default();
        let merged = base.merged(patch);

        let new_sid = match xfs.iter().position(|xf| *xf == merged) {
            Some(i) => u32::try_from(i)?,
            None => self.add_new_xf(&merged, u32::try_from(xfs.len())?)?,
        };
        self.apply_style_to_cell(coord, new_sid)
    }
}

/* ========================== LOW-LEVEL HELPERS ============================= */

impl XlsxEditor {
    fn add_new_xf(&mut self, parts: &StyleParts, new_index: u32) -> Result<u32> {
        let mut xf = format!(
            r#"<xf numFmtId="{}" fontId="{}" fillId="{}" borderId="{}" xfId="{}""#,
            parts.num_fmt, parts.font, parts.fill, parts.border, parts.xf_id
        );
        if parts.num_fmt != 0 {
            xf.push_str(r#" applyNumberFormat="1""#);
        }
        if parts.font != 0 {
            xf.push_str(r#" applyFont="1""#);
        }
        if parts.fill != 0 {
            xf.push_str(r#" applyFill="1""#);
        }
        if parts.border != 0 {
            xf.push_str(r#" applyBorder="1""#);
        }

        match &parts.align {
            Some(al) => {
                xf.push_str(r#" applyAlignment="1"><alignment"#);
                if let Some(h) = &al.horiz {
                    xf.push_str(&format!(r#" horizontal="{h}""#));
                }
                if let Some(v) = &al.vert {
                    xf.push_str(&format!(r#" vertical="{v}""#));
                }
                if al.wrap {
                    xf.push_str(r#" wrapText="1""#);
                }
                xf.push_str("/></xf>");
            }
            None => xf.push_str("/>"),
        }

        let pos = find_bytes(&self.styles_xml, b"</cellXfs>")
            .context("styles.xml: </cellXfs> not found")?;
        self.styles_xml.splice(pos..pos, xf.bytes());
        bump_count(&mut self.styles_xml, b"<cellXfs", b"count=\"")?;
        self.styles_dirty = true;

        Ok(new_index)
    }

    fn ensure_border(&mut self, style: &str) -> Result<u32> {
        let borders = read_borders(&self.styles_xml)?;
        let wanted = BorderSides::uniform(style);
        if let Some(i) = borders.iter().position(|b| *b == wanted) {
            return Ok(u32::try_from(i)?);
        }

        let end_pos = find_bytes(&self.styles_xml, b"</borders>")
            .context("styles.xml: </borders> not found")?;
        let tag = format!(
            r#"<border><left style="{s}"/><right style="{s}"/><top style="{s}"/><bottom style="{s}"/><diagonal/></border>"#,
            s = style
        );
        self.styles_xml.splice(end_pos..end_pos, tag.bytes());
        bump_count(&mut self.styles_xml, b"<borders", b"count=\"")?;
        self.styles_dirty = true;

        Ok(u32::try_from(borders.len())?)
    }

    fn cell_style_id(&self, coord: &str) -> Result<Option<u32>> {
        let (_, row_num) = split_coord(coord)?;
        let Some(row) = self.row_span(row_num) else {
            return Ok(None);
        };
        let Some(cell) = self.cell_span(coord, &row)? else {
            return Ok(None);
        };
        let s = tag_attr(&self.sheet_xml[cell.start..cell.tag_end], b"s")?;
        Ok(s.and_then(|v| v.parse::<u32>().ok()))
    }

    fn apply_style_to_cell(&mut self, coord: &str, style: u32) -> Result<()> {
        let (_, row_num) = split_coord(coord)?;
        let row = self.ensure_row(row_num)?;

        let Some(cell) = self.cell_span(coord, &row)? else {
            let new_cell = format!(r#"<c r="{coord}" s="{style}"/>"#);
            return self.insert_cell(coord, row_num, new_cell.into_bytes());
        };

        if let Some(sattr) = find_bytes(&self.sheet_xml[cell.start..cell.tag_end], b" s=\"") {
            let val_start = cell.start + sattr + " s=\"".len();
            let val_end = find_bytes_from(&self.sheet_xml, b"\"", val_start)
                .context("attr closing '\"' not found")?;
            self.sheet_xml
                .splice(val_start..val_end, style.to_string().bytes());
            return Ok(());
        }

        let ins = if self.sheet_xml[cell.tag_end - 2] == b'/' {
            cell.tag_end - 2
        } else {
            cell.tag_end - 1
        };
        self.sheet_xml
            .splice(ins..ins, format!(r#" s="{style}""#).bytes());
        Ok(())
    }
}

fn read_cell_xfs(styles_xml: &[u8]) -> Result<Vec<StyleParts>> {
    let mut rdr = Reader::from_reader(styles_xml);
    rdr.config_mut().trim_text(true);

    let mut in_xfs = false;
    let mut xfs = Vec::new();
    loop {
        match rdr.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"cellXfs" => in_xfs = true,
            Event::End(ref e) if e.name().as_ref() == b"cellXfs" => break,
            Event::Start(ref e) | Event::Empty(ref e) if in_xfs && e.name().as_ref() == b"xf" => {
                xfs.push(xf_parts(e)?);
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if in_xfs && e.name().as_ref() == b"alignment" =>
            {
                if let Some(last) = xfs.last_mut() {
                    last.align = Some(align_from(e));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(xfs)
}

fn xf_parts(e: &BytesStart<'_>) -> Result<StyleParts> {
    let mut parts = StyleParts::default();
    for a in e.attributes().with_checks(false).flatten() {
        let slot = match a.key.as_ref() {
            b"numFmtId" => &mut parts.num_fmt,
            b"fontId" => &mut parts.font,
            b"fillId" => &mut parts.fill,
            b"borderId" => &mut parts.border,
            b"xfId" => &mut parts.xf_id,
            _ => continue,
        };
        *slot = String::from_utf8_lossy(&a.value)
            .parse()
            .context("non-numeric id in <xf>")?;
    }
    Ok(parts)
}

// Values this editor does not model are dropped rather than rejected.
fn align_from(e: &BytesStart<'_>) -> AlignSpec {
    let mut spec = AlignSpec::default();
    for attr in e.attributes().with_checks(false).flatten() {
        let val = String::from_utf8_lossy(&attr.value).into_owned();
        match attr.key.as_ref() {
            b"horizontal" => spec.horiz = val.parse().ok(),
            b"vertical" => spec.vert = val.parse().ok(),
            b"wrapText" => spec.wrap = val == "1" || val == "true",
            _ => {}
        }
    }
    spec
}

fn read_borders(styles_xml: &[u8]) -> Result<Vec<BorderSides>> {
    let mut rdr = Reader::from_reader(styles_xml);
    rdr.config_mut().trim_text(true);

    let mut in_borders = false;
    let mut current: Option<BorderSides> = None;
    let mut out = Vec::new();
    loop {
        match rdr.read_event()? {
            Event::Start(ref e) if e.name().as_ref() == b"borders" => in_borders = true,
            Event::End(ref e) if e.name().as_ref() == b"borders" => break,
            Event::Empty(ref e) if in_borders && e.name().as_ref() == b"border" => {
                out.push(BorderSides::default());
            }
            Event::Start(ref e) if in_borders && e.name().as_ref() == b"border" => {
                current = Some(BorderSides::default());
            }
            Event::End(ref e) if e.name().as_ref() == b"border" => {
                if let Some(b) = current.take() {
                    out.push(b);
                }
            }
            Event::Start(ref e) | Event::Empty(ref e) => {
                let Some(b) = current.as_mut() else {
                    continue;
                };
                let style = e.attributes().with_checks(false).flatten().find_map(|a| {
                    (a.key.as_ref() == b"style")
                        .then(|| String::from_utf8_lossy(&a.value).into_owned())
                });
                match e.name().as_ref() {
                    b"left" => b.left = style,
                    b"right" => b.right = style,
                    b"top" => b.top = style,
                    b"bottom" => b.bottom = style,
                    b"color" => b.decorated = true,
                    _ if style.is_some() => b.decorated = true,
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}

/* ========================== BYTE/STRING HELPERS =========================== */

/// 0-based column index to letters: 0 -> `A`, 26 -> `AA`.
pub fn col_letter(mut n: u32) -> String {
    let mut s = String::new();
    loop {
        // n % 26 < 26, so the cast cannot truncate
        s.insert(0, char::from(b'A' + (n % 26) as u8));
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    s
}

fn col_index(s: &str) -> Result<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_alphabetic()) {
        bail!("invalid column `{s}`");
    }
    let n = s.bytes().try_fold(0u32, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(u32::from(b.to_ascii_uppercase() - b'A' + 1))
    });
    n.map(|n| n - 1)
        .with_context(|| format!("column `{s}` out of range"))
}

/// Splits `F12` into a 0-based column index and the 1-based row: `(5, 12)`.
pub fn split_coord(coord: &str) -> Result<(u32, u32)> {
    let p = coord
        .find(|c: char| c.is_ascii_digit())
        .with_context(|| format!("invalid cell coordinate `{coord}` – no digits found"))?;
    let row: u32 = coord[p..]
        .parse()
        .with_context(|| format!("invalid row number in `{coord}`"))?;
    if row == 0 {
        bail!("invalid row number in `{coord}`");
    }
    Ok((col_index(&coord[..p])?, row))
}
