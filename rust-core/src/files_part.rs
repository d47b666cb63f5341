use crate::XlsxEditor;
use ::zip as zip_crate;
use anyhow::{Context, Result};
use log::debug;
use quick_xml::{Reader, events::Event};
use std::{
    fs::File,
    io::{Cursor, Read, Seek, Write},
    path::Path,
};

const WORKBOOK: &str = "xl/workbook.xml";
const WORKBOOK_RELS: &str = "xl/_rels/workbook.xml.rels";
const STYLES: &str = "xl/styles.xml";
const SHARED_STRINGS: &str = "xl/sharedStrings.xml";

/// Work with files
impl XlsxEditor {
    /// Opens a workbook and prepares its active sheet (the tab selected in
    /// `<workbookView activeTab>`, first sheet by default).
    pub fn open_active<P: AsRef<Path>>(src: P) -> Result<Self> {
        let src_path = src.as_ref().to_path_buf();
        let file = File::open(&src_path)
            .with_context(|| format!("cannot open {}", src_path.display()))?;
        let mut zip = zip_crate::ZipArchive::new(file)?;

        let workbook_xml = read_part(&mut zip, WORKBOOK)?;
        let rels_xml = read_part(&mut zip, WORKBOOK_RELS)?;

        // ── active sheet -> r:id -> worksheet part ─────────────────────
        let sheets = sheet_entries(&workbook_xml)?;
        let active = active_tab(&workbook_xml)?;
        let (sheet_name, rid) = sheets
            .get(active)
            .with_context(|| format!("active sheet #{active} not found in workbook.xml"))?;
        let target = relationship_target(&rels_xml, rid)?
            .with_context(|| format!("relationship {rid} for `{sheet_name}` not found"))?;
        let sheet_path = resolve_target(&target);
        debug!("active sheet `{sheet_name}` -> {sheet_path}");

        let sheet_xml = read_part(&mut zip, &sheet_path)?;
        let styles_xml = read_part(&mut zip, STYLES)?;
        let has_shared = zip.file_names().any(|n| n == SHARED_STRINGS);
        let shared_strings = if has_shared {
            parse_shared_strings(&read_part(&mut zip, SHARED_STRINGS)?)?
        } else {
            Vec::new()
        };

        Ok(Self {
            src_path,
            sheet_path,
            sheet_xml,
            styles_xml,
            styles_dirty: false,
            shared_strings,
        })
    }

    /// Saves the modified workbook to `dst`.
    ///
    /// Every part of the source package is copied as-is except the edited
    /// sheet and, when styles were touched, `styles.xml`.
    pub fn save<P: AsRef<Path>>(&self, dst: P) -> Result<()> {
        let dst = dst.as_ref();
        let out = File::create(dst).with_context(|| format!("cannot create {}", dst.display()))?;
        self.write_to(out)?;
        Ok(())
    }

    /// Serializes the modified workbook into memory.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    fn write_to<W: Write + Seek>(&self, out: W) -> Result<W> {
        let mut zin = zip_crate::ZipArchive::new(File::open(&self.src_path)?)?;
        let mut zout = zip_crate::ZipWriter::new(out);

        let opt: zip_crate::write::FileOptions<'_, ()> = zip_crate::write::FileOptions::default()
            .compression_method(zip_crate::CompressionMethod::Deflated)
            .compression_level(Some(1));

        for i in 0..zin.len() {
            let file = zin.by_index_raw(i)?;
            let name = file.name().to_owned();

            if name == self.sheet_path {
                zout.start_file(name.as_str(), opt)?;
                zout.write_all(&self.sheet_xml)?;
            } else if name == STYLES && self.styles_dirty {
                zout.start_file(name.as_str(), opt)?;
                zout.write_all(&self.styles_xml)?;
            } else {
                zout.raw_copy_file(file)?;
            }
        }

        Ok(zout.finish()?)
    }
}

/// Lists sheet names of a workbook in tab order.
pub fn scan<P: AsRef<Path>>(src: P) -> Result<Vec<String>> {
    let mut zip = zip_crate::ZipArchive::new(File::open(src)?)?;
    let wb_xml = read_part(&mut zip, WORKBOOK)?;
    Ok(sheet_entries(&wb_xml)?.into_iter().map(|(name, _)| name).collect())
}

fn read_part<R: Read + Seek>(zip: &mut zip_crate::ZipArchive<R>, name: &str) -> Result<Vec<u8>> {
    let mut part = zip
        .by_name(name)
        .with_context(|| format!("{name} not found"))?;
    let mut buf = Vec::with_capacity(usize::try_from(part.size()).unwrap_or(0));
    part.read_to_end(&mut buf)?;
    Ok(buf)
}

/// `(name, r:id)` of every `<sheet>` in workbook.xml.
fn sheet_entries(workbook_xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut rdr = Reader::from_reader(workbook_xml);
    rdr.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    loop {
        match rdr.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"sheet" => {
                let mut name: Option<String> = None;
                let mut rid: Option<String> = None;
                for a in e.attributes().with_checks(false).flatten() {
                    let v = String::from_utf8_lossy(&a.value).into_owned();
                    match a.key.as_ref() {
                        b"name" => name = Some(v),
                        // usually `r:id`, but the prefix is not fixed
                        _ if a.key.local_name().as_ref() == b"id" => rid = Some(v),
                        _ => {}
                    }
                }
                if let (Some(n), Some(r)) = (name, rid) {
                    sheets.push((n, r));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

fn active_tab(workbook_xml: &[u8]) -> Result<usize> {
    let mut rdr = Reader::from_reader(workbook_xml);
    rdr.config_mut().trim_text(true);
    loop {
        match rdr.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"workbookView" => {
                let tab = e.attributes().with_checks(false).flatten().find_map(|a| {
                    (a.key.as_ref() == b"activeTab")
                        .then(|| String::from_utf8_lossy(&a.value).into_owned())
                });
                return Ok(match tab {
                    Some(t) => t.parse().with_context(|| format!("bad activeTab `{t}`"))?,
                    None => 0,
                });
            }
            Event::Eof => return Ok(0),
            _ => {}
        }
    }
}

fn relationship_target(rels_xml: &[u8], rid: &str) -> Result<Option<String>> {
    let mut rdr = Reader::from_reader(rels_xml);
    rdr.config_mut().trim_text(true);
    loop {
        match rdr.read_event()? {
            Event::Empty(ref e) | Event::Start(ref e) if e.name().as_ref() == b"Relationship" => {
                let mut id: Option<String> = None;
                let mut target: Option<String> = None;
                for a in e.attributes().with_checks(false).flatten() {
                    let v = String::from_utf8_lossy(&a.value).into_owned();
                    match a.key.as_ref() {
                        b"Id" => id = Some(v),
                        b"Target" => target = Some(v),
                        _ => {}
                    }
                }
                if id.as_deref() == Some(rid) {
                    return Ok(target);
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Turns a relationship target into a path inside the archive.
fn resolve_target(target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        abs.to_owned()
    } else if target.starts_with("xl/") {
        target.to_owned()
    } else {
        format!("xl/{target}")
    }
}

/// Texts of every `<si>` in sharedStrings.xml; phonetic runs are skipped.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut rdr = Reader::from_reader(xml);
    let mut out = Vec::new();
    let mut current = String::new();
    let (mut in_t, mut in_phonetic) = (false, false);

    loop {
        match rdr.read_event()? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(ref e) if e.name().as_ref() == b"si" => out.push(String::new()),
            Event::End(ref e) => match e.name().as_ref() {
                b"si" => {
                    out.push(quick_xml::escape::unescape(&current)?.into_owned());
                }
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(ref e) if in_t => current.push_str(&String::from_utf8_lossy(e)),
            Event::GeneralRef(ref e) if in_t => {
                current.push('&');
                current.push_str(&String::from_utf8_lossy(e));
                current.push(';');
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
