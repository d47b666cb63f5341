#![allow(dead_code)]

use anyhow::Result;
use kunjungan_xlsx::XlsxEditor;
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;
use zip::write::{FileOptions, ZipWriter};

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs></styleSheet>"#;

/// Title rows above the table, as a monthly template has them.
pub const TITLE_ROWS: &str = r#"<row r="1"><c r="A1" t="inlineStr"><is><t>LAPORAN KUNJUNGAN TOKO</t></is></c></row><row r="3"><c r="A3" t="inlineStr"><is><t>No</t></is></c><c r="B3" t="inlineStr"><is><t>Bulan</t></is></c><c r="C3" t="inlineStr"><is><t>Nama</t></is></c><c r="D3" t="inlineStr"><is><t>NIK</t></is></c><c r="E3" t="inlineStr"><is><t>Jabatan</t></is></c><c r="F3" t="inlineStr"><is><t>Toko</t></is></c></row>"#;

/// Single-sheet `.xlsx` whose `<sheetData>` holds `rows`.
pub fn template(rows: &str) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let opt: FileOptions<'_, ()> = FileOptions::default();

    zip.start_file("[Content_Types].xml", opt)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#)?;
    zip.start_file("_rels/.rels", opt)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#)?;
    zip.start_file("xl/workbook.xml", opt)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><bookViews><workbookView/></bookViews><sheets><sheet name="Kunjungan" sheetId="1" r:id="rId1"/></sheets></workbook>"#)?;
    zip.start_file("xl/_rels/workbook.xml.rels", opt)?;
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#)?;
    zip.start_file("xl/styles.xml", opt)?;
    zip.write_all(STYLES.as_bytes())?;
    zip.start_file("xl/worksheets/sheet1.xml", opt)?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{rows}</sheetData></worksheet>"#
    )?;

    Ok(zip.finish()?.into_inner())
}

/// Re-opens workbook bytes for inspection. The editor reads back from the
/// temp file, so both are returned.
pub fn reopen(bytes: &[u8]) -> Result<(NamedTempFile, XlsxEditor)> {
    let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile()?;
    file.write_all(bytes)?;
    file.flush()?;
    let editor = XlsxEditor::open_active(file.path())?;
    Ok((file, editor))
}
