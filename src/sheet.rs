//! Visit table layout on the active sheet.
//!
//! Row 4 holds a one-time header in B..E. Column F, starting at row 4, is the
//! anchor column: each write appends below its last filled row, numbering
//! the new rows in column A from 1.

use anyhow::{Context, Result, bail};
use kunjungan_xlsx::{AlignSpec, HorizAlignment, MAX_ROW, VertAlignment, XlsxEditor};
use log::debug;

pub const HEADER_ROW: u32 = 4;
pub const ANCHOR_COLUMN: &str = "F";
pub const BORDER_STYLE: &str = "thin";

const HEADER_COLUMNS: [&str; 4] = ["B", "C", "D", "E"];

/// Values of the header block, B4..E4 in that order.
#[derive(Debug, Clone, Copy)]
pub struct VisitHeader<'a> {
    pub period_label: &'a str,
    pub operator_name: &'a str,
    pub operator_id: &'a str,
    pub operator_role: &'a str,
}

impl VisitHeader<'_> {
    fn cells(&self) -> [&str; 4] {
        [
            self.period_label,
            self.operator_name,
            self.operator_id,
            self.operator_role,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendSummary {
    pub header_written: bool,
    pub first_row: u32,
    pub rows_written: u32,
}

impl AppendSummary {
    /// Last row covered by the table borders.
    pub fn last_row(&self) -> u32 {
        (self.first_row + self.rows_written).saturating_sub(1).max(HEADER_ROW)
    }
}

/// First row at or below `from` whose cell in `column` has no value.
pub fn first_empty_row(editor: &XlsxEditor, column: &str, from: u32) -> Result<u32> {
    let mut row = from;
    while editor.cell_value(&format!("{column}{row}"))?.is_some() {
        if row == MAX_ROW {
            bail!("column {column} is filled down to the last sheet row");
        }
        row += 1;
    }
    Ok(row)
}

/// Writes the header (when B4 is blank) and one numbered row per outlet,
/// then borders the whole A..F block from the header row down.
pub fn append_visits<S: AsRef<str>>(
    editor: &mut XlsxEditor,
    header: &VisitHeader<'_>,
    outlets: &[S],
) -> Result<AppendSummary> {
    let centered = AlignSpec::new(HorizAlignment::Center, VertAlignment::Center);
    let left = AlignSpec::new(HorizAlignment::Left, VertAlignment::Center);

    let header_written = editor.cell_value(&format!("B{HEADER_ROW}"))?.is_none();
    if header_written {
        for (col, value) in HEADER_COLUMNS.iter().zip(header.cells()) {
            let coord = format!("{col}{HEADER_ROW}");
            editor.set_cell(&coord, value)?;
            editor
                .set_alignment(&coord, &centered)?
                .set_border(&coord, BORDER_STYLE)?;
        }
        debug!("header written to B{HEADER_ROW}:E{HEADER_ROW}");
    } else {
        debug!("B{HEADER_ROW} already filled; header left as is");
    }

    let first_row = first_empty_row(editor, ANCHOR_COLUMN, HEADER_ROW)?;
    let rows_written = u32::try_from(outlets.len()).context("too many outlets")?;
    if rows_written > 0 && first_row - 1 + rows_written > MAX_ROW {
        bail!("{rows_written} rows from row {first_row} do not fit on the sheet");
    }

    for (seq, outlet) in (1u32..).zip(outlets) {
        let row = first_row + seq - 1;
        let number = format!("A{row}");
        editor.set_cell(&number, seq)?;
        editor.set_alignment(&number, &centered)?;

        let name = format!("{ANCHOR_COLUMN}{row}");
        editor.set_cell(&name, outlet.as_ref())?;
        editor.set_alignment(&name, &left)?;
    }

    let summary = AppendSummary {
        header_written,
        first_row,
        rows_written,
    };
    editor.set_border(
        &format!("A{HEADER_ROW}:{ANCHOR_COLUMN}{}", summary.last_row()),
        BORDER_STYLE,
    )?;
    debug!(
        "{rows_written} rows written from row {first_row}, bordered A{HEADER_ROW}:{ANCHOR_COLUMN}{}",
        summary.last_row()
    );
    Ok(summary)
}
