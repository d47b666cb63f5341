//! "SIMPAN KE EXCEL": validates the form, writes the visit block into a
//! scratch copy of the uploaded template and hands back the result.

use crate::period::Period;
use crate::sheet::{self, AppendSummary, VisitHeader};
use crate::state::SessionState;
use anyhow::Context;
use kunjungan_xlsx::XlsxEditor;
use log::info;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Pilih minimal 1 toko!")]
    NoOutletSelected,
    #[error("Nama petugas wajib diisi!")]
    MissingOperatorName,
    #[error("{0:#}")]
    Workbook(#[from] anyhow::Error),
}

impl ExportError {
    pub fn is_validation(&self) -> bool {
        !matches!(self, ExportError::Workbook(_))
    }
}

/// Finished workbook ready to be offered for download.
#[derive(Debug)]
pub struct VisitExport {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub summary: AppendSummary,
}

/// Checks run before any spreadsheet work, first failure wins.
pub fn validate(state: &SessionState) -> Result<(), ExportError> {
    if state.selected.is_empty() {
        return Err(ExportError::NoOutletSelected);
    }
    if state.operator.name.is_empty() {
        return Err(ExportError::MissingOperatorName);
    }
    Ok(())
}

/// `Kunjungan_<name>_<month>_<year>.xlsx`; path separators in the name
/// become `_`.
pub fn download_file_name(operator_name: &str, period: &Period) -> String {
    let name = operator_name.replace(['/', '\\'], "_");
    format!("Kunjungan_{name}_{}_{}.xlsx", period.month, period.year)
}

/// Runs one export against the uploaded template bytes.
///
/// The upload itself is never modified; the work happens on a temporary
/// copy that is removed when this returns.
pub fn export_visits(
    upload: &[u8],
    state: &SessionState,
    period: &Period,
) -> Result<VisitExport, ExportError> {
    validate(state)?;

    let mut scratch = tempfile::Builder::new()
        .prefix("kunjungan-")
        .suffix(".xlsx")
        .tempfile()
        .context("cannot create a scratch workbook")?;
    scratch
        .write_all(upload)
        .and_then(|()| scratch.flush())
        .context("cannot copy the upload")?;

    let mut editor = XlsxEditor::open_active(scratch.path())?;
    let month = period.month.to_string();
    let header = VisitHeader {
        period_label: &month,
        operator_name: &state.operator.name,
        operator_id: &state.operator.id_number,
        operator_role: &state.operator.role,
    };
    let summary = sheet::append_visits(&mut editor, &header, &state.selected)?;
    let bytes = editor.to_bytes()?;

    info!(
        "Exported {} outlets to {} from row {} ({})",
        summary.rows_written,
        editor.sheet_path(),
        summary.first_row,
        if summary.header_written {
            "header written"
        } else {
            "header kept"
        }
    );
    Ok(VisitExport {
        file_name: download_file_name(&state.operator.name, period),
        bytes,
        summary,
    })
}
