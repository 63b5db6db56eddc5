//! Writer module for serializing workbooks

mod package_writer;
mod xlsx_writer;

pub use package_writer::patch_xlsx;
pub use xlsx_writer::write_xlsx;

use anyhow::{Context, Result};
use std::path::Path;

use crate::reader::Workbook;

/// Encode a workbook as XLSX bytes.
///
/// A workbook decoded from an XLSX package is written over that package, so
/// only replaced sheets change. Legacy `.xls` workbooks become a new XLSX
/// package.
pub fn encode(workbook: &Workbook) -> Result<Vec<u8>> {
    let bytes = match &workbook.package {
        Some(package) => patch_xlsx(workbook, package)?,
        None => write_xlsx(workbook)?,
    };
    tracing::debug!(
        format = %workbook.format,
        sheets = workbook.sheets.len(),
        bytes = bytes.len(),
        "encoded workbook"
    );
    Ok(bytes)
}

/// Encode a workbook and write it to `output_path`
pub fn write_workbook<P: AsRef<Path>>(output_path: P, workbook: &Workbook) -> Result<()> {
    let output = output_path.as_ref();
    let bytes = encode(workbook)?;
    std::fs::write(output, bytes)
        .with_context(|| format!("Failed to write file: {}", output.display()))
}
