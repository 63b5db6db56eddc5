//! Positional column copy between two sheets

use serde::{Deserialize, Serialize};

use crate::config::SheetCopyConfig;
use crate::error::{FileRole, Result, SheetCopyError};
use crate::grid::{Grid, sheet_to_grid};
use crate::headers::{extract_headers, resolve_column};
use crate::reader::{Sheet, Workbook};
use crate::reassembly::reassemble;
use crate::writer;

/// A (sheet, column label) pair picked by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub sheet: String,
    pub column: String,
}

impl ColumnSelection {
    pub fn new(sheet: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            column: column.into(),
        }
    }
}

/// Result of [`copy_column`]
#[derive(Debug, Clone, PartialEq)]
pub struct CopyOutcome {
    pub grid: Grid,
    pub copied_rows: usize,
}

/// Copy `source_col` of every data row in `source` into `target_col` of the
/// row at the same index in `target`.
///
/// Row 0 is the header and is never written. The target gains empty rows so
/// that it is at least as long as the source. A source row that is missing or
/// too short to hold `source_col` is skipped and not counted. The input grids
/// are left untouched.
pub fn copy_column(
    source: &Grid,
    target: &Grid,
    source_col: usize,
    target_col: usize,
) -> CopyOutcome {
    let mut grid = target.clone();
    let mut copied_rows = 0;

    for i in 1..source.len() {
        if i >= grid.len() {
            grid.push_empty_row();
        }

        let Some(value) = source.get(i, source_col) else {
            continue;
        };

        grid.set(i, target_col, value.clone());
        copied_rows += 1;
    }

    CopyOutcome { grid, copied_rows }
}

/// Everything the caller needs after a successful copy
#[derive(Debug, Clone)]
pub struct CopyReport {
    /// Encoded target workbook
    pub bytes: Vec<u8>,
    pub copied_rows: usize,
    pub source_column_index: usize,
    pub target_column_index: usize,
    pub source_row_count: usize,
    pub target_row_count: usize,
    pub source: ColumnSelection,
    pub target: ColumnSelection,
}

impl CopyReport {
    /// One-line summary shown to the user
    pub fn summary(&self) -> String {
        format!(
            "Copied {} rows from column {} to column {}",
            self.copied_rows, self.source.column, self.target.column
        )
    }
}

/// Copy a column from one workbook into a column of another and encode the result.
///
/// Every selection is validated before any grid is built, so a failure
/// leaves both workbooks as they were.
pub fn copy_between(
    source_workbook: &Workbook,
    target_workbook: &Workbook,
    source: &ColumnSelection,
    target: &ColumnSelection,
    config: &SheetCopyConfig,
) -> Result<CopyReport> {
    for (workbook, role) in [
        (source_workbook, FileRole::Source),
        (target_workbook, FileRole::Target),
    ] {
        if workbook.is_empty() {
            return Err(SheetCopyError::EmptyWorkbook { role });
        }
    }

    let source_sheet = select_sheet(source_workbook, FileRole::Source, &source.sheet)?;
    let target_sheet = select_sheet(target_workbook, FileRole::Target, &target.sheet)?;

    let source_column_index = resolve_column(
        &source.sheet,
        &extract_headers(source_sheet),
        &source.column,
    )?;
    let target_column_index = resolve_column(
        &target.sheet,
        &extract_headers(target_sheet),
        &target.column,
    )?;

    let source_grid = sheet_to_grid(source_sheet);
    let target_grid = sheet_to_grid(target_sheet);
    tracing::debug!(
        source_column_index,
        target_column_index,
        source_row_count = source_grid.len(),
        target_row_count = target_grid.len(),
        "resolved column selections"
    );

    let outcome = copy_column(
        &source_grid,
        &target_grid,
        source_column_index,
        target_column_index,
    );

    let bare_sheet;
    let original = if config.preserve_layout {
        target_sheet
    } else {
        bare_sheet = Sheet::new(target_sheet.name.clone());
        &bare_sheet
    };
    let mut output = target_workbook.clone();
    reassemble(&mut output, &target.sheet, &outcome.grid, original)?;

    let bytes = writer::encode(&output).map_err(SheetCopyError::encode)?;

    tracing::info!(
        copied_rows = outcome.copied_rows,
        source_sheet = %source.sheet,
        target_sheet = %target.sheet,
        bytes = bytes.len(),
        "column copy finished"
    );

    Ok(CopyReport {
        bytes,
        copied_rows: outcome.copied_rows,
        source_column_index,
        target_column_index,
        source_row_count: source_grid.len(),
        target_row_count: target_grid.len(),
        source: source.clone(),
        target: target.clone(),
    })
}

fn select_sheet<'a>(workbook: &'a Workbook, role: FileRole, name: &str) -> Result<&'a Sheet> {
    workbook
        .get_sheet(name)
        .ok_or_else(|| SheetCopyError::InvalidSheetSelection {
            role,
            sheet: name.to_string(),
        })
}
