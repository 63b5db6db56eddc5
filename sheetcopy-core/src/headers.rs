//! Header row extraction and column label resolution

use serde::Serialize;

use crate::error::{Result, SheetCopyError};
use crate::reader::parser_utils::column_code;
use crate::reader::{Sheet, Workbook};

/// Labels for row 0 of a sheet, one per column from A to the last used column.
///
/// An empty or missing header cell is labelled with its column code, so an
/// empty sheet yields `["A"]`.
pub fn extract_headers(sheet: &Sheet) -> Vec<String> {
    let cols = sheet.used_range.map_or(1, |(_, cols)| cols.max(1));

    (0..cols)
        .map(|col| match sheet.get_cell(0, col) {
            Some(cell) if !cell.value.is_empty() => cell.value.to_string(),
            _ => column_code(col),
        })
        .collect()
}

/// Position of `label` in `headers`. Duplicate labels resolve to the first match.
pub fn resolve_column(sheet: &str, headers: &[String], label: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h == label)
        .ok_or_else(|| SheetCopyError::ColumnNotFound {
            sheet: sheet.to_string(),
            label: label.to_string(),
        })
}

/// Header labels of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetHeaders {
    pub sheet: String,
    pub labels: Vec<String>,
}

/// Sheet name to header labels for a whole workbook, in sheet order.
/// This is what the selection controls are populated from.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkbookHeaders {
    pub sheets: Vec<SheetHeaders>,
}

impl WorkbookHeaders {
    pub fn from_workbook(workbook: &Workbook) -> Self {
        Self {
            sheets: workbook
                .sheets
                .iter()
                .map(|sheet| SheetHeaders {
                    sheet: sheet.name.clone(),
                    labels: extract_headers(sheet),
                })
                .collect(),
        }
    }

    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|s| s.sheet.as_str())
    }

    pub fn labels(&self, sheet: &str) -> Option<&[String]> {
        self.sheets
            .iter()
            .find(|s| s.sheet == sheet)
            .map(|s| s.labels.as_slice())
    }

    pub fn contains_sheet(&self, sheet: &str) -> bool {
        self.labels(sheet).is_some()
    }
}
