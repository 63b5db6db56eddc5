//! Excel file reader using calamine

use anyhow::{Context, Result};
use calamine::{Data, Range, Reader, Sheets, Xls, Xlsx};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

pub mod package;
pub mod parser_utils;
pub mod workbook;
pub mod xml_parser;

pub use package::Package;
pub use workbook::{Cell, CellValue, Sheet, SheetLayout, Workbook};

/// The two accepted spreadsheet families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpreadsheetFormat {
    /// Office Open XML package (`.xlsx`, `.xlsm`)
    Xlsx,
    /// Legacy BIFF compound file (`.xls`)
    Xls,
}

impl SpreadsheetFormat {
    const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];
    const CFB_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

    /// Sniff the format from the leading bytes of a file
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&Self::ZIP_MAGIC) {
            Some(SpreadsheetFormat::Xlsx)
        } else if bytes.starts_with(&Self::CFB_MAGIC) {
            Some(SpreadsheetFormat::Xls)
        } else {
            None
        }
    }

    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension().and_then(|s| s.to_str())?;
        if ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm") {
            Some(SpreadsheetFormat::Xlsx)
        } else if ext.eq_ignore_ascii_case("xls") {
            Some(SpreadsheetFormat::Xls)
        } else {
            None
        }
    }
}

impl fmt::Display for SpreadsheetFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpreadsheetFormat::Xlsx => write!(f, "xlsx"),
            SpreadsheetFormat::Xls => write!(f, "xls"),
        }
    }
}

/// Read a workbook from a file path
pub fn read_workbook<P: AsRef<Path>>(path: P) -> Result<Workbook> {
    let path = path.as_ref();
    if SpreadsheetFormat::from_path(path).is_none() {
        anyhow::bail!(
            "Unsupported file extension: {} (expected .xlsx, .xlsm or .xls)",
            path.display()
        );
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    decode(&bytes)
}

/// Decode an in-memory spreadsheet file into a workbook
pub fn decode(bytes: &[u8]) -> Result<Workbook> {
    let format = SpreadsheetFormat::detect(bytes)
        .context("Unrecognized file content: not an Excel workbook")?;

    let mut excel: Sheets<_> = match format {
        SpreadsheetFormat::Xlsx => Sheets::Xlsx(
            Xlsx::new(Cursor::new(bytes))
                .map_err(calamine::Error::Xlsx)
                .context("Failed to open xlsx workbook")?,
        ),
        SpreadsheetFormat::Xls => Sheets::Xls(
            Xls::new(Cursor::new(bytes))
                .map_err(calamine::Error::Xls)
                .context("Failed to open xls workbook")?,
        ),
    };

    // Layout metadata lives in the worksheet XML, which calamine does not expose
    let package = match format {
        SpreadsheetFormat::Xlsx => Some(Package::open(bytes)?),
        SpreadsheetFormat::Xls => None,
    };
    let mut archive = package.as_ref().map(Package::archive).transpose()?;

    let mut sheets = Vec::new();
    for sheet_name in excel.sheet_names() {
        let range = excel
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet '{}'", sheet_name))?;
        let mut sheet = parse_sheet(&sheet_name, &range);

        if let (Some(package), Some(archive)) = (package.as_ref(), archive.as_mut()) {
            let sheet_path = package
                .sheet_part(&sheet_name)
                .with_context(|| format!("Sheet '{}' not found in workbook.xml", sheet_name))?;
            sheet.layout = xml_parser::extract_sheet_layout(archive, sheet_path)
                .with_context(|| format!("Failed to read layout of sheet '{}'", sheet_name))?;
        }

        sheets.push(sheet);
    }

    tracing::debug!(%format, sheets = sheets.len(), "decoded workbook");

    let workbook = Workbook::new(format, sheets);
    Ok(match package {
        Some(package) => workbook.with_package(package),
        None => workbook,
    })
}

fn parse_sheet(name: &str, range: &Range<Data>) -> Sheet {
    let mut cells = HashMap::new();

    // Calamine ranges start at the first used cell; positions here are absolute
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut max_row = None;
    let mut max_col = 0u32;

    for (rel_row, rel_col, data) in range.used_cells() {
        let value = parse_cell_value(data);
        if value.is_empty() {
            continue;
        }
        let row = start_row + rel_row as u32;
        let col = start_col + rel_col as u32;
        max_row = Some(max_row.map_or(row, |r: u32| r.max(row)));
        max_col = max_col.max(col);
        cells.insert((row, col), Cell { row, col, value });
    }

    Sheet {
        name: name.to_string(),
        cells,
        used_range: max_row.map(|r| (r + 1, max_col + 1)),
        layout: SheetLayout::default(),
    }
}

fn parse_cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => CellValue::Error(e.to_string()),
        Data::Empty => CellValue::Empty,
        Data::DateTime(dt) if dt.is_duration() => CellValue::Number(dt.as_f64()),
        // Stored serials depend on the workbook's date system; keep 1900-based ones
        Data::DateTime(dt) => dt
            .as_datetime()
            .and_then(workbook::datetime_to_serial)
            .map_or(CellValue::Number(dt.as_f64()), CellValue::DateTime),
        Data::DateTimeIso(s) => CellValue::Text(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
    }
}
