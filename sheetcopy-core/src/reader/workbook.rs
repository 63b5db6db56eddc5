//! Workbook data structures

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use super::SpreadsheetFormat;
use super::package::Package;

/// Represents a complete workbook
#[derive(Debug, Clone)]
pub struct Workbook {
    pub format: SpreadsheetFormat,
    pub sheets: Vec<Sheet>,
    /// The package the workbook was decoded from, for `.xlsx` inputs
    pub package: Option<Package>,
    /// Sheets swapped in by `replace_sheet` since decoding
    rewritten: BTreeSet<String>,
}

impl Workbook {
    pub fn new(format: SpreadsheetFormat, sheets: Vec<Sheet>) -> Self {
        Self {
            format,
            sheets,
            package: None,
            rewritten: BTreeSet::new(),
        }
    }

    pub fn with_package(mut self, package: Package) -> Self {
        self.package = Some(package);
        self
    }

    /// Get a sheet by name
    pub fn get_sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Get all sheet names
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Swap the sheet with the same name for `sheet`, keeping its position.
    /// Returns the replaced sheet, or `None` when no sheet has that name.
    pub fn replace_sheet(&mut self, sheet: Sheet) -> Option<Sheet> {
        let slot = self.sheets.iter_mut().find(|s| s.name == sheet.name)?;
        self.rewritten.insert(sheet.name.clone());
        Some(std::mem::replace(slot, sheet))
    }

    /// Sheets whose content no longer matches the decoded package
    pub fn rewritten_sheets(&self) -> impl Iterator<Item = &Sheet> {
        self.sheets
            .iter()
            .filter(|s| self.rewritten.contains(&s.name))
    }
}

/// Represents a worksheet
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub cells: HashMap<(u32, u32), Cell>,
    pub used_range: Option<(u32, u32)>, // (rows, cols)
    pub layout: SheetLayout,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Get a cell at the given position
    pub fn get_cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    /// Insert a non-empty value and grow the used range to cover it
    pub fn set_value(&mut self, row: u32, col: u32, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, col));
            return;
        }
        let (rows, cols) = self.used_range.unwrap_or((0, 0));
        self.used_range = Some((rows.max(row + 1), cols.max(col + 1)));
        self.cells.insert((row, col), Cell { row, col, value });
    }
}

/// Layout metadata carried across a rewrite without being interpreted.
///
/// Attribute lists are stored as read from the worksheet XML and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetLayout {
    /// Merged cell ranges as written in the file, e.g. `A1:C1`
    pub merged_ranges: Vec<String>,
    /// One attribute list per `<col>` element (widths, hidden flags)
    pub columns: Vec<Vec<(String, String)>>,
    /// Row height attributes keyed by 0-based row index
    pub rows: BTreeMap<u32, Vec<(String, String)>>,
    /// `s` attribute of each styled cell, keyed by 0-based (row, col)
    pub cell_styles: BTreeMap<(u32, u32), String>,
}

impl SheetLayout {
    pub fn is_empty(&self) -> bool {
        self.merged_ranges.is_empty()
            && self.columns.is_empty()
            && self.rows.is_empty()
            && self.cell_styles.is_empty()
    }
}

/// Represents a single cell
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

/// Cell value types
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    /// Excel serial date (days since 1899-12-30)
    DateTime(f64),
    Boolean(bool),
    Error(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::DateTime(serial) => match serial_to_datetime(*serial) {
                Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                }
                Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
                None => write!(f, "{}", serial),
            },
            CellValue::Boolean(b) => write!(f, "{}", b),
            CellValue::Error(e) => write!(f, "{}", e),
        }
    }
}

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Serial 60 is 1900-02-29, a day that does not exist; earlier serials are
/// one day behind the 1899-12-30 epoch
const LEAP_BUG_SERIAL: f64 = 60.0;

fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let serial = if serial < LEAP_BUG_SERIAL {
        serial + 1.0
    } else {
        serial
    };
    let millis = (serial * MILLIS_PER_DAY).round() as i64;
    excel_epoch()?.checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Inverse of `serial_to_datetime`: a 1900-system serial for `dt`
pub(crate) fn datetime_to_serial(dt: NaiveDateTime) -> Option<f64> {
    let millis = dt.signed_duration_since(excel_epoch()?).num_milliseconds();
    let days = millis as f64 / MILLIS_PER_DAY;
    if days < LEAP_BUG_SERIAL + 1.0 {
        Some(days - 1.0)
    } else {
        Some(days)
    }
}
