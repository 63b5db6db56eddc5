//! Row-major grids and their conversion to and from cell-indexed sheets

use crate::reader::{CellValue, Sheet};

/// A row-major view of a sheet. Rows may differ in length; a row that holds
/// nothing is an empty `Vec`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&[CellValue]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Value at (row, col), or `None` when the row is missing or too short
    pub fn get(&self, row: usize, col: usize) -> Option<&CellValue> {
        self.rows.get(row)?.get(col)
    }

    /// Append an empty row
    pub fn push_empty_row(&mut self) {
        self.rows.push(Vec::new());
    }

    /// Write a value, creating the row and padding it with `Empty` as needed
    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if row >= self.rows.len() {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if col >= cells.len() {
            cells.resize(col + 1, CellValue::Empty);
        }
        cells[col] = value;
    }

    /// Widest row length
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// Build a grid covering the sheet's used range. Every row is padded with
/// `Empty` up to the used width, so only ragged grids built by hand have
/// short rows.
pub fn sheet_to_grid(sheet: &Sheet) -> Grid {
    let Some((rows, cols)) = sheet.used_range else {
        return Grid::new();
    };

    let mut grid = vec![vec![CellValue::Empty; cols as usize]; rows as usize];
    for cell in sheet.cells.values() {
        if let Some(slot) = grid
            .get_mut(cell.row as usize)
            .and_then(|r| r.get_mut(cell.col as usize))
        {
            *slot = cell.value.clone();
        }
    }
    Grid::from_rows(grid)
}

/// Build a sheet from a grid. Empty values produce no cell, but the used
/// range still spans every row and the widest row of the grid.
pub fn grid_to_sheet(name: &str, grid: &Grid) -> Sheet {
    let mut sheet = Sheet::new(name);
    for (r, row) in grid.rows().iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            sheet.set_value(r as u32, c as u32, value.clone());
        }
    }

    let width = grid.width();
    if !grid.is_empty() && width > 0 {
        sheet.used_range = Some((grid.len() as u32, width as u32));
    }
    sheet
}
