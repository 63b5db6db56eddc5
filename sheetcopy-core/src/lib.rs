//! sheetcopy-core: Core library for copying a column between Excel workbooks
//!
//! A column of a source sheet is copied into a column of a target sheet,
//! row-aligned by position, and the target workbook is written back as a new
//! XLSX package with its merged cells, column widths and row heights intact.

pub mod config;
pub mod copy;
pub mod error;
pub mod grid;
pub mod headers;
pub mod load;
pub mod reader;
pub mod reassembly;
pub mod session;
pub mod writer;

pub use config::SheetCopyConfig;
pub use copy::{ColumnSelection, CopyOutcome, CopyReport, copy_between, copy_column};
pub use error::{FileRole, Result, SheetCopyError};
pub use grid::{Grid, grid_to_sheet, sheet_to_grid};
pub use headers::{SheetHeaders, WorkbookHeaders, extract_headers, resolve_column};
pub use load::{LoadedFile, load_bytes, load_file, load_pair};
pub use reader::{CellValue, Package, Sheet, SheetLayout, SpreadsheetFormat, Workbook};
pub use reassembly::reassemble;
pub use session::{CopyJob, JobOutcome, JobStatus, Panel, ProcessedFile, ProcessingState, Session};
