//! Put an updated grid back into its workbook

use crate::error::{FileRole, Result, SheetCopyError};
use crate::grid::{Grid, grid_to_sheet};
use crate::reader::{Sheet, Workbook};

/// Replace `sheet_name` in `workbook` with a sheet built from `grid`.
///
/// Merged ranges, column definitions, row heights and cell styles are taken
/// from `original` as they are. Other sheets and the sheet order are
/// unchanged, and only `sheet_name` is marked for rewriting.
pub fn reassemble(
    workbook: &mut Workbook,
    sheet_name: &str,
    grid: &Grid,
    original: &Sheet,
) -> Result<()> {
    let mut sheet = grid_to_sheet(sheet_name, grid);
    sheet.layout = original.layout.clone();

    workbook
        .replace_sheet(sheet)
        .map(|_| ())
        .ok_or_else(|| SheetCopyError::InvalidSheetSelection {
            role: FileRole::Target,
            sheet: sheet_name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{CellValue, SheetLayout, SpreadsheetFormat};
    use std::collections::BTreeMap;

    fn target_workbook() -> Workbook {
        let mut roster = Sheet::new("Roster");
        roster.set_value(0, 0, CellValue::from("ID"));
        roster.set_value(0, 1, CellValue::from("Grade"));
        roster.layout = SheetLayout {
            merged_ranges: vec!["A1:B1".to_string()],
            columns: vec![vec![
                ("min".to_string(), "1".to_string()),
                ("max".to_string(), "1".to_string()),
                ("width".to_string(), "18".to_string()),
            ]],
            rows: BTreeMap::from([(0, vec![("ht".to_string(), "24".to_string())])]),
            cell_styles: BTreeMap::from([((0, 1), "2".to_string())]),
        };

        let mut notes = Sheet::new("Notes");
        notes.set_value(0, 0, CellValue::from("keep me"));

        Workbook::new(SpreadsheetFormat::Xlsx, vec![roster, notes])
    }

    #[test]
    fn test_layout_is_carried_over() {
        let mut workbook = target_workbook();
        let original = workbook.sheets[0].clone();
        let grid = Grid::from_rows(vec![
            vec![CellValue::from("ID"), CellValue::from("Grade")],
            vec![CellValue::Empty, CellValue::from(85)],
            vec![CellValue::from(3)],
        ]);

        reassemble(&mut workbook, "Roster", &grid, &original).unwrap();

        let sheet = workbook.get_sheet("Roster").unwrap();
        assert_eq!(sheet.layout, original.layout);
        assert_eq!(sheet.used_range, Some((3, 2)));
        assert_eq!(
            sheet.get_cell(1, 1).map(|c| &c.value),
            Some(&CellValue::Number(85.0))
        );
    }

    #[test]
    fn test_other_sheets_are_untouched() {
        let mut workbook = target_workbook();
        let original = workbook.sheets[0].clone();
        let notes_before = workbook.sheets[1].cells.clone();

        reassemble(&mut workbook, "Roster", &Grid::new(), &original).unwrap();

        assert_eq!(workbook.sheet_names(), vec!["Roster", "Notes"]);
        assert_eq!(workbook.sheets[1].cells, notes_before);
        let rewritten: Vec<_> = workbook.rewritten_sheets().map(|s| s.name.as_str()).collect();
        assert_eq!(rewritten, vec!["Roster"]);
    }

    #[test]
    fn test_unknown_sheet_is_rejected() {
        let mut workbook = target_workbook();
        let original = workbook.sheets[0].clone();

        let err = reassemble(&mut workbook, "Missing", &Grid::new(), &original).unwrap_err();
        assert!(matches!(err, SheetCopyError::InvalidSheetSelection { .. }));
        assert_eq!(workbook.sheet_names(), vec!["Roster", "Notes"]);
        assert_eq!(workbook.rewritten_sheets().count(), 0);
    }
}
