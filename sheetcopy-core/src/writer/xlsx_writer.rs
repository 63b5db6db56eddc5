//! Fresh XLSX package writer, used when there is no package to patch

use anyhow::{Context, Result};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::collections::BTreeMap;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::reader::parser_utils::cell_ref;
use crate::reader::{CellValue, Sheet, Workbook};

/// Days between the 1900 and 1904 date system epochs
const DATE1904_OFFSET: f64 = 1462.0;

static NO_VALUE: CellValue = CellValue::Empty;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PKG_REL: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_WORKSHEET: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const REL_STYLES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";

const CT_RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
const CT_WORKBOOK: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";
const CT_WORKSHEET: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

/// Cell style indices in `STYLES_XML`
const STYLE_DATE: &str = "1";
const STYLE_DATETIME: &str = "2";

/// Style indices a worksheet part is written against
#[derive(Debug, Clone, Default)]
pub(crate) struct SheetStyles {
    /// `cellXfs` index with number format 14
    pub date: Option<String>,
    /// `cellXfs` index with number format 22
    pub datetime: Option<String>,
    /// Write the `s` indices read with the layout. Only valid against the
    /// styles part they were read from.
    pub keep_cell_styles: bool,
    /// The package counts dates from 1904-01-01
    pub date1904: bool,
}

impl SheetStyles {
    fn fresh() -> Self {
        Self {
            date: Some(STYLE_DATE.to_string()),
            datetime: Some(STYLE_DATETIME.to_string()),
            keep_cell_styles: false,
            date1904: false,
        }
    }
}

/// Default font and fills, plus two date formats (14 = date, 22 = date and time)
const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#;

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Serialize a workbook into a fresh XLSX package
pub fn write_xlsx(workbook: &Workbook) -> Result<Vec<u8>> {
    if workbook.sheets.is_empty() {
        anyhow::bail!("A workbook needs at least one sheet to be written");
    }

    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let parts = [
        ("[Content_Types].xml", content_types_xml(workbook)?),
        ("_rels/.rels", root_rels_xml()?),
        ("xl/workbook.xml", workbook_xml(workbook)?),
        ("xl/_rels/workbook.xml.rels", workbook_rels_xml(workbook)?),
        ("xl/styles.xml", STYLES_XML.as_bytes().to_vec()),
    ];
    for (name, content) in parts {
        zip_writer.start_file(name, options)?;
        zip_writer.write_all(&content)?;
    }

    let styles = SheetStyles::fresh();
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        let content = sheet_xml(sheet, &styles)
            .with_context(|| format!("Failed to serialize sheet '{}'", sheet.name))?;
        zip_writer.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip_writer.write_all(&content)?;
    }

    Ok(zip_writer.finish()?.into_inner())
}

fn new_document() -> Result<XmlWriter> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    Ok(writer)
}

fn start(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Start(elem))?;
    Ok(())
}

fn empty(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
    let mut elem = BytesStart::new(name);
    for attr in attrs {
        elem.push_attribute(*attr);
    }
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text(writer: &mut XmlWriter, name: &str, attrs: &[(&str, &str)], value: &str) -> Result<()> {
    start(writer, name, attrs)?;
    writer.write_event(Event::Text(BytesText::new(value)))?;
    end(writer, name)
}

fn content_types_xml(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut w = new_document()?;
    start(&mut w, "Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    empty(
        &mut w,
        "Default",
        &[("Extension", "rels"), ("ContentType", CT_RELS)],
    )?;
    empty(
        &mut w,
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    empty(
        &mut w,
        "Override",
        &[("PartName", "/xl/workbook.xml"), ("ContentType", CT_WORKBOOK)],
    )?;
    empty(
        &mut w,
        "Override",
        &[("PartName", "/xl/styles.xml"), ("ContentType", CT_STYLES)],
    )?;
    for i in 1..=workbook.sheets.len() {
        let part = format!("/xl/worksheets/sheet{}.xml", i);
        empty(
            &mut w,
            "Override",
            &[("PartName", part.as_str()), ("ContentType", CT_WORKSHEET)],
        )?;
    }
    end(&mut w, "Types")?;
    Ok(w.into_inner().into_inner())
}

fn root_rels_xml() -> Result<Vec<u8>> {
    let mut w = new_document()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    empty(
        &mut w,
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", REL_OFFICE_DOCUMENT),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner().into_inner())
}

fn workbook_xml(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut w = new_document()?;
    start(
        &mut w,
        "workbook",
        &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)],
    )?;
    start(&mut w, "sheets", &[])?;
    for (i, sheet) in workbook.sheets.iter().enumerate() {
        let sheet_id = (i + 1).to_string();
        let r_id = format!("rId{}", i + 1);
        empty(
            &mut w,
            "sheet",
            &[
                ("name", sheet.name.as_str()),
                ("sheetId", sheet_id.as_str()),
                ("r:id", r_id.as_str()),
            ],
        )?;
    }
    end(&mut w, "sheets")?;
    end(&mut w, "workbook")?;
    Ok(w.into_inner().into_inner())
}

fn workbook_rels_xml(workbook: &Workbook) -> Result<Vec<u8>> {
    let mut w = new_document()?;
    start(&mut w, "Relationships", &[("xmlns", NS_PKG_REL)])?;
    for i in 1..=workbook.sheets.len() {
        let r_id = format!("rId{}", i);
        let target = format!("worksheets/sheet{}.xml", i);
        empty(
            &mut w,
            "Relationship",
            &[
                ("Id", r_id.as_str()),
                ("Type", REL_WORKSHEET),
                ("Target", target.as_str()),
            ],
        )?;
    }
    let styles_id = format!("rId{}", workbook.sheets.len() + 1);
    empty(
        &mut w,
        "Relationship",
        &[
            ("Id", styles_id.as_str()),
            ("Type", REL_STYLES),
            ("Target", "styles.xml"),
        ],
    )?;
    end(&mut w, "Relationships")?;
    Ok(w.into_inner().into_inner())
}

/// Serialize one worksheet part, including its layout metadata
pub(crate) fn sheet_xml(sheet: &Sheet, styles: &SheetStyles) -> Result<Vec<u8>> {
    let mut w = new_document()?;
    start(
        &mut w,
        "worksheet",
        &[("xmlns", NS_MAIN), ("xmlns:r", NS_REL)],
    )?;

    let dimension = match sheet.used_range {
        Some((rows, cols)) if rows > 0 && cols > 0 => {
            format!("A1:{}", cell_ref(rows - 1, cols - 1))
        }
        _ => "A1".to_string(),
    };
    empty(&mut w, "dimension", &[("ref", dimension.as_str())])?;

    if !sheet.layout.columns.is_empty() {
        start(&mut w, "cols", &[])?;
        for attrs in &sheet.layout.columns {
            let mut attrs = borrow_attrs(attrs);
            if !styles.keep_cell_styles {
                attrs.retain(|(k, _)| *k != "style");
            }
            empty(&mut w, "col", &attrs)?;
        }
        end(&mut w, "cols")?;
    }

    // Rows holding cells, plus rows that only carry a height
    let mut rows: BTreeMap<u32, BTreeMap<u32, &CellValue>> = BTreeMap::new();
    for cell in sheet.cells.values().filter(|c| !c.value.is_empty()) {
        rows.entry(cell.row)
            .or_default()
            .insert(cell.col, &cell.value);
    }
    if styles.keep_cell_styles {
        for &(row, col) in sheet.layout.cell_styles.keys() {
            rows.entry(row)
                .or_default()
                .entry(col)
                .or_insert(&NO_VALUE);
        }
    }
    for row in sheet.layout.rows.keys() {
        rows.entry(*row).or_default();
    }

    start(&mut w, "sheetData", &[])?;
    for (row, cells) in rows {
        let r = (u64::from(row) + 1).to_string();
        let mut attrs = vec![("r", r.as_str())];
        if let Some(layout_attrs) = sheet.layout.rows.get(&row) {
            attrs.extend(borrow_attrs(layout_attrs));
        }

        if cells.is_empty() {
            empty(&mut w, "row", &attrs)?;
            continue;
        }

        start(&mut w, "row", &attrs)?;
        for (col, value) in cells {
            let style = sheet
                .layout
                .cell_styles
                .get(&(row, col))
                .filter(|_| styles.keep_cell_styles);
            write_cell(&mut w, &cell_ref(row, col), value, style.map(String::as_str), styles)?;
        }
        end(&mut w, "row")?;
    }
    end(&mut w, "sheetData")?;

    if !sheet.layout.merged_ranges.is_empty() {
        let count = sheet.layout.merged_ranges.len().to_string();
        start(&mut w, "mergeCells", &[("count", count.as_str())])?;
        for range in &sheet.layout.merged_ranges {
            empty(&mut w, "mergeCell", &[("ref", range.as_str())])?;
        }
        end(&mut w, "mergeCells")?;
    }

    end(&mut w, "worksheet")?;
    Ok(w.into_inner().into_inner())
}

fn borrow_attrs(attrs: &[(String, String)]) -> Vec<(&str, &str)> {
    attrs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

fn write_cell(
    w: &mut XmlWriter,
    r: &str,
    value: &CellValue,
    style: Option<&str>,
    styles: &SheetStyles,
) -> Result<()> {
    let date_style = match value {
        CellValue::DateTime(serial) if serial.fract() == 0.0 => styles.date.as_deref(),
        CellValue::DateTime(_) => styles.datetime.as_deref(),
        _ => None,
    };
    let mut attrs = vec![("r", r)];
    if let Some(style) = date_style.or(style) {
        attrs.push(("s", style));
    }

    match value {
        // A styled position with no value keeps its formatting
        CellValue::Empty if attrs.len() > 1 => empty(w, "c", &attrs),
        CellValue::Empty => Ok(()),
        CellValue::Text(s) => {
            attrs.push(("t", "inlineStr"));
            start(w, "c", &attrs)?;
            start(w, "is", &[])?;
            if s.starts_with(char::is_whitespace) || s.ends_with(char::is_whitespace) {
                text(w, "t", &[("xml:space", "preserve")], s)?;
            } else {
                text(w, "t", &[], s)?;
            }
            end(w, "is")?;
            end(w, "c")
        }
        CellValue::Number(n) if n.is_finite() => {
            start(w, "c", &attrs)?;
            text(w, "v", &[], &n.to_string())?;
            end(w, "c")
        }
        CellValue::Number(_) => {
            attrs.push(("t", "e"));
            start(w, "c", &attrs)?;
            text(w, "v", &[], "#NUM!")?;
            end(w, "c")
        }
        CellValue::DateTime(serial) => {
            let serial = if styles.date1904 {
                serial - DATE1904_OFFSET
            } else {
                *serial
            };
            start(w, "c", &attrs)?;
            text(w, "v", &[], &serial.to_string())?;
            end(w, "c")
        }
        CellValue::Boolean(b) => {
            attrs.push(("t", "b"));
            start(w, "c", &attrs)?;
            text(w, "v", &[], if *b { "1" } else { "0" })?;
            end(w, "c")
        }
        CellValue::Error(e) => {
            attrs.push(("t", "e"));
            start(w, "c", &attrs)?;
            text(w, "v", &[], e)?;
            end(w, "c")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{SheetLayout, SpreadsheetFormat};
    use std::collections::BTreeMap;

    fn sheet_xml_string(sheet: &Sheet) -> String {
        styled_sheet_xml_string(sheet, &SheetStyles::fresh())
    }

    fn styled_sheet_xml_string(sheet: &Sheet, styles: &SheetStyles) -> String {
        String::from_utf8(sheet_xml(sheet, styles).unwrap()).unwrap()
    }

    #[test]
    fn test_sheet_xml_cells() {
        let mut sheet = Sheet::new("Data");
        sheet.set_value(0, 0, CellValue::from("a < b"));
        sheet.set_value(0, 1, CellValue::from(90));
        sheet.set_value(1, 0, CellValue::from(true));
        sheet.set_value(1, 2, CellValue::DateTime(45306.0));
        sheet.set_value(2, 1, CellValue::Error("#N/A".into()));
        sheet.set_value(2, 2, CellValue::from(" padded"));

        let xml = sheet_xml_string(&sheet);
        assert!(xml.contains(r#"<dimension ref="A1:C3"/>"#));
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t>a &lt; b</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B1"><v>90</v></c>"#));
        assert!(xml.contains(r#"<c r="A2" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="C2" s="1"><v>45306</v></c>"#));
        assert!(xml.contains(r#"<c r="B3" t="e"><v>#N/A</v></c>"#));
        assert!(xml.contains(r#"<t xml:space="preserve"> padded</t>"#));
        // Cells are written in column order within a row
        let a1 = xml.find(r#"r="A1""#).unwrap();
        let b1 = xml.find(r#"r="B1""#).unwrap();
        assert!(a1 < b1);
    }

    #[test]
    fn test_sheet_xml_layout() {
        let mut sheet = Sheet::new("Roster");
        sheet.set_value(0, 0, CellValue::from("ID"));
        sheet.layout = SheetLayout {
            merged_ranges: vec!["A1:C1".to_string()],
            columns: vec![vec![
                ("min".to_string(), "1".to_string()),
                ("max".to_string(), "2".to_string()),
                ("width".to_string(), "15".to_string()),
                ("customWidth".to_string(), "1".to_string()),
                ("style".to_string(), "5".to_string()),
            ]],
            rows: BTreeMap::from([
                (0, vec![("ht".to_string(), "28".to_string())]),
                (4, vec![("hidden".to_string(), "1".to_string())]),
            ]),
            cell_styles: BTreeMap::from([((0, 0), "3".to_string())]),
        };

        let xml = sheet_xml_string(&sheet);
        assert!(xml.contains(r#"<cols><col min="1" max="2" width="15" customWidth="1"/></cols>"#));
        assert!(xml.contains(r#"<row r="1" ht="28">"#));
        assert!(xml.contains(r#"<row r="5" hidden="1"/>"#));
        assert!(xml.contains(r#"<mergeCells count="1"><mergeCell ref="A1:C1"/></mergeCells>"#));

        // Style indices refer to a styles part this package does not have
        assert!(xml.contains(r#"<c r="A1" t="inlineStr">"#));

        let cols = xml.find("<cols>").unwrap();
        let data = xml.find("<sheetData>").unwrap();
        let merges = xml.find("<mergeCells").unwrap();
        assert!(cols < data && data < merges);
    }

    #[test]
    fn test_sheet_xml_keeps_cell_styles() {
        let mut sheet = Sheet::new("Roster");
        sheet.set_value(0, 0, CellValue::from("ID"));
        sheet.set_value(1, 1, CellValue::from(85));
        sheet.set_value(2, 1, CellValue::DateTime(45306.0));
        sheet.set_value(3, 1, CellValue::DateTime(45306.25));
        sheet.layout.columns = vec![vec![
            ("min".to_string(), "2".to_string()),
            ("max".to_string(), "2".to_string()),
            ("style".to_string(), "5".to_string()),
        ]];
        sheet.layout.cell_styles = BTreeMap::from([
            ((0, 0), "3".to_string()),
            ((1, 1), "4".to_string()),
            ((2, 1), "4".to_string()),
            ((4, 1), "4".to_string()),
        ]);
        let styles = SheetStyles {
            date: Some("9".to_string()),
            datetime: Some("10".to_string()),
            keep_cell_styles: true,
            date1904: false,
        };

        let xml = styled_sheet_xml_string(&sheet, &styles);
        assert!(xml.contains(r#"<col min="2" max="2" style="5"/>"#));
        assert!(xml.contains(r#"<c r="A1" s="3" t="inlineStr">"#));
        assert!(xml.contains(r#"<c r="B2" s="4"><v>85</v></c>"#));
        // Dates take a date format over the cell's own style
        assert!(xml.contains(r#"<c r="B3" s="9"><v>45306</v></c>"#));
        assert!(xml.contains(r#"<c r="B4" s="10"><v>45306.25</v></c>"#));
        assert!(xml.contains(r#"<row r="5"><c r="B5" s="4"/></row>"#));
    }

    #[test]
    fn test_sheet_xml_dates_in_1904_package() {
        let mut sheet = Sheet::new("Dates");
        sheet.set_value(0, 0, CellValue::DateTime(45306.0));
        let styles = SheetStyles {
            date: Some("1".to_string()),
            datetime: Some("2".to_string()),
            keep_cell_styles: true,
            date1904: true,
        };

        let xml = styled_sheet_xml_string(&sheet, &styles);
        assert!(xml.contains(r#"<c r="A1" s="1"><v>43844</v></c>"#));
    }

    #[test]
    fn test_empty_sheet_xml() {
        let xml = sheet_xml_string(&Sheet::new("Blank"));
        assert!(xml.contains(r#"<dimension ref="A1"/>"#));
        assert!(xml.contains("<sheetData></sheetData>"));
    }

    #[test]
    fn test_write_xlsx_parts() {
        let workbook = Workbook::new(
            SpreadsheetFormat::Xls,
            vec![Sheet::new("One"), Sheet::new("R&D")],
        );
        let bytes = write_xlsx(&workbook).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        for name in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/styles.xml",
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
        ] {
            assert!(archive.by_name(name).is_ok(), "missing part {}", name);
        }

        let mut content = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("xl/workbook.xml").unwrap(),
            &mut content,
        )
        .unwrap();
        assert!(content.contains(r#"<sheet name="R&amp;D" sheetId="2" r:id="rId2"/>"#));
    }

    #[test]
    fn test_write_xlsx_needs_a_sheet() {
        let workbook = Workbook::new(SpreadsheetFormat::Xlsx, Vec::new());
        assert!(write_xlsx(&workbook).is_err());
    }
}
