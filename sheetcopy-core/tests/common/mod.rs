#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Optional parts of a mock package
#[derive(Default)]
pub struct MockParts<'a> {
    /// Set `date1904="1"` on `workbookPr`
    pub date1904: bool,
    /// Content of xl/styles.xml
    pub styles: Option<&'a str>,
    /// Content of xl/calcChain.xml
    pub calc_chain: Option<&'a str>,
    /// Extra elements after `<sheets>` in workbook.xml, e.g. defined names
    pub workbook_extra: &'a str,
}

/// Cell formats: general (0), date (1, format 14) and percent (2, format 10)
pub const DATE_STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts><fills count="1"><fill><patternFill patternType="none"/></fill></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="10" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#;

// Helper to create a minimal valid XLSX file. Each sheet is given as its name
// and the worksheet body (everything inside <worksheet>).
pub fn create_mock_xlsx(path: &Path, sheets: &[(&str, &str)]) -> anyhow::Result<()> {
    create_mock_xlsx_with(path, sheets, &MockParts::default())
}

pub fn create_mock_xlsx_with(
    path: &Path,
    sheets: &[(&str, &str)],
    parts: &MockParts<'_>,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);

    // 1. [Content_Types].xml
    zip.start_file("[Content_Types].xml", options)?;
    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
            i + 1
        ));
    }
    if parts.styles.is_some() {
        content_types.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    }
    if parts.calc_chain.is_some() {
        content_types.push_str(r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#);
    }
    content_types.push_str("</Types>");
    zip.write_all(content_types.as_bytes())?;

    // 2. _rels/.rels
    zip.start_file("_rels/.rels", options)?;
    zip.write_all(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#.as_bytes())?;

    // 3. xl/workbook.xml
    zip.start_file("xl/workbook.xml", options)?;
    let mut workbook_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
"#,
    );
    if parts.date1904 {
        workbook_xml.push_str(r#"<workbookPr date1904="1"/>"#);
    }
    workbook_xml.push_str("<sheets>");
    for (i, (name, _)) in sheets.iter().enumerate() {
        workbook_xml.push_str(&format!(
            r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
            name,
            i + 1,
            i + 1
        ));
    }
    workbook_xml.push_str("</sheets>");
    workbook_xml.push_str(parts.workbook_extra);
    workbook_xml.push_str("</workbook>");
    zip.write_all(workbook_xml.as_bytes())?;

    // 4. xl/_rels/workbook.xml.rels
    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    let mut rels_xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
"#,
    );
    for (i, _) in sheets.iter().enumerate() {
        rels_xml.push_str(&format!(
            r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
            i + 1, i + 1
        ));
    }
    if parts.styles.is_some() {
        rels_xml.push_str(r#"<Relationship Id="rIdStyles" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#);
    }
    if parts.calc_chain.is_some() {
        rels_xml.push_str(r#"<Relationship Id="rIdCalc" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/calcChain" Target="calcChain.xml"/>"#);
    }
    rels_xml.push_str("</Relationships>");
    zip.write_all(rels_xml.as_bytes())?;

    if let Some(styles) = parts.styles {
        zip.start_file("xl/styles.xml", options)?;
        zip.write_all(styles.as_bytes())?;
    }
    if let Some(calc_chain) = parts.calc_chain {
        zip.start_file("xl/calcChain.xml", options)?;
        zip.write_all(calc_chain.as_bytes())?;
    }

    // 5. sheets
    for (i, (_, body)) in sheets.iter().enumerate() {
        zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), options)?;
        zip.write_all(
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">{}</worksheet>"#,
                body
            )
            .as_bytes(),
        )?;
    }

    zip.finish()?;
    Ok(())
}

/// Inline string cell
pub fn s(cell_ref: &str, value: &str) -> String {
    format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell_ref, value)
}

/// Numeric cell
pub fn n(cell_ref: &str, value: f64) -> String {
    format!(r#"<c r="{}"><v>{}</v></c>"#, cell_ref, value)
}

/// Cell with a formula and its cached result
pub fn f(cell_ref: &str, formula: &str, cached: f64) -> String {
    format!(r#"<c r="{}"><f>{}</f><v>{}</v></c>"#, cell_ref, formula, cached)
}

/// Numeric cell with a style index
pub fn styled(cell_ref: &str, style: u32, value: f64) -> String {
    format!(r#"<c r="{}" s="{}"><v>{}</v></c>"#, cell_ref, style, value)
}

/// Read one part of a package as text
pub fn read_part(bytes: &[u8], name: &str) -> anyhow::Result<String> {
    use std::io::Read;

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))?;
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

/// The "Data" sheet: ID, Name, Score with two people
pub fn data_sheet() -> String {
    format!(
        "<sheetData><row r=\"1\">{}{}{}</row><row r=\"2\">{}{}{}</row><row r=\"3\">{}{}{}</row></sheetData>",
        s("A1", "ID"),
        s("B1", "Name"),
        s("C1", "Score"),
        s("A2", "1"),
        s("B2", "Alice"),
        n("C2", 90.0),
        s("A3", "2"),
        s("B3", "Bob"),
        n("C3", 85.0),
    )
}

/// The "Roster" sheet: one person, no grade, with a wide first column,
/// a tall header row and a merged title next to the table
pub fn roster_sheet() -> String {
    format!(
        concat!(
            r#"<cols><col min="1" max="1" width="20" customWidth="1"/></cols>"#,
            r#"<sheetData><row r="1" ht="30" customHeight="1">{}{}{}{}</row><row r="2">{}{}</row></sheetData>"#,
            r#"<mergeCells count="1"><mergeCell ref="E1:F1"/></mergeCells>"#,
        ),
        s("A1", "ID"),
        s("B1", "Name"),
        s("C1", "Grade"),
        s("E1", "Roster 2024"),
        s("A2", "1"),
        s("B2", "Alice"),
    )
}

/// Write source.xlsx (sheet "Data") and target.xlsx (sheets "Roster" and "Notes")
pub fn write_fixture_pair(dir: &Path) -> anyhow::Result<(std::path::PathBuf, std::path::PathBuf)> {
    let source = dir.join("source.xlsx");
    let target = dir.join("target.xlsx");
    create_mock_xlsx(&source, &[("Data", &data_sheet())])?;
    create_mock_xlsx(
        &target,
        &[
            ("Roster", &roster_sheet()),
            ("Notes", &format!("<sheetData><row r=\"1\">{}</row></sheetData>", s("A1", "keep me"))),
        ],
    )?;
    Ok((source, target))
}
