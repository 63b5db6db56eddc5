//! Rewrite of a decoded XLSX package in which only replaced sheets change.
//!
//! Every part that does not describe a replaced sheet is copied without being
//! decompressed, so formulas, defined names, number formats and hidden state
//! on the other sheets survive the copy.

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Seek, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::xlsx_writer::{SheetStyles, sheet_xml};
use crate::reader::package::{CONTENT_TYPES_PART, WORKBOOK_RELS_PART};
use crate::reader::{CellValue, Package, Sheet, Workbook};

/// Built-in number formats for whole days and for date and time
const NUM_FMT_DATE: &str = "14";
const NUM_FMT_DATETIME: &str = "22";

/// Write `workbook` over the package it was decoded from, regenerating only
/// the worksheet parts of replaced sheets
pub fn patch_xlsx(workbook: &Workbook, package: &Package) -> Result<Vec<u8>> {
    let mut archive = package.archive()?;

    let mut replaced: BTreeMap<&str, &Sheet> = BTreeMap::new();
    for sheet in workbook.rewritten_sheets() {
        let part = package
            .sheet_part(&sheet.name)
            .with_context(|| format!("Sheet '{}' has no worksheet part", sheet.name))?;
        replaced.insert(part, sheet);
    }

    let mut rewrites: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    let mut dropped: BTreeSet<String> = BTreeSet::new();
    let mut styles = SheetStyles {
        keep_cell_styles: true,
        date1904: package.date1904(),
        ..Default::default()
    };

    let has_dates = replaced.values().any(|sheet| {
        sheet
            .cells
            .values()
            .any(|c| matches!(c.value, CellValue::DateTime(_)))
    });
    if let Some(part) = package.styles().filter(|_| has_dates) {
        let xml = read_part(&mut archive, &part.path)?;
        match append_date_formats(&xml)? {
            Some((patched, first)) => {
                styles.date = Some(first.to_string());
                styles.datetime = Some((first + 1).to_string());
                rewrites.insert(part.path.clone(), patched);
            }
            None => {
                tracing::warn!(part = %part.path, "styles part has no cellXfs, dates keep cell styles")
            }
        }
    }

    // The calculation chain lists formula cells of the replaced sheets, which
    // are now written as values
    if let Some(calc_chain) = package.calc_chain().filter(|_| !replaced.is_empty()) {
        let content_types = read_part(&mut archive, CONTENT_TYPES_PART)?;
        let part_name = format!("/{}", calc_chain.path);
        rewrites.insert(
            CONTENT_TYPES_PART.to_string(),
            drop_element(&content_types, b"Override", b"PartName", &part_name)?,
        );
        let rels = read_part(&mut archive, WORKBOOK_RELS_PART)?;
        rewrites.insert(
            WORKBOOK_RELS_PART.to_string(),
            drop_element(&rels, b"Relationship", b"Id", &calc_chain.id)?,
        );
        dropped.insert(calc_chain.path.clone());
    }

    for (part, sheet) in &replaced {
        let content = sheet_xml(sheet, &styles)
            .with_context(|| format!("Failed to serialize sheet '{}'", sheet.name))?;
        rewrites.insert(part.to_string(), content);
    }

    let mut zip_writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let name = archive.by_index_raw(i)?.name().to_string();
        if dropped.contains(&name) {
            continue;
        }
        match rewrites.get(&name) {
            Some(content) => {
                zip_writer.start_file(name.as_str(), options)?;
                zip_writer.write_all(content)?;
            }
            None => zip_writer.raw_copy_file(archive.by_index_raw(i)?)?,
        }
    }

    tracing::debug!(
        replaced = replaced.len(),
        rewritten_parts = rewrites.len(),
        dropped_parts = dropped.len(),
        "patched xlsx package"
    );

    Ok(zip_writer.finish()?.into_inner())
}

fn read_part(archive: &mut ZipArchive<impl Read + Seek>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .with_context(|| format!("Failed to find {}", name))?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Append date and date-time cell formats to `cellXfs`. Returns the patched
/// part and the index of the first added format, or `None` when the part has
/// no `cellXfs` list.
fn append_date_formats(xml: &str) -> Result<Option<(Vec<u8>, usize)>> {
    let Some(existing) = count_cell_xfs(xml)? else {
        return Ok(None);
    };

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"cellXfs" => {
                writer.write_event(Event::Start(with_count(&e, existing + 2)?))?;
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"cellXfs" => {
                let list = with_count(&e, 2)?;
                let end = list.to_end().into_owned();
                writer.write_event(Event::Start(list.borrow()))?;
                write_date_formats(&mut writer, e.name().as_ref())?;
                writer.write_event(Event::End(end))?;
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"cellXfs" => {
                write_date_formats(&mut writer, e.name().as_ref())?;
                writer.write_event(Event::End(e))?;
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        }
        buf.clear();
    }

    Ok(Some((writer.into_inner().into_inner(), existing)))
}

/// Number of `xf` entries in `cellXfs`, or `None` when there is no such list
fn count_cell_xfs(xml: &str) -> Result<Option<usize>> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut count = None;
    let mut depth_in_list = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                depth += 1;
                if e.local_name().as_ref() == b"cellXfs" {
                    count = Some(0);
                    depth_in_list = Some(depth);
                } else if e.local_name().as_ref() == b"xf" && depth_in_list == Some(depth - 1) {
                    count = count.map(|n| n + 1);
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"cellXfs" {
                    count = Some(0);
                } else if e.local_name().as_ref() == b"xf" && depth_in_list == Some(depth) {
                    count = count.map(|n| n + 1);
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"cellXfs" {
                    depth_in_list = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(count)
}

/// `element` with its `count` attribute set to `count`
fn with_count(element: &BytesStart<'_>, count: usize) -> Result<BytesStart<'static>> {
    let mut list = BytesStart::new(String::from_utf8(element.name().as_ref().to_vec())?);
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() != b"count" {
            list.push_attribute(attr);
        }
    }
    list.push_attribute(("count", count.to_string().as_str()));
    Ok(list)
}

/// Two `xf` entries with the same namespace prefix as the `cellXfs` list
fn write_date_formats(writer: &mut Writer<Cursor<Vec<u8>>>, list_name: &[u8]) -> Result<()> {
    let list_name = std::str::from_utf8(list_name)?;
    let xf_name = match list_name.split_once(':') {
        Some((prefix, _)) => format!("{}:xf", prefix),
        None => "xf".to_string(),
    };
    for num_fmt in [NUM_FMT_DATE, NUM_FMT_DATETIME] {
        let mut xf = BytesStart::new(xf_name.as_str());
        xf.push_attribute(("numFmtId", num_fmt));
        xf.push_attribute(("fontId", "0"));
        xf.push_attribute(("fillId", "0"));
        xf.push_attribute(("borderId", "0"));
        xf.push_attribute(("xfId", "0"));
        xf.push_attribute(("applyNumberFormat", "1"));
        writer.write_event(Event::Empty(xf))?;
    }
    Ok(())
}

/// Copy `xml`, leaving out empty `tag` elements whose `key` attribute equals
/// `value`
fn drop_element(xml: &str, tag: &[u8], key: &[u8], value: &str) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) if e.local_name().as_ref() == tag => {
                let mut matched = false;
                for attr in e.attributes() {
                    let attr = attr?;
                    if attr.key.as_ref() == key {
                        matched = attr.unescape_value()? == value;
                        break;
                    }
                }
                if !matched {
                    writer.write_event(Event::Empty(e))?;
                }
            }
            Ok(Event::Eof) => break,
            Ok(e) => writer.write_event(e)?,
            Err(e) => return Err(anyhow::anyhow!("Error parsing XML: {}", e)),
        }
        buf.clear();
    }

    Ok(writer.into_inner().into_inner())
}
