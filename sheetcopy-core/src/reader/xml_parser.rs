//! XML parsing utilities for extracting layout metadata from XLSX packages

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

use super::parser_utils::{parse_cell_ref, parse_range_ref};
use super::workbook::SheetLayout;

/// Row attributes that describe height or visibility
const ROW_LAYOUT_ATTRS: [&str; 3] = ["ht", "customHeight", "hidden"];

/// Extract merged ranges, column definitions, row heights and cell style
/// indices from a worksheet part
pub fn extract_sheet_layout(
    archive: &mut ZipArchive<impl Read + Seek>,
    sheet_path: &str,
) -> Result<SheetLayout> {
    let sheet_xml = archive
        .by_name(sheet_path)
        .with_context(|| format!("Failed to find {}", sheet_path))?;
    parse_sheet_layout(BufReader::new(sheet_xml))
}

pub(crate) fn parse_sheet_layout<R: std::io::BufRead>(source: R) -> Result<SheetLayout> {
    let mut layout = SheetLayout::default();
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    // Rows without an `r` attribute follow the previous one
    let mut next_row = 0u32;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"col" => {
                    let attrs = collect_attributes(&e, |_| true)?;
                    if !attrs.is_empty() {
                        layout.columns.push(attrs);
                    }
                }
                b"row" => {
                    let mut row = next_row;
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r" {
                            if let Ok(val) = attr.unescape_value()?.parse::<u32>() {
                                row = val.saturating_sub(1); // Convert to 0-based
                            }
                        }
                    }
                    next_row = row.saturating_add(1);

                    let attrs = collect_attributes(&e, |key| ROW_LAYOUT_ATTRS.contains(&key))?;
                    if !attrs.is_empty() {
                        layout.rows.insert(row, attrs);
                    }
                }
                b"c" => {
                    let attrs = collect_attributes(&e, |key| key == "r" || key == "s")?;
                    let position = attrs
                        .iter()
                        .find(|(k, _)| k == "r")
                        .and_then(|(_, v)| parse_cell_ref(v));
                    let style = attrs.into_iter().find(|(k, _)| k == "s").map(|(_, v)| v);
                    if let (Some(position), Some(style)) = (position, style) {
                        layout.cell_styles.insert(position, style);
                    }
                }
                b"mergeCell" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            let range = attr.unescape_value()?.to_string();
                            if parse_range_ref(&range).is_some() {
                                layout.merged_ranges.push(range);
                            } else {
                                tracing::debug!(%range, "skipping malformed merged range");
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow::anyhow!("XML parsing error: {}", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(layout)
}

fn collect_attributes(
    element: &BytesStart<'_>,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<(String, String)>> {
    let mut attrs = Vec::new();
    for attr in element.attributes() {
        let attr = attr?;
        let key = String::from_utf8(attr.key.as_ref().to_vec())?;
        if keep(&key) {
            attrs.push((key, attr.unescape_value()?.to_string()));
        }
    }
    Ok(attrs)
}
