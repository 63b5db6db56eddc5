//! The OOXML package a workbook was decoded from.
//!
//! Kept alongside the decoded cells so that a rewrite can copy every part it
//! does not change byte for byte.

use anyhow::{Context, Result};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::fmt;
use std::io::{BufRead, BufReader, Cursor};
use std::sync::Arc;
use zip::ZipArchive;

pub const WORKBOOK_PART: &str = "xl/workbook.xml";
pub const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";

const REL_STYLES: &str = "/relationships/styles";
const REL_CALC_CHAIN: &str = "/relationships/calcChain";

/// A workbook relationship, with its target resolved to a part path
#[derive(Debug, Clone, PartialEq)]
pub struct PartRef {
    pub id: String,
    pub path: String,
}

#[derive(Clone)]
pub struct Package {
    bytes: Arc<[u8]>,
    /// (sheet name, worksheet part) in workbook order
    sheet_parts: Vec<(String, String)>,
    styles: Option<PartRef>,
    calc_chain: Option<PartRef>,
    date1904: bool,
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Package")
            .field("bytes", &self.bytes.len())
            .field("sheet_parts", &self.sheet_parts)
            .field("date1904", &self.date1904)
            .finish_non_exhaustive()
    }
}

impl Package {
    /// Index the workbook part and its relationships
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).context("Failed to open zip archive")?;

        let (sheets, date1904) = {
            let part = archive
                .by_name(WORKBOOK_PART)
                .with_context(|| format!("Failed to find {}", WORKBOOK_PART))?;
            parse_workbook_part(BufReader::new(part))?
        };
        let relationships = {
            let part = archive
                .by_name(WORKBOOK_RELS_PART)
                .with_context(|| format!("Failed to find {}", WORKBOOK_RELS_PART))?;
            parse_relationships(BufReader::new(part))?
        };

        let mut sheet_parts = Vec::with_capacity(sheets.len());
        for (name, rid) in sheets {
            let rel = relationships
                .iter()
                .find(|rel| rel.id == rid)
                .with_context(|| format!("Relationship '{}' not found for sheet '{}'", rid, name))?;
            sheet_parts.push((name, resolve_target(&rel.target)));
        }

        let part_of_kind = |kind: &str| {
            relationships
                .iter()
                .find(|rel| rel.kind.ends_with(kind))
                .map(|rel| PartRef {
                    id: rel.id.clone(),
                    path: resolve_target(&rel.target),
                })
        };

        Ok(Self {
            bytes: Arc::from(bytes),
            sheet_parts,
            styles: part_of_kind(REL_STYLES),
            calc_chain: part_of_kind(REL_CALC_CHAIN),
            date1904,
        })
    }

    pub fn archive(&self) -> Result<ZipArchive<Cursor<&[u8]>>> {
        ZipArchive::new(Cursor::new(&self.bytes[..])).context("Failed to open zip archive")
    }

    /// Worksheet part path for a sheet name
    pub fn sheet_part(&self, sheet_name: &str) -> Option<&str> {
        self.sheet_parts
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, path)| path.as_str())
    }

    pub fn styles(&self) -> Option<&PartRef> {
        self.styles.as_ref()
    }

    pub fn calc_chain(&self) -> Option<&PartRef> {
        self.calc_chain.as_ref()
    }

    /// True when stored dates count from 1904-01-01
    pub fn date1904(&self) -> bool {
        self.date1904
    }
}

struct Relationship {
    id: String,
    kind: String,
    target: String,
}

/// Targets are relative to `xl/` unless they are package-absolute
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target.trim_start_matches("./")),
    }
}

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Sheet (name, relationship id) pairs and the date system flag
fn parse_workbook_part<R: BufRead>(source: R) -> Result<(Vec<(String, String)>, bool)> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut sheets = Vec::new();
    let mut date1904 = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"sheet" => {
                    let name = attribute(&e, b"name")?.unwrap_or_default();
                    let rid = attribute(&e, b"r:id")?.unwrap_or_default();
                    sheets.push((name, rid));
                }
                b"workbookPr" => {
                    date1904 = matches!(
                        attribute(&e, b"date1904")?.as_deref(),
                        Some("1") | Some("true")
                    );
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, date1904))
}

fn parse_relationships<R: BufRead>(source: R) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(source);
    reader.config_mut().trim_text(true);

    let mut relationships = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                relationships.push(Relationship {
                    id: attribute(&e, b"Id")?.unwrap_or_default(),
                    kind: attribute(&e, b"Type")?.unwrap_or_default(),
                    target: attribute(&e, b"Target")?.unwrap_or_default(),
                });
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(relationships)
}
