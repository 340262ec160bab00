//! Locate EBDs in the flattened document.
//!
//! EBD documents are organised as chapter (Heading 1) → section (Heading 2)
//! → subsection (Heading 3). Each EBD is announced by a paragraph of the form
//! `E_0003_Bestellung der Aggregationsebene RZ prüfen`, followed by one or
//! more tables, or by a short remark when the EBD has no table of its own.

use super::docx::{Block, Paragraph, RawTable};
use super::{EbdDescriptor, EbdDocxTables, EbdNoTableSection};
use crate::error::ScrapingError;
use crate::model::EbdChapterInformation;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

// A tab ends the title: in a table of contents the page number follows it.
static RE_EBD_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<key>E_\d{4})_?\s*(?P<title>[^\t]*?)\s*(?:\t.*)?$").unwrap()
});

// "TOC3", "Verzeichnis3", "Inhaltsverzeichnis1", …
static RE_TOC_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:toc|(?:inhalts)?verzeichnis)\s*\d*$").unwrap());

// Word writes localised style ids: "Heading1", "berschrift1" (Überschrift
// with the umlaut dropped), "heading 2", …
static RE_HEADING_STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:heading|.berschrift|berschrift)\s*(?P<level>\d)$").unwrap());

/// Heading level (1-based) of a paragraph, if it is a heading.
pub fn heading_level(paragraph: &Paragraph) -> Option<u8> {
    let style = paragraph.style.as_deref()?;
    RE_HEADING_STYLE
        .captures(style.trim())
        .and_then(|caps| caps["level"].parse().ok())
}

/// Whether the paragraph is an entry of a table of contents.
pub fn is_toc_entry(paragraph: &Paragraph) -> bool {
    paragraph
        .style
        .as_deref()
        .is_some_and(|style| RE_TOC_STYLE.is_match(style.trim()))
}

/// `(key, title)` if the paragraph announces an EBD.
pub fn parse_ebd_key(text: &str) -> Option<(String, String)> {
    let first_line = text.lines().next().unwrap_or_default();
    RE_EBD_KEY
        .captures(first_line)
        .map(|caps| (caps["key"].to_string(), caps["title"].to_string()))
}

/// Counters for the heading hierarchy while walking the document.
#[derive(Debug, Default)]
struct ChapterCursor {
    chapter: u32,
    chapter_title: String,
    section: u32,
    section_title: String,
    subsection: u32,
    subsection_title: String,
}

impl ChapterCursor {
    fn enter(&mut self, level: u8, title: &str) {
        let title = title.trim().to_string();
        match level {
            1 => {
                self.chapter += 1;
                self.chapter_title = title;
                self.section = 0;
                self.section_title.clear();
                self.subsection = 0;
                self.subsection_title.clear();
            }
            2 => {
                self.section += 1;
                self.section_title = title;
                self.subsection = 0;
                self.subsection_title.clear();
            }
            3 => {
                self.subsection += 1;
                self.subsection_title = title;
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> EbdChapterInformation {
        EbdChapterInformation {
            chapter: self.chapter,
            chapter_title: self.chapter_title.clone(),
            section: self.section,
            section_title: self.section_title.clone(),
            subsection: self.subsection,
            subsection_title: self.subsection_title.clone(),
        }
    }
}

/// Every EBD announced in the document, in document order.
///
/// Table-of-contents entries are skipped. A key announced more than once
/// keeps its first position in the result, but title, chapter and block
/// come from its last announcement.
pub fn find_ebd_keys(blocks: &[Block]) -> Vec<EbdDescriptor> {
    let mut cursor = ChapterCursor::default();
    let mut position: HashMap<String, usize> = HashMap::new();
    let mut found: Vec<EbdDescriptor> = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let Block::Paragraph(paragraph) = block else {
            continue;
        };
        if is_toc_entry(paragraph) {
            continue;
        }
        if let Some(level) = heading_level(paragraph) {
            cursor.enter(level, &paragraph.text);
        }
        let Some((key, title)) = parse_ebd_key(&paragraph.text) else {
            continue;
        };
        debug!("Found {} at block {}", key, index);
        let descriptor = EbdDescriptor {
            key: key.clone(),
            title,
            chapter: cursor.snapshot(),
            block_index: index,
        };
        match position.get(&key) {
            Some(&at) => found[at] = descriptor,
            None => {
                position.insert(key, found.len());
                found.push(descriptor);
            }
        }
    }

    found
}

/// Tables (or the explanatory remark) that belong to the EBD announced at
/// `start`.
///
/// The span ends at the next EBD key or at the next heading of level 1–3.
pub fn collect_ebd_tables(
    blocks: &[Block],
    start: usize,
    ebd_key: &str,
) -> Result<EbdDocxTables, ScrapingError> {
    let mut tables: Vec<RawTable> = Vec::new();
    let mut remark_lines: Vec<&str> = Vec::new();

    for block in blocks.iter().skip(start + 1) {
        match block {
            Block::Table(table) => tables.push(table.clone()),
            Block::Paragraph(paragraph) => {
                if is_toc_entry(paragraph) {
                    continue;
                }
                let announced = parse_ebd_key(&paragraph.text).map(|(key, _)| key);
                // the key is often repeated right below its own heading
                if announced.as_deref() == Some(ebd_key) {
                    continue;
                }
                let ends_span = announced.is_some()
                    || heading_level(paragraph).is_some_and(|level| level <= 3);
                if ends_span {
                    break;
                }
                let text = paragraph.text.trim();
                if !text.is_empty() {
                    remark_lines.push(text);
                }
            }
        }
    }

    if !tables.is_empty() {
        return Ok(EbdDocxTables::Tables(tables));
    }
    if remark_lines.is_empty() {
        return Err(ScrapingError::TableNotFound {
            ebd_key: ebd_key.to_string(),
            reason: "neither a table nor a remark follows the EBD heading".into(),
        });
    }
    Ok(EbdDocxTables::NoTable(EbdNoTableSection {
        ebd_key: ebd_key.to_string(),
        remark: remark_lines.join("\n"),
    }))
}
