//! `.docx` reading: flatten `word/document.xml` into paragraphs and tables.
//!
//! ## Why not a full WordprocessingML model?
//!
//! EBD scraping only needs three things from the document: paragraph text,
//! paragraph style (to find headings) and table cell text, all in reading
//! order. A streaming `quick-xml` pass over `word/document.xml` yields exactly
//! that without modelling runs, fonts or numbering.
//!
//! Merged cells follow the convention of common docx libraries: a cell with
//! `w:gridSpan = n` appears `n` times in its row, so every row of a table has
//! one entry per grid column. Tables nested inside a cell are flattened into
//! that cell's text.

use crate::error::ToolchainError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{Read, Seek};
use std::path::Path;
use tracing::debug;

const DOCUMENT_XML: &str = "word/document.xml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    /// Style id as found in `w:pStyle`, e.g. `Heading1` or `berschrift2`.
    pub style: Option<String>,
    pub text: String,
}

/// A table as it appears in the document: rows of cell texts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

/// A top-level element of the document body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Paragraph(Paragraph),
    Table(RawTable),
}

/// Read all body blocks from a `.docx` file on disk.
pub fn read_docx_blocks(path: &Path) -> Result<Vec<Block>, ToolchainError> {
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ToolchainError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ToolchainError::NotADocx {
            path: path.to_path_buf(),
            detail: e.to_string(),
        },
    })?;
    read_blocks_from(file, path)
}

/// Read all body blocks from any seekable `.docx` source.
///
/// `origin` is only used in error messages.
pub fn read_blocks_from<R: Read + Seek>(
    reader: R,
    origin: &Path,
) -> Result<Vec<Block>, ToolchainError> {
    let mut archive = zip::ZipArchive::new(reader).map_err(|e| ToolchainError::NotADocx {
        path: origin.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .map_err(|e| ToolchainError::NotADocx {
            path: origin.to_path_buf(),
            detail: format!("{DOCUMENT_XML}: {e}"),
        })?
        .read_to_string(&mut xml)
        .map_err(|e| ToolchainError::CorruptDocument {
            path: origin.to_path_buf(),
            detail: e.to_string(),
        })?;

    let blocks = parse_document_xml(&xml).map_err(|detail| ToolchainError::CorruptDocument {
        path: origin.to_path_buf(),
        detail,
    })?;
    debug!("Read {} body blocks from {}", blocks.len(), origin.display());
    Ok(blocks)
}

// ── XML walking ──────────────────────────────────────────────────────────

/// Builder state for the table currently being read.
#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: Vec<String>,
    grid_span: usize,
}

#[derive(Default)]
struct ParagraphState {
    style: Option<String>,
    text: String,
}

/// Parse the body of `word/document.xml` into blocks.
///
/// Errors are returned as plain strings; the caller attaches the path.
pub fn parse_document_xml(xml: &str) -> Result<Vec<Block>, String> {
    let mut reader = Reader::from_str(xml);

    let mut blocks = Vec::new();
    let mut tables: Vec<TableState> = Vec::new();
    let mut paragraph: Option<ParagraphState> = None;
    let mut in_text = false;
    // tab stops in `w:pPr/w:tabs` are also called `w:tab`
    let mut in_paragraph_props = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"p" => paragraph = Some(ParagraphState::default()),
                b"t" => in_text = true,
                b"pPr" => in_paragraph_props = true,
                b"tbl" => tables.push(TableState::default()),
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        table.row.clear();
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        table.cell.clear();
                        table.grid_span = 1;
                    }
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.local_name().as_ref() {
                b"tab" if !in_paragraph_props => push_text(&mut paragraph, "\t"),
                b"br" | b"cr" => push_text(&mut paragraph, "\n"),
                b"pStyle" => {
                    if let Some(p) = paragraph.as_mut() {
                        p.style = attribute(e, b"val");
                    }
                }
                b"gridSpan" => {
                    if let Some(table) = tables.last_mut() {
                        table.grid_span = attribute(e, b"val")
                            .and_then(|v| v.parse().ok())
                            .unwrap_or(1)
                            .max(1);
                    }
                }
                b"p" => close_paragraph(ParagraphState::default(), &mut tables, &mut blocks),
                _ => {}
            },
            Event::Text(ref t) if in_text => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                push_text(&mut paragraph, &text);
            }
            Event::End(ref e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"pPr" => in_paragraph_props = false,
                b"p" => {
                    if let Some(p) = paragraph.take() {
                        close_paragraph(p, &mut tables, &mut blocks);
                    }
                }
                b"tc" => {
                    if let Some(table) = tables.last_mut() {
                        let text = table.cell.join("\n").trim().to_string();
                        for _ in 0..table.grid_span {
                            table.row.push(text.clone());
                        }
                    }
                }
                b"tr" => {
                    if let Some(table) = tables.last_mut() {
                        let row = std::mem::take(&mut table.row);
                        table.rows.push(row);
                    }
                }
                b"tbl" => {
                    if let Some(done) = tables.pop() {
                        match tables.last_mut() {
                            // nested table: keep its text in the enclosing cell
                            Some(outer) => outer.cell.extend(
                                done.rows
                                    .into_iter()
                                    .map(|r| r.join("\t"))
                                    .filter(|r| !r.trim().is_empty()),
                            ),
                            None => blocks.push(Block::Table(RawTable { rows: done.rows })),
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(blocks)
}

fn push_text(paragraph: &mut Option<ParagraphState>, text: &str) {
    if let Some(p) = paragraph.as_mut() {
        p.text.push_str(text);
    }
}

/// A finished paragraph goes into the current cell, or into the body.
fn close_paragraph(p: ParagraphState, tables: &mut [TableState], blocks: &mut Vec<Block>) {
    match tables.last_mut() {
        Some(table) => table.cell.push(p.text),
        None => blocks.push(Block::Paragraph(Paragraph {
            style: p.style,
            text: p.text,
        })),
    }
}

/// Value of an attribute by local name, ignoring the namespace prefix.
fn attribute(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}
