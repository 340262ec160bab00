//! EBD scraping: find every EBD in a `.docx` and pull out its tables.
//!
//! ## Data Flow
//!
//! ```text
//! .docx ──▶ docx ──▶ keys ──▶ convert
//!          (blocks)  (EBD spans) (EbdTable)
//! ```
//!
//! 1. [`docx`]    — flatten `word/document.xml` into paragraphs and tables
//! 2. [`keys`]    — discover EBD keys with their chapter position, and the
//!    tables (or remark) following each key
//! 3. [`convert`] — normalise the raw tables of one EBD into an
//!    [`crate::model::EbdTable`]
//!
//! The orchestrator talks to a document through the [`EbdDocument`] trait so
//! it can be driven by something other than a file on disk.

pub mod convert;
pub mod docx;
pub mod keys;

use crate::error::{ScrapingError, ToolchainError};
use crate::model::EbdChapterInformation;
use docx::{Block, RawTable};
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use tracing::info;

/// One EBD announced in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbdDescriptor {
    /// e.g. `E_0003`
    pub key: String,
    pub title: String,
    pub chapter: EbdChapterInformation,
    /// Position of the announcing paragraph among the document blocks.
    pub block_index: usize,
}

/// An EBD the document describes in prose instead of with a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbdNoTableSection {
    pub ebd_key: String,
    pub remark: String,
}

/// What the document holds for one EBD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbdDocxTables {
    Tables(Vec<RawTable>),
    NoTable(EbdNoTableSection),
}

/// A source of EBDs.
pub trait EbdDocument: Send + Sync {
    /// All EBDs in document order.
    fn ebd_keys(&self) -> &[EbdDescriptor];

    /// The tables, or the no-table remark, of one EBD.
    fn ebd_tables(&self, descriptor: &EbdDescriptor) -> Result<EbdDocxTables, ScrapingError>;
}

/// A `.docx` file, parsed once and kept in memory.
#[derive(Debug)]
pub struct DocxDocument {
    path: PathBuf,
    blocks: Vec<Block>,
    keys: Vec<EbdDescriptor>,
}

impl DocxDocument {
    /// Read and index a `.docx` from disk.
    ///
    /// Validates that `path` exists and is a regular file first, so the
    /// caller gets a precise error instead of a zip failure.
    pub fn open(path: &Path) -> Result<Self, ToolchainError> {
        if !path.exists() {
            return Err(ToolchainError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ToolchainError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let blocks = docx::read_docx_blocks(path)?;
        Ok(Self::from_blocks(path.to_path_buf(), blocks))
    }

    /// Read and index a `.docx` held in memory or any other seekable source.
    pub fn from_reader<R: Read + Seek>(reader: R, origin: &Path) -> Result<Self, ToolchainError> {
        let blocks = docx::read_blocks_from(reader, origin)?;
        Ok(Self::from_blocks(origin.to_path_buf(), blocks))
    }

    fn from_blocks(path: PathBuf, blocks: Vec<Block>) -> Self {
        let keys = keys::find_ebd_keys(&blocks);
        info!("Found {} EBDs in {}", keys.len(), path.display());
        Self { path, blocks, keys }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EbdDocument for DocxDocument {
    fn ebd_keys(&self) -> &[EbdDescriptor] {
        &self.keys
    }

    fn ebd_tables(&self, descriptor: &EbdDescriptor) -> Result<EbdDocxTables, ScrapingError> {
        let known = self
            .keys
            .iter()
            .any(|d| d.key == descriptor.key && d.block_index == descriptor.block_index);
        if !known {
            return Err(ScrapingError::TableNotFound {
                ebd_key: descriptor.key.clone(),
                reason: format!("{} is not part of {}", descriptor.key, self.path.display()),
            });
        }
        keys::collect_ebd_tables(&self.blocks, descriptor.block_index, &descriptor.key)
    }
}
