//! Normalised EBD tables.
//!
//! An [`EbdTable`] is the document-independent form of one
//! Entscheidungsbaumdiagramm: metadata plus an ordered list of steps, each
//! with its `ja`/`nein` sub-rows. It is what the `.json` artifact contains
//! and what the graph conversion consumes.
//!
//! Struct fields are declared in alphabetical order so the serialised JSON
//! has sorted keys without a post-processing pass.

use serde::{Deserialize, Serialize};

/// Role recorded for EBDs that have no decision table.
pub const ROLE_NOT_APPLICABLE: &str = "N/A";

/// Where an EBD sits inside the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdChapterInformation {
    pub chapter: u32,
    pub chapter_title: String,
    pub section: u32,
    pub section_title: String,
    pub subsection: u32,
    pub subsection_title: String,
}

impl EbdChapterInformation {
    /// `"{chapter}.{section}.{subsection}: {section_title}"`, the label used
    /// as the table's `section` metadata.
    pub fn sub_chapter_label(&self) -> String {
        format!(
            "{}.{}.{}: {}",
            self.chapter, self.section, self.subsection, self.section_title
        )
    }
}

impl std::fmt::Display for EbdChapterInformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}.{}.{} {}",
            self.chapter, self.section, self.subsection, self.subsection_title
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableMetaData {
    /// Title of the chapter the EBD is located in.
    pub chapter: String,
    /// Key of the EBD, e.g. `E_0003`.
    pub ebd_code: String,
    /// Human-readable title of the EBD.
    pub ebd_name: String,
    /// Explanation why an EBD has no table; `None` for regular tables.
    pub remark: Option<String>,
    /// Market role that performs the checks, e.g. `NB`.
    pub role: String,
    /// `"{chapter}.{section}.{subsection}: {section_title}"`
    pub section: String,
}

/// Outcome of a single check: the answer plus where to go next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdCheckResult {
    /// `true` for `ja`, `false` for `nein`.
    pub result: bool,
    /// Next step number; `None` means the path ends here.
    pub subsequent_step_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableSubRow {
    pub check_result: EbdCheckResult,
    pub note: Option<String>,
    pub result_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTableRow {
    /// The question asked in this step.
    pub description: String,
    pub step_number: String,
    /// Normally exactly two: one `ja`, one `nein`.
    pub sub_rows: Vec<EbdTableSubRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EbdTable {
    pub metadata: EbdTableMetaData,
    pub rows: Vec<EbdTableRow>,
}

impl EbdTable {
    /// A table for an EBD that the document explains away instead of
    /// tabulating ("Es ist das EBD E_0556 zu nutzen", …).
    pub fn metadata_only(
        ebd_key: &str,
        ebd_title: &str,
        chapter: &EbdChapterInformation,
        remark: impl Into<String>,
    ) -> Self {
        Self {
            metadata: EbdTableMetaData {
                chapter: chapter.chapter_title.clone(),
                ebd_code: ebd_key.to_string(),
                ebd_name: ebd_title.to_string(),
                remark: Some(remark.into()),
                role: ROLE_NOT_APPLICABLE.to_string(),
                section: chapter.sub_chapter_label(),
            },
            rows: Vec::new(),
        }
    }

    pub fn is_metadata_only(&self) -> bool {
        self.rows.is_empty()
    }
}
