//! Raw `.docx` tables → [`EbdTable`].
//!
//! An EBD table looks like this (one table may continue over several
//! physical tables when it spans pages; the header is repeated):
//!
//! ```text
//! | Prüfende Rolle: NB                                          |
//! | Nr. | Prüfschritt          | Prüfergebnis |      | Code | Hinweis |
//! | 1   | Ist der Absender …?  | ja           | → 2  |      |         |
//! |     |                      | nein         | Ende | A01  | Cluster |
//! ```
//!
//! Every data row becomes one sub-row. A row with an empty step number
//! continues the step above it. The check result may be split over several
//! grid columns (`ja` | `→ 2`); their texts are joined before parsing.

use super::docx::RawTable;
use super::EbdDescriptor;
use crate::error::TableConversionError;
use crate::model::{
    EbdCheckResult, EbdTable, EbdTableMetaData, EbdTableRow, EbdTableSubRow, ROLE_NOT_APPLICABLE,
};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_CHECK_RESULT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)^(?P<answer>ja|nein)\b\s*(?:(?:→|->)\s*(?P<target>.+?)|(?P<end>ende))?\s*$")
        .unwrap()
});

const ROLE_PREFIX: &str = "Prüfende Rolle";

/// Column positions resolved from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Columns {
    step: usize,
    description: usize,
    check: Vec<usize>,
    code: usize,
    note: Option<usize>,
}

impl Columns {
    fn from_header(cells: &[String]) -> Result<Self, TableConversionError> {
        let find = |needle: &str| {
            cells
                .iter()
                .position(|c| c.trim().to_lowercase().contains(needle))
        };
        let description =
            find("prüfschritt").ok_or(TableConversionError::MissingColumn("Prüfschritt"))?;
        let check: Vec<usize> = cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.trim().to_lowercase().contains("prüfergebnis"))
            .map(|(i, _)| i)
            .collect();
        if check.is_empty() {
            return Err(TableConversionError::MissingColumn("Prüfergebnis"));
        }
        // check-result sub-columns without a header text of their own sit
        // between "Prüfergebnis" and "Code"
        let code = find("code").ok_or(TableConversionError::MissingColumn("Code"))?;
        let last_check = check.last().copied().unwrap_or(code);
        let check = (check[0]..code.max(last_check + 1)).collect();

        Ok(Self {
            step: 0,
            description,
            check,
            code,
            note: find("hinweis"),
        })
    }
}

fn is_header(cells: &[String]) -> bool {
    cells
        .first()
        .is_some_and(|c| c.trim().trim_end_matches('.').eq_ignore_ascii_case("nr"))
}

fn cell<'a>(cells: &'a [String], index: usize) -> &'a str {
    cells.get(index).map(|c| c.trim()).unwrap_or_default()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Join the check-result columns, dropping the repeats a grid span produces.
fn check_text(cells: &[String], columns: &[usize]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for &index in columns {
        let text = cell(cells, index);
        if !text.is_empty() && parts.last() != Some(&text) {
            parts.push(text);
        }
    }
    parts.join(" ")
}

/// Parse `ja → 2`, `nein Ende`, `ja -> 4*`, … into a check result.
pub fn parse_check_result(text: &str, row: usize) -> Result<EbdCheckResult, TableConversionError> {
    let malformed = || TableConversionError::MalformedCheckResult {
        row,
        text: text.to_string(),
    };
    let caps = RE_CHECK_RESULT.captures(text.trim()).ok_or_else(malformed)?;
    let result = caps["answer"].eq_ignore_ascii_case("ja");
    let subsequent_step_number = caps
        .name("target")
        .map(|m| m.as_str().trim())
        .filter(|target| !target.eq_ignore_ascii_case("ende"))
        .map(str::to_string);
    Ok(EbdCheckResult {
        result,
        subsequent_step_number,
    })
}

/// Convert the tables of one EBD into its normalised form.
pub fn convert_docx_tables(
    tables: &[RawTable],
    descriptor: &EbdDescriptor,
) -> Result<EbdTable, TableConversionError> {
    let mut role: Option<String> = None;
    let mut columns: Option<Columns> = None;
    let mut rows: Vec<EbdTableRow> = Vec::new();
    let mut row_number = 0usize;

    for cells in tables.iter().flat_map(|t| t.rows.iter()) {
        row_number += 1;
        if cells.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        let first = cell(cells, 0);
        if let Some(rest) = first.strip_prefix(ROLE_PREFIX) {
            role = non_empty(rest.trim_start_matches(':'));
            continue;
        }
        if is_header(cells) {
            columns = Some(Columns::from_header(cells)?);
            continue;
        }
        let Some(columns) = columns.as_ref() else {
            return Err(TableConversionError::MissingHeader);
        };

        let sub_row = EbdTableSubRow {
            check_result: parse_check_result(&check_text(cells, &columns.check), row_number)?,
            note: columns.note.and_then(|i| non_empty(cell(cells, i))),
            result_code: non_empty(cell(cells, columns.code)),
        };

        let step_number = cell(cells, columns.step);
        match rows.last_mut() {
            Some(last) if step_number.is_empty() || step_number == last.step_number => {
                last.sub_rows.push(sub_row)
            }
            _ if step_number.is_empty() => {
                return Err(TableConversionError::OrphanSubRow { row: row_number })
            }
            _ => rows.push(EbdTableRow {
                description: cell(cells, columns.description).to_string(),
                step_number: step_number.to_string(),
                sub_rows: vec![sub_row],
            }),
        }
    }

    if columns.is_none() {
        return Err(TableConversionError::MissingHeader);
    }

    Ok(EbdTable {
        metadata: EbdTableMetaData {
            chapter: descriptor.chapter.chapter_title.clone(),
            ebd_code: descriptor.key.clone(),
            ebd_name: descriptor.title.clone(),
            remark: None,
            role: role.unwrap_or_else(|| ROLE_NOT_APPLICABLE.to_string()),
            section: descriptor.chapter.sub_chapter_label(),
        },
        rows,
    })
}
