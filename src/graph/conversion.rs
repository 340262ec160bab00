//! [`EbdTable`] → [`EbdGraph`].
//!
//! Every step becomes a decision node. Every sub-row becomes an edge
//! labelled with its answer, leading either to the next decision or to an
//! outcome node. Outcome nodes are shared per result code and lead to the
//! single end node, or on to the next decision when the sub-row names both
//! a code and a subsequent step.

use crate::error::GraphConversionError;
use crate::model::{EbdGraph, EbdGraphNode, EbdTable, EbdTableRow, EbdTableSubRow, NodeIndex};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

static RE_EBD_REFERENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"E_\d{4}").unwrap());

/// Build the decision graph of a normalised table.
pub fn convert_table_to_graph(table: &EbdTable) -> Result<EbdGraph, GraphConversionError> {
    let first = table.rows.first().ok_or_else(|| {
        GraphConversionError::Unclassified(format!(
            "{} has no rows to build a graph from",
            table.metadata.ebd_code
        ))
    })?;
    check_outcome_codes(table)?;

    let mut graph = EbdGraph::new(table.metadata.clone());
    let mut decisions: HashMap<&str, NodeIndex> = HashMap::new();
    for row in &table.rows {
        if decisions.contains_key(row.step_number.as_str()) {
            return Err(GraphConversionError::Unclassified(format!(
                "step {} appears twice",
                row.step_number
            )));
        }
        let index = graph.add_node(EbdGraphNode::Decision {
            step_number: row.step_number.clone(),
            question: row.description.clone(),
        });
        decisions.insert(row.step_number.as_str(), index);
    }

    let start = graph.start();
    graph.add_edge(start, decisions[first.step_number.as_str()], None);

    for row in &table.rows {
        let source = decisions[row.step_number.as_str()];
        for sub_row in &row.sub_rows {
            add_sub_row(&mut graph, &decisions, row, sub_row, source)?;
        }
    }

    debug!(
        "{}: graph with {} nodes and {} edges",
        table.metadata.ebd_code,
        graph.nodes.len(),
        graph.edges.len()
    );
    Ok(graph)
}

/// A result code must always come with the same note.
fn check_outcome_codes(table: &EbdTable) -> Result<(), GraphConversionError> {
    let mut notes: HashMap<&str, Option<&str>> = HashMap::new();
    for sub_row in table.rows.iter().flat_map(|r| r.sub_rows.iter()) {
        let Some(code) = sub_row.result_code.as_deref() else {
            continue;
        };
        let note = sub_row.note.as_deref();
        match notes.get(code) {
            Some(previous) if *previous != note => {
                return Err(GraphConversionError::OutcomeCodeAmbiguous {
                    code: code.to_string(),
                })
            }
            Some(_) => {}
            None => {
                notes.insert(code, note);
            }
        }
    }
    Ok(())
}

fn add_sub_row(
    graph: &mut EbdGraph,
    decisions: &HashMap<&str, NodeIndex>,
    row: &EbdTableRow,
    sub_row: &EbdTableSubRow,
    source: NodeIndex,
) -> Result<(), GraphConversionError> {
    let answer = Some(sub_row.check_result.result);
    let code = sub_row.result_code.as_deref();

    if code.is_some_and(|c| c.trim().eq_ignore_ascii_case("ende")) {
        return Err(GraphConversionError::EndeInWrongColumn {
            step: row.step_number.clone(),
        });
    }

    let target = match sub_row.check_result.subsequent_step_number.as_deref() {
        Some(step) => Some(resolve_step(decisions, row, step)?),
        None => None,
    };

    match (code, target) {
        (Some(code), Some(target)) => {
            let outcome = outcome_node(graph, code, sub_row.note.as_deref());
            graph.add_edge(source, outcome, answer);
            graph.add_edge(outcome, target, None);
        }
        (Some(code), None) => {
            let outcome = outcome_node(graph, code, sub_row.note.as_deref());
            let end = end_node(graph);
            graph.add_edge(source, outcome, answer);
            graph.add_edge(outcome, end, None);
        }
        (None, Some(target)) => graph.add_edge(source, target, answer),
        (None, None) => {
            if let Some(reference) = sub_row
                .note
                .as_deref()
                .and_then(|note| RE_EBD_REFERENCE.find(note))
            {
                return Err(GraphConversionError::EbdCrossReferenceNotSupported {
                    step: row.step_number.clone(),
                    reference: reference.as_str().to_string(),
                });
            }
            return Err(GraphConversionError::Unclassified(format!(
                "step {}: the '{}' branch has neither a result code nor a subsequent step",
                row.step_number,
                if sub_row.check_result.result { "ja" } else { "nein" }
            )));
        }
    }
    Ok(())
}

fn resolve_step(
    decisions: &HashMap<&str, NodeIndex>,
    row: &EbdTableRow,
    step: &str,
) -> Result<NodeIndex, GraphConversionError> {
    if let Some(index) = decisions.get(step) {
        return Ok(*index);
    }
    if let Some(reference) = RE_EBD_REFERENCE.find(step) {
        return Err(GraphConversionError::EbdCrossReferenceNotSupported {
            step: row.step_number.clone(),
            reference: reference.as_str().to_string(),
        });
    }
    Err(GraphConversionError::UnknownSubsequentStep {
        step: row.step_number.clone(),
        target: step.to_string(),
    })
}

fn outcome_node(graph: &mut EbdGraph, code: &str, note: Option<&str>) -> NodeIndex {
    let existing = graph.find(|n| {
        matches!(n, EbdGraphNode::Outcome { result_code, .. } if result_code == code)
    });
    existing.unwrap_or_else(|| {
        graph.add_node(EbdGraphNode::Outcome {
            result_code: code.to_string(),
            note: note.map(str::to_string),
        })
    })
}

fn end_node(graph: &mut EbdGraph) -> NodeIndex {
    graph
        .find(|n| matches!(n, EbdGraphNode::End))
        .unwrap_or_else(|| graph.add_node(EbdGraphNode::End))
}
