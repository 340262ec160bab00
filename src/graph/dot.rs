//! [`EbdGraph`] → Graphviz DOT.
//!
//! Labels use Graphviz HTML-like syntax so step numbers and codes can be set
//! in bold. Before writing, the graph is checked for the two shapes the
//! layout cannot represent sensibly: cycles, and merge nodes that are only
//! reachable along a single path (a sign of an orphaned step).

use crate::error::DotError;
use crate::model::{EbdGraph, EbdGraphNode, NodeIndex};
use std::collections::VecDeque;
use std::fmt::Write;

const FONT: &str = "Roboto, sans-serif";
const COLOR_TERMINAL: &str = "#8ba2d7";
const COLOR_DECISION: &str = "#c2cee9";
const COLOR_OUTCOME: &str = "#c4cac1";
const COLOR_EDGE: &str = "#88a0ca";

/// Number of distinct paths from the start node to every node.
///
/// Fails on cycles: the first node that never reaches in-degree zero during
/// the topological sort is reported.
pub fn count_paths(graph: &EbdGraph) -> Result<Vec<usize>, DotError> {
    let mut remaining: Vec<usize> = graph.node_indices().map(|i| graph.in_degree(i)).collect();
    let mut paths = vec![0usize; graph.nodes.len()];
    paths[graph.start().0] = 1;

    let mut queue: VecDeque<NodeIndex> = graph
        .node_indices()
        .filter(|i| remaining[i.0] == 0)
        .collect();
    let mut visited = 0usize;

    while let Some(node) = queue.pop_front() {
        visited += 1;
        for edge in graph.outgoing(node) {
            paths[edge.target.0] = paths[edge.target.0].saturating_add(paths[node.0]);
            remaining[edge.target.0] -= 1;
            if remaining[edge.target.0] == 0 {
                queue.push_back(edge.target);
            }
        }
    }

    if visited < graph.nodes.len() {
        let stuck = graph
            .node_indices()
            .find(|i| remaining[i.0] > 0)
            .map(|i| graph.node(i).key())
            .unwrap_or_default();
        return Err(DotError::Cycle(stuck));
    }
    Ok(paths)
}

fn validate(graph: &EbdGraph) -> Result<(), DotError> {
    let paths = count_paths(graph)?;
    for index in graph.node_indices() {
        let in_degree = graph.in_degree(index);
        if in_degree > 1 && paths[index.0] <= 1 {
            return Err(DotError::PathsNotGreaterThanOne {
                node: graph.node(index).key(),
                in_degree,
                paths: paths[index.0],
            });
        }
    }
    Ok(())
}

/// Escape text for use inside an HTML-like label.
fn html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\n', "<BR align=\"left\"/>")
}

fn quoted(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

fn node_line(graph: &EbdGraph, node: &EbdGraphNode) -> String {
    let id = quoted(&node.key());
    match node {
        EbdGraphNode::Start => format!(
            "{id} [margin=\"0.2,0.12\", shape=box, style=\"filled,rounded\", penwidth=0.0, \
             fillcolor=\"{COLOR_TERMINAL}\", label=<<B>{}</B><BR align=\"center\"/>\
             <FONT point-size=\"12\"><B><U>Prüfende Rolle:</U> {}</B></FONT><BR align=\"center\"/>>];",
            html(&graph.metadata.ebd_code),
            html(&graph.metadata.role),
        ),
        EbdGraphNode::Decision {
            step_number,
            question,
        } => format!(
            "{id} [margin=\"0.2,0.12\", shape=box, style=\"filled,rounded\", penwidth=0.0, \
             fillcolor=\"{COLOR_DECISION}\", label=<<B>{}: </B>{}<BR align=\"left\"/>>];",
            html(step_number),
            html(question),
        ),
        EbdGraphNode::Outcome { result_code, note } => {
            let note = note
                .as_deref()
                .map(|n| format!("<FONT point-size=\"12\">{}</FONT><BR align=\"left\"/>", html(n)))
                .unwrap_or_default();
            format!(
                "{id} [margin=\"0.17,0.08\", shape=box, style=filled, penwidth=0.0, \
                 fillcolor=\"{COLOR_OUTCOME}\", label=<<B>{}</B><BR align=\"left\"/>{note}>];",
                html(result_code),
            )
        }
        EbdGraphNode::End => format!(
            "{id} [margin=\"0.2,0.12\", shape=box, style=\"filled,rounded\", penwidth=0.0, \
             fillcolor=\"{COLOR_TERMINAL}\", label=\"Ende\"];"
        ),
    }
}

/// Render the graph as DOT source.
pub fn convert_graph_to_dot(graph: &EbdGraph) -> Result<String, DotError> {
    validate(graph)?;
    let meta = &graph.metadata;

    let mut dot = String::new();
    // writing into a String cannot fail
    let _ = writeln!(dot, "digraph D {{");
    let _ = writeln!(dot, "    labelloc=\"t\";");
    let _ = writeln!(
        dot,
        "    label=<<B>{}: {}</B><BR align=\"left\"/><FONT point-size=\"10\">{} · {}</FONT><BR align=\"left\"/>>;",
        html(&meta.ebd_code),
        html(&meta.ebd_name),
        html(&meta.chapter),
        html(&meta.section),
    );
    let _ = writeln!(dot, "    ratio=\"compress\";");
    let _ = writeln!(dot, "    concentrate=true;");
    let _ = writeln!(dot, "    rankdir=TB;");
    let _ = writeln!(dot, "    fontname=\"{FONT}\";");
    let _ = writeln!(dot, "    node [fontname=\"{FONT}\"];");
    let _ = writeln!(dot, "    edge [fontname=\"{FONT}\"];");

    for node in &graph.nodes {
        let _ = writeln!(dot, "    {}", node_line(graph, node));
    }
    dot.push('\n');

    for edge in &graph.edges {
        let source = quoted(&graph.node(edge.source).key());
        let target = quoted(&graph.node(edge.target).key());
        match edge.answer {
            Some(answer) => {
                let label = if answer { "JA" } else { "NEIN" };
                let _ = writeln!(
                    dot,
                    "    {source} -> {target} [label=<<B>{label}</B>>, color=\"{COLOR_EDGE}\", fontcolor=\"{COLOR_EDGE}\"];"
                );
            }
            None => {
                let _ = writeln!(dot, "    {source} -> {target} [color=\"{COLOR_EDGE}\"];");
            }
        }
    }
    dot.push_str("}\n");
    Ok(dot)
}
