//! [`EbdGraph`] → PlantUML activity diagram.
//!
//! PlantUML activity diagrams are written as nested `if/else/endif` blocks,
//! which can only express trees. A decision that is reached from more than
//! one place, or that does not have exactly one `ja` and one `nein` branch,
//! cannot be written down and is reported instead.

use crate::error::PlantUmlError;
use crate::model::{EbdGraph, EbdGraphNode, NodeIndex};

const SKIN: &str = "\
skinparam Shadowing false
skinparam NoteBorderColor #f3f1f6
skinparam NoteBackgroundColor #f3f1f6
skinparam NoteFontSize 12
skinparam ActivityBorderColor none
skinparam ActivityBackgroundColor #7a8da1
skinparam ActivityFontSize 16
skinparam ArrowColor #7aab8a
skinparam ArrowFontSize 16
skinparam ActivityDiamondBackgroundColor #7aab8a
skinparam ActivityDiamondBorderColor #7aab8a
skinparam ActivityDiamondFontSize 18
skinparam defaultFontName DejaVu Serif Condensed
skinparam ActivityEndColor #669580
";

/// `(ja, nein)` targets of a decision node.
fn branches(graph: &EbdGraph, index: NodeIndex) -> Result<(NodeIndex, NodeIndex), PlantUmlError> {
    let edges: Vec<_> = graph.outgoing(index).collect();
    let yes = edges.iter().find(|e| e.answer == Some(true));
    let no = edges.iter().find(|e| e.answer == Some(false));
    match (yes, no) {
        (Some(yes), Some(no)) if edges.len() == 2 => Ok((yes.target, no.target)),
        _ => Err(PlantUmlError::NotExactlyTwoOutgoingEdges {
            step: graph.node(index).key(),
            found: edges.len(),
        }),
    }
}

fn validate(graph: &EbdGraph) -> Result<(), PlantUmlError> {
    for index in graph.node_indices() {
        if !graph.node(index).is_decision() {
            continue;
        }
        branches(graph, index)?;
        let predecessors = graph.in_degree(index);
        if predecessors > 1 {
            return Err(PlantUmlError::GraphTooComplexForPlantuml {
                step: graph.node(index).key(),
                predecessors,
            });
        }
    }
    Ok(())
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

struct Writer<'g> {
    graph: &'g EbdGraph,
    out: String,
    /// Nodes on the current branch, to stop on cycles.
    stack: Vec<NodeIndex>,
}

impl Writer<'_> {
    fn line(&mut self, depth: usize, text: &str) {
        for _ in 0..depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn node(&mut self, index: NodeIndex, depth: usize) -> Result<(), PlantUmlError> {
        let graph = self.graph;
        if self.stack.contains(&index) {
            return Err(PlantUmlError::Unclassified(format!(
                "cycle through node {}",
                graph.node(index).key()
            )));
        }
        self.stack.push(index);

        match graph.node(index) {
            EbdGraphNode::Decision {
                step_number,
                question,
            } => {
                let (yes, no) = branches(graph, index)?;
                self.line(
                    depth,
                    &format!("if (<b>{step_number}: </b> {}) then (ja)", single_line(question)),
                );
                self.node(yes, depth + 1)?;
                self.line(depth, "else (nein)");
                self.node(no, depth + 1)?;
                self.line(depth, "endif");
            }
            EbdGraphNode::Outcome { result_code, note } => {
                self.line(depth, &format!(":{result_code};"));
                if let Some(note) = note {
                    self.line(depth, "note left");
                    for text in note.lines() {
                        self.line(depth, text.trim());
                    }
                    self.line(depth, "endnote");
                }
                let next: Vec<NodeIndex> = graph.outgoing(index).map(|e| e.target).collect();
                match next.as_slice() {
                    [target] if graph.node(*target).is_decision() => {
                        self.node(*target, depth)?
                    }
                    _ => self.line(depth, "kill;"),
                }
            }
            EbdGraphNode::End => self.line(depth, "kill;"),
            EbdGraphNode::Start => {
                return Err(PlantUmlError::Unclassified(
                    "start node reached from inside the graph".into(),
                ))
            }
        }

        self.stack.pop();
        Ok(())
    }
}

/// Render the graph as PlantUML source.
pub fn convert_graph_to_plantuml(graph: &EbdGraph) -> Result<String, PlantUmlError> {
    validate(graph)?;
    let meta = &graph.metadata;
    let first = graph
        .outgoing(graph.start())
        .map(|e| e.target)
        .next()
        .ok_or_else(|| PlantUmlError::Unclassified("graph has no first step".into()))?;

    let mut writer = Writer {
        graph,
        out: String::from("@startuml\n"),
        stack: Vec::new(),
    };
    writer.out.push_str(SKIN);
    writer.line(0, "");
    writer.line(0, "title");
    writer.line(0, &format!("{}: {}", meta.ebd_code, single_line(&meta.ebd_name)));
    writer.line(0, "end title");
    writer.line(0, &format!(":<b>{}</b>;", meta.ebd_code));
    writer.line(0, "note right");
    writer.line(0, &format!("<b><i>Prüfende Rolle: {}</i></b>", meta.role));
    writer.line(0, "end note");
    writer.line(0, "");
    writer.node(first, 0)?;
    writer.line(0, "");
    writer.line(0, "@enduml");
    Ok(writer.out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::conversion::convert_table_to_graph;
    use crate::graph::conversion::tests::{step, sub, table, three_step_table};

    #[test]
    fn nested_if_blocks() {
        let graph = convert_table_to_graph(&three_step_table()).unwrap();
        let puml = convert_graph_to_plantuml(&graph).unwrap();
        assert!(puml.starts_with("@startuml\n"));
        assert!(puml.trim_end().ends_with("@enduml"));
        assert!(puml.contains("if (<b>1: </b> Erfolgt die Bestellung fristgerecht?) then (ja)"));
        assert!(puml.contains("    if (<b>2: </b>"));
        assert!(puml.contains("        if (<b>3: </b>"));
        assert_eq!(puml.matches("endif").count(), 3);
        assert_eq!(puml.matches("kill;").count(), 4);
        assert!(puml.contains("Frist nicht eingehalten"));
    }

    #[test]
    fn merge_into_decision_is_too_complex() {
        let t = table(vec![
            step("1", "?", vec![sub(true, Some("3"), None, None), sub(false, Some("2"), None, None)]),
            step("2", "?", vec![sub(true, Some("3"), None, None), sub(false, None, Some("A01"), None)]),
            step("3", "?", vec![sub(true, None, Some("A02"), None), sub(false, None, Some("A03"), None)]),
        ]);
        let graph = convert_table_to_graph(&t).unwrap();
        match convert_graph_to_plantuml(&graph) {
            Err(PlantUmlError::GraphTooComplexForPlantuml { step, predecessors }) => {
                assert_eq!(step, "3");
                assert_eq!(predecessors, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn one_sided_decision() {
        let t = table(vec![step("1", "?", vec![sub(true, None, Some("A01"), None)])]);
        let graph = convert_table_to_graph(&t).unwrap();
        let err = convert_graph_to_plantuml(&graph).unwrap_err();
        assert_eq!(err.kind(), "NotExactlyTwoOutgoingEdgesError");
    }

    #[test]
    fn dangling_start_is_unclassified() {
        let mut graph = convert_table_to_graph(&three_step_table()).unwrap();
        let start = graph.start();
        graph.edges.retain(|e| e.source != start);
        let err = convert_graph_to_plantuml(&graph).unwrap_err();
        assert_eq!(err.kind(), "UnclassifiedPlantUmlError");
    }
}
