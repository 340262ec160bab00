//! Directed-graph form of an EBD.
//!
//! Nodes live in a `Vec` and are addressed by [`NodeIndex`]; edges are a
//! flat list. EBD graphs have a few dozen nodes at most, so adjacency is
//! computed by scanning instead of being stored.

use super::table::EbdTableMetaData;

/// Position of a node in [`EbdGraph::nodes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIndex(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EbdGraphNode {
    Start,
    /// One step of the table: a yes/no question.
    Decision {
        step_number: String,
        question: String,
    },
    /// A result code the check ends with (or passes through).
    Outcome {
        result_code: String,
        note: Option<String>,
    },
    End,
}

impl EbdGraphNode {
    /// Stable identifier used for DOT node names.
    pub fn key(&self) -> String {
        match self {
            EbdGraphNode::Start => "Start".to_string(),
            EbdGraphNode::Decision { step_number, .. } => step_number.clone(),
            EbdGraphNode::Outcome { result_code, .. } => result_code.clone(),
            EbdGraphNode::End => "Ende".to_string(),
        }
    }

    pub fn is_decision(&self) -> bool {
        matches!(self, EbdGraphNode::Decision { .. })
    }
}

/// An edge; decision edges carry the answer that leads along them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EbdGraphEdge {
    pub source: NodeIndex,
    pub target: NodeIndex,
    pub answer: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EbdGraph {
    pub metadata: EbdTableMetaData,
    pub nodes: Vec<EbdGraphNode>,
    pub edges: Vec<EbdGraphEdge>,
}

impl EbdGraph {
    pub fn new(metadata: EbdTableMetaData) -> Self {
        Self {
            metadata,
            nodes: vec![EbdGraphNode::Start],
            edges: Vec::new(),
        }
    }

    /// The start node is always inserted first.
    pub fn start(&self) -> NodeIndex {
        NodeIndex(0)
    }

    pub fn add_node(&mut self, node: EbdGraphNode) -> NodeIndex {
        self.nodes.push(node);
        NodeIndex(self.nodes.len() - 1)
    }

    /// Adding an edge that already exists is a no-op.
    pub fn add_edge(&mut self, source: NodeIndex, target: NodeIndex, answer: Option<bool>) {
        let edge = EbdGraphEdge {
            source,
            target,
            answer,
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub fn node(&self, index: NodeIndex) -> &EbdGraphNode {
        &self.nodes[index.0]
    }

    pub fn find(&self, predicate: impl Fn(&EbdGraphNode) -> bool) -> Option<NodeIndex> {
        self.nodes.iter().position(predicate).map(NodeIndex)
    }

    pub fn outgoing(&self, index: NodeIndex) -> impl Iterator<Item = &EbdGraphEdge> {
        self.edges.iter().filter(move |e| e.source == index)
    }

    pub fn incoming(&self, index: NodeIndex) -> impl Iterator<Item = &EbdGraphEdge> {
        self.edges.iter().filter(move |e| e.target == index)
    }

    pub fn in_degree(&self, index: NodeIndex) -> usize {
        self.incoming(index).count()
    }

    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }
}
