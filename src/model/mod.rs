//! Data types shared by the scraping, graph and rendering stages.

pub mod graph;
pub mod table;

pub use graph::{EbdGraph, EbdGraphEdge, EbdGraphNode, NodeIndex};
pub use table::{
    EbdChapterInformation, EbdCheckResult, EbdTable, EbdTableMetaData, EbdTableRow,
    EbdTableSubRow, ROLE_NOT_APPLICABLE,
};
