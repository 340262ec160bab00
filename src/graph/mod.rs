//! Graph stages: build the decision graph of a table and write it as text.
//!
//! 1. [`conversion`] — [`crate::model::EbdTable`] → [`crate::model::EbdGraph`]
//! 2. [`dot`]        — graph → Graphviz DOT (also the input for SVG rendering)
//! 3. [`plantuml`]   — graph → PlantUML activity diagram

pub mod conversion;
pub mod dot;
pub mod plantuml;

pub use conversion::convert_table_to_graph;
pub use dot::convert_graph_to_dot;
pub use plantuml::convert_graph_to_plantuml;
