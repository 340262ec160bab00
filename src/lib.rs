//! # ebd-toolchain
//!
//! Scrape EBDs (Entscheidungsbaumdiagramme) from a `.docx` document and turn
//! each into machine-readable artifacts: the normalised table as JSON, the
//! decision graph as Graphviz DOT, PlantUML and a Kroki-rendered SVG.
//!
//! ## Why this crate?
//!
//! The EBD documents of the German energy market describe hundreds of
//! decision trees as Word tables. Some of them cannot be converted, some
//! cannot be drawn as PlantUML, some crash the renderer. A batch run should
//! never stop on one of them: every failure is classified per stage and the
//! run ends with a summary of which EBDs failed where.
//!
//! ## Pipeline Overview
//!
//! ```text
//! .docx
//!  │
//!  ├─ 1. Scrape     find EBD keys, their chapter and their tables (spawn_blocking)
//!  ├─ 2. Normalise  raw tables → EbdTable (or a metadata-only stub)
//!  ├─ 3. JSON       <key>.json
//!  ├─ 4. Graph      EbdTable → EbdGraph
//!  ├─ 5. PlantUML   <key>.puml (advisory)
//!  └─ 6. Render     <key>.dot, <key>.svg via Kroki
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ebd_toolchain::{scrape_and_graph, ExportType, RunConfig, Settings};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // KROKI_HOST / KROKI_PORT from the environment, .env or ebd_toolchain.toml
//!     let settings = Settings::load()?;
//!     let config = RunConfig::builder()
//!         .output_dir("machine-readable")
//!         .export_types(ExportType::ALL)
//!         .build()?;
//!     let report = scrape_and_graph(Path::new("ebd.docx"), &settings, &config).await?;
//!     println!("{}", report.ledger.to_pretty_json(4)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scrape-and-graph` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! ebd-toolchain = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod render;
pub mod scrape;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportType, RunConfig, RunConfigBuilder, Settings};
pub use error::{Severity, Stage, StageFailure, ToolchainError};
pub use model::{EbdGraph, EbdTable, EbdTableMetaData};
pub use pipeline::{run_pipeline, scrape_and_graph, ErrorLedger, RunReport};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use render::{KrokiClient, SvgRenderer};
pub use scrape::{DocxDocument, EbdDescriptor, EbdDocument};
