//! The orchestrator: every EBD of a document through every stage.
//!
//! ## Stage order per EBD
//!
//! ```text
//! extraction ──▶ normalisation ──▶ .json ──▶ graph ──▶ .puml ──▶ .dot/.svg
//! ```
//!
//! A failure is classified at the stage boundary it crossed and recorded in
//! the [`ErrorLedger`]. Critical failures end the EBD; the `.puml` stage is
//! advisory and never blocks `.dot`/`.svg`. No failure of a single EBD ends
//! the run.

use super::export::{table_to_json, write_artifact};
use super::ledger::ErrorLedger;
use crate::config::{ExportType, RunConfig, Settings};
use crate::error::{
    PlantUmlError, RenderError, ScrapingError, Stage, StageFailure, ToolchainError,
};
use crate::graph::{convert_graph_to_dot, convert_graph_to_plantuml, convert_table_to_graph};
use crate::model::{EbdGraph, EbdTable};
use crate::render::{KrokiClient, SvgRenderer};
use crate::scrape::convert::convert_docx_tables;
use crate::scrape::{DocxDocument, EbdDescriptor, EbdDocument, EbdDocxTables};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// What [`prepare_output_dir`] found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDirectory {
    Created,
    /// Already there. Existing files are left alone; artifacts of the same
    /// name are replaced.
    Reused,
}

/// Result of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Number of EBDs attempted.
    pub processed: usize,
    pub ledger: ErrorLedger,
    /// Every artifact written, in order.
    pub written: Vec<PathBuf>,
}

/// What happened to one EBD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EbdOutcome {
    pub written: Vec<(ExportType, PathBuf)>,
    pub failures: Vec<StageFailure>,
}

impl EbdOutcome {
    fn fail(&mut self, failure: StageFailure) {
        self.failures.push(failure);
    }
}

/// Create the output directory if needed. An existing directory is reused.
pub async fn prepare_output_dir(dir: &Path) -> Result<OutputDirectory, ToolchainError> {
    match tokio::fs::metadata(dir).await {
        Ok(meta) if meta.is_dir() => {
            warn!(
                "The output directory '{}' exists already. Will reuse it and replace artifacts of the same name.",
                dir.display()
            );
            Ok(OutputDirectory::Reused)
        }
        Ok(_) => Err(ToolchainError::OutputDirectory {
            path: dir.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            ),
        }),
        Err(_) => {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|source| ToolchainError::OutputDirectory {
                    path: dir.to_path_buf(),
                    source,
                })?;
            info!("Created output directory '{}'", dir.display());
            Ok(OutputDirectory::Created)
        }
    }
}

/// Scrape a `.docx`, convert every EBD and write the requested artifacts.
///
/// Renders SVGs through the Kroki instance named by `settings`.
///
/// # Errors
/// Only fatal problems are returned: the input is missing or not a `.docx`,
/// or the output directory cannot be prepared. Per-EBD failures end up in
/// [`RunReport::ledger`].
pub async fn scrape_and_graph(
    input: &Path,
    settings: &Settings,
    config: &RunConfig,
) -> Result<RunReport, ToolchainError> {
    settings.validate()?;
    let renderer = KrokiClient::new(settings, config.render_timeout_secs)
        .map_err(|e| ToolchainError::Internal(e.to_string()))?;

    // zip + XML parsing is CPU-bound and synchronous
    let path = input.to_path_buf();
    let document = tokio::task::spawn_blocking(move || DocxDocument::open(&path))
        .await
        .map_err(|e| ToolchainError::Internal(format!("document reader task failed: {e}")))??;

    run_pipeline(&document, &renderer, config).await
}

/// Process every EBD of `document` in discovery order.
pub async fn run_pipeline(
    document: &dyn EbdDocument,
    renderer: &dyn SvgRenderer,
    config: &RunConfig,
) -> Result<RunReport, ToolchainError> {
    prepare_output_dir(&config.output_dir).await?;

    let ebds = document.ebd_keys();
    let total = ebds.len();
    info!("Found {} EBD(s)", total);
    if let Some(cb) = &config.progress_callback {
        cb.on_run_start(total);
    }

    let mut report = RunReport::default();
    for (i, descriptor) in ebds.iter().enumerate() {
        if let Some(cb) = &config.progress_callback {
            cb.on_ebd_start(i + 1, total, descriptor);
        }
        info!("Processing {} ({})", descriptor.key, descriptor.title);

        let outcome = process_ebd(document, renderer, config, descriptor).await;

        for (export_type, path) in &outcome.written {
            if let Some(cb) = &config.progress_callback {
                cb.on_artifact_written(&descriptor.key, *export_type, path);
            }
        }
        for failure in &outcome.failures {
            warn!("{}: {}", descriptor.key, failure);
            report.ledger.record(&descriptor.key, failure);
            if let Some(cb) = &config.progress_callback {
                cb.on_stage_failure(&descriptor.key, failure);
            }
        }
        report
            .written
            .extend(outcome.written.into_iter().map(|(_, path)| path));
        report.processed += 1;
    }

    info!(
        "Processed {} EBD(s), {} artifact(s) written, {} failure(s)",
        report.processed,
        report.written.len(),
        report.ledger.failure_count()
    );
    if let Some(cb) = &config.progress_callback {
        cb.on_run_complete(report.processed, report.ledger.failure_count());
    }
    Ok(report)
}

/// Run all stages for a single EBD.
///
/// Never fails: every problem is classified into the returned outcome.
pub async fn process_ebd(
    document: &dyn EbdDocument,
    renderer: &dyn SvgRenderer,
    config: &RunConfig,
    descriptor: &EbdDescriptor,
) -> EbdOutcome {
    let key = descriptor.key.as_str();
    let mut outcome = EbdOutcome::default();

    // ── Step 1: Extraction ─────────────────────────────────────────────────
    let tables = match document.ebd_tables(descriptor) {
        Ok(tables) => tables,
        Err(e) => {
            outcome.fail(StageFailure::from(&e));
            return outcome;
        }
    };

    // ── Step 2: Normalisation ──────────────────────────────────────────────
    let table = match tables {
        EbdDocxTables::NoTable(section) => {
            debug!("{key}: no table, remark only");
            EbdTable::metadata_only(key, &descriptor.title, &descriptor.chapter, section.remark)
        }
        EbdDocxTables::Tables(raw) => match convert_docx_tables(&raw, descriptor) {
            Ok(table) => table,
            Err(source) => {
                let e = ScrapingError::TableNotConvertible {
                    ebd_key: key.to_string(),
                    source,
                };
                outcome.fail(StageFailure::from(&e));
                return outcome;
            }
        },
    };
    debug!("{key}: table with {} row(s)", table.rows.len());

    // ── Step 3: Structured output ──────────────────────────────────────────
    if config.wants(ExportType::Json) {
        if let Err(failure) = write_json(config, key, &table, &mut outcome).await {
            outcome.fail(failure);
            return outcome;
        }
    }

    if table.is_metadata_only() {
        // nothing to draw
        return outcome;
    }

    // ── Step 4: Graph conversion ───────────────────────────────────────────
    let graph = match convert_table_to_graph(&table) {
        Ok(graph) => graph,
        Err(e) => {
            outcome.fail(StageFailure::from(&e));
            return outcome;
        }
    };
    debug!("{key}: graph with {} node(s)", graph.nodes.len());

    // ── Step 5: PlantUML (advisory) ────────────────────────────────────────
    if config.wants(ExportType::Puml) {
        if let Err(e) = write_plantuml(config, key, &graph, &mut outcome).await {
            outcome.fail(StageFailure::from(&e));
        }
    }

    // ── Step 6: DOT / SVG ──────────────────────────────────────────────────
    if config.wants(ExportType::Dot) || config.wants(ExportType::Svg) {
        if let Err(e) = write_dot_and_svg(renderer, config, key, &graph, &mut outcome).await {
            outcome.fail(StageFailure::from(&e));
        }
    }

    outcome
}

// ── Stage helpers ────────────────────────────────────────────────────────

async fn write_json(
    config: &RunConfig,
    key: &str,
    table: &EbdTable,
    outcome: &mut EbdOutcome,
) -> Result<(), StageFailure> {
    let json = table_to_json(table).map_err(|e| {
        StageFailure::new(Stage::StructuredOutput, "SerializationError", e.to_string())
    })?;
    let path = write_artifact(&config.output_dir, key, ExportType::Json, &json)
        .await
        .map_err(|e| {
            StageFailure::new(
                Stage::StructuredOutput,
                "OutputWriteError",
                format!(
                    "failed to write '{}': {e}",
                    ExportType::Json.path_for(&config.output_dir, key).display()
                ),
            )
        })?;
    debug!("{key}: wrote {}", path.display());
    outcome.written.push((ExportType::Json, path));
    Ok(())
}

async fn write_plantuml(
    config: &RunConfig,
    key: &str,
    graph: &EbdGraph,
    outcome: &mut EbdOutcome,
) -> Result<(), PlantUmlError> {
    let puml = convert_graph_to_plantuml(graph)?;
    let path = write_artifact(&config.output_dir, key, ExportType::Puml, &puml)
        .await
        .map_err(|source| PlantUmlError::OutputWrite {
            path: ExportType::Puml.path_for(&config.output_dir, key),
            source,
        })?;
    debug!("{key}: wrote {}", path.display());
    outcome.written.push((ExportType::Puml, path));
    Ok(())
}

async fn write_dot_and_svg(
    renderer: &dyn SvgRenderer,
    config: &RunConfig,
    key: &str,
    graph: &EbdGraph,
    outcome: &mut EbdOutcome,
) -> Result<(), RenderError> {
    let dot = convert_graph_to_dot(graph)?;

    if config.wants(ExportType::Dot) {
        let path = write_render_artifact(config, key, ExportType::Dot, &dot).await?;
        outcome.written.push((ExportType::Dot, path));
    }
    if config.wants(ExportType::Svg) {
        let svg = renderer.render_svg(&dot).await?;
        let path = write_render_artifact(config, key, ExportType::Svg, &svg).await?;
        outcome.written.push((ExportType::Svg, path));
    }
    Ok(())
}

async fn write_render_artifact(
    config: &RunConfig,
    key: &str,
    export_type: ExportType,
    contents: &str,
) -> Result<PathBuf, RenderError> {
    let path = write_artifact(&config.output_dir, key, export_type, contents)
        .await
        .map_err(|source| RenderError::OutputWrite {
            path: export_type.path_for(&config.output_dir, key),
            source,
        })?;
    debug!("{key}: wrote {}", path.display());
    Ok(path)
}
