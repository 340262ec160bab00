//! Error types for the ebd-toolchain library.
//!
//! Two distinct families reflect two distinct failure modes:
//!
//! * [`ToolchainError`] — **Fatal**: the run cannot proceed at all (input
//!   file missing, not a `.docx`, rendering service not configured). Returned
//!   as `Err(ToolchainError)` from the top-level entry points.
//!
//! * Stage errors ([`ScrapingError`], [`GraphConversionError`],
//!   [`PlantUmlError`], [`RenderError`]) — **Non-fatal**: a single EBD failed
//!   in one pipeline stage. The orchestrator turns each into a
//!   [`StageFailure`], records it in the error ledger and moves on to the
//!   next EBD.
//!
//! Every stage error enum carries an `Unclassified` variant. A cause the
//! stage does not recognise lands there under its own kind name instead of
//! being folded into one of the known kinds.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ebd-toolchain library.
#[derive(Debug, Error)]
pub enum ToolchainError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Input file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input path exists but is a directory (or something else).
    #[error("Input path '{path}' is not a file")]
    NotAFile { path: PathBuf },

    /// The file could be read but is not a zip-based `.docx` document.
    #[error("File is not a valid .docx document: '{path}'\n{detail}")]
    NotADocx { path: PathBuf, detail: String },

    /// The `.docx` container is fine but `word/document.xml` is broken.
    #[error("Document '{path}' is corrupt: {detail}")]
    CorruptDocument { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Rendering-service settings are missing or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create the output directory.
    #[error("Failed to prepare output directory '{path}': {source}")]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while loading the rendering-service settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Settings loading failed: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid port number: {0}")]
    InvalidPort(u16),

    #[error("Required setting missing: {0}")]
    MissingRequired(&'static str),
}

// ── Stage classification ─────────────────────────────────────────────────

/// How bad a classified failure is for the EBD that hit it.
///
/// The declaration order is the sort order of the error ledger: critical
/// entries are listed before advisory ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// Remaining stages for this EBD are skipped.
    Critical,
    /// Recorded, but the next stage still runs.
    Advisory,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Critical => f.write_str("critical"),
            Severity::Advisory => f.write_str("advisory"),
        }
    }
}

/// The pipeline stage a failure was classified in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Table lookup in the document and table normalisation.
    Scraping,
    /// Writing the `.json` artifact.
    StructuredOutput,
    /// Normalised table → graph.
    GraphConversion,
    /// `.puml` artifact.
    PlantUml,
    /// `.dot` and `.svg` artifacts.
    Rendering,
}

impl Stage {
    pub fn severity(self) -> Severity {
        match self {
            Stage::PlantUml => Severity::Advisory,
            Stage::Scraping
            | Stage::StructuredOutput
            | Stage::GraphConversion
            | Stage::Rendering => Severity::Critical,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Scraping => "scraping",
            Stage::StructuredOutput => "structured_output",
            Stage::GraphConversion => "graph_conversion",
            Stage::PlantUml => "plantuml",
            Stage::Rendering => "rendering",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, per-EBD failure as recorded by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageFailure {
    pub stage: Stage,
    /// Stable kind name of the underlying error, e.g. `TableNotFound`.
    pub kind: &'static str,
    /// Human-readable cause.
    pub message: String,
}

impl StageFailure {
    pub fn new(stage: Stage, kind: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            kind,
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.stage.severity()
    }
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}:{}] {}: {}",
            self.severity(),
            self.stage,
            self.kind,
            self.message
        )
    }
}

// ── Stage errors ─────────────────────────────────────────────────────────

/// Failures while locating or normalising an EBD table.
#[derive(Debug, Error)]
pub enum ScrapingError {
    /// Neither a table nor an explanatory remark follows the EBD key.
    #[error("Table not found for {ebd_key}: {reason}")]
    TableNotFound { ebd_key: String, reason: String },

    /// A table exists but cannot be normalised.
    #[error("Table of {ebd_key} is not convertible: {source}")]
    TableNotConvertible {
        ebd_key: String,
        #[source]
        source: TableConversionError,
    },

    #[error("Unexpected scraping error for {ebd_key}: {detail}")]
    Unclassified { ebd_key: String, detail: String },
}

impl ScrapingError {
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapingError::TableNotFound { .. } => "TableNotFound",
            ScrapingError::TableNotConvertible { .. } => "TableNotConvertible",
            ScrapingError::Unclassified { .. } => "UnclassifiedScrapingError",
        }
    }
}

/// Why a raw `.docx` table could not be turned into an `EbdTable`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableConversionError {
    #[error("no header row starting with 'Nr.' found")]
    MissingHeader,

    #[error("header row lacks the '{0}' column")]
    MissingColumn(&'static str),

    #[error("row {row}: check result '{text}' is neither 'ja' nor 'nein'")]
    MalformedCheckResult { row: usize, text: String },

    #[error("row {row}: sub-row without a preceding step number")]
    OrphanSubRow { row: usize },
}

/// Failures while turning a normalised table into a graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphConversionError {
    #[error("step {step}: references EBD {reference}, cross references are not supported")]
    EbdCrossReferenceNotSupported { step: String, reference: String },

    #[error("step {step}: 'Ende' found in the code column instead of the check result column")]
    EndeInWrongColumn { step: String },

    #[error("result code {code} is used with different notes")]
    OutcomeCodeAmbiguous { code: String },

    #[error("step {step}: subsequent step {target} does not exist")]
    UnknownSubsequentStep { step: String, target: String },

    #[error("{0}")]
    Unclassified(String),
}

impl GraphConversionError {
    pub fn kind(&self) -> &'static str {
        match self {
            GraphConversionError::EbdCrossReferenceNotSupported { .. } => {
                "EbdCrossReferenceNotSupportedError"
            }
            GraphConversionError::EndeInWrongColumn { .. } => "EndeInWrongColumnError",
            GraphConversionError::OutcomeCodeAmbiguous { .. } => "OutcomeCodeAmbiguousError",
            GraphConversionError::UnknownSubsequentStep { .. } => "UnknownSubsequentStepError",
            GraphConversionError::Unclassified(_) => "UnclassifiedGraphConversionError",
        }
    }
}

/// Failures while writing the PlantUML artifact.
#[derive(Debug, Error)]
pub enum PlantUmlError {
    #[error("decision node {step} has {found} outgoing edges, expected one 'ja' and one 'nein'")]
    NotExactlyTwoOutgoingEdges { step: String, found: usize },

    #[error("decision node {step} is reachable from {predecessors} predecessors; PlantUML needs a tree")]
    GraphTooComplexForPlantuml { step: String, predecessors: usize },

    #[error("failed to write '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Unclassified(String),
}

impl PlantUmlError {
    pub fn kind(&self) -> &'static str {
        match self {
            PlantUmlError::NotExactlyTwoOutgoingEdges { .. } => "NotExactlyTwoOutgoingEdgesError",
            PlantUmlError::GraphTooComplexForPlantuml { .. } => "GraphTooComplexForPlantumlError",
            PlantUmlError::OutputWrite { .. } => "OutputWriteError",
            PlantUmlError::Unclassified(_) => "UnclassifiedPlantUmlError",
        }
    }
}

/// Failures while writing the DOT text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DotError {
    #[error("node {node} has in-degree {in_degree} but only {paths} path(s) from the start node")]
    PathsNotGreaterThanOne {
        node: String,
        in_degree: usize,
        paths: usize,
    },

    #[error("graph contains a cycle through node {0}")]
    Cycle(String),
}

impl DotError {
    pub fn kind(&self) -> &'static str {
        match self {
            DotError::PathsNotGreaterThanOne { .. } => "PathsNotGreaterThanOneError",
            DotError::Cycle(_) => "GraphCycleError",
        }
    }
}

/// Failures talking to the Kroki rendering service.
#[derive(Debug, Error)]
pub enum KrokiError {
    #[error("Kroki at {url} is unreachable: {reason}\nIs the service running (docker-compose up -d)?")]
    Unreachable { url: String, reason: String },

    #[error("Kroki request to {url} timed out after {secs}s")]
    Timeout { url: String, secs: u64 },

    #[error("Kroki returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Kroki response is not an SVG document")]
    InvalidResponse,

    #[error("{0}")]
    Unclassified(String),
}

impl KrokiError {
    pub fn kind(&self) -> &'static str {
        match self {
            KrokiError::Unreachable { .. } => "KrokiUnreachableError",
            KrokiError::Timeout { .. } => "KrokiTimeoutError",
            KrokiError::HttpStatus { .. } => "KrokiHttpStatusError",
            KrokiError::InvalidResponse => "KrokiInvalidResponseError",
            KrokiError::Unclassified(_) => "UnclassifiedKrokiError",
        }
    }
}

/// Failures in the combined `.dot` / `.svg` stage.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Dot(#[from] DotError),

    #[error(transparent)]
    Kroki(#[from] KrokiError),

    #[error("failed to write '{path}': {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Dot(e) => e.kind(),
            RenderError::Kroki(e) => e.kind(),
            RenderError::OutputWrite { .. } => "OutputWriteError",
        }
    }
}

// ── Conversions into StageFailure ────────────────────────────────────────

impl From<&ScrapingError> for StageFailure {
    fn from(e: &ScrapingError) -> Self {
        StageFailure::new(Stage::Scraping, e.kind(), e.to_string())
    }
}

impl From<&GraphConversionError> for StageFailure {
    fn from(e: &GraphConversionError) -> Self {
        StageFailure::new(Stage::GraphConversion, e.kind(), e.to_string())
    }
}

impl From<&PlantUmlError> for StageFailure {
    fn from(e: &PlantUmlError) -> Self {
        StageFailure::new(Stage::PlantUml, e.kind(), e.to_string())
    }
}

impl From<&RenderError> for StageFailure {
    fn from(e: &RenderError) -> Self {
        StageFailure::new(Stage::Rendering, e.kind(), e.to_string())
    }
}
