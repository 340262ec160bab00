//! Configuration types for an EBD export run.
//!
//! Two separate structs with two separate origins:
//!
//! * [`Settings`] — where the Kroki rendering service lives. Read from the
//!   environment (`KROKI_HOST`, `KROKI_PORT`), an optional `.env` file and an
//!   optional `ebd_toolchain.toml`. Both values are required; there are no
//!   defaults, so a missing service is reported before any work starts.
//! * [`RunConfig`] — what to produce and where. Built via
//!   [`RunConfig::builder()`], usually from CLI flags.

use crate::error::{SettingsError, ToolchainError};
use crate::progress::ProgressCallback;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

/// Config file consulted by [`Settings::load`] when present.
pub const DEFAULT_CONFIG_FILE: &str = "ebd_toolchain.toml";

/// Connection settings for the Kroki rendering service.
///
/// # Example
/// ```no_run
/// use ebd_toolchain::Settings;
///
/// std::env::set_var("KROKI_HOST", "localhost");
/// std::env::set_var("KROKI_PORT", "8125");
/// let settings = Settings::load().unwrap();
/// assert_eq!(settings.base_url(), "http://localhost:8125");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    pub kroki_host: String,
    pub kroki_port: u16,
}

impl Settings {
    /// Load from `.env`, [`DEFAULT_CONFIG_FILE`] and the process environment.
    ///
    /// Environment variables win over the config file.
    pub fn load() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from the given config file (optional, may be absent) and the
    /// process environment. Does not read `.env`.
    pub fn load_from(config_file: &Path) -> Result<Self, SettingsError> {
        let settings: Settings = config::Config::builder()
            .add_source(config::File::from(config_file).required(false))
            .add_source(config::Environment::with_prefix("KROKI").keep_prefix(true))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.kroki_host.trim().is_empty() {
            return Err(SettingsError::MissingRequired("kroki_host"));
        }
        if self.kroki_port == 0 {
            return Err(SettingsError::InvalidPort(self.kroki_port));
        }
        Ok(())
    }

    /// `http://{host}:{port}`
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.kroki_host.trim(), self.kroki_port)
    }
}

/// Configuration for one export run.
///
/// # Example
/// ```rust
/// use ebd_toolchain::{ExportType, RunConfig};
///
/// let config = RunConfig::builder()
///     .output_dir("machine-readable/FV2504")
///     .export_type(ExportType::Json)
///     .export_type(ExportType::Svg)
///     .build()
///     .unwrap();
/// assert!(config.wants(ExportType::Svg));
/// assert!(!config.wants(ExportType::Puml));
/// ```
#[derive(Clone)]
pub struct RunConfig {
    /// Directory the artifacts are written to. Default: `output`.
    ///
    /// Created (with parents) if missing. An existing directory is reused as
    /// is: nothing in it is deleted, artifacts of the same name are replaced.
    pub output_dir: PathBuf,

    /// Artifacts to produce per EBD. Default: none.
    ///
    /// With no export types the pipeline still runs every stage up to graph
    /// conversion and reports errors, it just writes nothing.
    pub export_types: BTreeSet<ExportType>,

    /// Timeout for a single Kroki request in seconds. Default: 30.
    pub render_timeout_secs: u64,

    /// Receives per-EBD progress events. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            export_types: BTreeSet::new(),
            render_timeout_secs: 30,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for RunConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunConfig")
            .field("output_dir", &self.output_dir)
            .field("export_types", &self.export_types)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn ProcessingProgressCallback>"),
            )
            .finish()
    }
}

impl RunConfig {
    /// Create a new builder for `RunConfig`.
    pub fn builder() -> RunConfigBuilder {
        RunConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn wants(&self, export_type: ExportType) -> bool {
        self.export_types.contains(&export_type)
    }
}

/// Builder for [`RunConfig`].
#[derive(Debug)]
pub struct RunConfigBuilder {
    config: RunConfig,
}

impl RunConfigBuilder {
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn export_type(mut self, export_type: ExportType) -> Self {
        self.config.export_types.insert(export_type);
        self
    }

    pub fn export_types(mut self, types: impl IntoIterator<Item = ExportType>) -> Self {
        self.config.export_types.extend(types);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<RunConfig, ToolchainError> {
        let c = &self.config;
        if c.output_dir.as_os_str().is_empty() {
            return Err(ToolchainError::InvalidConfig(
                "output directory must not be empty".into(),
            ));
        }
        if c.render_timeout_secs == 0 {
            return Err(ToolchainError::InvalidConfig(
                "render timeout must be ≥ 1 second".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// An artifact that can be written per EBD, named `<EBD key>.<extension>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExportType {
    /// Normalised table (metadata + rows).
    Json,
    /// Graphviz source of the decision graph.
    Dot,
    /// Decision graph rendered by Kroki.
    Svg,
    /// PlantUML activity diagram.
    Puml,
}

impl ExportType {
    pub const ALL: [ExportType; 4] = [
        ExportType::Json,
        ExportType::Dot,
        ExportType::Svg,
        ExportType::Puml,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportType::Json => "json",
            ExportType::Dot => "dot",
            ExportType::Svg => "svg",
            ExportType::Puml => "puml",
        }
    }

    /// `<dir>/<ebd_key>.<extension>`
    pub fn path_for(self, dir: &Path, ebd_key: &str) -> PathBuf {
        dir.join(format!("{}.{}", ebd_key, self.extension()))
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
