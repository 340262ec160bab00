//! DOT → SVG rendering.
//!
//! ## Why a trait?
//!
//! Rendering is the only stage that leaves the process. The pipeline talks to
//! [`SvgRenderer`] so tests can substitute a renderer that needs no network,
//! while production runs use [`KrokiClient`].

pub mod kroki;

pub use kroki::KrokiClient;

use crate::error::KrokiError;
use async_trait::async_trait;

/// Turns Graphviz DOT source into an SVG document.
#[async_trait]
pub trait SvgRenderer: Send + Sync {
    async fn render_svg(&self, dot: &str) -> Result<String, KrokiError>;
}
