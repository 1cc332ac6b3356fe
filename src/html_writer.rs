//! HTML Writer
//!
//! Wraps the SVG in a minimal page with an `#app` mount point.

use std::path::Path;

use tracing::debug;

use crate::io::{IoError, IoResult, Writer, write_file};
use crate::render::Scene;

/// Writer for the HTML page shell
pub struct HtmlWriter;

impl HtmlWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for HtmlWriter {
    fn write(&self, scene: &Scene, output: &Path) -> IoResult<()> {
        let html = scene.to_html().map_err(|e| IoError::Write(e.to_string()))?;
        write_file(output, &html)?;
        debug!(path = %output.display(), bytes = html.len(), "wrote HTML page");
        Ok(())
    }

    fn format_id(&self) -> &str {
        "html"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["html", "htm"]
    }
}
