//! SVG Writer
//!
//! Writes the rendered scene as a standalone SVG document.

use std::path::Path;

use tracing::debug;

use crate::io::{IoError, IoResult, Writer, write_file};
use crate::render::Scene;

/// Writer for SVG output
pub struct SvgWriter;

impl SvgWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SvgWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer for SvgWriter {
    fn write(&self, scene: &Scene, output: &Path) -> IoResult<()> {
        let svg = scene.to_svg().map_err(|e| IoError::Write(e.to_string()))?;
        write_file(output, &svg)?;
        debug!(path = %output.display(), bytes = svg.len(), "wrote SVG");
        Ok(())
    }

    fn format_id(&self) -> &str {
        "svg"
    }

    fn supported_extensions(&self) -> &[&str] {
        &["svg"]
    }
}
