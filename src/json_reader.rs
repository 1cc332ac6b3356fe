//! JSON Reader
//!
//! Reads `{ "nodes": [...], "links": [...] }` documents, the shape used by the
//! d3 example datasets.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::io::{IoError, IoResult, Reader};
use crate::model::GraphData;

/// Reader for JSON graph documents
pub struct JsonReader;

impl JsonReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for JsonReader {
    fn read(&self, input: &Path) -> IoResult<GraphData> {
        let content = fs::read_to_string(input)?;
        let data: GraphData = serde_json::from_str(&content)
            .map_err(|e| IoError::Parse(format!("{}: {e}", input.display())))?;
        debug!(path = %input.display(), nodes = data.nodes.len(), links = data.links.len(), "read JSON graph");
        Ok(data)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["json"]
    }
}
