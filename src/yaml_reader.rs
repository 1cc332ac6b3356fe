//! YAML Reader
//!
//! Reads the same `nodes`/`links` document as the JSON reader, written as YAML.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::io::{IoError, IoResult, Reader};
use crate::model::GraphData;

/// Reader for YAML graph documents
pub struct YamlReader;

impl YamlReader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for YamlReader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader for YamlReader {
    fn read(&self, input: &Path) -> IoResult<GraphData> {
        let content = fs::read_to_string(input)?;
        let data: GraphData = serde_yaml::from_str(&content)
            .map_err(|e| IoError::Parse(format!("{}: {e}", input.display())))?;
        debug!(path = %input.display(), nodes = data.nodes.len(), links = data.links.len(), "read YAML graph");
        Ok(data)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["yaml", "yml"]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Group;
    use std::path::PathBuf;

    fn fixture() -> PathBuf {
        PathBuf::from("tests/fixtures/pinned.yaml")
    }

    #[test]
    fn yaml_reader_supports_yaml_extensions() {
        let reader = YamlReader::new();
        assert!(reader.supports_extension("yaml"));
        assert!(reader.supports_extension("yml"));
        assert!(reader.supports_extension("YML"));
        assert!(!reader.supports_extension("json"));
    }

    #[test]
    fn yaml_reader_parses_fixture() {
        let data = YamlReader::new().read(&fixture()).expect("Should parse YAML graph");

        assert_eq!(data.nodes.len(), 4);
        assert_eq!(data.nodes[0].id, "hub");
        assert_eq!(data.nodes[1].group, Some(Group::from("leaf")));
        assert_eq!((data.nodes[3].fx, data.nodes[3].fy), (Some(120.0), Some(-80.0)));
        assert_eq!(data.links.len(), 3);
        assert_eq!(data.links[2].value, None);
    }

    #[test]
    fn yaml_reader_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(&path, "nodes: not-a-list\n").unwrap();

        assert!(matches!(YamlReader::new().read(&path), Err(IoError::Parse(_))));
    }
}
