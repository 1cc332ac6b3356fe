//! Reader/Writer traits and format dispatch
//!
//! Readers turn an input document into [`GraphData`]; writers serialize a
//! rendered [`Scene`]. The [`FormatRegistry`] picks one by file extension or
//! by format id.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::html_writer::HtmlWriter;
use crate::json_reader::JsonReader;
use crate::layout_writer::LayoutWriter;
use crate::model::{GraphData, GraphError, GraphModel};
use crate::render::Scene;
use crate::svg_writer::SvgWriter;
use crate::yaml_reader::YamlReader;

/// Errors that can occur during reading or writing
#[derive(Error, Debug)]
pub enum IoError {
    /// The file format is not supported
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file extension could not be determined
    #[error("could not determine file format from path: {0}")]
    UnknownExtension(String),

    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A parsing error occurred
    #[error("parse error: {0}")]
    Parse(String),

    /// A rendering/writing error occurred
    #[error("write error: {0}")]
    Write(String),

    /// The document parsed but does not describe a valid graph
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for reader/writer operations
pub type IoResult<T> = Result<T, IoError>;

/// A reader parses an input document into [`GraphData`]
pub trait Reader {
    fn read(&self, input: &Path) -> IoResult<GraphData>;

    /// File extensions this reader can handle (e.g., ["yaml", "yml"])
    fn supported_extensions(&self) -> &[&str];

    /// Check if this reader can handle the given file extension
    fn supports_extension(&self, ext: &str) -> bool {
        self.supported_extensions()
            .iter()
            .any(|e| e.eq_ignore_ascii_case(ext))
    }
}

/// A writer outputs a rendered scene in one format
pub trait Writer {
    /// Write the scene to the output file, creating parent directories
    fn write(&self, scene: &Scene, output: &Path) -> IoResult<()>;

    /// Identifier for this output format (e.g., "svg", "html")
    fn format_id(&self) -> &str;

    /// Output file extensions that imply this format
    fn supported_extensions(&self) -> &[&str];
}

/// Write `contents` to `output`, creating missing parent directories
pub(crate) fn write_file(output: &Path, contents: &str) -> IoResult<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, contents)?;
    Ok(())
}

/// Registry of available readers and writers
pub struct FormatRegistry {
    readers: Vec<Box<dyn Reader>>,
    writers: Vec<Box<dyn Writer>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            readers: Vec::new(),
            writers: Vec::new(),
        }
    }

    /// Create a registry with all default readers and writers registered
    ///
    /// Currently registers:
    /// - Readers: `JsonReader` (json), `YamlReader` (yaml, yml)
    /// - Writers: `SvgWriter` (svg), `HtmlWriter` (html), `LayoutWriter` (layout-json)
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_reader(Box::new(JsonReader::new()));
        registry.register_reader(Box::new(YamlReader::new()));
        registry.register_writer(Box::new(SvgWriter::new()));
        registry.register_writer(Box::new(HtmlWriter::new()));
        registry.register_writer(Box::new(LayoutWriter::new()));
        registry
    }

    pub fn register_reader(&mut self, reader: Box<dyn Reader>) {
        self.readers.push(reader);
    }

    pub fn register_writer(&mut self, writer: Box<dyn Writer>) {
        self.writers.push(writer);
    }

    /// Find a reader for the given file extension
    pub fn reader_for_extension(&self, ext: &str) -> Option<&dyn Reader> {
        self.readers
            .iter()
            .find(|r| r.supports_extension(ext))
            .map(|r| r.as_ref())
    }

    /// Find a writer by format ID
    pub fn writer_for_format(&self, format_id: &str) -> Option<&dyn Writer> {
        self.writers
            .iter()
            .find(|w| w.format_id().eq_ignore_ascii_case(format_id))
            .map(|w| w.as_ref())
    }

    /// Get file extension from a path
    pub fn extension_from_path(path: &Path) -> Option<&str> {
        path.extension().and_then(|e| e.to_str())
    }

    /// Find a reader for the given path based on its extension
    pub fn reader_for_path(&self, path: &Path) -> IoResult<&dyn Reader> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.reader_for_extension(ext)
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Find a writer for the given output path based on its extension
    pub fn writer_for_path(&self, path: &Path) -> IoResult<&dyn Writer> {
        let ext = Self::extension_from_path(path)
            .ok_or_else(|| IoError::UnknownExtension(path.display().to_string()))?;

        self.writers
            .iter()
            .find(|w| {
                w.supported_extensions()
                    .iter()
                    .any(|e| e.eq_ignore_ascii_case(ext))
            })
            .map(|w| w.as_ref())
            .ok_or_else(|| IoError::UnsupportedFormat(ext.to_string()))
    }

    /// Read a graph document, choosing the reader from the path
    pub fn read(&self, path: &Path) -> IoResult<GraphData> {
        self.reader_for_path(path)?.read(path)
    }

    /// Read a graph document and resolve its links
    pub fn read_model(&self, path: &Path) -> IoResult<GraphModel> {
        let data = self.read(path)?;
        Ok(GraphModel::from_data(&data)?)
    }

    /// Registered output format ids
    pub fn format_ids(&self) -> Vec<&str> {
        self.writers.iter().map(|w| w.format_id()).collect()
    }
}
