//! Schema loader
//!
//! Reads schema documents from JSON or YAML, either from strings or from a
//! list of search directories.

use crate::model::SchemaFragment;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Loads schema documents from disk or memory
pub struct SchemaLoader {
    schema_paths: Vec<PathBuf>,
}

impl SchemaLoader {
    /// Create a new schema loader with the given search paths
    #[must_use]
    pub fn new(schema_paths: Vec<PathBuf>) -> Self {
        Self { schema_paths }
    }

    /// Load a schema by name from the search paths
    ///
    /// Tries `<name>.json`, `<name>.json.schema`, `<name>.schema.json`,
    /// `<name>.yaml` and `<name>.yml` in every search path, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] with kind `NotFound` when no candidate exists, or
    /// the parse error of the first candidate found.
    pub fn load(&self, name: &str) -> Result<SchemaFragment> {
        let variations = [
            format!("{name}.json"),
            format!("{name}.json.schema"),
            format!("{name}.schema.json"),
            format!("{name}.yaml"),
            format!("{name}.yml"),
        ];

        for path in &self.schema_paths {
            for variation in &variations {
                let file_path = path.join(variation);
                if file_path.exists() {
                    trace!("Found schema file: {:?}", file_path);
                    return self.load_from_file(&file_path);
                }
            }
        }

        Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!(
                "Schema {name} not found in search paths: {:?}",
                self.schema_paths
            ),
        )))
    }

    /// Load a schema from a specific file path
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the file cannot be read and
    /// [`Error::InvalidFormat`] when it does not parse.
    pub fn load_from_file(&self, path: &Path) -> Result<SchemaFragment> {
        debug!("Loading schema from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;

        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            self.load_from_yaml(&content)
        } else {
            self.load_from_json(&content)
        }
    }

    /// Load a schema from JSON string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] on malformed JSON.
    pub fn load_from_json(&self, json: &str) -> Result<SchemaFragment> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidFormat(format!("JSON parse error: {e}")))
    }

    /// Load a schema from YAML string
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFormat`] on malformed YAML.
    pub fn load_from_yaml(&self, yaml: &str) -> Result<SchemaFragment> {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::InvalidFormat(format!("YAML parse error: {e}")))
    }

    /// Add a search path for schema files
    pub fn add_path(&mut self, path: PathBuf) {
        self.schema_paths.push(path);
    }
}

impl Default for SchemaLoader {
    fn default() -> Self {
        Self::new(vec![PathBuf::from(".")])
    }
}
