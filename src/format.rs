//! File formats
//!
//! A [`FileFormat`] is a name plus every schema version it has ever had.
//! Loading reads the header of a file to pick the schema it was written
//! with; saving stamps the requested schema version into a fresh header.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info};

use crate::codec;
use crate::config::TreefileConfig;
use crate::error::{ConstructionError, FormatError, Result};
use crate::header;
use crate::node::{NodeId, Tree};
use crate::schema::Schema;
use crate::storage::{FsStorage, Storage};
use crate::verify::{verify_tree, Verification};

/// A document body, without its file header
#[derive(Debug, Clone)]
pub struct Document {
    pub tree: Tree,
    /// First top-level node of the body
    pub root: NodeId,
}

impl Document {
    pub fn new(tree: Tree, root: NodeId) -> Self {
        Self { tree, root }
    }

    /// The body in the line format, without a header
    pub fn to_text(&self) -> String {
        codec::serialize_subtree(&self.tree, self.root)
    }
}

/// A named file format and its schema versions
pub struct FileFormat {
    name: String,
    /// Schemas keyed by version string
    schemas: BTreeMap<String, Schema>,
    config: TreefileConfig,
    storage: Box<dyn Storage>,
}

impl std::fmt::Debug for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileFormat")
            .field("name", &self.name)
            .field("versions", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl FileFormat {
    /// Build a format from all of its schema versions
    pub fn new(name: impl Into<String>, schemas: impl IntoIterator<Item = Schema>) -> std::result::Result<Self, ConstructionError> {
        let name = name.into();
        let mut errors = ConstructionError::new("file format");
        if name.trim().is_empty() {
            errors.push("format name is required");
        } else if name.contains('\n') {
            errors.push("format name may not contain a line break");
        }

        let mut registry = BTreeMap::new();
        for schema in schemas {
            let version = schema.version_string().to_string();
            if registry.insert(version.clone(), schema).is_some() {
                errors.push(format!("schema version '{}' is registered more than once", version));
            }
        }
        if registry.is_empty() {
            errors.push("at least one schema is required");
        }

        errors.into_result(())?;
        Ok(Self {
            name,
            schemas: registry,
            config: TreefileConfig::default(),
            storage: Box::new(FsStorage),
        })
    }

    pub fn with_config(mut self, config: TreefileConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_storage(mut self, storage: impl Storage + 'static) -> Self {
        self.storage = Box::new(storage);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema registered under `version`
    pub fn schema(&self, version: &str) -> Option<&Schema> {
        self.schemas.get(version)
    }

    /// Schema with the highest version number
    pub fn latest_schema(&self) -> Option<&Schema> {
        self.schemas.values().max_by_key(|s| s.version_num())
    }

    /// Registered version strings, sorted
    pub fn versions(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    /// Read and verify a file, returning its body
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Document> {
        let path = path.as_ref();
        debug!(format = %self.name, path = %path.display(), "loading document");

        let (mut tree, header) = self.read_verified(path)?;
        let body = tree.next_sibling(header).ok_or_else(|| {
            FormatError::Header(format!("{} has no document body", path.display()))
        })?;
        tree.set_prev_sibling(body, None)?;
        Ok(Document::new(tree, body))
    }

    /// Write `document` under a header for schema `version_string`. The
    /// document is verified before writing and, unless disabled, the written
    /// file is read back and verified again.
    pub fn save(&self, path: impl AsRef<Path>, document: &Document, version_string: &str) -> Result<()> {
        let path = path.as_ref();
        let schema = self.resolve(version_string)?;

        let mut tree = document.tree.clone();
        let header = header::generate(&mut tree, &self.name, schema)?;
        tree.set_next_sibling(header, Some(document.root))?;

        let result = verify_tree(&tree, header, &self.name, schema, path);
        Self::check(path, result)?;

        let mut text = codec::serialize_subtree(&tree, header);
        if self.config.save.trailing_newline {
            text.push('\n');
        }
        self.storage.write_string(path, &text)?;
        info!(format = %self.name, version = version_string, path = %path.display(), "saved document");

        if self.config.save.reverify {
            self.read_verified(path)?;
        }
        Ok(())
    }

    /// Parse `path` and verify it against the schema its header names
    fn read_verified(&self, path: &Path) -> Result<(Tree, NodeId)> {
        let lines = self.storage.read_lines(path)?;
        let (tree, header) = codec::parse(&lines)?;
        let version = header::extract_schema_version_string(&tree, header)?;
        let schema = self.resolve(&version)?;

        let result = verify_tree(&tree, header, &self.name, schema, path);
        Self::check(path, result)?;
        Ok((tree, header))
    }

    fn resolve(&self, version: &str) -> Result<&Schema> {
        self.schema(version).ok_or_else(|| FormatError::UnknownSchemaVersion {
            format: self.name.clone(),
            version: version.to_string(),
        })
    }

    fn check(path: &Path, result: Verification) -> Result<()> {
        if result.passed() {
            return Ok(());
        }
        Err(FormatError::Violation {
            path: path.display().to_string(),
            diagnostics: result.into_diagnostics(),
        })
    }
}
