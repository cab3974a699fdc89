//! Error types for treefile

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::diagnostics::Diagnostics;

/// Result type for treefile operations
pub type Result<T> = std::result::Result<T, FormatError>;

/// Top-level errors
#[derive(Error, Debug)]
pub enum FormatError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("{path} does not conform to its format:\n{diagnostics}")]
    Violation {
        path: String,
        diagnostics: Diagnostics,
    },

    #[error("Malformed file header: {0}")]
    Header(String),

    #[error("Unknown schema version '{version}' for format '{format}'")]
    UnknownSchemaVersion { format: String, version: String },

    #[error("IO error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),
}

impl FormatError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Every constraint violated while building a value, reported together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructionError {
    /// What was being built ("node", "format node", ...)
    pub target: String,
    pub violations: Vec<String>,
}

impl ConstructionError {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            violations: Vec::new(),
        }
    }

    pub fn push(&mut self, violation: impl Into<String>) {
        self.violations.push(violation.into());
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn extend(&mut self, other: ConstructionError) {
        self.violations.extend(other.violations);
    }

    /// `Ok(value)` when nothing was violated, otherwise `Err(self)`.
    pub fn into_result<T>(self, value: T) -> std::result::Result<T, ConstructionError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.violations.iter().any(|v| v.contains(needle))
    }
}

impl fmt::Display for ConstructionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid {} ({} violation(s))",
            self.target,
            self.violations.len()
        )?;
        for violation in &self.violations {
            write!(f, "\n  - {}", violation)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConstructionError {}

/// Structural errors raised while turning text into a tree.
///
/// Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Nothing to parse")]
    Empty,

    #[error("Line {line}: missing ':' delimiter in {text:?}")]
    MissingDelimiter { line: usize, text: String },

    #[error("Line {line}: multi-line value opened here is never closed")]
    UnterminatedMultilineValue { line: usize },

    #[error("Line {line}: first node must be at level 0, found level {level}")]
    InvalidRootLevel { line: usize, level: usize },

    #[error("Line {line}: level {level} skips past level {previous} of the preceding node")]
    SkippedLevel {
        line: usize,
        level: usize,
        previous: usize,
    },
}
