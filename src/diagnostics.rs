//! Diagnostics
//!
//! Verification never fails loudly. Each failed check becomes one
//! [`DiagnosticItem`]; callers decide whether to print, log or raise them.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// What kind of check failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Single node ===
    /// Title does not match the title regex
    TitleMismatch,
    /// Data does not match the data regex
    DataMismatch,
    /// Level differs from the format node's level
    LevelMismatch,
    /// A relation that must be absent is present
    UnexpectedNeighbor,
    /// A relation is not the expected node
    NeighborMismatch,
    /// Title regex stopped compiling after path substitution
    InvalidPattern,

    // === Tree ===
    /// A node is present where none is allowed, or missing where one is required
    MissingNode,
    /// No candidate format node accepted the node
    NoMatchingFormat,
    /// A neighbor list names a format node the schema does not define
    UnknownFormatNode,

    // === Document ===
    /// File extension differs from the schema's
    ExtensionMismatch,
    /// The header does not have the expected shape or content
    HeaderMismatch,
    /// The header is not followed by a body
    MissingBody,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TitleMismatch => "E001",
            Self::DataMismatch => "E002",
            Self::LevelMismatch => "E003",
            Self::UnexpectedNeighbor => "E004",
            Self::NeighborMismatch => "E005",
            Self::InvalidPattern => "E006",
            Self::MissingNode => "E101",
            Self::NoMatchingFormat => "E102",
            Self::UnknownFormatNode => "E103",
            Self::ExtensionMismatch => "E201",
            Self::HeaderMismatch => "E202",
            Self::MissingBody => "E203",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Diagnostic Item
// =============================================================================

/// A single failed check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticItem {
    /// What the check was about (a node, a path, the header)
    pub subject: String,
    pub code: DiagnosticCode,
    pub message: String,
    /// Nested detail, e.g. why each candidate format node was rejected
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl DiagnosticItem {
    pub fn new(subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for DiagnosticItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code, self.subject, self.message)?;

        for ctx in &self.context {
            write!(f, "\n  - {}", ctx)?;
        }

        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Collection of failed checks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<DiagnosticItem>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: DiagnosticItem) {
        self.items.push(item);
    }

    pub fn error(&mut self, subject: impl Into<String>, code: DiagnosticCode, message: impl Into<String>) {
        self.push(DiagnosticItem::new(subject, code, message));
    }

    pub fn has(&self, code: DiagnosticCode) -> bool {
        self.items.iter().any(|i| i.code == code)
    }

    pub fn all(&self) -> &[DiagnosticItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Send every item to the `tracing` warn level
    pub fn emit(&self) {
        for item in &self.items {
            tracing::warn!(code = %item.code, subject = %item.subject, "{}", item.message);
        }
    }

    pub fn format_all(&self) -> String {
        let mut output = String::new();

        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }

        if !self.is_empty() {
            output.push_str(&format!("\n{} failed check(s)\n", self.len()));
        }

        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = DiagnosticItem;
    type IntoIter = std::vec::IntoIter<DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a DiagnosticItem;
    type IntoIter = std::slice::Iter<'a, DiagnosticItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
