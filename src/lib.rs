//! Treefile
//!
//! Self-describing hierarchical text files. A document is a tree of
//! `title:data` lines, indented two spaces per level, preceded by a header
//! that names its format and schema version. Schemas describe which nodes may
//! appear where, and every load and save is verified against them.
//!
//! ## Features
//!
//! - **Line Codec**: Lossless parsing and serialization of the indented format
//! - **Pattern Templates**: Compact `<text>` / `<#>` templates for node content
//! - **Format Nodes**: Per-node rules for content, level and neighbors
//! - **Versioned Schemas**: Several schema versions per file format
//! - **Diagnostics**: Every failed check is reported, not just the first
//!
//! ## File Layout
//!
//! ```text
//! fileHeader:
//!   headerVersion:1
//!   fileFormat:groceries
//!   schema:
//!     schemaVersionString:1.0
//!     schemaVersionNum:1
//! list:weekly
//!   item:eggs
//!   item:milk
//! ```

pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod format;
pub mod format_node;
pub mod header;
pub mod node;
pub mod pattern;
pub mod schema;
pub mod storage;
pub mod verify;

pub use config::TreefileConfig;
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
pub use error::{ConstructionError, FormatError, ParseError, Result};
pub use format::{Document, FileFormat};
pub use format_node::{FormatNode, FormatNodeSpec, NONE};
pub use node::{Node, NodeId, NodeSpec, Relation, Tree};
pub use pattern::{regex_to_template, template_to_regex};
pub use schema::{Schema, SchemaSpec};
pub use storage::{FsStorage, Storage};
pub use verify::{verify_node, verify_tree, Expectation, RequestSpec, Verification, VerificationRequest};
