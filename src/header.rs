//! Versioned file header
//!
//! Every document starts with the same six-node preamble:
//!
//! ```text
//! fileHeader:
//!   headerVersion:1
//!   fileFormat:<format name>
//!   schema:
//!     schemaVersionString:<schema version string>
//!     schemaVersionNum:<schema version number>
//! ```
//!
//! The document body is the header's next sibling. The header's expected
//! content is always derived from the (format, schema) pair it decorates.

use crate::diagnostics::DiagnosticCode;
use crate::error::{ConstructionError, FormatError, Result};
use crate::format_node::{FormatNode, FormatNodeSpec, NONE};
use crate::node::{NodeId, NodeSpec, Relation, Tree};
use crate::schema::Schema;
use crate::verify::{verify_node, RequestSpec, Verification, VerificationRequest};

/// Title of the header root, and the name body rules use in their
/// previous-sibling lists to say "I may follow the header"
pub const HEADER_NAME: &str = "fileHeader";
pub const HEADER_VERSION_TITLE: &str = "headerVersion";
pub const FILE_FORMAT_TITLE: &str = "fileFormat";
pub const SCHEMA_TITLE: &str = "schema";
pub const SCHEMA_VERSION_STRING_TITLE: &str = "schemaVersionString";
pub const SCHEMA_VERSION_NUM_TITLE: &str = "schemaVersionNum";

/// Version of the preamble layout itself
pub const HEADER_VERSION: u32 = 1;

/// Build the six header nodes in `tree` and return the header root
pub fn generate(tree: &mut Tree, format_name: &str, schema: &Schema) -> std::result::Result<NodeId, ConstructionError> {
    let header = tree.leaf(HEADER_NAME, "", 0)?;
    let version = tree.add(
        NodeSpec::new(HEADER_VERSION_TITLE, HEADER_VERSION.to_string(), 1).with(Relation::Parent, header),
    )?;
    let format = tree.add(NodeSpec::new(FILE_FORMAT_TITLE, format_name, 1).with(Relation::PrevSibling, version))?;
    let section = tree.add(NodeSpec::new(SCHEMA_TITLE, "", 1).with(Relation::PrevSibling, format))?;
    let version_string = tree.add(
        NodeSpec::new(SCHEMA_VERSION_STRING_TITLE, schema.version_string(), 2).with(Relation::Parent, section),
    )?;
    tree.add(
        NodeSpec::new(SCHEMA_VERSION_NUM_TITLE, schema.version_num().to_string(), 2)
            .with(Relation::PrevSibling, version_string),
    )?;
    Ok(header)
}

/// Walk to the schema version string leaf. Anything but the header shape
/// is an error.
pub fn extract_schema_version_string(tree: &Tree, header: NodeId) -> Result<String> {
    let leaf = tree
        .child(header)
        .and_then(|version| tree.next_sibling(version))
        .and_then(|format| tree.next_sibling(format))
        .and_then(|section| tree.child(section))
        .ok_or_else(|| FormatError::Header(format!("{} does not have the file header shape", tree[header].describe())))?;

    let node = &tree[leaf];
    if node.title != SCHEMA_VERSION_STRING_TITLE {
        return Err(FormatError::Header(format!(
            "expected '{}' but found {}",
            SCHEMA_VERSION_STRING_TITLE,
            node.describe()
        )));
    }
    Ok(node.data.clone())
}

/// Check the header against what [`generate`] would produce for this pair,
/// and that a body follows it.
pub fn verify(tree: &Tree, header: NodeId, format_name: &str, schema: &Schema) -> Verification {
    let rules = match rules(format_name, schema) {
        Ok(rules) => rules,
        Err(e) => {
            let mut result = Verification::pass();
            result.record(HEADER_NAME, DiagnosticCode::HeaderMismatch, e.to_string());
            return result;
        }
    };
    let [header_rule, version_rule, format_rule, section_rule, string_rule, num_rule] = &rules;

    let version = tree.child(header);
    let format = version.and_then(|n| tree.next_sibling(n));
    let section = format.and_then(|n| tree.next_sibling(n));
    let version_string = section.and_then(|n| tree.child(n));
    let version_num = version_string.and_then(|n| tree.next_sibling(n));

    let checks = [
        (
            Some(header),
            header_rule,
            RequestSpec {
                parent_absent: true,
                prev_sibling_absent: true,
                expected_child: version,
                ..RequestSpec::default()
            },
        ),
        (
            version,
            version_rule,
            RequestSpec {
                expected_parent: Some(header),
                child_absent: true,
                prev_sibling_absent: true,
                expected_next_sibling: format,
                ..RequestSpec::default()
            },
        ),
        (
            format,
            format_rule,
            RequestSpec {
                parent_absent: true,
                child_absent: true,
                expected_prev_sibling: version,
                expected_next_sibling: section,
                ..RequestSpec::default()
            },
        ),
        (
            section,
            section_rule,
            RequestSpec {
                parent_absent: true,
                expected_child: version_string,
                expected_prev_sibling: format,
                next_sibling_absent: true,
                ..RequestSpec::default()
            },
        ),
        (
            version_string,
            string_rule,
            RequestSpec {
                expected_parent: section,
                child_absent: true,
                prev_sibling_absent: true,
                expected_next_sibling: version_num,
                ..RequestSpec::default()
            },
        ),
        (
            version_num,
            num_rule,
            RequestSpec {
                parent_absent: true,
                child_absent: true,
                expected_prev_sibling: version_string,
                next_sibling_absent: true,
                ..RequestSpec::default()
            },
        ),
    ];

    let mut result = Verification::pass();
    for (node, rule, spec) in checks {
        let Some(node) = node else {
            result.record(
                HEADER_NAME,
                DiagnosticCode::HeaderMismatch,
                format!("header is missing its '{}' line", rule.name()),
            );
            continue;
        };
        let outcome = match VerificationRequest::new(RequestSpec {
            node: Some(node),
            format_node: Some(rule),
            ..spec
        }) {
            Ok(request) => verify_node(tree, &request),
            Err(e) => {
                let mut failed = Verification::pass();
                failed.record(HEADER_NAME, DiagnosticCode::HeaderMismatch, e.to_string());
                failed
            }
        };
        result = result.and(outcome);
    }

    if tree.next_sibling(header).is_none() {
        result.record(
            tree[header].describe(),
            DiagnosticCode::MissingBody,
            "header is not followed by a document body",
        );
    }
    result
}

/// One literal rule per preamble node
fn rules(format_name: &str, schema: &Schema) -> std::result::Result<[FormatNode; 6], ConstructionError> {
    let literal = |title: &str, data: &str, level: usize| {
        FormatNode::new(FormatNodeSpec {
            name: Some(title.to_string()),
            title_regex: Some(regex::escape(title)),
            data_regex: Some(regex::escape(data)),
            level: Some(level),
            parent_names: Some(vec![NONE.to_string()]),
            ..FormatNodeSpec::default()
        })
    };
    Ok([
        literal(HEADER_NAME, "", 0)?,
        literal(HEADER_VERSION_TITLE, &HEADER_VERSION.to_string(), 1)?,
        literal(FILE_FORMAT_TITLE, format_name, 1)?,
        literal(SCHEMA_TITLE, "", 1)?,
        literal(SCHEMA_VERSION_STRING_TITLE, schema.version_string(), 2)?,
        literal(SCHEMA_VERSION_NUM_TITLE, &schema.version_num().to_string(), 2)?,
    ])
}
