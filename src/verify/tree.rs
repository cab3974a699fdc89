//! Whole-document verification
//!
//! Identity matching is greedy: each node takes the first candidate name
//! (in list order) whose rule accepts it, and that choice is never revisited.
//! A document can therefore be rejected when an earlier candidate accepts a
//! node that only a later candidate would have let the rest of the tree
//! pass. Schemas rely on this order, so it is kept as is.

use std::path::Path;

use tracing::debug;

use crate::diagnostics::{DiagnosticCode, DiagnosticItem};
use crate::format_node::{FormatNode, NONE};
use crate::header;
use crate::node::{NodeId, Relation, Tree};
use crate::schema::Schema;

use super::node::{verify_node, VerificationRequest};
use super::Verification;

/// Verify a full document: `root` is the file header, the body is its next
/// sibling. The outcome also covers the file extension and the header.
/// Every failed check is logged at warn level.
pub fn verify_tree(tree: &Tree, root: NodeId, format_name: &str, schema: &Schema, path: &Path) -> Verification {
    let walker = Walker { tree, schema, path };

    let heads = schema.head_names();
    let body = walker.check_chain(tree.next_sibling(root), &heads, Slot::AfterHeader);

    let mut extension = Verification::pass();
    if !schema.matches_extension(path) {
        extension.record(
            path.display().to_string(),
            DiagnosticCode::ExtensionMismatch,
            format!(
                "file extension must be '{}' (case-insensitive)",
                schema.file_extension()
            ),
        );
    }

    let preamble = header::verify(tree, root, format_name, schema);

    let result = body.and(extension).and(preamble);
    result.diagnostics().emit();
    debug!(
        path = %path.display(),
        passed = result.passed(),
        failures = result.diagnostics().len(),
        "verified document"
    );
    result
}

/// Where a node under inspection sits, for diagnostics
#[derive(Clone, Copy)]
enum Slot<'a> {
    AfterHeader,
    Neighbor(&'a FormatNode, NodeId, Relation),
}

impl Slot<'_> {
    fn describe(&self, tree: &Tree) -> String {
        match self {
            Slot::AfterHeader => "the document body".to_string(),
            Slot::Neighbor(rule, owner, relation) => {
                format!("{} of {} ('{}')", relation, tree[*owner].describe(), rule.name())
            }
        }
    }
}

struct Walker<'a> {
    tree: &'a Tree,
    schema: &'a Schema,
    path: &'a Path,
}

impl<'a> Walker<'a> {
    /// Check `first` and the sibling chain that follows it. Children recurse;
    /// siblings are walked in a loop, each against the previous match's
    /// next-sibling names.
    fn check_chain(&self, first: Option<NodeId>, allowed: &[String], slot: Slot<'_>) -> Verification {
        let mut result = Verification::pass();
        let mut current = first;
        let mut allowed: Vec<String> = allowed.to_vec();
        let mut slot_text = slot.describe(self.tree);

        loop {
            let Some(id) = current else {
                if !allowed.iter().any(|n| n == NONE) {
                    result.record(
                        slot_text,
                        DiagnosticCode::MissingNode,
                        format!("expected one of [{}] but found nothing", allowed.join(", ")),
                    );
                }
                return result;
            };

            let Some(rule) = self.identify(id, &allowed, &slot_text, &mut result) else {
                return result;
            };

            let children = self.check_chain(
                self.tree.child(id),
                rule.child_names(),
                Slot::Neighbor(rule, id, Relation::Child),
            );
            result = result.and(children);

            slot_text = Slot::Neighbor(rule, id, Relation::NextSibling).describe(self.tree);
            allowed = rule.next_sibling_names().to_vec();
            current = self.tree.next_sibling(id);
        }
    }

    /// First candidate whose rule accepts `id`; records why all failed otherwise.
    fn identify(&self, id: NodeId, allowed: &[String], slot: &str, result: &mut Verification) -> Option<&'a FormatNode> {
        let schema: &'a Schema = self.schema;
        let node = &self.tree[id];
        let mut rejections = Vec::new();

        for name in allowed.iter().filter(|n| n.as_str() != NONE) {
            let Some(rule) = schema.get(name) else {
                result.record(
                    node.describe(),
                    DiagnosticCode::UnknownFormatNode,
                    format!("'{}' is not defined by schema {}", name, schema.version_string()),
                );
                continue;
            };
            let request = VerificationRequest::for_rule(id, rule, Some(self.path));
            let outcome = verify_node(self.tree, &request);
            if outcome.passed() {
                debug!(node = %node.describe(), format_node = rule.name(), "identified node");
                return Some(rule);
            }
            rejections.push(format!("{}: {}", rule.name(), outcome.summary()));
        }

        let message = if rejections.is_empty() {
            format!("nothing may appear as {}", slot)
        } else {
            format!("no format node accepts it as {}", slot)
        };
        let item = rejections
            .into_iter()
            .fold(
                DiagnosticItem::new(node.describe(), DiagnosticCode::NoMatchingFormat, message),
                |item, why| item.with_context(why),
            );
        result.record_item(item);
        None
    }
}
