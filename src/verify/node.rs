//! Single-node verification

use std::borrow::Cow;
use std::path::Path;

use regex::Regex;

use crate::diagnostics::DiagnosticCode;
use crate::error::ConstructionError;
use crate::format_node::{anchored, FormatNode};
use crate::node::{NodeId, Relation, Tree};
use crate::pattern;

use super::Verification;

/// What a request demands of one relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expectation {
    #[default]
    Unconstrained,
    /// The relation must be empty
    Absent,
    /// The relation must be exactly this node
    Exactly(NodeId),
}

/// Raw request, validated by [`VerificationRequest::new`]
#[derive(Debug, Clone, Default)]
pub struct RequestSpec<'a> {
    pub node: Option<NodeId>,
    pub format_node: Option<&'a FormatNode>,
    pub expected_parent: Option<NodeId>,
    pub expected_child: Option<NodeId>,
    pub expected_prev_sibling: Option<NodeId>,
    pub expected_next_sibling: Option<NodeId>,
    pub parent_absent: bool,
    pub child_absent: bool,
    pub prev_sibling_absent: bool,
    pub next_sibling_absent: bool,
    pub path: Option<&'a Path>,
}

impl RequestSpec<'_> {
    fn relation(&self, relation: Relation) -> (Option<NodeId>, bool) {
        match relation {
            Relation::Parent => (self.expected_parent, self.parent_absent),
            Relation::Child => (self.expected_child, self.child_absent),
            Relation::PrevSibling => (self.expected_prev_sibling, self.prev_sibling_absent),
            Relation::NextSibling => (self.expected_next_sibling, self.next_sibling_absent),
        }
    }
}

/// One node checked against one candidate rule
#[derive(Debug, Clone)]
pub struct VerificationRequest<'a> {
    node: NodeId,
    format_node: &'a FormatNode,
    expectations: [Expectation; 4],
    path: Option<&'a Path>,
}

impl<'a> VerificationRequest<'a> {
    pub fn new(spec: RequestSpec<'a>) -> Result<Self, ConstructionError> {
        let mut errors = ConstructionError::new("verification request");
        if spec.node.is_none() {
            errors.push("node is required");
        }
        if spec.format_node.is_none() {
            errors.push("format node is required");
        }

        let mut expectations = [Expectation::Unconstrained; 4];
        for (slot, relation) in expectations.iter_mut().zip(Relation::ALL) {
            *slot = match spec.relation(relation) {
                (Some(_), true) => {
                    errors.push(format!("{} cannot be both expected and absent", relation));
                    Expectation::Unconstrained
                }
                (Some(expected), false) => Expectation::Exactly(expected),
                (None, true) => Expectation::Absent,
                (None, false) => Expectation::Unconstrained,
            };
        }

        match (spec.node, spec.format_node) {
            (Some(node), Some(format_node)) if errors.is_empty() => Ok(Self {
                node,
                format_node,
                expectations,
                path: spec.path,
            }),
            _ => Err(errors),
        }
    }

    /// Request used while walking a document: a relation is required to be
    /// absent exactly when the rule allows nothing but the sentinel there.
    pub fn for_rule(node: NodeId, format_node: &'a FormatNode, path: Option<&'a Path>) -> Self {
        let mut expectations = [Expectation::Unconstrained; 4];
        for (slot, relation) in expectations.iter_mut().zip(Relation::ALL) {
            if format_node.forbids(relation) {
                *slot = Expectation::Absent;
            }
        }
        Self {
            node,
            format_node,
            expectations,
            path,
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn format_node(&self) -> &FormatNode {
        self.format_node
    }

    pub fn expectation(&self, relation: Relation) -> Expectation {
        self.expectations[relation_index(relation)]
    }
}

fn relation_index(relation: Relation) -> usize {
    match relation {
        Relation::Parent => 0,
        Relation::Child => 1,
        Relation::PrevSibling => 2,
        Relation::NextSibling => 3,
    }
}

/// Check every constraint of `request`; each failure is its own diagnostic.
pub fn verify_node(tree: &Tree, request: &VerificationRequest<'_>) -> Verification {
    let mut result = Verification::pass();
    let node = &tree[request.node];
    let rule = request.format_node;
    let subject = node.describe();

    match title_matcher(rule, request.path) {
        Ok(matcher) => {
            if !matcher.is_match(&node.title) {
                result.record(
                    &subject,
                    DiagnosticCode::TitleMismatch,
                    format!(
                        "title '{}' does not match /{}/ of '{}'",
                        node.title,
                        matcher.as_str(),
                        rule.name()
                    ),
                );
            }
        }
        Err(e) => result.record(
            &subject,
            DiagnosticCode::InvalidPattern,
            format!("title pattern of '{}' is invalid for this path: {}", rule.name(), e),
        ),
    }

    if !rule.data_matcher().is_match(&node.data) {
        result.record(
            &subject,
            DiagnosticCode::DataMismatch,
            format!(
                "data {:?} does not match /{}/ of '{}'",
                node.data,
                rule.data_regex(),
                rule.name()
            ),
        );
    }

    if node.level != rule.level() {
        result.record(
            &subject,
            DiagnosticCode::LevelMismatch,
            format!(
                "level {} expected by '{}', found {}",
                rule.level(),
                rule.name(),
                node.level
            ),
        );
    }

    for relation in Relation::ALL {
        let actual = node.link(relation);
        match request.expectation(relation) {
            Expectation::Unconstrained => {}
            Expectation::Absent => {
                if let Some(found) = actual {
                    result.record(
                        &subject,
                        DiagnosticCode::UnexpectedNeighbor,
                        format!(
                            "'{}' allows no {} but found {}",
                            rule.name(),
                            relation,
                            tree[found].describe()
                        ),
                    );
                }
            }
            Expectation::Exactly(expected) => {
                if actual != Some(expected) {
                    let found = actual
                        .map(|n| tree[n].describe())
                        .unwrap_or_else(|| "nothing".to_string());
                    result.record(
                        &subject,
                        DiagnosticCode::NeighborMismatch,
                        format!(
                            "{} should be {} but found {}",
                            relation,
                            tree[expected].describe(),
                            found
                        ),
                    );
                }
            }
        }
    }

    result
}

fn title_matcher<'r>(rule: &'r FormatNode, path: Option<&Path>) -> Result<Cow<'r, Regex>, regex::Error> {
    let file_name = path.and_then(|p| p.file_name()).and_then(|n| n.to_str());
    match file_name {
        Some(file_name) if pattern::has_path_placeholder(rule.title_regex()) => {
            let substituted = pattern::substitute_path(rule.title_regex(), file_name);
            anchored(&substituted).map(Cow::Owned)
        }
        _ => Ok(Cow::Borrowed(rule.title_matcher())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_node::FormatNodeSpec;
    use crate::node::NodeSpec;

    fn some_rule() -> FormatNode {
        FormatNode::new(FormatNodeSpec {
            name: Some("some".to_string()),
            title_regex: Some("some title".to_string()),
            data_regex: Some("some data".to_string()),
            level: Some(0),
            ..FormatNodeSpec::default()
        })
        .unwrap()
    }

    fn check(tree: &Tree, node: NodeId, rule: &FormatNode) -> Verification {
        verify_node(tree, &VerificationRequest::for_rule(node, rule, None))
    }

    #[test]
    fn test_accepts_exact_node() {
        let rule = some_rule();
        let mut tree = Tree::new();
        let node = tree.leaf("some title", "some data", 0).unwrap();
        assert!(check(&tree, node, &rule).passed());
    }

    #[test]
    fn test_rejects_any_single_change() {
        let rule = some_rule();
        let mut tree = Tree::new();

        let title = tree.leaf("other title", "some data", 0).unwrap();
        let data = tree.leaf("some title", "other data", 0).unwrap();
        let level = tree.leaf("some title", "some data", 1).unwrap();

        for (node, code) in [
            (title, DiagnosticCode::TitleMismatch),
            (data, DiagnosticCode::DataMismatch),
            (level, DiagnosticCode::LevelMismatch),
        ] {
            let result = check(&tree, node, &rule);
            assert!(!result.passed());
            assert_eq!(result.diagnostics().len(), 1);
            assert!(result.diagnostics().has(code));
        }
    }

    #[test]
    fn test_rejects_any_present_neighbor() {
        let rule = some_rule();

        let mut tree = Tree::new();
        let node = tree.leaf("some title", "some data", 0).unwrap();
        tree.add(NodeSpec::new("kid", "", 1).with(Relation::Parent, node)).unwrap();
        assert!(!check(&tree, node, &rule).passed());

        let mut tree = Tree::new();
        let node = tree.leaf("some title", "some data", 0).unwrap();
        tree.add(NodeSpec::new("after", "", 0).with(Relation::PrevSibling, node)).unwrap();
        assert!(!check(&tree, node, &rule).passed());

        let mut tree = Tree::new();
        let before = tree.leaf("before", "", 0).unwrap();
        let node = tree
            .add(NodeSpec::new("some title", "some data", 0).with(Relation::PrevSibling, before))
            .unwrap();
        assert!(!check(&tree, node, &rule).passed());

        let deep_rule = FormatNode::new(FormatNodeSpec {
            level: Some(1),
            ..FormatNodeSpec {
                name: Some("deep".to_string()),
                title_regex: Some("some title".to_string()),
                data_regex: Some("some data".to_string()),
                ..FormatNodeSpec::default()
            }
        })
        .unwrap();
        let mut tree = Tree::new();
        let parent = tree.leaf("top", "", 0).unwrap();
        let node = tree
            .add(NodeSpec::new("some title", "some data", 1).with(Relation::Parent, parent))
            .unwrap();
        let result = check(&tree, node, &deep_rule);
        assert!(!result.passed());
        assert!(result.diagnostics().has(DiagnosticCode::UnexpectedNeighbor));
    }

    #[test]
    fn test_every_failure_is_reported() {
        let rule = some_rule();
        let mut tree = Tree::new();
        let node = tree.leaf("x", "y", 2).unwrap();
        let result = check(&tree, node, &rule);
        assert_eq!(result.diagnostics().len(), 3);
    }

    #[test]
    fn test_expected_neighbor_identity() {
        let rule = some_rule();
        let mut tree = Tree::new();
        let node = tree.leaf("some title", "some data", 0).unwrap();
        let next = tree.add(NodeSpec::new("n", "", 0).with(Relation::PrevSibling, node)).unwrap();
        let stranger = tree.leaf("n", "", 0).unwrap();

        let request = |expected| {
            VerificationRequest::new(RequestSpec {
                node: Some(node),
                format_node: Some(&rule),
                expected_next_sibling: Some(expected),
                ..RequestSpec::default()
            })
            .unwrap()
        };
        assert!(verify_node(&tree, &request(next)).passed());

        let result = verify_node(&tree, &request(stranger));
        assert!(result.diagnostics().has(DiagnosticCode::NeighborMismatch));
    }

    #[test]
    fn test_request_rejects_absent_and_expected() {
        let rule = some_rule();
        let mut tree = Tree::new();
        let node = tree.leaf("some title", "some data", 0).unwrap();

        let err = VerificationRequest::new(RequestSpec {
            node: Some(node),
            format_node: Some(&rule),
            expected_child: Some(node),
            child_absent: true,
            expected_parent: Some(node),
            parent_absent: true,
            ..RequestSpec::default()
        })
        .unwrap_err();
        assert_eq!(err.violations.len(), 2);

        let err = VerificationRequest::new(RequestSpec::default()).unwrap_err();
        assert!(err.contains("node is required"));
        assert!(err.contains("format node is required"));
    }

    #[test]
    fn test_title_uses_path_placeholders() {
        let rule = FormatNode::new(FormatNodeSpec {
            name: Some("named".to_string()),
            title_format: Some("<filetitle>".to_string()),
            data_format: Some("<text>".to_string()),
            level: Some(0),
            ..FormatNodeSpec::default()
        })
        .unwrap();
        let mut tree = Tree::new();
        let node = tree.leaf("notes", "anything", 0).unwrap();

        let path = Path::new("/tmp/notes.cfg");
        assert!(verify_node(&tree, &VerificationRequest::for_rule(node, &rule, Some(path))).passed());

        let other = Path::new("/tmp/other.cfg");
        assert!(!verify_node(&tree, &VerificationRequest::for_rule(node, &rule, Some(other))).passed());
    }
}
