//! Format nodes
//!
//! A [`FormatNode`] is one named rule of a schema: which titles and data a
//! node may carry, at what level, and which rules its four neighbors must
//! follow. Rules are immutable; they are built from a plain
//! [`FormatNodeSpec`] by [`FormatNode::new`], which reports every problem at
//! once.

use regex::Regex;

use crate::codec;
use crate::error::ConstructionError;
use crate::node::{NodeId, NodeSpec, Relation, Tree};
use crate::pattern;

/// Neighbor name meaning "this relation must be absent"
pub const NONE: &str = "<none>";

const ROOT_TITLE: &str = "formatNode";
const TITLE: &str = "title";
const DATA: &str = "data";
const LEVEL: &str = "level";
const PARENTS: &str = "parents";
const CHILDREN: &str = "children";
const PREV_SIBLINGS: &str = "prevSiblings";
const NEXT_SIBLINGS: &str = "nextSiblings";

const CANONICAL_FIELDS: [&str; 7] = [TITLE, DATA, LEVEL, PARENTS, CHILDREN, PREV_SIBLINGS, NEXT_SIBLINGS];

/// Raw description of a format node, validated by [`FormatNode::new`].
///
/// Either set `canonical` alone, or set `name`, one of
/// `title_regex`/`title_format`, one of `data_regex`/`data_format`, `level`
/// and optionally the neighbor lists (which default to `[NONE]`).
#[derive(Debug, Clone, Default)]
pub struct FormatNodeSpec {
    pub canonical: Option<String>,
    pub name: Option<String>,
    pub title_regex: Option<String>,
    pub title_format: Option<String>,
    pub data_regex: Option<String>,
    pub data_format: Option<String>,
    pub level: Option<usize>,
    pub parent_names: Option<Vec<String>>,
    pub child_names: Option<Vec<String>>,
    pub prev_sibling_names: Option<Vec<String>>,
    pub next_sibling_names: Option<Vec<String>>,
}

impl FormatNodeSpec {
    pub fn canonical(text: impl Into<String>) -> Self {
        Self {
            canonical: Some(text.into()),
            ..Self::default()
        }
    }

    /// Names of the individual fields that are set
    fn individual_fields(&self) -> Vec<&'static str> {
        let fields = [
            ("name", self.name.is_some()),
            ("title regex", self.title_regex.is_some()),
            ("title format", self.title_format.is_some()),
            ("data regex", self.data_regex.is_some()),
            ("data format", self.data_format.is_some()),
            ("level", self.level.is_some()),
            ("parent names", self.parent_names.is_some()),
            ("child names", self.child_names.is_some()),
            ("previous sibling names", self.prev_sibling_names.is_some()),
            ("next sibling names", self.next_sibling_names.is_some()),
        ];
        fields.into_iter().filter(|(_, set)| *set).map(|(f, _)| f).collect()
    }
}

/// A validated schema rule
#[derive(Debug, Clone)]
pub struct FormatNode {
    name: String,
    title_regex: String,
    data_regex: String,
    level: usize,
    parent_names: Vec<String>,
    child_names: Vec<String>,
    prev_sibling_names: Vec<String>,
    next_sibling_names: Vec<String>,
    title_matcher: Regex,
    data_matcher: Regex,
}

impl PartialEq for FormatNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.title_regex == other.title_regex
            && self.data_regex == other.data_regex
            && self.level == other.level
            && self.parent_names == other.parent_names
            && self.child_names == other.child_names
            && self.prev_sibling_names == other.prev_sibling_names
            && self.next_sibling_names == other.next_sibling_names
    }
}

impl Eq for FormatNode {}

impl FormatNode {
    pub fn new(spec: FormatNodeSpec) -> Result<Self, ConstructionError> {
        let mut errors = ConstructionError::new("format node");

        if let Some(canonical) = &spec.canonical {
            for field in spec.individual_fields() {
                errors.push(format!("canonical form cannot be combined with {}", field));
            }
            errors.into_result(())?;
            return Self::parse_canonical(canonical);
        }

        let name = match spec.name {
            None => {
                errors.push("name is required");
                None
            }
            Some(name) => {
                check_name("name", &name, &mut errors);
                Some(name)
            }
        };
        let title_regex = pick_pattern("title", spec.title_regex, spec.title_format, &mut errors);
        let data_regex = pick_pattern("data", spec.data_regex, spec.data_format, &mut errors);
        if spec.level.is_none() {
            errors.push("level is required");
        }

        let parent_names = neighbor_names("parent", spec.parent_names, &mut errors);
        let child_names = neighbor_names("child", spec.child_names, &mut errors);
        let prev_sibling_names = neighbor_names("previous sibling", spec.prev_sibling_names, &mut errors);
        let next_sibling_names = neighbor_names("next sibling", spec.next_sibling_names, &mut errors);

        let title_matcher = title_regex.as_deref().and_then(|r| compile("title", r, &mut errors));
        let data_matcher = data_regex.as_deref().and_then(|r| compile("data", r, &mut errors));

        match (name, title_regex, data_regex, spec.level, title_matcher, data_matcher) {
            (Some(name), Some(title_regex), Some(data_regex), Some(level), Some(title_matcher), Some(data_matcher))
                if errors.is_empty() =>
            {
                Ok(Self {
                    name,
                    title_regex,
                    data_regex,
                    level,
                    parent_names,
                    child_names,
                    prev_sibling_names,
                    next_sibling_names,
                    title_matcher,
                    data_matcher,
                })
            }
            _ => Err(errors),
        }
    }

    /// Build from the eight-line canonical text form
    pub fn parse_canonical(text: &str) -> Result<Self, ConstructionError> {
        let (tree, root) = codec::parse_str(text).map_err(|e| {
            let mut errors = ConstructionError::new("format node");
            errors.push(format!("canonical form does not parse: {}", e));
            errors
        })?;
        let mut errors = ConstructionError::new("format node");
        if tree.next_sibling(root).is_some() {
            errors.push("canonical form must contain exactly one format node");
        }
        match Self::from_node(&tree, root) {
            Ok(node) => errors.into_result(node),
            Err(e) => {
                errors.extend(e);
                Err(errors)
            }
        }
    }

    /// Read the canonical layout rooted at `id`, at whatever level it sits
    pub fn from_node(tree: &Tree, id: NodeId) -> Result<Self, ConstructionError> {
        let mut errors = ConstructionError::new("format node");
        let root = &tree[id];
        if root.title != ROOT_TITLE {
            errors.push(format!("expected '{}' but found '{}'", ROOT_TITLE, root.title));
        }
        for child in tree.children(id) {
            let title = tree[child].title.as_str();
            if !CANONICAL_FIELDS.contains(&title) {
                errors.push(format!("unexpected field '{}' in format node '{}'", title, root.data));
            }
        }

        let mut field = |title: &str| match tree.find_child(id, title) {
            Some(child) => Some(tree[child].data.clone()),
            None => {
                errors.push(format!("format node '{}' is missing its '{}' line", root.data, title));
                None
            }
        };
        let title_regex = field(TITLE);
        let data_regex = field(DATA);
        let level = field(LEVEL);
        let parents = field(PARENTS);
        let children = field(CHILDREN);
        let prev_siblings = field(PREV_SIBLINGS);
        let next_siblings = field(NEXT_SIBLINGS);

        let level = level.and_then(|raw| match raw.trim().parse::<usize>() {
            Ok(level) => Some(level),
            Err(_) => {
                errors.push(format!("level {:?} is not a non-negative integer", raw));
                None
            }
        });

        // Fields already reported above get neutral stand-ins so the
        // remaining checks still run.
        let built = Self::new(FormatNodeSpec {
            name: Some(root.data.clone()),
            title_regex: Some(title_regex.unwrap_or_default()),
            data_regex: Some(data_regex.unwrap_or_default()),
            level: Some(level.unwrap_or_default()),
            parent_names: parents.map(|n| split_names(&n)),
            child_names: children.map(|n| split_names(&n)),
            prev_sibling_names: prev_siblings.map(|n| split_names(&n)),
            next_sibling_names: next_siblings.map(|n| split_names(&n)),
            ..FormatNodeSpec::default()
        });
        match built {
            Ok(node) => errors.into_result(node),
            Err(e) => {
                errors.extend(e);
                Err(errors)
            }
        }
    }

    /// Append this rule's canonical layout to `tree` at `level`
    pub fn write_into(&self, tree: &mut Tree, level: usize) -> Result<NodeId, ConstructionError> {
        let root = tree.leaf(ROOT_TITLE, self.name.as_str(), level)?;
        let fields = [
            (TITLE, self.title_regex.clone()),
            (DATA, self.data_regex.clone()),
            (LEVEL, self.level.to_string()),
            (PARENTS, self.parent_names.join(",")),
            (CHILDREN, self.child_names.join(",")),
            (PREV_SIBLINGS, self.prev_sibling_names.join(",")),
            (NEXT_SIBLINGS, self.next_sibling_names.join(",")),
        ];
        let mut previous: Option<NodeId> = None;
        for (title, data) in fields {
            let spec = NodeSpec::new(title, data, level + 1);
            let spec = match previous {
                Some(prev) => spec.with(Relation::PrevSibling, prev),
                None => spec.with(Relation::Parent, root),
            };
            previous = Some(tree.add(spec)?);
        }
        Ok(root)
    }

    /// Render the eight-line canonical text form
    pub fn to_canonical(&self) -> Result<String, ConstructionError> {
        let mut tree = Tree::new();
        let root = self.write_into(&mut tree, 0)?;
        Ok(codec::serialize_subtree(&tree, root))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title_regex(&self) -> &str {
        &self.title_regex
    }

    pub fn data_regex(&self) -> &str {
        &self.data_regex
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn parent_names(&self) -> &[String] {
        &self.parent_names
    }

    pub fn child_names(&self) -> &[String] {
        &self.child_names
    }

    pub fn prev_sibling_names(&self) -> &[String] {
        &self.prev_sibling_names
    }

    pub fn next_sibling_names(&self) -> &[String] {
        &self.next_sibling_names
    }

    pub fn names(&self, relation: Relation) -> &[String] {
        match relation {
            Relation::Parent => &self.parent_names,
            Relation::Child => &self.child_names,
            Relation::PrevSibling => &self.prev_sibling_names,
            Relation::NextSibling => &self.next_sibling_names,
        }
    }

    /// True when the only allowed neighbor for `relation` is [`NONE`]
    pub fn forbids(&self, relation: Relation) -> bool {
        self.names(relation).iter().all(|n| n == NONE)
    }

    pub fn title_matcher(&self) -> &Regex {
        &self.title_matcher
    }

    pub fn data_matcher(&self) -> &Regex {
        &self.data_matcher
    }
}

/// Anchor a pattern so it has to match the whole value
pub(crate) fn anchored(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

fn compile(what: &str, pattern: &str, errors: &mut ConstructionError) -> Option<Regex> {
    match anchored(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            errors.push(format!("{} regex {:?} does not compile: {}", what, pattern, e));
            None
        }
    }
}

fn pick_pattern(
    what: &str,
    regex: Option<String>,
    format: Option<String>,
    errors: &mut ConstructionError,
) -> Option<String> {
    match (regex, format) {
        (Some(_), Some(_)) => {
            errors.push(format!("{} regex and {} format are mutually exclusive", what, what));
            None
        }
        (None, None) => {
            errors.push(format!("one of {} regex or {} format is required", what, what));
            None
        }
        (Some(regex), None) => Some(regex),
        (None, Some(format)) => Some(pattern::template_to_regex(&format)),
    }
}

fn neighbor_names(what: &str, names: Option<Vec<String>>, errors: &mut ConstructionError) -> Vec<String> {
    let names = names.unwrap_or_else(|| vec![NONE.to_string()]);
    if names.is_empty() {
        errors.push(format!("{} names may not be empty; use {} for no neighbor", what, NONE));
    }
    for name in &names {
        if name != NONE {
            check_name(&format!("{} name", what), name, errors);
        }
    }
    names
}

fn check_name(what: &str, name: &str, errors: &mut ConstructionError) {
    if name.trim().is_empty() {
        errors.push(format!("{} may not be blank", what));
    } else if name.contains(',') || name.contains('\n') {
        errors.push(format!("{} {:?} may not contain ',' or a line break", what, name));
    } else if name == NONE {
        errors.push(format!("{} may not be the reserved {}", what, NONE));
    }
}

fn split_names(raw: &str) -> Vec<String> {
    raw.split(',').map(|n| n.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::INDENT;

    /// Indented canonical text, handy for hand-written fixtures
    fn canonical_text(name: &str, lines: &[(&str, &str)]) -> String {
        let mut text = format!("{}:{}", ROOT_TITLE, name);
        for (title, data) in lines {
            text.push('\n');
            text.push_str(INDENT);
            text.push_str(title);
            text.push(':');
            text.push_str(data);
        }
        text
    }

    fn simple_spec() -> FormatNodeSpec {
        FormatNodeSpec {
            name: Some("simple".to_string()),
            title_regex: Some("some title".to_string()),
            data_regex: Some("some data".to_string()),
            level: Some(0),
            ..FormatNodeSpec::default()
        }
    }

    #[test]
    fn test_defaults_to_no_neighbors() {
        let node = FormatNode::new(simple_spec()).unwrap();
        for relation in Relation::ALL {
            assert_eq!(node.names(relation), &[NONE.to_string()]);
            assert!(node.forbids(relation));
        }
    }

    #[test]
    fn test_formats_compile_to_regex() {
        let node = FormatNode::new(FormatNodeSpec {
            name: Some("flag".to_string()),
            title_format: Some("enabled".to_string()),
            data_format: Some("<boolean>".to_string()),
            level: Some(1),
            ..FormatNodeSpec::default()
        })
        .unwrap();
        assert_eq!(node.data_regex(), "(true|false)");
        assert!(node.data_matcher().is_match("true"));
        assert!(!node.data_matcher().is_match("truer"));
    }

    #[test]
    fn test_all_violations_reported() {
        let err = FormatNode::new(FormatNodeSpec {
            title_regex: Some("a".to_string()),
            title_format: Some("a".to_string()),
            child_names: Some(Vec::new()),
            ..FormatNodeSpec::default()
        })
        .unwrap_err();

        assert!(err.contains("name is required"));
        assert!(err.contains("title regex and title format are mutually exclusive"));
        assert!(err.contains("one of data regex or data format is required"));
        assert!(err.contains("level is required"));
        assert!(err.contains("child names may not be empty"));
        assert_eq!(err.violations.len(), 5);
    }

    #[test]
    fn test_bad_regex_is_a_construction_error() {
        let err = FormatNode::new(FormatNodeSpec {
            data_regex: Some("(unclosed".to_string()),
            ..simple_spec()
        })
        .unwrap_err();
        assert!(err.contains("data regex"));
    }

    #[test]
    fn test_canonical_excludes_individual_fields() {
        let err = FormatNode::new(FormatNodeSpec {
            canonical: Some("formatNode:x".to_string()),
            name: Some("x".to_string()),
            level: Some(0),
            ..FormatNodeSpec::default()
        })
        .unwrap_err();
        assert!(err.contains("combined with name"));
        assert!(err.contains("combined with level"));
    }

    #[test]
    fn test_canonical_round_trip() {
        let node = FormatNode::new(FormatNodeSpec {
            name: Some("entry".to_string()),
            title_format: Some("entry".to_string()),
            data_format: Some("[$<#>]<Boolean>".to_string()),
            level: Some(1),
            parent_names: Some(vec!["list".to_string(), NONE.to_string()]),
            prev_sibling_names: Some(vec!["entry".to_string(), NONE.to_string()]),
            next_sibling_names: Some(vec!["entry".to_string(), NONE.to_string()]),
            ..FormatNodeSpec::default()
        })
        .unwrap();

        let text = node.to_canonical().unwrap();
        assert_eq!(text.lines().count(), 8);
        // the data regex starts with '(' and must survive the codec
        assert!(text.contains("  data:\\(\\$"));

        let back = FormatNode::new(FormatNodeSpec::canonical(text)).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_canonical_missing_fields() {
        let text = canonical_text("broken", &[("title", "x"), ("level", "one")]);
        let err = FormatNode::parse_canonical(&text).unwrap_err();
        assert!(err.contains("missing its 'data' line"));
        assert!(err.contains("missing its 'parents' line"));
        assert!(err.contains("not a non-negative integer"));
        assert!(!err.contains("level is required"));
    }

    #[test]
    fn test_canonical_missing_line_and_bad_regex_reported_together() {
        let text = canonical_text(
            "broken",
            &[
                ("title", "[unclosed"),
                ("level", "0"),
                ("parents", NONE),
                ("children", "a,,b"),
                ("prevSiblings", NONE),
                ("nextSiblings", NONE),
            ],
        );
        let err = FormatNode::parse_canonical(&text).unwrap_err();
        assert!(err.contains("missing its 'data' line"));
        assert!(err.contains("title regex \"[unclosed\" does not compile"));
        assert!(err.contains("child name may not be blank"));
        assert_eq!(err.violations.len(), 3);
    }
}
