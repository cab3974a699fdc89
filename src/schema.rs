//! Schemas
//!
//! A schema is one version of a file format: a version string and number,
//! the file extension documents must carry, and the ordered set of
//! [`FormatNode`] rules a document body is checked against.

use std::collections::HashMap;
use std::path::Path;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::codec;
use crate::error::ConstructionError;
use crate::format_node::{FormatNode, NONE};
use crate::header::HEADER_NAME;
use crate::node::{NodeId, NodeSpec, Relation, Tree};

const ROOT_TITLE: &str = "schema";
const VERSION_NUM: &str = "versionNum";
const FILE_EXTENSION: &str = "fileExtension";
const FORMAT_NODE: &str = "formatNode";

/// Raw description of a schema, validated by [`Schema::new`]
#[derive(Debug, Clone, Default)]
pub struct SchemaSpec {
    pub version_string: Option<String>,
    pub version_num: Option<u32>,
    pub file_extension: Option<String>,
    pub format_nodes: Vec<FormatNode>,
}

/// A single, immutable schema version
#[derive(Debug, Clone)]
pub struct Schema {
    version_string: String,
    version_num: u32,
    file_extension: String,
    format_nodes: Vec<FormatNode>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Validate and build a schema.
    ///
    /// Besides missing fields and duplicate names, every neighbor name must
    /// resolve to a format node of this schema (or be [`NONE`]); previous
    /// sibling lists may also name the file header.
    pub fn new(spec: SchemaSpec) -> Result<Self, ConstructionError> {
        let mut errors = ConstructionError::new("schema");

        let version_string = spec.version_string.unwrap_or_default();
        if version_string.trim().is_empty() {
            errors.push("version string is required");
        } else if version_string.contains('\n') {
            errors.push("version string may not contain a line break");
        }
        if spec.version_num.is_none() {
            errors.push("version number is required");
        }
        let file_extension = spec
            .file_extension
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or_default();
        if file_extension.is_empty() {
            errors.push("file extension is required");
        }

        let mut index = HashMap::new();
        for (position, node) in spec.format_nodes.iter().enumerate() {
            if node.name() == HEADER_NAME {
                errors.push(format!("format node name '{}' is reserved for the file header", HEADER_NAME));
            }
            if index.insert(node.name().to_string(), position).is_some() {
                errors.push(format!("format node '{}' is defined more than once", node.name()));
            }
        }

        for node in &spec.format_nodes {
            for relation in Relation::ALL {
                for name in node.names(relation) {
                    let resolves = name == NONE
                        || index.contains_key(name)
                        || (relation == Relation::PrevSibling && name == HEADER_NAME);
                    if !resolves {
                        errors.push(unresolved(node.name(), relation, name, &index));
                    }
                }
            }
        }

        errors.into_result(())?;
        Ok(Self {
            version_string,
            version_num: spec.version_num.unwrap_or_default(),
            file_extension,
            format_nodes: spec.format_nodes,
            index,
        })
    }

    pub fn version_string(&self) -> &str {
        &self.version_string
    }

    pub fn version_num(&self) -> u32 {
        self.version_num
    }

    pub fn file_extension(&self) -> &str {
        &self.file_extension
    }

    pub fn format_nodes(&self) -> &[FormatNode] {
        &self.format_nodes
    }

    /// Look up a format node by name
    pub fn get(&self, name: &str) -> Option<&FormatNode> {
        self.index.get(name).map(|&i| &self.format_nodes[i])
    }

    /// Names of the format nodes allowed to follow the file header
    pub fn head_names(&self) -> Vec<String> {
        self.format_nodes
            .iter()
            .filter(|n| n.prev_sibling_names().iter().any(|p| p == HEADER_NAME))
            .map(|n| n.name().to_string())
            .collect()
    }

    /// Case-insensitive comparison of `path`'s extension with ours
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case(&self.file_extension))
            .unwrap_or(false)
    }

    /// Read a schema definition written in the line format
    pub fn parse_text(text: &str) -> Result<Self, ConstructionError> {
        let (tree, root) = codec::parse_str(text).map_err(|e| {
            let mut errors = ConstructionError::new("schema");
            errors.push(format!("schema definition does not parse: {}", e));
            errors
        })?;
        Self::from_node(&tree, root)
    }

    pub fn from_node(tree: &Tree, id: NodeId) -> Result<Self, ConstructionError> {
        let mut errors = ConstructionError::new("schema");
        let root = &tree[id];
        if root.title != ROOT_TITLE {
            errors.push(format!("expected '{}' but found '{}'", ROOT_TITLE, root.title));
        }

        let mut spec = SchemaSpec {
            version_string: Some(root.data.clone()),
            ..SchemaSpec::default()
        };
        for child in tree.children(id) {
            let node = &tree[child];
            match node.title.as_str() {
                VERSION_NUM => match node.data.trim().parse::<u32>() {
                    Ok(num) => spec.version_num = Some(num),
                    Err(_) => errors.push(format!("version number {:?} is not an integer", node.data)),
                },
                FILE_EXTENSION => spec.file_extension = Some(node.data.clone()),
                FORMAT_NODE => match FormatNode::from_node(tree, child) {
                    Ok(format_node) => spec.format_nodes.push(format_node),
                    Err(e) => errors.extend(e),
                },
                other => errors.push(format!("unexpected field '{}' in schema", other)),
            }
        }
        match Self::new(spec) {
            Ok(schema) => errors.into_result(schema),
            Err(e) => {
                errors.extend(e);
                Err(errors)
            }
        }
    }

    /// Render this schema in the line format read by [`Schema::parse_text`]
    pub fn to_text(&self) -> Result<String, ConstructionError> {
        let mut tree = Tree::new();
        let root = tree.leaf(ROOT_TITLE, self.version_string.as_str(), 0)?;
        let num = tree.add(NodeSpec::new(VERSION_NUM, self.version_num.to_string(), 1).with(Relation::Parent, root))?;
        let mut previous = tree.add(
            NodeSpec::new(FILE_EXTENSION, self.file_extension.as_str(), 1).with(Relation::PrevSibling, num),
        )?;
        for format_node in &self.format_nodes {
            let id = format_node.write_into(&mut tree, 1)?;
            tree.set_next_sibling(previous, Some(id))?;
            previous = id;
        }
        Ok(codec::serialize_subtree(&tree, root))
    }
}

fn unresolved(owner: &str, relation: Relation, name: &str, index: &HashMap<String, usize>) -> String {
    let matcher = SkimMatcherV2::default();
    let suggestion = index
        .keys()
        .filter_map(|candidate| matcher.fuzzy_match(candidate, name).map(|score| (score, candidate)))
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
        .map(|(_, candidate)| candidate);

    match suggestion {
        Some(candidate) => format!(
            "format node '{}' names unknown {} '{}' (did you mean '{}'?)",
            owner, relation, name, candidate
        ),
        None => format!("format node '{}' names unknown {} '{}'", owner, relation, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format_node::FormatNodeSpec;

    fn names(list: &[&str]) -> Option<Vec<String>> {
        Some(list.iter().map(|s| s.to_string()).collect())
    }

    fn list_schema() -> SchemaSpec {
        let list = FormatNode::new(FormatNodeSpec {
            name: Some("list".to_string()),
            title_format: Some("list".to_string()),
            data_format: Some("".to_string()),
            level: Some(0),
            child_names: names(&["item", NONE]),
            prev_sibling_names: names(&[HEADER_NAME]),
            ..FormatNodeSpec::default()
        })
        .unwrap();
        let item = FormatNode::new(FormatNodeSpec {
            name: Some("item".to_string()),
            title_format: Some("item".to_string()),
            data_format: Some("<text>".to_string()),
            level: Some(1),
            parent_names: names(&["list", NONE]),
            prev_sibling_names: names(&["item", NONE]),
            next_sibling_names: names(&["item", NONE]),
            ..FormatNodeSpec::default()
        })
        .unwrap();
        SchemaSpec {
            version_string: Some("1.0".to_string()),
            version_num: Some(1),
            file_extension: Some(".lst".to_string()),
            format_nodes: vec![list, item],
        }
    }

    #[test]
    fn test_build_and_lookup() {
        let schema = Schema::new(list_schema()).unwrap();
        assert_eq!(schema.file_extension(), "lst");
        assert_eq!(schema.get("item").unwrap().level(), 1);
        assert!(schema.get("missing").is_none());
        assert_eq!(schema.head_names(), vec!["list".to_string()]);
    }

    #[test]
    fn test_extension_is_case_insensitive() {
        let schema = Schema::new(list_schema()).unwrap();
        assert!(schema.matches_extension(Path::new("groceries.LST")));
        assert!(!schema.matches_extension(Path::new("groceries.txt")));
        assert!(!schema.matches_extension(Path::new("groceries")));
    }

    #[test]
    fn test_missing_fields_and_duplicates_reported_together() {
        let mut spec = list_schema();
        spec.version_string = None;
        spec.version_num = None;
        let duplicate = spec.format_nodes[1].clone();
        spec.format_nodes.push(duplicate);

        let err = Schema::new(spec).unwrap_err();
        assert!(err.contains("version string is required"));
        assert!(err.contains("version number is required"));
        assert!(err.contains("'item' is defined more than once"));
    }

    #[test]
    fn test_dangling_reference_suggests_name() {
        let mut spec = list_schema();
        spec.format_nodes.truncate(1);
        let err = Schema::new(spec).unwrap_err();
        assert!(err.contains("names unknown child 'item'"));

        let mut spec = list_schema();
        spec.format_nodes[0] = FormatNode::new(FormatNodeSpec {
            name: Some("list".to_string()),
            title_format: Some("list".to_string()),
            data_format: Some("".to_string()),
            level: Some(0),
            child_names: names(&["itm"]),
            ..FormatNodeSpec::default()
        })
        .unwrap();
        let err = Schema::new(spec).unwrap_err();
        assert!(err.contains("did you mean 'item'?"));
    }

    #[test]
    fn test_text_errors_reported_together() {
        let text = "schema:1.0\n  versionNum:one\n  bogus:x\n  formatNode:list\n    title:list\n    data:\n    level:0\n    parents:<none>\n    children:missing\n    prevSiblings:fileHeader\n    nextSiblings:<none>";
        let err = Schema::parse_text(text).unwrap_err();

        assert!(err.contains("unexpected field 'bogus'"));
        assert!(err.contains("version number \"one\" is not an integer"));
        assert!(err.contains("version number is required"));
        assert!(err.contains("file extension is required"));
        assert!(err.contains("names unknown child 'missing'"));
    }

    #[test]
    fn test_text_round_trip() {
        let schema = Schema::new(list_schema()).unwrap();
        let text = schema.to_text().unwrap();
        assert!(text.starts_with("schema:1.0\n  versionNum:1\n  fileExtension:lst\n  formatNode:list"));

        let back = Schema::parse_text(&text).unwrap();
        assert_eq!(back.version_string(), "1.0");
        assert_eq!(back.version_num(), 1);
        assert_eq!(back.format_nodes(), schema.format_nodes());
    }
}
