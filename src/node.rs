//! Node arena
//!
//! A document is a multiway tree encoded as "first child + sibling chain".
//! Nodes live in a [`Tree`] arena and refer to each other through [`NodeId`]
//! handles, so every relation is an `Option<NodeId>` and navigation is O(1)
//! in all four directions.
//!
//! Links are symmetric: `a.child = b` implies `b.parent = a`, and
//! `a.next_sibling = b` implies `b.prev_sibling = a`. Only the first child of
//! a node carries a `parent` link; later children are reached through the
//! sibling chain.

use std::fmt;
use std::ops::Index;

use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

/// Handle of a node inside a [`Tree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the four neighbor links of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    Parent,
    Child,
    PrevSibling,
    NextSibling,
}

impl Relation {
    pub const ALL: [Relation; 4] = [
        Relation::Parent,
        Relation::Child,
        Relation::PrevSibling,
        Relation::NextSibling,
    ];

    /// The link the other end holds back to us
    pub fn inverse(self) -> Relation {
        match self {
            Relation::Parent => Relation::Child,
            Relation::Child => Relation::Parent,
            Relation::PrevSibling => Relation::NextSibling,
            Relation::NextSibling => Relation::PrevSibling,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::Parent => "parent",
            Relation::Child => "child",
            Relation::PrevSibling => "previous sibling",
            Relation::NextSibling => "next sibling",
        }
    }

    /// Whether a neighbor at `other` may sit in this relation to a node at `own`
    pub fn admits(self, own: usize, other: usize) -> bool {
        match self {
            Relation::Parent => other < own,
            Relation::Child => other > own,
            Relation::PrevSibling | Relation::NextSibling => other == own,
        }
    }

    fn requirement(self) -> &'static str {
        match self {
            Relation::Parent => "lower than",
            Relation::Child => "higher than",
            Relation::PrevSibling | Relation::NextSibling => "equal to",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `title:data` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub title: String,
    pub data: String,
    pub level: usize,
    /// 1-based source line, for parsed nodes
    pub line: Option<usize>,
    parent: Option<NodeId>,
    child: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
}

impl Node {
    pub fn link(&self, relation: Relation) -> Option<NodeId> {
        match relation {
            Relation::Parent => self.parent,
            Relation::Child => self.child,
            Relation::PrevSibling => self.prev_sibling,
            Relation::NextSibling => self.next_sibling,
        }
    }

    fn link_mut(&mut self, relation: Relation) -> &mut Option<NodeId> {
        match relation {
            Relation::Parent => &mut self.parent,
            Relation::Child => &mut self.child,
            Relation::PrevSibling => &mut self.prev_sibling,
            Relation::NextSibling => &mut self.next_sibling,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn child(&self) -> Option<NodeId> {
        self.child
    }

    pub fn prev_sibling(&self) -> Option<NodeId> {
        self.prev_sibling
    }

    pub fn next_sibling(&self) -> Option<NodeId> {
        self.next_sibling
    }

    /// Short human-readable label for diagnostics
    pub fn describe(&self) -> String {
        match self.line {
            Some(line) => format!("'{}' (line {})", self.title, line),
            None => format!("'{}' (level {})", self.title, self.level),
        }
    }
}

/// Everything needed to add a node to a [`Tree`]
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    pub title: String,
    pub data: String,
    pub level: usize,
    pub line: Option<usize>,
    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
}

impl NodeSpec {
    pub fn new(title: impl Into<String>, data: impl Into<String>, level: usize) -> Self {
        Self {
            title: title.into(),
            data: data.into(),
            level,
            ..Self::default()
        }
    }

    pub fn with(mut self, relation: Relation, neighbor: NodeId) -> Self {
        match relation {
            Relation::Parent => self.parent = Some(neighbor),
            Relation::Child => self.child = Some(neighbor),
            Relation::PrevSibling => self.prev_sibling = Some(neighbor),
            Relation::NextSibling => self.next_sibling = Some(neighbor),
        }
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    fn link(&self, relation: Relation) -> Option<NodeId> {
        match relation {
            Relation::Parent => self.parent,
            Relation::Child => self.child,
            Relation::PrevSibling => self.prev_sibling,
            Relation::NextSibling => self.next_sibling,
        }
    }
}

/// Arena owning every node of one or more documents
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    /// Add a node, linking it to the neighbors named in `spec`.
    ///
    /// Every level rule is checked before anything is linked; all violations
    /// are reported together.
    pub fn add(&mut self, spec: NodeSpec) -> Result<NodeId, ConstructionError> {
        let mut errors = ConstructionError::new("node");
        check_title(&spec.title, &mut errors);
        check_data(&spec.data, &mut errors);
        for relation in Relation::ALL {
            if let Some(neighbor) = spec.link(relation) {
                self.check_level(spec.level, relation, neighbor, &mut errors);
            }
        }
        match (spec.prev_sibling, spec.next_sibling) {
            (Some(prev), Some(next)) if prev == next => {
                errors.push("previous and next sibling must be different nodes");
            }
            (Some(prev), Some(next)) if errors.is_empty() && self.walks_back_to(prev, next) => {
                errors.push(format!(
                    "next sibling {} already precedes previous sibling {}, which would close a sibling cycle",
                    next, prev
                ));
            }
            _ => {}
        }
        errors.into_result(())?;

        let links: Vec<(Relation, NodeId)> = Relation::ALL
            .into_iter()
            .filter_map(|relation| spec.link(relation).map(|neighbor| (relation, neighbor)))
            .collect();
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            title: spec.title,
            data: spec.data,
            level: spec.level,
            line: spec.line,
            parent: None,
            child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        for (relation, neighbor) in links {
            self.set_link(id, relation, Some(neighbor))?;
        }
        Ok(id)
    }

    /// Add a node with no neighbors
    pub fn leaf(
        &mut self,
        title: impl Into<String>,
        data: impl Into<String>,
        level: usize,
    ) -> Result<NodeId, ConstructionError> {
        self.add(NodeSpec::new(title, data, level))
    }

    /// Point `relation` of `id` at `target` (or clear it), keeping the
    /// reverse link of both the old and the new neighbor consistent.
    pub fn set_link(
        &mut self,
        id: NodeId,
        relation: Relation,
        target: Option<NodeId>,
    ) -> Result<(), ConstructionError> {
        let mut errors = ConstructionError::new("node link");
        if !self.contains(id) {
            errors.push(format!("node {} does not belong to this tree", id));
            return Err(errors);
        }
        if let Some(target) = target {
            if target == id {
                errors.push(format!("node {} cannot be its own {}", id, relation));
            } else {
                self.check_level(self.nodes[id.0].level, relation, target, &mut errors);
                if errors.is_empty() && self.closes_sibling_cycle(id, relation, target) {
                    errors.push(format!(
                        "linking {} as {} of {} would close a sibling cycle",
                        target, relation, id
                    ));
                }
            }
        }
        errors.into_result(())?;

        let inverse = relation.inverse();
        if let Some(old) = self.nodes[id.0].link(relation) {
            *self.nodes[old.0].link_mut(inverse) = None;
        }
        if let Some(target) = target {
            if let Some(displaced) = self.nodes[target.0].link(inverse) {
                *self.nodes[displaced.0].link_mut(relation) = None;
            }
            *self.nodes[target.0].link_mut(inverse) = Some(id);
        }
        *self.nodes[id.0].link_mut(relation) = target;
        Ok(())
    }

    /// Push a node whose text was already split by the codec
    pub(crate) fn push_parsed(&mut self, title: &str, data: String, level: usize, line: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            title: title.to_string(),
            data,
            level,
            line: Some(line),
            parent: None,
            child: None,
            prev_sibling: None,
            next_sibling: None,
        });
        id
    }

    /// Link two nodes whose levels the caller has already reconciled
    pub(crate) fn attach(&mut self, id: NodeId, relation: Relation, target: NodeId) {
        debug_assert!(relation.admits(self.nodes[id.0].level, self.nodes[target.0].level));
        *self.nodes[id.0].link_mut(relation) = Some(target);
        *self.nodes[target.0].link_mut(relation.inverse()) = Some(id);
    }

    pub fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) -> Result<(), ConstructionError> {
        self.set_link(id, Relation::Parent, parent)
    }

    pub fn set_child(&mut self, id: NodeId, child: Option<NodeId>) -> Result<(), ConstructionError> {
        self.set_link(id, Relation::Child, child)
    }

    pub fn set_prev_sibling(&mut self, id: NodeId, prev: Option<NodeId>) -> Result<(), ConstructionError> {
        self.set_link(id, Relation::PrevSibling, prev)
    }

    pub fn set_next_sibling(&mut self, id: NodeId, next: Option<NodeId>) -> Result<(), ConstructionError> {
        self.set_link(id, Relation::NextSibling, next)
    }

    pub fn link(&self, id: NodeId, relation: Relation) -> Option<NodeId> {
        self.nodes[id.0].link(relation)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].child
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].prev_sibling
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].next_sibling
    }

    /// Direct children of `id`: its first child followed by that child's siblings
    pub fn children(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: self.child(id),
        }
    }

    /// `id` followed by every node after it in its sibling chain
    pub fn siblings_from(&self, id: NodeId) -> Siblings<'_> {
        Siblings {
            tree: self,
            next: Some(id),
        }
    }

    /// Pre-order walk over the forest reachable from `id`: the node itself,
    /// its full child subtree, then its full next-sibling subtree.
    pub fn pre_order(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            let node = &self.nodes[current.0];
            if let Some(next) = node.next_sibling {
                stack.push(next);
            }
            if let Some(child) = node.child {
                stack.push(child);
            }
        }
        order
    }

    pub fn collect_titles(&self, id: NodeId) -> Vec<String> {
        self.pre_order(id)
            .into_iter()
            .map(|n| self.nodes[n.0].title.clone())
            .collect()
    }

    pub fn collect_data(&self, id: NodeId) -> Vec<String> {
        self.pre_order(id)
            .into_iter()
            .map(|n| self.nodes[n.0].data.clone())
            .collect()
    }

    /// First direct child of `id` with the given title
    pub fn find_child(&self, id: NodeId, title: &str) -> Option<NodeId> {
        self.children(id).find(|c| self.nodes[c.0].title == title)
    }

    /// Nested JSON view of the forest starting at `id`
    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        let views: Vec<NodeView> = self.siblings_from(id).map(|n| self.view(n)).collect();
        serde_json::to_value(views).unwrap_or(serde_json::Value::Null)
    }

    fn view(&self, id: NodeId) -> NodeView {
        let node = &self.nodes[id.0];
        NodeView {
            title: node.title.clone(),
            data: node.data.clone(),
            level: node.level,
            line: node.line,
            children: self.children(id).map(|c| self.view(c)).collect(),
        }
    }

    fn check_level(&self, level: usize, relation: Relation, neighbor: NodeId, errors: &mut ConstructionError) {
        match self.get(neighbor) {
            None => errors.push(format!("{} {} does not belong to this tree", relation, neighbor)),
            Some(other) if !relation.admits(level, other.level) => errors.push(format!(
                "{} level {} must be {} node level {}",
                relation,
                other.level,
                relation.requirement(),
                level
            )),
            Some(_) => {}
        }
    }

    /// Whether `target` is `from` or lies before it in its sibling chain
    fn walks_back_to(&self, from: NodeId, target: NodeId) -> bool {
        let mut cursor = Some(from);
        while let Some(current) = cursor {
            if current == target {
                return true;
            }
            cursor = self.link(current, Relation::PrevSibling);
        }
        false
    }

    fn closes_sibling_cycle(&self, id: NodeId, relation: Relation, target: NodeId) -> bool {
        let walk = match relation {
            Relation::NextSibling => Relation::PrevSibling,
            Relation::PrevSibling => Relation::NextSibling,
            Relation::Parent | Relation::Child => return false,
        };
        let mut cursor = self.link(id, walk);
        while let Some(current) = cursor {
            if current == target {
                return true;
            }
            cursor = self.link(current, walk);
        }
        false
    }
}

impl Index<NodeId> for Tree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

/// Iterator along a sibling chain
pub struct Siblings<'a> {
    tree: &'a Tree,
    next: Option<NodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

#[derive(Debug, Serialize)]
struct NodeView {
    title: String,
    data: String,
    level: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeView>,
}

fn check_title(title: &str, errors: &mut ConstructionError) {
    if title.contains(':') {
        errors.push(format!("title {:?} may not contain ':'", title));
    }
    if title.contains('\n') {
        errors.push(format!("title {:?} may not contain a line break", title));
    }
}

/// Wrapped values end at the first line closing with ')', so only the last
/// line of multi-line data may end that way.
fn check_data(data: &str, errors: &mut ConstructionError) {
    let mut lines = data.split('\n').peekable();
    while let Some(line) = lines.next() {
        if lines.peek().is_some() && line.ends_with(')') {
            errors.push(format!(
                "multi-line data may only end a line with ')' on its last line, found {:?}",
                line
            ));
            return;
        }
    }
}
