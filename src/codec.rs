//! Text codec
//!
//! One line per node: `(two spaces × level)` + `title` + `:` + `data`.
//! Data containing line breaks is wrapped in parentheses and spans several
//! lines; data that itself starts with `(` or `\` is escaped with a leading
//! backslash.

use std::borrow::Cow;

use tracing::debug;

use crate::error::ParseError;
use crate::node::{NodeId, Relation, Tree};

/// Indentation for one level
pub const INDENT: &str = "  ";

/// Parse `lines` into a fresh tree, returning it with the id of the first node.
pub fn parse<S: AsRef<str>>(lines: &[S]) -> Result<(Tree, NodeId), ParseError> {
    let mut tree = Tree::new();
    let mut built: Vec<NodeId> = Vec::new();
    let mut index = 0;

    while index < lines.len() {
        let line = index + 1;
        let raw = lines[index].as_ref();
        let (level, rest) = split_indent(raw);
        let (title, value) = rest.split_once(':').ok_or_else(|| ParseError::MissingDelimiter {
            line,
            text: raw.to_string(),
        })?;
        let (data, consumed) = read_value(value, lines, index)?;
        index += consumed;

        let previous = match built.last() {
            Some(&previous) => previous,
            None => {
                if level != 0 {
                    return Err(ParseError::InvalidRootLevel { line, level });
                }
                built.push(tree.push_parsed(title, data, level, line));
                continue;
            }
        };

        let previous_level = tree[previous].level;
        if level > previous_level + 1 {
            return Err(ParseError::SkippedLevel {
                line,
                level,
                previous: previous_level,
            });
        }

        let id = tree.push_parsed(title, data, level, line);
        if level == previous_level {
            tree.attach(previous, Relation::NextSibling, id);
        } else if level == previous_level + 1 {
            tree.attach(previous, Relation::Child, id);
        } else {
            // Walk back to the nearest node at or above the new level.
            let anchor = built
                .iter()
                .rev()
                .copied()
                .find(|&n| tree[n].level <= level)
                .unwrap_or(built[0]);
            if tree[anchor].level == level {
                tree.attach(anchor, Relation::NextSibling, id);
            } else {
                tree.attach(anchor, Relation::Child, id);
            }
        }
        built.push(id);
    }

    let root = built.first().copied().ok_or(ParseError::Empty)?;
    debug!(nodes = tree.len(), "parsed tree");
    Ok((tree, root))
}

/// Parse a whole text blob
pub fn parse_str(text: &str) -> Result<(Tree, NodeId), ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    parse(&lines)
}

/// Render a single node as one (possibly multi-line) entry
pub fn serialize(tree: &Tree, id: NodeId) -> String {
    let node = &tree[id];
    format!(
        "{}{}:{}",
        INDENT.repeat(node.level),
        node.title,
        encode_value(&node.data)
    )
}

/// Render `id`, its child subtree and then its next-sibling subtree
pub fn serialize_subtree(tree: &Tree, id: NodeId) -> String {
    tree.pre_order(id)
        .into_iter()
        .map(|n| serialize(tree, n))
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_indent(raw: &str) -> (usize, &str) {
    let spaces = raw.len() - raw.trim_start_matches(' ').len();
    let level = spaces / INDENT.len();
    (level, &raw[level * INDENT.len()..])
}

/// Decode the data part of the line at `index`, pulling in continuation
/// lines for wrapped values. Returns the value and the number of lines used.
fn read_value<S: AsRef<str>>(
    value: &str,
    lines: &[S],
    index: usize,
) -> Result<(String, usize), ParseError> {
    if let Some(escaped) = value.strip_prefix('\\') {
        if escaped.starts_with('(') || escaped.starts_with('\\') {
            return Ok((escaped.to_string(), 1));
        }
        return Ok((value.to_string(), 1));
    }

    let Some(opened) = value.strip_prefix('(') else {
        return Ok((value.to_string(), 1));
    };
    if let Some(inner) = opened.strip_suffix(')') {
        return Ok((inner.to_string(), 1));
    }

    let mut data = opened.to_string();
    for (offset, next) in lines[index + 1..].iter().enumerate() {
        let next = next.as_ref();
        data.push('\n');
        if let Some(last) = next.strip_suffix(')') {
            data.push_str(last);
            return Ok((data, offset + 2));
        }
        data.push_str(next);
    }
    Err(ParseError::UnterminatedMultilineValue { line: index + 1 })
}

fn encode_value(data: &str) -> Cow<'_, str> {
    if data.contains('\n') {
        Cow::Owned(format!("({})", data))
    } else if data.starts_with('(') || data.starts_with('\\') {
        Cow::Owned(format!("\\{}", data))
    } else {
        Cow::Borrowed(data)
    }
}
