use std::ops::Range;

use serde_json::Value;

use super::{commit, require_selection};
use crate::core::{ElementNode, Node, Point, Selection, child_path, is_text_block_tag};
use crate::edit;
use crate::error::CommandError;
use crate::inspector::{SelectionInspector, closest_ancestor_matching};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{BackendPlugin, CommandSpec, QuerySpec};
use crate::region::EditableRegion;

pub struct BlockPlugin;

impl BackendPlugin for BlockPlugin {
    fn id(&self) -> &'static str {
        "block"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("formatBlock", "Block type", |region, value| {
                let tag = value
                    .and_then(block_tag_from_value)
                    .ok_or_else(|| CommandError::new("formatBlock expects a block tag"))?;
                format_block(region, &tag)
            })
            .description("Turn the current block(s) into a paragraph, heading or blockquote."),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("formatBlock", |region| {
            Ok(SelectionInspector::new(region)
                .block_type()
                .map(|block| Value::String(block.command_value()))
                .unwrap_or(Value::Null))
        })]
    }
}

/// Accepts `h1` as well as `<h1>`.
fn block_tag_from_value(value: &str) -> Option<String> {
    let tag = value
        .trim()
        .trim_start_matches('<')
        .trim_end_matches('>')
        .to_ascii_lowercase();
    let known = matches!(
        tag.as_str(),
        "p" | "div" | "pre" | "blockquote" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    );
    known.then_some(tag)
}

fn parent_of(path: &[usize]) -> &[usize] {
    &path[..path.len().saturating_sub(1)]
}

fn retaggable(el: &ElementNode) -> bool {
    is_text_block_tag(&el.tag)
        || (el.tag == "div" && !el.children.iter().any(Node::is_block))
}

/// Moves the children `range` of `container` into a new `wrapper`.
pub(crate) struct Wrap {
    pub container: Path,
    pub range: Range<usize>,
}

impl Wrap {
    pub fn ops(&self, children: &[Node], wrapper: ElementNode) -> Vec<Op> {
        let moved: Vec<Node> = children[self.range.clone()].to_vec();
        let mut ops: Vec<Op> = self
            .range
            .clone()
            .rev()
            .map(|ix| Op::RemoveNode {
                path: child_path(&self.container, ix),
            })
            .collect();
        ops.push(Op::InsertNode {
            path: child_path(&self.container, self.range.start),
            node: Node::Element(wrapper.with_children(moved)),
        });
        ops
    }

    /// Where a pre-wrap point ends up once the wrap is applied.
    pub fn remap(&self, point: &Point) -> Point {
        let depth = self.container.len();
        let (start, end) = (self.range.start, self.range.end);
        let collapsed = end - start - 1;
        if point.path == self.container {
            if point.offset > start && point.offset <= end {
                return Point::new(child_path(&self.container, start), point.offset - start);
            }
            let offset = if point.offset > end {
                point.offset - collapsed
            } else {
                point.offset
            };
            return Point::new(point.path.clone(), offset);
        }
        if point.path.len() <= depth || !point.path.starts_with(&self.container) {
            return point.clone();
        }
        let ix = point.path[depth];
        let mut path = self.container.clone();
        if ix >= start && ix < end {
            path.push(start);
            path.push(ix - start);
        } else if ix >= end {
            path.push(ix - collapsed);
        } else {
            path.push(ix);
        }
        path.extend_from_slice(&point.path[depth + 1..]);
        Point::new(path, point.offset)
    }

    pub fn remap_selection(&self, selection: &Selection) -> Selection {
        Selection::new(self.remap(&selection.anchor), self.remap(&selection.focus))
    }
}

/// Sibling range under the selection's flow container, from the child
/// holding the start through the child holding the end.
fn selected_children(region: &EditableRegion, selection: &Selection) -> Option<Wrap> {
    let doc = region.doc();
    let container = edit::flow_container_of(doc, &selection.common_ancestor());
    let children = doc.children_at(&container)?;
    if children.is_empty() {
        return None;
    }
    let (start, end) = selection.ordered();
    let first = edit::child_index_toward(&container, &start).min(children.len() - 1);
    let last = if end.path == container {
        end.offset.saturating_sub(1)
    } else {
        edit::child_index_toward(&container, &end)
    };
    let last = last.clamp(first, children.len() - 1);
    Some(Wrap {
        container,
        range: first..last + 1,
    })
}

pub(crate) fn wrap_in_blockquote(region: &mut EditableRegion) -> Result<(), CommandError> {
    let selection = require_selection(region)?;
    let Some(wrap) = selected_children(region, &selection) else {
        return Err(CommandError::new("Nothing to quote"));
    };
    let Some(children) = region.doc().children_at(&wrap.container) else {
        return Err(CommandError::new("Selection container is gone"));
    };
    let ops = wrap.ops(children, ElementNode::new("blockquote"));
    let tx = Transaction::new(ops)
        .selection_after(wrap.remap_selection(&selection))
        .source("command:formatBlock.blockquote");
    commit(region, tx)?;

    // Keep the range inside the new quote so the next toggle finds it.
    let quote = child_path(&wrap.container, wrap.range.start);
    let inside = region
        .live_selection()
        .is_some_and(|sel| sel.common_ancestor().starts_with(&quote));
    if !inside {
        let end = edit::end_point_of(region.doc(), &quote);
        let selection = if selection.is_collapsed() {
            Selection::collapsed(end)
        } else {
            Selection::new(edit::start_point_of(region.doc(), &quote), end)
        };
        region.set_selection(Some(selection));
    }
    Ok(())
}

/// Replaces the blockquote at `quote_path` by its children and puts the caret
/// at the end of what was inside.
pub(crate) fn unwrap_blockquote(
    region: &mut EditableRegion,
    quote_path: &[usize],
) -> Result<(), CommandError> {
    let Some((&quote_ix, parent)) = quote_path.split_last() else {
        return Err(CommandError::new("Invalid blockquote path"));
    };
    let Some(quote) = region.doc().element(quote_path).filter(|el| el.tag == "blockquote") else {
        return Ok(());
    };
    let children = quote.children.clone();
    let count = children.len();

    let mut ops = vec![Op::RemoveNode {
        path: quote_path.to_vec(),
    }];
    for (i, node) in children.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, quote_ix + i),
            node,
        });
    }
    commit(region, Transaction::new(ops).source("command:blockquote.unwrap"))?;

    let caret = match count.checked_sub(1) {
        Some(last) => edit::end_point_of(region.doc(), &child_path(parent, quote_ix + last)),
        None => Point::new(parent.to_vec(), quote_ix),
    };
    region.place_caret(caret);
    Ok(())
}

fn format_block(region: &mut EditableRegion, tag: &str) -> Result<(), CommandError> {
    if tag == "blockquote" {
        return wrap_in_blockquote(region);
    }
    let selection = require_selection(region)?;
    let (start, end) = selection.ordered();
    let doc = region.doc();

    let start_block = closest_ancestor_matching(doc, &start.path, retaggable);
    let end_block = closest_ancestor_matching(doc, &end.path, retaggable);

    let retag = |paths: Vec<Path>| -> Transaction {
        let ops = paths
            .into_iter()
            .map(|path| Op::Retag {
                path,
                tag: tag.to_string(),
            })
            .collect();
        Transaction::new(ops).source("command:formatBlock")
    };

    let tx = match (start_block, end_block) {
        (Some(first), Some(last)) if parent_of(&first) == parent_of(&last) => {
            let parent = parent_of(&first);
            let first_ix = first.last().copied().unwrap_or(0);
            let last_ix = last.last().copied().unwrap_or(first_ix);
            let children = doc.children_at(parent).unwrap_or(&[]);
            let paths = (first_ix.min(last_ix)..=first_ix.max(last_ix))
                .filter(|ix| {
                    children
                        .get(*ix)
                        .and_then(Node::as_element)
                        .is_some_and(retaggable)
                })
                .map(|ix| child_path(parent, ix))
                .collect();
            retag(paths)
        }
        (Some(first), _) => retag(vec![first]),
        (None, _) => {
            let container = edit::flow_container_of(doc, &start.path);
            let children = doc.children_at(&container).unwrap_or(&[]);
            let index = edit::child_index_toward(&container, &start);
            let Some(range) = edit::inline_run_around(children, index) else {
                return Ok(());
            };
            let wrap = Wrap { container, range };
            let ops = wrap.ops(children, ElementNode::new(tag));
            Transaction::new(ops)
                .selection_after(wrap.remap_selection(&selection))
                .source("command:formatBlock.wrap")
        }
    };
    commit(region, tx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remap_moves_points_into_the_wrapper() {
        let wrap = Wrap {
            container: vec![],
            range: 1..3,
        };
        assert_eq!(
            wrap.remap(&Point::new(vec![2, 0], 4)),
            Point::new(vec![1, 1, 0], 4)
        );
        assert_eq!(wrap.remap(&Point::new(vec![3], 0)), Point::new(vec![2], 0));
        assert_eq!(wrap.remap(&Point::new(vec![], 3)), Point::new(vec![1], 2));
        assert_eq!(wrap.remap(&Point::new(vec![], 4)), Point::new(vec![], 3));
    }

    #[test]
    fn block_values_accept_angle_brackets() {
        assert_eq!(block_tag_from_value("<H2>").as_deref(), Some("h2"));
        assert_eq!(block_tag_from_value("span"), None);
    }
}
