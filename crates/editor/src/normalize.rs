use crate::core::{Document, Node, is_list_tag};
use crate::ops::Op;

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document) -> Vec<Op>;
}

pub fn core_passes() -> Vec<Box<dyn NormalizePass>> {
    vec![Box::new(MergeAdjacentTextLeaves), Box::new(RemoveEmptyLists)]
}

pub struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut ops = Vec::new();

        // Children first, so merges in a parent never shift a path that an
        // earlier op in this batch still has to resolve.
        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                if let Node::Element(el) = node {
                    path.push(ix);
                    walk(&el.children, path, ops);
                    path.pop();
                }
            }

            let mut ix = children.len();
            while ix > 1 {
                ix -= 1;
                let (Node::Text(left), Node::Text(right)) = (&children[ix - 1], &children[ix])
                else {
                    continue;
                };
                if left.marks != right.marks {
                    continue;
                }
                let mut merge_path = path.clone();
                merge_path.push(ix);
                ops.push(Op::MergeText { path: merge_path });
            }
        }

        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// A list left without items is dropped when nested in a list item and
/// replaced by `<p><br></p>` otherwise.
pub struct RemoveEmptyLists;

impl NormalizePass for RemoveEmptyLists {
    fn id(&self) -> &'static str {
        "core.remove_empty_lists"
    }

    fn run(&self, doc: &Document) -> Vec<Op> {
        let mut sites: Vec<(Vec<usize>, bool)> = Vec::new();

        fn walk(
            children: &[Node],
            parent_is_item: bool,
            path: &mut Vec<usize>,
            sites: &mut Vec<(Vec<usize>, bool)>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };
                path.push(ix);
                if is_list_tag(&el.tag) && el.element_children().next().is_none() {
                    sites.push((path.clone(), parent_is_item));
                } else {
                    walk(&el.children, el.tag == "li", path, sites);
                }
                path.pop();
            }
        }

        walk(&doc.children, false, &mut Vec::new(), &mut sites);

        let mut ops = Vec::new();
        for (path, nested) in sites.into_iter().rev() {
            ops.push(Op::RemoveNode { path: path.clone() });
            if !nested {
                ops.push(Op::InsertNode {
                    path,
                    node: Node::placeholder_paragraph(),
                });
            }
        }
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_runs_right_to_left() {
        let doc = Document::new(vec![Node::element(
            "p",
            vec![Node::text("a"), Node::text("b"), Node::text("c")],
        )]);
        let ops = MergeAdjacentTextLeaves.run(&doc);
        assert_eq!(
            ops,
            vec![
                Op::MergeText { path: vec![0, 2] },
                Op::MergeText { path: vec![0, 1] },
            ]
        );
    }

    #[test]
    fn nested_empty_list_is_removed_top_level_is_replaced() {
        let doc = Document::new(vec![Node::element(
            "ul",
            vec![Node::element(
                "li",
                vec![Node::text("a"), Node::element("ol", Vec::new())],
            )],
        )]);
        assert_eq!(
            RemoveEmptyLists.run(&doc),
            vec![Op::RemoveNode {
                path: vec![0, 0, 1]
            }]
        );

        let doc = Document::new(vec![Node::element("ol", Vec::new())]);
        let ops = RemoveEmptyLists.run(&doc);
        assert_eq!(ops.len(), 2);
    }
}
