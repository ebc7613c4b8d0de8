//! Copying subtrees between arenas.
//!
//! Nodes are copied into the destination arena with fresh ids. Source
//! positions and parent links are not carried over: the copy gets parents
//! from its new structure, and no span at all, since the text it came from
//! belongs to another file.

use crate::ast::{AttachedComment, Node, NodeId, Piece, SyntaxTree};
use std::collections::HashMap;

/// Copy `node` and everything below it from `src` into `dst`.
///
/// The copy is detached; attach it with one of the [`SyntaxTree`] statement
/// methods.
pub fn clone_subtree(src: &SyntaxTree, node: NodeId, dst: &mut SyntaxTree) -> NodeId {
    let mut visited: HashMap<NodeId, NodeId> = HashMap::new();
    let mut order = Vec::new();

    // Allocate every copy first; a node reached twice keeps its first copy
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if visited.contains_key(&current) {
            continue;
        }
        let original = src.node(current);
        let mut copy = Node::new(original.kind.clone());
        copy.comments = original.comments.clone();
        visited.insert(current, dst.alloc(copy));
        order.push(current);
        stack.extend(original.children());
    }

    for original_id in order {
        let copy_id = visited[&original_id];
        let pieces: Vec<Piece> = src
            .node(original_id)
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Text(text) => Piece::Text(text.clone()),
                Piece::Child(child) => Piece::Child(visited[child]),
            })
            .collect();
        for piece in &pieces {
            if let Piece::Child(child) = piece {
                dst.node_mut(*child).parent = Some(copy_id);
            }
        }
        dst.node_mut(copy_id).pieces = pieces;
    }

    visited[&node]
}

/// Copy several top-level statements, preserving their order
pub fn clone_statements(src: &SyntaxTree, nodes: &[NodeId], dst: &mut SyntaxTree) -> Vec<NodeId> {
    nodes
        .iter()
        .map(|node| clone_subtree(src, *node, dst))
        .collect()
}

/// Comments attached to a statement, as plain values independent of any tree
pub fn extract_comments(tree: &SyntaxTree, node: NodeId) -> Vec<AttachedComment> {
    let mut comments = tree.node(node).comments.clone();
    if tree.is_export_wrapper(node) {
        let inner = tree.declaration(node);
        if inner != node {
            comments.extend(tree.node(inner).comments.iter().cloned());
        }
    }
    comments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print::node_text;
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn copy_is_independent_of_the_original() {
        let src = SwcCodec
            .parse(Path::new("a.ts"), "/** Doc */\nfunction keep(x) { return x + 1; }\n")
            .unwrap();
        let mut dst = SyntaxTree::empty("b.ts");
        let stmt = src.top_level()[0];
        let copy = clone_subtree(&src, stmt, &mut dst);

        assert_eq!(node_text(&dst, copy), node_text(&src, stmt));
        assert!(dst.node(copy).span.is_none());
        assert!(dst.node(copy).parent.is_none());

        let binding = dst.name_binding(copy).unwrap();
        assert_eq!(dst.node(binding).parent, Some(copy));
        dst.set_name(binding, "changed");
        assert_eq!(src.declared_names(stmt), vec!["keep".to_string()]);
    }

    #[test]
    fn comments_are_extracted_as_values() {
        let src = SwcCodec
            .parse(Path::new("a.ts"), "// lead\nconst a = 1; // tail\n")
            .unwrap();
        let comments = extract_comments(&src, src.top_level()[0]);
        assert_eq!(comments.len(), 2);
        assert!(comments[0].leading && !comments[0].doc);
        assert_eq!(comments[1].text, " tail");
        assert!(!comments[1].leading);
    }
}
