//! Text emission for arena trees

use super::{NodeId, NodeKind, Piece, SyntaxTree};

/// Render a whole tree
pub fn print_tree(tree: &SyntaxTree) -> String {
    let mut out = String::new();
    print_node(tree, tree.root(), &mut out);
    out
}

/// Render one node and its subtree, comments included
pub fn print_node(tree: &SyntaxTree, id: NodeId, out: &mut String) {
    let node = tree.node(id);

    for comment in node.comments.iter().filter(|c| c.leading) {
        out.push_str(&comment.render());
        out.push('\n');
    }

    match &node.kind {
        NodeKind::Binding {
            name, shorthand, ..
        }
        | NodeKind::Ident {
            name, shorthand, ..
        } => match shorthand {
            // `{ key }` keeps its property key once the local name changes
            Some(key) if key != name => {
                out.push_str(key);
                out.push_str(": ");
                out.push_str(name);
            }
            _ => out.push_str(name),
        },
        _ => {
            for piece in &node.pieces {
                match piece {
                    Piece::Text(text) => out.push_str(text),
                    Piece::Child(child) => print_node(tree, *child, out),
                }
            }
        }
    }

    for comment in node.comments.iter().filter(|c| !c.leading) {
        out.push(' ');
        out.push_str(&comment.render());
    }
}

/// Render a single node to a fresh string
pub fn node_text(tree: &SyntaxTree, id: NodeId) -> String {
    let mut out = String::new();
    print_node(tree, id, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn renamed_shorthand_keeps_property_key() {
        let mut tree = SwcCodec::default()
            .parse(Path::new("print.ts"), "const value = 1;\nconst o = { value };\n")
            .unwrap();
        let refs: Vec<NodeId> = tree
            .descendants(tree.root())
            .into_iter()
            .filter(|id| tree.node(*id).name() == Some("value"))
            .collect();
        for id in refs {
            tree.set_name(id, "amount");
        }
        assert_eq!(
            print_tree(&tree),
            "const amount = 1;\nconst o = { value: amount };\n"
        );
    }

    #[test]
    fn node_text_includes_doc_comment() {
        let tree = SwcCodec::default()
            .parse(Path::new("print.ts"), "/** Doc */\nfunction f() {}\n")
            .unwrap();
        let stmt = tree.top_level()[0];
        assert_eq!(node_text(&tree, stmt), "/** Doc */\nfunction f() {}");
    }
}
