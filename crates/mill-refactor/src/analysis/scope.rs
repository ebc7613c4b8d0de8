//! Lexical scope tracking over arena trees

use crate::ast::{BindingKind, NodeId, NodeKind, SyntaxTree, TypeDeclKind};
use std::collections::HashMap;

#[derive(Debug, Default)]
struct Frame {
    names: HashMap<String, BindingKind>,
}

/// Stack of lexical name sets, innermost last.
///
/// A tracker always holds at least one frame; the bottom frame stands for
/// the scope the analysis started in.
#[derive(Debug)]
pub struct ScopeTracker {
    frames: Vec<Frame>,
}

impl Default for ScopeTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
        }
    }

    pub fn enter(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn leave(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Number of frames above the bottom one
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    pub fn declare(&mut self, name: impl Into<String>, kind: BindingKind) {
        if let Some(frame) = self.frames.last_mut() {
            frame.names.entry(name.into()).or_insert(kind);
        }
    }

    pub fn is_bound_here(&self, name: &str) -> bool {
        self.frames
            .last()
            .is_some_and(|frame| frame.names.contains_key(name))
    }

    /// Search the current frame, then its ancestors
    pub fn is_bound(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }

    /// Depth of the innermost frame binding `name`
    pub fn resolve(&self, name: &str) -> Option<usize> {
        self.frames
            .iter()
            .rposition(|frame| frame.names.contains_key(name))
    }

    pub fn binding_kind(&self, name: &str) -> Option<BindingKind> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.names.get(name).copied())
    }

    /// Declare every name `scope_node` binds, before any of its body runs.
    ///
    /// Function, class and type declarations bind their name in the enclosing
    /// scope, so when `scope_node` is one of them its own name is skipped.
    /// `var` bindings found in nested blocks belong to the nearest function
    /// scope and are only declared there.
    pub fn hoist(&mut self, tree: &SyntaxTree, scope_node: NodeId) {
        let kind = &tree.node(scope_node).kind;
        let function_like = matches!(
            kind,
            NodeKind::Program
                | NodeKind::FunctionDecl
                | NodeKind::Function
                | NodeKind::TypeDecl {
                    kind: TypeDeclKind::Namespace
                }
        );
        let own_name = tree.name_binding(scope_node);

        let mut stack: Vec<NodeId> = tree.children(scope_node).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            if Some(current) == own_name {
                continue;
            }
            let node = tree.node(current);
            match &node.kind {
                NodeKind::Binding { name, kind, .. } => {
                    if function_like || *kind != BindingKind::Var {
                        self.declare(name.clone(), *kind);
                    }
                }
                k if k.is_named_declaration() => {
                    if let Some(binding) = tree.name_binding(current) {
                        if let NodeKind::Binding { name, kind, .. } = &tree.node(binding).kind {
                            self.declare(name.clone(), *kind);
                        }
                    }
                }
                NodeKind::Block if function_like => self.hoist_vars(tree, current),
                k if k.opens_scope() => {}
                _ => stack.extend(tree.children(current).into_iter().rev()),
            }
        }
    }

    fn hoist_vars(&mut self, tree: &SyntaxTree, block: NodeId) {
        let mut stack = vec![block];
        while let Some(current) = stack.pop() {
            for child in tree.children(current) {
                match &tree.node(child).kind {
                    NodeKind::Binding {
                        name,
                        kind: BindingKind::Var,
                        ..
                    } => self.declare(name.clone(), BindingKind::Var),
                    NodeKind::FunctionDecl
                    | NodeKind::Function
                    | NodeKind::ClassDecl
                    | NodeKind::Class
                    | NodeKind::TypeDecl { .. } => {}
                    _ => stack.push(child),
                }
            }
        }
    }
}

/// Callbacks for [`walk`]
pub trait ScopeVisitor {
    /// A name use; `scope` reflects every frame enclosing it
    fn reference(&mut self, _tree: &SyntaxTree, _id: NodeId, _name: &str, _scope: &ScopeTracker) {
    }

    fn binding(
        &mut self,
        _tree: &SyntaxTree,
        _id: NodeId,
        _name: &str,
        _kind: BindingKind,
        _scope: &ScopeTracker,
    ) {
    }
}

enum Step {
    Visit(NodeId),
    Leave,
}

/// Iterative pre-order walk that enters and hoists a scope frame at every
/// scope-opening node.
pub fn walk(
    tree: &SyntaxTree,
    nodes: &[NodeId],
    scope: &mut ScopeTracker,
    visitor: &mut impl ScopeVisitor,
) {
    let mut stack: Vec<Step> = nodes.iter().rev().map(|id| Step::Visit(*id)).collect();
    while let Some(step) = stack.pop() {
        let id = match step {
            Step::Visit(id) => id,
            Step::Leave => {
                scope.leave();
                continue;
            }
        };
        let node = tree.node(id);
        match &node.kind {
            NodeKind::Binding { name, kind, .. } => visitor.binding(tree, id, name, *kind, scope),
            NodeKind::Ident { name, .. } => visitor.reference(tree, id, name, scope),
            kind if kind.opens_scope() => {
                // A declaration's name lives outside the scope it opens
                if let Some(binding) = tree.name_binding(id) {
                    if let NodeKind::Binding { name, kind, .. } = &tree.node(binding).kind {
                        visitor.binding(tree, binding, name, *kind, scope);
                    }
                }
                scope.enter();
                scope.hoist(tree, id);
                stack.push(Step::Leave);
                let own_name = tree.name_binding(id);
                stack.extend(
                    tree.children(id)
                        .into_iter()
                        .filter(|child| Some(*child) != own_name)
                        .rev()
                        .map(Step::Visit),
                );
            }
            _ => stack.extend(tree.children(id).into_iter().rev().map(Step::Visit)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut scope = ScopeTracker::new();
        scope.declare("a", BindingKind::Const);
        scope.enter();
        assert!(scope.is_bound("a"));
        assert!(!scope.is_bound_here("a"));
        scope.declare("a", BindingKind::Parameter);
        assert_eq!(scope.resolve("a"), Some(1));
        assert_eq!(scope.binding_kind("a"), Some(BindingKind::Parameter));
        scope.leave();
        assert_eq!(scope.resolve("a"), Some(0));
        scope.leave();
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn hoisting_binds_declarations_before_use() {
        let tree = SwcCodec
            .parse(
                Path::new("scope.ts"),
                "function outer(p) {\n  use(later, v);\n  if (p) { var v = 1; let hidden = 2; }\n  function later() {}\n}\n",
            )
            .unwrap();
        let outer = tree.top_level()[0];
        let mut scope = ScopeTracker::new();
        scope.hoist(&tree, outer);
        assert!(scope.is_bound("p"));
        assert!(!scope.is_bound("outer"));

        let body = tree
            .children(outer)
            .into_iter()
            .find(|c| tree.node(*c).kind == NodeKind::Block)
            .unwrap();
        scope.enter();
        scope.hoist(&tree, body);
        assert!(scope.is_bound_here("later"));
        assert!(!scope.is_bound("hidden"));
        assert_eq!(scope.resolve("v"), Some(0));
    }

    #[test]
    fn namespace_members_stay_inside_the_namespace() {
        let tree = SwcCodec
            .parse(
                Path::new("scope.ts"),
                "namespace Units {\n  export const scale = 10;\n  if (scale) { var legacy = 1; }\n}\n",
            )
            .unwrap();
        let units = tree.top_level()[0];
        let mut scope = ScopeTracker::new();
        scope.hoist(&tree, tree.root());
        assert!(scope.is_bound("Units"));
        assert!(!scope.is_bound("scale"));
        assert!(!scope.is_bound("legacy"));

        scope.enter();
        scope.hoist(&tree, units);
        assert!(scope.is_bound_here("scale"));
        assert!(scope.is_bound_here("legacy"));
        assert!(!scope.is_bound_here("Units"));
    }
}
