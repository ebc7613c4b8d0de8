//! Selector resolution

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::command::{DeclarationKind, Selector};
use crate::error::{RefactorError, RefactorResult};

/// Locates the declaration a selector names
pub trait DeclarationResolver: Send + Sync {
    /// The top-level statement (including any `export` wrapper) declaring the
    /// selected symbol
    fn resolve(&self, tree: &SyntaxTree, selector: &Selector) -> RefactorResult<NodeId>;
}

/// Matches selectors against the module's top-level declarations
#[derive(Debug, Default, Clone, Copy)]
pub struct TopLevelResolver;

fn kind_matches(kind: &NodeKind, wanted: DeclarationKind) -> bool {
    matches!(
        (kind, wanted),
        (NodeKind::FunctionDecl, DeclarationKind::Function)
            | (NodeKind::ClassDecl, DeclarationKind::Class)
            | (NodeKind::VarDecl { .. }, DeclarationKind::Variable)
    )
}

impl DeclarationResolver for TopLevelResolver {
    fn resolve(&self, tree: &SyntaxTree, selector: &Selector) -> RefactorResult<NodeId> {
        let candidates: Vec<NodeId> = tree
            .top_level()
            .into_iter()
            .filter(|stmt| kind_matches(&tree.node(tree.declaration(*stmt)).kind, selector.declaration_kind))
            .filter(|stmt| tree.declared_names(*stmt).contains(&selector.name))
            .collect();

        match candidates.as_slice() {
            [] => Err(RefactorError::symbol_not_found(
                &selector.name,
                selector.declaration_kind.as_str(),
                tree.path(),
            )),
            [single] => Ok(*single),
            many => Err(RefactorError::AmbiguousSelector {
                name: selector.name.clone(),
                file: tree.path().to_path_buf(),
                candidates: many.len(),
            }),
        }
    }
}
