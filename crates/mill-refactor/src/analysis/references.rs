//! Scope-aware lookup of module-level names

use super::scope::{walk, ScopeTracker, ScopeVisitor};
use crate::ast::{BindingKind, NodeId, SyntaxTree};
use indexmap::IndexMap;

/// One leaf that resolves to a module-level binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub id: NodeId,
    /// The leaf declares the name rather than using it
    pub binding: bool,
}

/// Module-level names used by `statements`, keyed by name in first-use order.
///
/// Only leaves that resolve to the module scope are reported; a use of a
/// name that an inner declaration shadows belongs to that declaration.
pub fn module_occurrences(
    tree: &SyntaxTree,
    statements: &[NodeId],
) -> IndexMap<String, Vec<Occurrence>> {
    let mut finder = ModuleOccurrences {
        filter: None,
        candidate: None,
        found: IndexMap::new(),
        captured: Vec::new(),
    };
    let mut scope = module_scope(tree);
    walk(tree, statements, &mut scope, &mut finder);
    finder.found
}

/// Every leaf in the file bound to the module-level declaration of `name`
pub fn occurrences_of(tree: &SyntaxTree, name: &str) -> Vec<Occurrence> {
    let (found, _) = occurrences_with_candidate(tree, name, None);
    found
}

/// Occurrences of `name` at which `candidate` is bound by an inner scope.
///
/// Renaming `name` to `candidate` would make those sites resolve to the inner
/// declaration instead.
pub fn captured_sites(tree: &SyntaxTree, name: &str, candidate: &str) -> Vec<NodeId> {
    let (_, captured) = occurrences_with_candidate(tree, name, Some(candidate));
    captured
}

/// Uses (not declarations) of `name` within `statements`
pub fn count_uses(tree: &SyntaxTree, name: &str, statements: &[NodeId]) -> usize {
    let mut finder = ModuleOccurrences {
        filter: Some(name),
        candidate: None,
        found: IndexMap::new(),
        captured: Vec::new(),
    };
    let mut scope = module_scope(tree);
    walk(tree, statements, &mut scope, &mut finder);
    finder
        .found
        .get(name)
        .map(|sites| sites.iter().filter(|o| !o.binding).count())
        .unwrap_or(0)
}

/// Uses of `name` that resolve to no declaration in the file
pub fn unresolved_uses(tree: &SyntaxTree, name: &str) -> usize {
    struct Unresolved<'a> {
        name: &'a str,
        count: usize,
    }
    impl ScopeVisitor for Unresolved<'_> {
        fn reference(&mut self, _tree: &SyntaxTree, _id: NodeId, name: &str, scope: &ScopeTracker) {
            if name == self.name && !scope.is_bound(name) {
                self.count += 1;
            }
        }
    }

    let mut finder = Unresolved { name, count: 0 };
    let mut scope = module_scope(tree);
    walk(tree, &tree.top_level(), &mut scope, &mut finder);
    finder.count
}

fn occurrences_with_candidate(
    tree: &SyntaxTree,
    name: &str,
    candidate: Option<&str>,
) -> (Vec<Occurrence>, Vec<NodeId>) {
    let mut finder = ModuleOccurrences {
        filter: Some(name),
        candidate,
        found: IndexMap::new(),
        captured: Vec::new(),
    };
    let mut scope = module_scope(tree);
    walk(tree, &tree.top_level(), &mut scope, &mut finder);
    let found = finder.found.swap_remove(name).unwrap_or_default();
    (found, finder.captured)
}

fn module_scope(tree: &SyntaxTree) -> ScopeTracker {
    let mut scope = ScopeTracker::new();
    scope.hoist(tree, tree.root());
    scope
}

struct ModuleOccurrences<'a> {
    filter: Option<&'a str>,
    candidate: Option<&'a str>,
    found: IndexMap<String, Vec<Occurrence>>,
    captured: Vec<NodeId>,
}

impl ModuleOccurrences<'_> {
    fn record(&mut self, id: NodeId, name: &str, binding: bool, scope: &ScopeTracker) {
        if self.filter.is_some_and(|filter| filter != name) {
            return;
        }
        if scope.resolve(name) != Some(0) {
            return;
        }
        if let Some(candidate) = self.candidate {
            if scope.resolve(candidate).is_some_and(|depth| depth > 0) {
                self.captured.push(id);
            }
        }
        self.found
            .entry(name.to_string())
            .or_default()
            .push(Occurrence { id, binding });
    }
}

impl ScopeVisitor for ModuleOccurrences<'_> {
    fn reference(&mut self, _tree: &SyntaxTree, id: NodeId, name: &str, scope: &ScopeTracker) {
        self.record(id, name, false, scope);
    }

    fn binding(
        &mut self,
        _tree: &SyntaxTree,
        id: NodeId,
        name: &str,
        _kind: BindingKind,
        scope: &ScopeTracker,
    ) {
        self.record(id, name, true, scope);
    }
}
