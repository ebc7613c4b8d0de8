//! Program analysis over arena trees: scopes, free names and references

pub mod dependencies;
pub mod references;
pub mod scope;

pub use dependencies::{DependencyAnalyzer, DependencySet, BUILTIN_GLOBALS};
pub use references::{
    captured_sites, count_uses, module_occurrences, occurrences_of, unresolved_uses, Occurrence,
};
pub use scope::{walk, ScopeTracker, ScopeVisitor};
