//! Free-name collection for groups of declarations

use super::scope::{walk, ScopeTracker, ScopeVisitor};
use crate::ast::{NodeId, NodeKind, SyntaxTree};
use indexmap::IndexSet;
use std::collections::HashSet;
use tracing::debug;

/// Free names referenced by a group of nodes, in first-use order
pub type DependencySet = IndexSet<String>;

/// Globals of the ECMAScript, browser, Node.js and TypeScript lib environments
/// that are never reported as dependencies.
pub const BUILTIN_GLOBALS: &[&str] = &[
    // ECMAScript
    "undefined", "NaN", "Infinity", "globalThis", "eval", "isFinite", "isNaN",
    "parseFloat", "parseInt", "decodeURI", "decodeURIComponent", "encodeURI",
    "encodeURIComponent", "escape", "unescape", "arguments",
    "Object", "Function", "Array", "String", "Number", "Boolean", "Symbol", "BigInt",
    "Math", "JSON", "Date", "RegExp", "Promise", "Proxy", "Reflect", "Intl",
    "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "FinalizationRegistry",
    "Error", "AggregateError", "EvalError", "RangeError", "ReferenceError",
    "SyntaxError", "TypeError", "URIError",
    "ArrayBuffer", "SharedArrayBuffer", "DataView", "Atomics",
    "Int8Array", "Uint8Array", "Uint8ClampedArray", "Int16Array", "Uint16Array",
    "Int32Array", "Uint32Array", "Float32Array", "Float64Array",
    "BigInt64Array", "BigUint64Array", "Iterator",
    // Host environments
    "console", "window", "self", "document", "navigator", "location", "history",
    "localStorage", "sessionStorage", "performance", "crypto", "fetch",
    "alert", "confirm", "prompt", "atob", "btoa", "structuredClone", "queueMicrotask",
    "setTimeout", "clearTimeout", "setInterval", "clearInterval",
    "setImmediate", "clearImmediate", "requestAnimationFrame", "cancelAnimationFrame",
    "URL", "URLSearchParams", "TextEncoder", "TextDecoder", "AbortController",
    "AbortSignal", "Blob", "File", "FormData", "Headers", "Request", "Response",
    "Event", "EventTarget", "CustomEvent", "HTMLElement", "Element", "Node",
    "WebSocket", "Worker", "XMLHttpRequest",
    "process", "global", "Buffer", "require", "module", "exports",
    "__dirname", "__filename",
    // TypeScript lib types
    "Partial", "Required", "Readonly", "Record", "Pick", "Omit", "Exclude",
    "Extract", "NonNullable", "ReturnType", "Parameters", "ConstructorParameters",
    "InstanceType", "Awaited", "ThisType", "NoInfer", "Uppercase", "Lowercase",
    "Capitalize", "Uncapitalize", "PromiseLike", "ArrayLike", "ReadonlyArray",
    "ReadonlyMap", "ReadonlySet", "Iterable", "IterableIterator", "AsyncIterable",
    "AsyncIterableIterator", "Generator", "AsyncGenerator", "PropertyKey",
    "TemplateStringsArray", "JSX",
];

/// Computes the names a group of nodes needs from outside itself
#[derive(Debug, Clone)]
pub struct DependencyAnalyzer {
    globals: HashSet<String>,
}

impl Default for DependencyAnalyzer {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl DependencyAnalyzer {
    /// An analyzer whose allowlist is the built-ins plus `extra_globals`
    pub fn new(extra_globals: &[String]) -> Self {
        let globals = BUILTIN_GLOBALS
            .iter()
            .map(|name| name.to_string())
            .chain(extra_globals.iter().cloned())
            .collect();
        Self { globals }
    }

    pub fn is_global(&self, name: &str) -> bool {
        self.globals.contains(name)
    }

    /// Free names of `nodes`.
    ///
    /// The names the nodes themselves declare at their own level are bound in
    /// a fresh frame pushed onto `scope` for the duration of the call, so they
    /// never count as dependencies of one another.
    pub fn collect(
        &self,
        tree: &SyntaxTree,
        nodes: &[NodeId],
        exclude: &HashSet<String>,
        scope: &mut ScopeTracker,
    ) -> DependencySet {
        scope.enter();
        for node in nodes {
            for binding in tree.declared_bindings(*node) {
                if let NodeKind::Binding { name, kind, .. } = &tree.node(binding).kind {
                    scope.declare(name.clone(), *kind);
                }
            }
        }

        let mut collector = FreeNames {
            analyzer: self,
            exclude,
            found: DependencySet::new(),
        };
        walk(tree, nodes, scope, &mut collector);
        scope.leave();

        debug!(
            file_path = %tree.path().display(),
            dependencies = ?collector.found,
            "Collected free names"
        );
        collector.found
    }
}

struct FreeNames<'a> {
    analyzer: &'a DependencyAnalyzer,
    exclude: &'a HashSet<String>,
    found: DependencySet,
}

impl ScopeVisitor for FreeNames<'_> {
    fn reference(&mut self, _tree: &SyntaxTree, _id: NodeId, name: &str, scope: &ScopeTracker) {
        if scope.is_bound(name) || self.exclude.contains(name) || self.analyzer.is_global(name) {
            return;
        }
        self.found.insert(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn free_names(source: &str) -> Vec<String> {
        let tree = SwcCodec.parse(Path::new("deps.ts"), source).unwrap();
        let nodes = tree.top_level();
        DependencyAnalyzer::default()
            .collect(&tree, &nodes, &HashSet::new(), &mut ScopeTracker::new())
            .into_iter()
            .collect()
    }

    #[test]
    fn parameters_and_locals_are_not_dependencies() {
        let names = free_names(
            "function f(a, { b, c: [d] }) {\n  const e = a + b + d;\n  return helper(e, shared.value.deep);\n}\n",
        );
        assert_eq!(names, vec!["helper".to_string(), "shared".to_string()]);
    }

    #[test]
    fn nested_scopes_neither_leak_nor_hide_outer_names() {
        let names = free_names(
            "function f() {\n  const inner = () => { const local = 1; return local + outer; };\n  return local;\n}\n",
        );
        assert_eq!(names, vec!["outer".to_string(), "local".to_string()]);
    }

    #[test]
    fn builtins_and_extra_globals_are_ignored() {
        let tree = SwcCodec
            .parse(
                Path::new("deps.ts"),
                "function f() { console.log(Math.max(1, 2)); return chrome.tabs; }\n",
            )
            .unwrap();
        let analyzer = DependencyAnalyzer::new(&["chrome".to_string()]);
        let found = analyzer.collect(
            &tree,
            &tree.top_level(),
            &HashSet::new(),
            &mut ScopeTracker::new(),
        );
        assert!(found.is_empty());
    }

    #[test]
    fn excluded_names_are_skipped() {
        let tree = SwcCodec
            .parse(Path::new("deps.ts"), "function f() { return g() + h(); }\n")
            .unwrap();
        let exclude: HashSet<String> = ["g".to_string()].into_iter().collect();
        let found = DependencyAnalyzer::default().collect(
            &tree,
            &tree.top_level(),
            &exclude,
            &mut ScopeTracker::new(),
        );
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["h".to_string()]);
    }

    #[test]
    fn enum_members_are_bound_inside_the_enum() {
        let names = free_names("enum Level { Low = 1, High = Low * 2, Max = High + offset }\n");
        assert_eq!(names, vec!["offset".to_string()]);
    }

    #[test]
    fn type_references_are_dependencies_but_type_parameters_are_not() {
        let names = free_names("function f<T>(value: T, options: Options): Result<T> { return wrap(value); }\n");
        assert_eq!(
            names,
            vec![
                "Options".to_string(),
                "Result".to_string(),
                "wrap".to_string(),
            ]
        );
    }
}
