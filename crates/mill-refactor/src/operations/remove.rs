//! Remove a top-level declaration

use super::OperationContext;
use crate::analysis::unresolved_uses;
use crate::ast::SyntaxTree;
use crate::command::Selector;
use crate::error::RefactorResult;
use crate::imports;
use crate::logging;
use crate::splice;
use std::collections::HashSet;
use tracing::{info, warn};

/// Summary of a completed removal
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoveReport {
    /// Names the removed statement declared
    pub removed: Vec<String>,
    /// `export { name }` specifiers and `export default name` statements dropped
    pub export_references: usize,
    /// References left without a declaration
    pub dangling_references: usize,
}

/// Prune the declaration `selector` names, along with any export statement
/// that only re-exports it. Remaining references are reported, not rewritten.
pub fn remove(
    ctx: &OperationContext<'_>,
    tree: &mut SyntaxTree,
    selector: &Selector,
) -> RefactorResult<RemoveReport> {
    let _span = logging::operation_span("remove", &selector.name).entered();

    let stmt = ctx.resolver.resolve(tree, selector)?;
    let removed = tree.declared_names(stmt);
    splice::prune(tree, &[stmt]);

    let names: HashSet<String> = removed.iter().cloned().collect();
    let export_references = imports::remove_export_references(tree, &names)?;
    let dangling_references = removed
        .iter()
        .map(|name| unresolved_uses(tree, name))
        .sum();
    if dangling_references > 0 {
        warn!(
            file_path = %tree.path().display(),
            dangling = dangling_references,
            "Removed declaration is still referenced"
        );
    }

    info!(
        file_path = %tree.path().display(),
        removed = ?removed,
        "Removed declaration"
    );
    Ok(RemoveReport {
        removed,
        export_references,
        dangling_references,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleanup::is_balanced;
    use crate::command::DeclarationKind;
    use crate::error::RefactorError;
    use crate::operations::test_support::{selector, Fixture};
    use crate::splice::generate;
    use pretty_assertions::assert_eq;

    #[test]
    fn removes_class_and_keeps_output_balanced() {
        let fx = Fixture::new();
        let mut tree = fx.parse(
            "a.ts",
            "export class Legacy {\n  run() {\n    if (x) {\n      return 1;\n    }\n  }\n}\n\nexport function keep() {\n  return 2;\n}\n",
        );
        let report = remove(
            &fx.context(),
            &mut tree,
            &selector("Legacy", DeclarationKind::Class, "a.ts"),
        )
        .unwrap();
        assert_eq!(report.removed, vec!["Legacy"]);
        assert_eq!(report.dangling_references, 0);

        let out = generate(&fx.codec, &tree, true, true).unwrap();
        assert_eq!(out.as_str(), "export function keep() {\n  return 2;\n}\n");
        assert!(is_balanced(out.as_str()));
    }

    #[test]
    fn export_specifiers_go_with_the_declaration() {
        let fx = Fixture::new();
        let mut tree = fx.parse(
            "a.ts",
            "function a() {}\nfunction b() {}\nexport { a, b };\n",
        );
        let report = remove(
            &fx.context(),
            &mut tree,
            &selector("b", DeclarationKind::Function, "a.ts"),
        )
        .unwrap();
        assert_eq!(report.export_references, 1);
        assert_eq!(fx.print(&tree), "function a() {}\nexport { a };\n");
    }

    #[test]
    fn dangling_references_are_counted() {
        let fx = Fixture::new();
        let mut tree = fx.parse(
            "a.ts",
            "const limit = 10;\nexport function check(n: number) { return n < limit; }\n",
        );
        let report = remove(
            &fx.context(),
            &mut tree,
            &selector("limit", DeclarationKind::Variable, "a.ts"),
        )
        .unwrap();
        assert_eq!(report.dangling_references, 1);
    }

    #[test]
    fn removing_twice_fails() {
        let fx = Fixture::new();
        let mut tree = fx.parse("a.ts", "function gone() {}\n");
        let sel = selector("gone", DeclarationKind::Function, "a.ts");
        remove(&fx.context(), &mut tree, &sel).unwrap();
        let err = remove(&fx.context(), &mut tree, &sel).unwrap_err();
        assert!(matches!(err, RefactorError::SymbolNotFound { .. }));
    }
}
