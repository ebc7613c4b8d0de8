//! Scope-aware rename of a top-level declaration within one file

use super::OperationContext;
use crate::analysis::{captured_sites, occurrences_of, unresolved_uses};
use crate::ast::SyntaxTree;
use crate::command::{self, Selector};
use crate::error::{RefactorError, RefactorResult, SchemaError};
use crate::logging;
use tracing::{debug, info};

/// Summary of a completed rename
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    /// Declaring leaves rewritten
    pub declarations: usize,
    /// Referencing leaves rewritten
    pub references: usize,
}

/// Rename the declaration `selector` names, and every reference bound to it,
/// to `new_name`.
///
/// References to a different declaration that shadows the old name are left
/// alone. The rename is refused when `new_name` is already bound at the top
/// level, when an inner declaration of `new_name` would capture a renamed
/// reference, or when an existing free use of `new_name` would start
/// resolving to the renamed declaration.
pub fn rename(
    ctx: &OperationContext<'_>,
    tree: &mut SyntaxTree,
    selector: &Selector,
    new_name: &str,
) -> RefactorResult<RenameReport> {
    let _span = logging::operation_span("rename", &selector.name).entered();

    if !command::is_identifier(new_name) {
        return Err(SchemaError::invalid_field("newName", "not a valid identifier").into());
    }
    ctx.resolver.resolve(tree, selector)?;
    if new_name == selector.name {
        debug!("New name equals old name");
        return Ok(RenameReport::default());
    }

    let bound_at_top = tree
        .top_level()
        .into_iter()
        .any(|stmt| tree.declared_names(stmt).iter().any(|n| n == new_name));
    if bound_at_top {
        return Err(RefactorError::name_collision(new_name, tree.path()));
    }
    let captured = captured_sites(tree, &selector.name, new_name);
    if !captured.is_empty() {
        debug!(sites = captured.len(), "Inner declaration would capture renamed references");
        return Err(RefactorError::name_collision(new_name, tree.path()));
    }
    if unresolved_uses(tree, new_name) > 0 {
        return Err(RefactorError::name_collision(new_name, tree.path()));
    }

    let mut report = RenameReport::default();
    for occurrence in occurrences_of(tree, &selector.name) {
        tree.set_name(occurrence.id, new_name);
        if occurrence.binding {
            report.declarations += 1;
        } else {
            report.references += 1;
        }
    }

    info!(
        file_path = %tree.path().display(),
        new_name = %new_name,
        references = report.references,
        "Renamed declaration"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::DeclarationKind;
    use crate::operations::test_support::{selector, Fixture};
    use pretty_assertions::assert_eq;

    #[test]
    fn renames_declaration_and_call_site() {
        let fx = Fixture::new();
        let mut tree = fx.parse(
            "a.ts",
            "export function functionToRename() {\n  return 1;\n}\n\nexport function caller() {\n  return functionToRename();\n}\n",
        );
        let report = rename(
            &fx.context(),
            &mut tree,
            &selector("functionToRename", DeclarationKind::Function, "a.ts"),
            "renamedFunction",
        )
        .unwrap();

        assert_eq!(report, RenameReport { declarations: 1, references: 1 });
        assert_eq!(
            fx.print(&tree),
            "export function renamedFunction() {\n  return 1;\n}\n\nexport function caller() {\n  return renamedFunction();\n}\n"
        );
    }

    #[test]
    fn shadowing_declarations_are_untouched() {
        let fx = Fixture::new();
        let mut tree = fx.parse(
            "a.ts",
            "const value = 1;\nfunction a() { return value; }\nfunction b(value: number) { return value; }\nfunction c() { const value = 2; return value; }\n",
        );
        rename(
            &fx.context(),
            &mut tree,
            &selector("value", DeclarationKind::Variable, "a.ts"),
            "total",
        )
        .unwrap();
        assert_eq!(
            fx.print(&tree),
            "const total = 1;\nfunction a() { return total; }\nfunction b(value: number) { return value; }\nfunction c() { const value = 2; return value; }\n"
        );
    }

    #[test]
    fn shorthand_properties_keep_their_key() {
        let fx = Fixture::new();
        let mut tree = fx.parse("a.ts", "const amount = 3;\nexport const order = { amount };\n");
        rename(
            &fx.context(),
            &mut tree,
            &selector("amount", DeclarationKind::Variable, "a.ts"),
            "quantity",
        )
        .unwrap();
        assert_eq!(
            fx.print(&tree),
            "const quantity = 3;\nexport const order = { amount: quantity };\n"
        );
    }

    #[test]
    fn collisions_are_refused() {
        let fx = Fixture::new();
        let source = "function target() {}\nfunction taken() {}\nfunction user(local: number) { return target() + local + free; }\n";
        let cases = [("taken", "top-level"), ("local", "capture"), ("free", "free use")];
        for (new_name, case) in cases {
            let mut tree = fx.parse("a.ts", source);
            let err = rename(
                &fx.context(),
                &mut tree,
                &selector("target", DeclarationKind::Function, "a.ts"),
                new_name,
            )
            .unwrap_err();
            assert!(
                matches!(err, RefactorError::NameCollision { .. }),
                "{case}: {err}"
            );
            assert_eq!(fx.print(&tree), source, "{case}");
        }
    }

    #[test]
    fn missing_symbol_is_reported() {
        let fx = Fixture::new();
        let mut tree = fx.parse("a.ts", "function present() {}\n");
        let err = rename(
            &fx.context(),
            &mut tree,
            &selector("absent", DeclarationKind::Function, "a.ts"),
            "other",
        )
        .unwrap_err();
        assert!(matches!(err, RefactorError::SymbolNotFound { .. }));
    }
}
