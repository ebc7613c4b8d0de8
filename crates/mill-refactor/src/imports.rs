//! Import and export statement synthesis and editing.
//!
//! Import declarations are rewritten through the swc AST and codegen, then
//! lowered back into arena nodes, so generated imports are always valid
//! syntax regardless of the identifiers and module paths involved.

use crate::ast::print::node_text;
use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::clone::clone_subtree;
use crate::codec::{LanguageCodec, SwcCodec};
use crate::error::{RefactorError, RefactorResult};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use swc_common::{sync::Lrc, FileName, FilePathMapping, SourceMap, DUMMY_SP};
use swc_ecma_ast::{
    ExportSpecifier, Expr, Ident, ImportDecl, ImportDefaultSpecifier, ImportNamedSpecifier,
    ImportSpecifier, Module, ModuleDecl, ModuleExportName, ModuleItem,
};
use swc_ecma_codegen::{text_writer::JsWriter, Emitter};
use swc_ecma_parser::{lexer::Lexer, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

const MODULE_EXTENSIONS: &[&str] = &["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Names to import from one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportRequest {
    pub specifier: String,
    pub named: Vec<String>,
    pub default: Option<String>,
}

/// Relative module specifier `from_file` uses to import `to_file`
pub fn module_specifier(from_file: &Path, to_file: &Path) -> String {
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    let target = strip_module_extension(&normalize(to_file));
    let relative = pathdiff::diff_paths(&target, normalize(from_dir)).unwrap_or(target);
    as_relative_specifier(&relative)
}

/// Re-express a specifier written in `from_file` as seen from `to_file`.
///
/// Bare package specifiers are returned unchanged.
pub fn rebase_specifier(specifier: &str, from_file: &Path, to_file: &Path) -> String {
    if !is_relative_specifier(specifier) {
        return specifier.to_string();
    }
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    let to_dir = to_file.parent().unwrap_or_else(|| Path::new(""));
    let resolved = normalize(&from_dir.join(specifier));
    let relative = pathdiff::diff_paths(&resolved, normalize(to_dir)).unwrap_or(resolved);
    as_relative_specifier(&relative)
}

/// Whether two specifiers written in the same file name the same module
pub fn same_module(a: &str, b: &str) -> bool {
    strip_module_extension(&normalize(Path::new(a))) == strip_module_extension(&normalize(Path::new(b)))
}

/// Whether `specifier`, written in `from_file`, resolves to `file`
pub fn refers_to(specifier: &str, from_file: &Path, file: &Path) -> bool {
    if !is_relative_specifier(specifier) {
        return false;
    }
    let from_dir = from_file.parent().unwrap_or_else(|| Path::new(""));
    strip_module_extension(&normalize(&from_dir.join(specifier)))
        == strip_module_extension(&normalize(file))
}

fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

/// Lexically resolve `.` and `..` components
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn strip_module_extension(path: &Path) -> PathBuf {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if MODULE_EXTENSIONS.contains(&ext) => path.with_extension(""),
        _ => path.to_path_buf(),
    }
}

fn as_relative_specifier(path: &Path) -> String {
    let joined = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if joined.starts_with("../") || joined == ".." {
        joined
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        format!("./{}", joined)
    }
}

fn parse_imports(text: &str) -> RefactorResult<(Lrc<SourceMap>, Module)> {
    let cm = Lrc::new(SourceMap::new(FilePathMapping::empty()));
    let file_name = Lrc::new(FileName::Anon);
    let source_file = cm.new_source_file(file_name, text.to_string());

    let syntax = Syntax::Typescript(TsSyntax {
        tsx: true,
        decorators: true,
        ..Default::default()
    });
    let lexer = Lexer::new(
        syntax,
        Default::default(),
        StringInput::from(&*source_file),
        None,
    );
    let mut parser = Parser::new_from(lexer);
    let module = parser.parse_module().map_err(|e| {
        RefactorError::generation("<import>", format!("Failed to parse import: {:?}", e.kind()))
    })?;
    Ok((cm, module))
}

fn emit_module(cm: &Lrc<SourceMap>, module: &Module) -> RefactorResult<String> {
    let mut buf = vec![];
    {
        let mut emitter = Emitter {
            cfg: Default::default(),
            cm: cm.clone(),
            comments: None,
            wr: JsWriter::new(cm.clone(), "\n", &mut buf, None),
        };
        emitter
            .emit_module(module)
            .map_err(|e| RefactorError::generation("<import>", format!("Failed to emit import: {:?}", e)))?;
    }
    String::from_utf8(buf)
        .map(|text| text.trim().to_string())
        .map_err(|e| RefactorError::generation("<import>", e.to_string()))
}

fn quoted(specifier: &str) -> String {
    serde_json::Value::String(specifier.to_string()).to_string()
}

fn into_import(item: ModuleItem) -> Option<ImportDecl> {
    match item {
        ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => Some(import),
        _ => None,
    }
}

fn specifier_local(specifier: &ImportSpecifier) -> &str {
    match specifier {
        ImportSpecifier::Named(named) => named.local.sym.as_ref(),
        ImportSpecifier::Default(default) => default.local.sym.as_ref(),
        ImportSpecifier::Namespace(ns) => ns.local.sym.as_ref(),
    }
}

fn named_specifier(name: &str) -> ImportSpecifier {
    ImportSpecifier::Named(ImportNamedSpecifier {
        span: DUMMY_SP,
        local: Ident::new_no_ctxt(name.into(), DUMMY_SP),
        imported: None,
        is_type_only: false,
    })
}

fn default_specifier(name: &str) -> ImportSpecifier {
    ImportSpecifier::Default(ImportDefaultSpecifier {
        span: DUMMY_SP,
        local: Ident::new_no_ctxt(name.into(), DUMMY_SP),
    })
}

/// Text of a fresh `import` statement
pub fn import_statement_text(request: &ImportRequest) -> RefactorResult<String> {
    let (cm, mut module) =
        parse_imports(&format!("import {{}} from {};", quoted(&request.specifier)))?;
    if let Some(ModuleItem::ModuleDecl(ModuleDecl::Import(import))) = module.body.first_mut() {
        if let Some(default) = &request.default {
            import.specifiers.push(default_specifier(default));
        }
        for name in &request.named {
            import.specifiers.push(named_specifier(name));
        }
    }
    emit_module(&cm, &module)
}

/// Text of a fresh `import local = require("specifier")` statement
pub fn import_equals_text(local: &str, specifier: &str) -> RefactorResult<String> {
    let (cm, module) = parse_imports(&format!("import {} = require({});", local, quoted(specifier)))?;
    emit_module(&cm, &module)
}

/// Lower generated import text into `tree` as a detached statement
fn lower_statement(tree: &mut SyntaxTree, text: &str) -> RefactorResult<NodeId> {
    let scratch = SwcCodec
        .parse(tree.path(), text)
        .map_err(|e| RefactorError::generation(tree.path(), e.to_string()))?;
    let stmt = scratch
        .top_level()
        .first()
        .copied()
        .ok_or_else(|| RefactorError::generation(tree.path(), "generated import is empty"))?;
    Ok(clone_subtree(&scratch, stmt, tree))
}

/// Names bound by top-level imports of `tree`
pub fn imported_names(tree: &SyntaxTree) -> HashSet<String> {
    tree.top_level()
        .into_iter()
        .filter(|stmt| tree.node(*stmt).kind.import_source().is_some())
        .flat_map(|stmt| tree.declared_names(stmt))
        .collect()
}

/// Ensure `tree` imports the requested names, merging into an existing
/// import of the same module when one can take them.
pub fn add_import(tree: &mut SyntaxTree, request: &ImportRequest) -> RefactorResult<()> {
    let bound = imported_names(tree);
    let request = ImportRequest {
        specifier: request.specifier.clone(),
        named: request
            .named
            .iter()
            .filter(|name| !bound.contains(*name))
            .cloned()
            .collect(),
        default: request.default.clone().filter(|name| !bound.contains(name)),
    };
    if request.named.is_empty() && request.default.is_none() {
        return Ok(());
    }

    let existing = tree.top_level().into_iter().find(|stmt| {
        matches!(&tree.node(*stmt).kind, NodeKind::Import { source } if same_module(source, &request.specifier))
    });

    if let Some(stmt) = existing {
        if let Some(merged) = merge_into(tree, stmt, &request)? {
            let replacement = lower_statement(tree, &merged)?;
            let comments = std::mem::take(&mut tree.node_mut(stmt).comments);
            tree.node_mut(replacement).comments = comments;
            tree.replace_statement(stmt, replacement);
            debug!(
                file_path = %tree.path().display(),
                specifier = %request.specifier,
                "Merged names into existing import"
            );
            return Ok(());
        }
    }

    let text = import_statement_text(&request)?;
    let stmt = lower_statement(tree, &text)?;
    tree.insert_import_statement(stmt);
    debug!(
        file_path = %tree.path().display(),
        import = %text,
        "Added import"
    );
    Ok(())
}

fn merge_into(
    tree: &SyntaxTree,
    stmt: NodeId,
    request: &ImportRequest,
) -> RefactorResult<Option<String>> {
    let (cm, mut module) = parse_imports(&node_text_without_comments(tree, stmt))?;
    let body = std::mem::take(&mut module.body);
    let Some(mut import) = body.into_iter().find_map(into_import) else {
        return Ok(None);
    };
    let has_namespace = import
        .specifiers
        .iter()
        .any(|s| matches!(s, ImportSpecifier::Namespace(_)));
    let has_default = import
        .specifiers
        .iter()
        .any(|s| matches!(s, ImportSpecifier::Default(_)));
    if import.type_only || has_namespace || (request.default.is_some() && has_default) {
        return Ok(None);
    }

    if let Some(default) = &request.default {
        import.specifiers.insert(0, default_specifier(default));
    }
    for name in &request.named {
        import.specifiers.push(named_specifier(name));
    }
    let module = Module {
        body: vec![ModuleItem::ModuleDecl(ModuleDecl::Import(import))],
        ..module
    };
    emit_module(&cm, &module).map(Some)
}

fn node_text_without_comments(tree: &SyntaxTree, stmt: NodeId) -> String {
    let mut copy = SyntaxTree::empty(tree.path());
    let id = clone_subtree(tree, stmt, &mut copy);
    copy.node_mut(id).comments.clear();
    node_text(&copy, id)
}

/// Text of `stmt` keeping only the specifiers whose local name is in `keep`,
/// importing from `specifier` instead. `None` when nothing is kept.
pub fn retain_specifiers(
    tree: &SyntaxTree,
    stmt: NodeId,
    keep: &HashSet<String>,
    specifier: &str,
) -> RefactorResult<Option<String>> {
    let template = format!("import {{}} from {};\n", quoted(specifier));
    let original = node_text_without_comments(tree, stmt);
    let (cm, mut module) = parse_imports(&format!("{}{}", template, original))?;
    let body = std::mem::take(&mut module.body);
    let mut imports = body.into_iter().filter_map(into_import);
    let (Some(mut target), Some(original)) = (imports.next(), imports.next()) else {
        return Ok(None);
    };

    target.type_only = original.type_only;
    target.with = original.with;
    target.specifiers = original
        .specifiers
        .into_iter()
        .filter(|s| keep.contains(specifier_local(s)))
        .collect();
    if target.specifiers.is_empty() {
        return Ok(None);
    }

    let module = Module {
        body: vec![ModuleItem::ModuleDecl(ModuleDecl::Import(target))],
        ..module
    };
    emit_module(&cm, &module).map(Some)
}

/// Insert generated import text as a new statement
pub fn insert_import_text(tree: &mut SyntaxTree, text: &str) -> RefactorResult<()> {
    let stmt = lower_statement(tree, text)?;
    tree.insert_import_statement(stmt);
    Ok(())
}

/// Drop import specifiers whose local name is in `names`, optionally only
/// from imports of modules matching `source`. Imports left empty are removed.
/// Returns the number of specifiers dropped.
pub fn remove_imported_names(
    tree: &mut SyntaxTree,
    names: &HashSet<String>,
    source: Option<&str>,
) -> RefactorResult<usize> {
    let mut removed = 0;
    for stmt in tree.top_level() {
        let Some(imported_from) = tree.node(stmt).kind.import_source() else {
            continue;
        };
        if source.is_some_and(|s| !same_module(s, imported_from)) {
            continue;
        }
        let declared = tree.declared_names(stmt);
        let dropping = declared.iter().filter(|n| names.contains(*n)).count();
        if dropping == 0 {
            continue;
        }
        removed += dropping;

        if dropping == declared.len() {
            tree.remove_statement(stmt);
            continue;
        }
        let keep: HashSet<String> = declared.into_iter().filter(|n| !names.contains(n)).collect();
        let imported_from = imported_from.to_string();
        if let Some(text) = retain_specifiers(tree, stmt, &keep, &imported_from)? {
            let replacement = lower_statement(tree, &text)?;
            let comments = std::mem::take(&mut tree.node_mut(stmt).comments);
            tree.node_mut(replacement).comments = comments;
            tree.replace_statement(stmt, replacement);
        }
    }
    Ok(removed)
}

/// Drop `export { name }` specifiers and `export default name` statements
/// that refer to any of `names`. Returns the number of references dropped.
pub fn remove_export_references(
    tree: &mut SyntaxTree,
    names: &HashSet<String>,
) -> RefactorResult<usize> {
    let mut removed = 0;
    for stmt in tree.top_level() {
        if !matches!(tree.node(stmt).kind, NodeKind::Statement) {
            continue;
        }
        let referenced = tree
            .children(stmt)
            .into_iter()
            .filter(|child| {
                matches!(&tree.node(*child).kind, NodeKind::Ident { name, export: true, .. } if names.contains(name))
            })
            .count();
        if referenced == 0 {
            continue;
        }
        removed += referenced;

        let (cm, mut module) = parse_imports(&node_text_without_comments(tree, stmt))?;
        let body = std::mem::take(&mut module.body);
        let mut kept = Vec::new();
        for item in body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(mut export)) if export.src.is_none() => {
                    export.specifiers.retain(|specifier| match specifier {
                        ExportSpecifier::Named(named) => match &named.orig {
                            ModuleExportName::Ident(orig) => !names.contains(&*orig.sym),
                            _ => true,
                        },
                        _ => true,
                    });
                    if !export.specifiers.is_empty() {
                        kept.push(ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(export)));
                    }
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(export))
                    if matches!(&*export.expr, Expr::Ident(ident) if names.contains(&*ident.sym)) => {}
                other => kept.push(other),
            }
        }

        if kept.is_empty() {
            tree.remove_statement(stmt);
            continue;
        }
        let text = emit_module(&cm, &Module { body: kept, ..module })?;
        let replacement = lower_statement(tree, &text)?;
        let comments = std::mem::take(&mut tree.node_mut(stmt).comments);
        tree.node_mut(replacement).comments = comments;
        tree.replace_statement(stmt, replacement);
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print::print_tree;
    use pretty_assertions::assert_eq;

    fn normalized(text: &str) -> String {
        text.replace('\'', "\"").split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn specifiers_are_relative_and_extensionless() {
        assert_eq!(module_specifier(Path::new("src/a.ts"), Path::new("src/target.ts")), "./target");
        assert_eq!(
            module_specifier(Path::new("src/a.ts"), Path::new("src/util/strings.ts")),
            "./util/strings"
        );
        assert_eq!(
            module_specifier(Path::new("src/util/a.ts"), Path::new("src/b.tsx")),
            "../b"
        );
    }

    #[test]
    fn relative_specifiers_are_rebased() {
        assert_eq!(
            rebase_specifier("./math", Path::new("src/a.ts"), Path::new("src/util/b.ts")),
            "../math"
        );
        assert_eq!(
            rebase_specifier("../shared/x", Path::new("src/app/a.ts"), Path::new("src/b.ts")),
            "./shared/x"
        );
        assert_eq!(
            rebase_specifier("lodash", Path::new("src/a.ts"), Path::new("lib/b.ts")),
            "lodash"
        );
    }

    #[test]
    fn specifiers_are_matched_against_files() {
        assert!(refers_to("./target", Path::new("src/a.ts"), Path::new("src/target.ts")));
        assert!(refers_to("../src/target.js", Path::new("src/a.ts"), Path::new("src/target.ts")));
        assert!(!refers_to("./other", Path::new("src/a.ts"), Path::new("src/target.ts")));
        assert!(!refers_to("target", Path::new("src/a.ts"), Path::new("target.ts")));
    }

    #[test]
    fn generates_named_import() {
        let text = import_statement_text(&ImportRequest {
            specifier: "./target".to_string(),
            named: vec!["formatString".to_string()],
            default: None,
        })
        .unwrap();
        assert_eq!(normalized(&text), "import { formatString } from \"./target\";");
    }

    #[test]
    fn generates_import_equals() {
        let text = import_equals_text("fs", "../node/fs").unwrap();
        assert_eq!(normalized(&text), "import fs = require(\"../node/fs\");");
    }

    #[test]
    fn merges_into_existing_import() {
        let mut tree = SwcCodec
            .parse(Path::new("a.ts"), "import { a } from './target';\n\nconsole.log(a);\n")
            .unwrap();
        add_import(
            &mut tree,
            &ImportRequest {
                specifier: "./target".to_string(),
                named: vec!["b".to_string()],
                default: None,
            },
        )
        .unwrap();
        let printed = print_tree(&tree);
        assert_eq!(tree.top_level().len(), 2);
        assert!(normalized(&printed).starts_with("import { a, b } from \"./target\";"));
    }

    #[test]
    fn removes_names_and_empty_imports() {
        let mut tree = SwcCodec
            .parse(
                Path::new("a.ts"),
                "import { a, b } from './x';\nimport { c } from './y';\nuse(a);\n",
            )
            .unwrap();
        let names: HashSet<String> = ["b".to_string(), "c".to_string()].into_iter().collect();
        let removed = remove_imported_names(&mut tree, &names, None).unwrap();
        assert_eq!(removed, 2);
        let printed = print_tree(&tree);
        assert_eq!(normalized(&printed), "import { a } from \"./x\"; use(a);");
    }

    #[test]
    fn export_references_are_removed() {
        let mut tree = SwcCodec
            .parse(
                Path::new("a.ts"),
                "function a() {}\nfunction b() {}\nexport { a, b };\nexport default b;\n",
            )
            .unwrap();
        let names: HashSet<String> = ["b".to_string()].into_iter().collect();
        assert_eq!(remove_export_references(&mut tree, &names).unwrap(), 2);
        assert_eq!(
            normalized(&print_tree(&tree)),
            "function a() {} function b() {} export { a };"
        );
    }

    #[test]
    fn retains_aliased_specifiers_with_new_source() {
        let tree = SwcCodec
            .parse(Path::new("src/a.ts"), "import def, { x as y, z } from '../lib';\n")
            .unwrap();
        let keep: HashSet<String> = ["def".to_string(), "y".to_string()].into_iter().collect();
        let text = retain_specifiers(&tree, tree.top_level()[0], &keep, "../../lib")
            .unwrap()
            .unwrap();
        assert_eq!(normalized(&text), "import def, { x as y } from \"../../lib\";");
    }
}
