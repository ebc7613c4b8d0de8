//! Tree surgery shared by the executors, and text generation

use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::cleanup::{self, CleanedSource};
use crate::clone::{clone_statements, extract_comments};
use crate::codec::LanguageCodec;
use crate::error::RefactorResult;
use tracing::debug;

/// Whether `export` can be put in front of a statement
fn exportable(tree: &SyntaxTree, stmt: NodeId) -> bool {
    matches!(
        tree.node(stmt).kind,
        NodeKind::FunctionDecl
            | NodeKind::ClassDecl
            | NodeKind::VarDecl { .. }
            | NodeKind::TypeDecl { .. }
            | NodeKind::ImportEquals { source: None }
    )
}

/// Copy `stmts` from `src` to the end of `dst`, in order, exporting every
/// declaration that is not exported already. Returns the inserted statements.
pub fn splice_exported(src: &SyntaxTree, stmts: &[NodeId], dst: &mut SyntaxTree) -> Vec<NodeId> {
    let copies = clone_statements(src, stmts, dst);
    let mut inserted = Vec::with_capacity(copies.len());
    for copy in copies {
        let stmt = if exportable(dst, copy) {
            dst.wrap_in_export(copy)
        } else {
            copy
        };
        dst.append_statement(stmt);
        inserted.push(stmt);
    }
    let comments: usize = inserted
        .iter()
        .map(|stmt| extract_comments(&*dst, *stmt).len())
        .sum();
    debug!(
        from = %src.path().display(),
        to = %dst.path().display(),
        statements = inserted.len(),
        comments,
        "Spliced statements"
    );
    inserted
}

/// Detach `stmts` from the top level of `tree`
pub fn prune(tree: &mut SyntaxTree, stmts: &[NodeId]) {
    for stmt in stmts {
        if !tree.remove_statement(*stmt) {
            debug!(file_path = %tree.path().display(), "Statement already detached");
        }
    }
}

/// Export a top-level declaration in place, returning its new statement id
pub fn export_in_place(tree: &mut SyntaxTree, stmt: NodeId) -> NodeId {
    if tree.is_exported(stmt) || !exportable(tree, stmt) {
        return stmt;
    }
    tree.wrap_in_export(stmt)
}

/// Print a tree, optionally repair orphaned braces, and optionally re-parse
/// the result
pub fn generate(
    codec: &dyn LanguageCodec,
    tree: &SyntaxTree,
    repair_braces: bool,
    validate: bool,
) -> RefactorResult<CleanedSource> {
    let text = codec.print(tree)?;
    let cleaned = if repair_braces {
        cleanup::clean(&text)
    } else {
        CleanedSource::trusted(text)
    };
    if validate {
        codec.validate(tree.path(), cleaned.as_str())?;
    }
    Ok(cleaned)
}
