//! Move a top-level declaration to another file.
//!
//! The selected statement travels together with every private helper that
//! nothing else in the source file uses. Whatever the moving code needs and
//! cannot take along is imported by the target: exported declarations of
//! the source from the source file, imported names from their original
//! modules (with the specifier rebased to the target's directory).

use super::OperationContext;
use crate::analysis::{count_uses, unresolved_uses, DependencySet, ScopeTracker};
use crate::ast::{NodeId, NodeKind, SyntaxTree};
use crate::command::Selector;
use crate::error::{RefactorError, RefactorResult, SchemaError};
use crate::imports::{self, ImportRequest};
use crate::logging;
use crate::splice;
use indexmap::{IndexMap, IndexSet};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// Result of dependency analysis for one move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovablePlan {
    /// Statement declaring the selected symbol
    pub primary: NodeId,
    /// Statements that travel, in source order
    pub statements: Vec<NodeId>,
    /// Top-level names declared by the travelling statements
    pub moved_names: IndexSet<String>,
    /// Exported declarations of the source the target must import by name
    pub from_source: IndexSet<String>,
    /// Default-exported declaration of the source the target must import
    pub default_from_source: Option<String>,
    /// Private statements that stay behind and get exported in place
    pub shared_helpers: Vec<NodeId>,
    /// Source imports the moving code uses, with the local names it needs
    pub reimports: IndexMap<NodeId, IndexSet<String>>,
    /// Free names of the travelling statements
    pub dependencies: DependencySet,
}

impl MovablePlan {
    /// Compute the dependency closure of `primary` within `source`
    pub fn compute(
        ctx: &OperationContext<'_>,
        source: &SyntaxTree,
        target_path: &Path,
        primary: NodeId,
    ) -> RefactorResult<Self> {
        let top = source.top_level();
        let mut declared_by: HashMap<String, NodeId> = HashMap::new();
        let mut imported_by: HashMap<String, NodeId> = HashMap::new();
        for stmt in &top {
            let decl = source.declaration(*stmt);
            let owners = if source.node(decl).kind.import_source().is_some() {
                &mut imported_by
            } else {
                &mut declared_by
            };
            for name in source.declared_names(*stmt) {
                owners.entry(name).or_insert(*stmt);
            }
        }

        let no_exclusions = HashSet::new();
        let mut moving: IndexSet<NodeId> = IndexSet::from([primary]);
        let dependencies = loop {
            let members = in_source_order(&top, &moving);
            let dependencies =
                ctx.analyzer
                    .collect(source, &members, &no_exclusions, &mut ScopeTracker::new());

            let mut grew = false;
            for name in &dependencies {
                let Some(&helper) = declared_by.get(name) else {
                    continue;
                };
                if moving.contains(&helper) || source.is_exported(helper) {
                    continue;
                }
                let elsewhere: Vec<NodeId> = top
                    .iter()
                    .copied()
                    .filter(|stmt| *stmt != helper && !moving.contains(stmt))
                    .collect();
                let used_elsewhere = source
                    .declared_names(helper)
                    .iter()
                    .any(|declared| count_uses(source, declared, &elsewhere) > 0);
                if !used_elsewhere {
                    debug!(helper = %name, "Private helper joins the move");
                    moving.insert(helper);
                    grew = true;
                }
            }
            if !grew {
                break dependencies;
            }
        };

        let statements = in_source_order(&top, &moving);
        let moved_names = statements
            .iter()
            .flat_map(|stmt| source.declared_names(*stmt))
            .collect();
        let mut plan = MovablePlan {
            primary,
            statements,
            moved_names,
            from_source: IndexSet::new(),
            default_from_source: None,
            shared_helpers: Vec::new(),
            reimports: IndexMap::new(),
            dependencies: DependencySet::new(),
        };

        for name in &dependencies {
            if let Some(&stmt) = declared_by.get(name) {
                if source.is_default_export(stmt) {
                    plan.default_from_source = Some(name.clone());
                } else if source.is_exported(stmt) {
                    plan.from_source.insert(name.clone());
                } else if ctx.config.export_shared_helpers {
                    if !plan.shared_helpers.contains(&stmt) {
                        plan.shared_helpers.push(stmt);
                    }
                    plan.from_source.insert(name.clone());
                } else {
                    return Err(RefactorError::unresolvable_dependency(name, target_path));
                }
            } else if let Some(&stmt) = imported_by.get(name) {
                plan.reimports.entry(stmt).or_default().insert(name.clone());
            } else {
                debug!(name = %name, "Unbound name left to the host environment");
            }
        }
        plan.dependencies = dependencies;
        Ok(plan)
    }
}

fn in_source_order(top: &[NodeId], members: &IndexSet<NodeId>) -> Vec<NodeId> {
    top.iter()
        .copied()
        .filter(|stmt| members.contains(stmt))
        .collect()
}

/// Summary of a completed move
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoveReport {
    /// Names now declared in the target
    pub moved: Vec<String>,
    /// Names the target imports from the source
    pub imported_from_source: Vec<String>,
    /// Private helpers exported in place so the target can import them
    pub exported_helpers: Vec<String>,
    /// Whether the source gained an import of the moved names
    pub source_imports_target: bool,
    /// Import specifiers dropped from the source
    pub pruned_imports: usize,
}

/// Top-level statement of `tree` binding `name`
fn binding_statement(tree: &SyntaxTree, name: &str) -> Option<NodeId> {
    tree.top_level()
        .into_iter()
        .find(|stmt| tree.declared_names(*stmt).iter().any(|n| n == name))
}

fn imports_from(tree: &SyntaxTree, stmt: NodeId, file: &Path) -> bool {
    tree.node(stmt)
        .kind
        .import_source()
        .is_some_and(|source| imports::refers_to(source, tree.path(), file))
}

/// Move the declaration `selector` names from `source` to the end of `target`
pub fn move_symbol(
    ctx: &OperationContext<'_>,
    source: &mut SyntaxTree,
    target: &mut SyntaxTree,
    selector: &Selector,
) -> RefactorResult<MoveReport> {
    let _span = logging::operation_span("move", &selector.name).entered();

    if imports::normalize(source.path()) == imports::normalize(target.path()) {
        return Err(SchemaError::invalid_field(
            "targetFilePath",
            "must differ from selector.filePath",
        )
        .into());
    }

    let primary = ctx.resolver.resolve(source, selector)?;
    let primary_is_default = source.is_default_export(primary);
    let plan = MovablePlan::compute(ctx, source, target.path(), primary)?;
    debug!(
        statements = plan.statements.len(),
        moved = ?plan.moved_names,
        from_source = ?plan.from_source,
        "Computed move plan"
    );

    // Everything the target already binds must either be an import of the
    // source (made stale by the move) or be exactly what the moved code needs.
    let mut stale = HashSet::new();
    for name in &plan.moved_names {
        match binding_statement(target, name) {
            None => {}
            Some(stmt) if imports_from(target, stmt, source.path()) => {
                stale.insert(name.clone());
            }
            Some(_) => return Err(RefactorError::name_collision(name, target.path())),
        }
    }
    for name in plan.from_source.iter().chain(plan.default_from_source.iter()) {
        match binding_statement(target, name) {
            Some(stmt) if !imports_from(target, stmt, source.path()) => {
                return Err(RefactorError::name_collision(name, target.path()));
            }
            _ => {}
        }
    }

    let mut reimports = Vec::new();
    for (stmt, names) in &plan.reimports {
        let import = &source.node(source.declaration(*stmt)).kind;
        let Some(specifier) = import.import_source() else {
            continue;
        };
        if imports::refers_to(specifier, source.path(), target.path()) {
            continue;
        }
        let rebased = imports::rebase_specifier(specifier, source.path(), target.path());
        let mut keep = HashSet::new();
        for name in names {
            match binding_statement(target, name) {
                None => {
                    keep.insert(name.clone());
                }
                Some(existing) => {
                    let reused = target
                        .node(existing)
                        .kind
                        .import_source()
                        .is_some_and(|source| imports::same_module(source, &rebased));
                    if !reused {
                        return Err(RefactorError::name_collision(name, target.path()));
                    }
                }
            }
        }
        if keep.is_empty() {
            continue;
        }
        match import {
            NodeKind::ImportEquals { .. } => {
                for name in &keep {
                    reimports.push(imports::import_equals_text(name, &rebased)?);
                }
            }
            _ => {
                if let Some(text) = imports::retain_specifiers(source, *stmt, &keep, &rebased)? {
                    reimports.push(text);
                }
            }
        }
    }

    let target_to_source = imports::module_specifier(target.path(), source.path());
    let source_to_target = imports::module_specifier(source.path(), target.path());

    if !stale.is_empty() {
        imports::remove_imported_names(target, &stale, Some(&target_to_source))?;
    }
    splice::splice_exported(source, &plan.statements, target);
    for text in &reimports {
        imports::insert_import_text(target, text)?;
    }
    let mut report = MoveReport {
        moved: plan.moved_names.iter().cloned().collect(),
        ..MoveReport::default()
    };
    if !plan.from_source.is_empty() || plan.default_from_source.is_some() {
        imports::add_import(
            target,
            &ImportRequest {
                specifier: target_to_source,
                named: plan.from_source.iter().cloned().collect(),
                default: plan.default_from_source.clone(),
            },
        )?;
        report.imported_from_source = plan
            .default_from_source
            .iter()
            .chain(plan.from_source.iter())
            .cloned()
            .collect();
    }

    for helper in &plan.shared_helpers {
        report.exported_helpers.extend(source.declared_names(*helper));
        splice::export_in_place(source, *helper);
    }
    splice::prune(source, &plan.statements);

    let still_used: Vec<&String> = plan
        .moved_names
        .iter()
        .filter(|name| unresolved_uses(source, name) > 0)
        .collect();
    if !still_used.is_empty() {
        let mut request = ImportRequest {
            specifier: source_to_target,
            ..ImportRequest::default()
        };
        for name in still_used {
            if primary_is_default && *name == selector.name {
                request.default = Some(name.clone());
            } else {
                request.named.push(name.clone());
            }
        }
        imports::add_import(source, &request)?;
        report.source_imports_target = true;
    }

    if ctx.config.prune_unused_imports {
        let remaining = source.top_level();
        let unused: HashSet<String> = plan
            .reimports
            .values()
            .flatten()
            .filter(|name| count_uses(source, name, &remaining) == 0)
            .cloned()
            .collect();
        if !unused.is_empty() {
            report.pruned_imports = imports::remove_imported_names(source, &unused, None)?;
        }
    }

    info!(
        source = %source.path().display(),
        target = %target.path().display(),
        moved = ?report.moved,
        "Moved declaration"
    );
    Ok(report)
}
