//! Lowering from the swc AST into an arena [`SyntaxTree`].
//!
//! The visitor opens a frame for every node that maps onto a [`NodeKind`];
//! when the frame closes, the frame's source range is cut around its child
//! ranges into `Text` pieces. Syntax without a dedicated kind never becomes a
//! node and simply stays inside the enclosing node's text.

use super::{
    AttachedComment, BindingKind, Node, NodeId, NodeKind, Piece, Span, SyntaxTree, TypeDeclKind,
    VarKind,
};
use id_arena::Arena;
use std::path::PathBuf;
use swc_common::comments::{Comment, CommentKind, Comments, SingleThreadedComments};
use swc_common::{BytePos, Spanned};
use swc_ecma_ast as ast;
use swc_ecma_visit::{Visit, VisitWith};
use tracing::warn;

struct Frame {
    kind: NodeKind,
    lo: u32,
    hi: u32,
    children: Vec<(u32, u32, NodeId)>,
}

struct Lowerer<'a> {
    source: &'a str,
    base: u32,
    arena: Arena<Node>,
    frames: Vec<Frame>,
    /// Set while visiting a pattern that declares names
    binding_context: Option<BindingKind>,
}

/// Build a tree from a parsed module and the comments collected while lexing it
pub(crate) fn lower_module(
    path: PathBuf,
    source: &str,
    base: BytePos,
    module: &ast::Module,
    comments: &SingleThreadedComments,
) -> SyntaxTree {
    let mut lowerer = Lowerer {
        source,
        base: base.0,
        arena: Arena::new(),
        frames: vec![Frame {
            kind: NodeKind::Program,
            lo: 0,
            hi: source.len() as u32,
            children: Vec::new(),
        }],
        binding_context: None,
    };

    let mut statements: Vec<(u32, u32, u32, NodeId)> = Vec::new();
    for item in &module.body {
        let before = lowerer.frames[0].children.len();
        lowerer.lower_item(item);
        let produced = lowerer.frames[0].children.split_off(before);
        for (lo, hi, id) in produced {
            let extended = lowerer.absorb_semicolon(id, hi);
            statements.push((lo, hi, extended, id));
        }
    }

    let root = lowerer.build_program(statements, comments);
    SyntaxTree::from_parts(path, lowerer.arena, root)
}

impl<'a> Lowerer<'a> {
    fn slice(&self, lo: u32, hi: u32) -> &'a str {
        self.source.get(lo as usize..hi as usize).unwrap_or("")
    }

    fn relative(&self, pos: BytePos) -> Option<u32> {
        pos.0.checked_sub(self.base)
    }

    fn range(&self, span: swc_common::Span) -> Option<(u32, u32)> {
        self.range_of(&[span])
    }

    /// Smallest file range covering every non-dummy span
    fn range_of(&self, spans: &[swc_common::Span]) -> Option<(u32, u32)> {
        let mut out: Option<(u32, u32)> = None;
        for span in spans.iter().filter(|s| !s.is_dummy()) {
            let (Some(lo), Some(hi)) = (self.relative(span.lo), self.relative(span.hi)) else {
                continue;
            };
            if hi as usize > self.source.len() || lo > hi {
                continue;
            }
            out = Some(match out {
                Some((a, b)) => (a.min(lo), b.max(hi)),
                None => (lo, hi),
            });
        }
        out
    }

    fn scoped(&mut self, kind: NodeKind, range: Option<(u32, u32)>, f: impl FnOnce(&mut Self)) {
        let saved = self.binding_context.take();
        match range {
            Some((lo, hi)) => {
                self.frames.push(Frame {
                    kind,
                    lo,
                    hi,
                    children: Vec::new(),
                });
                f(self);
                self.close();
            }
            None => f(self),
        }
        self.binding_context = saved;
    }

    fn with_context<T>(&mut self, kind: Option<BindingKind>, node: &T)
    where
        T: VisitWith<Self> + ?Sized,
    {
        let saved = std::mem::replace(&mut self.binding_context, kind);
        node.visit_with(self);
        self.binding_context = saved;
    }

    fn close(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let (lo, hi) = (frame.lo, frame.hi);
        let id = self.build(frame);
        if let Some(parent) = self.frames.last_mut() {
            parent.children.push((lo, hi, id));
        }
    }

    fn build(&mut self, frame: Frame) -> NodeId {
        let Frame {
            kind,
            lo,
            hi,
            mut children,
        } = frame;
        children.sort_by_key(|(clo, _, _)| *clo);

        let mut pieces = Vec::new();
        let mut kept = Vec::new();
        let mut cursor = lo;
        for (clo, chi, child) in children {
            if clo < cursor || chi > hi {
                warn!(
                    child_lo = clo,
                    child_hi = chi,
                    parent_lo = lo,
                    parent_hi = hi,
                    "Dropping child outside its parent's range"
                );
                continue;
            }
            if clo > cursor {
                pieces.push(Piece::Text(self.slice(cursor, clo).to_string()));
            }
            pieces.push(Piece::Child(child));
            kept.push(child);
            cursor = chi;
        }
        if hi > cursor {
            pieces.push(Piece::Text(self.slice(cursor, hi).to_string()));
        }

        let id = self.arena.alloc(Node {
            kind,
            parent: None,
            span: Some(Span { lo, hi }),
            pieces,
            comments: Vec::new(),
        });
        for child in kept {
            self.arena[child].parent = Some(id);
        }
        id
    }

    fn leaf(&mut self, ident: &ast::Ident, kind: NodeKind) {
        let Some((lo, _)) = self.range(ident.span) else {
            return;
        };
        let hi = lo + ident.sym.len() as u32;
        // Escaped or decorated identifiers stay as text
        if self.slice(lo, hi) != &*ident.sym {
            return;
        }
        let id = self.arena.alloc(Node {
            kind,
            parent: None,
            span: Some(Span { lo, hi }),
            pieces: Vec::new(),
            comments: Vec::new(),
        });
        if let Some(frame) = self.frames.last_mut() {
            frame.children.push((lo, hi, id));
        }
    }

    fn binding(&mut self, ident: &ast::Ident, kind: BindingKind, shorthand: bool) {
        let name = ident.sym.to_string();
        let shorthand = shorthand.then(|| name.clone());
        self.leaf(
            ident,
            NodeKind::Binding {
                name,
                kind,
                shorthand,
            },
        );
    }

    fn reference(&mut self, ident: &ast::Ident, shorthand: bool, export: bool) {
        let name = ident.sym.to_string();
        let shorthand = shorthand.then(|| name.clone());
        self.leaf(
            ident,
            NodeKind::Ident {
                name,
                shorthand,
                export,
            },
        );
    }

    fn lower_item(&mut self, item: &ast::ModuleItem) {
        match item {
            ast::ModuleItem::ModuleDecl(decl) => self.lower_module_decl(decl),
            ast::ModuleItem::Stmt(ast::Stmt::Decl(decl)) => self.lower_decl(decl),
            ast::ModuleItem::Stmt(stmt) => {
                self.scoped(NodeKind::Statement, self.range(stmt.span()), |this| {
                    stmt.visit_children_with(this)
                });
            }
        }
    }

    fn lower_decl(&mut self, decl: &ast::Decl) {
        match decl {
            ast::Decl::Fn(_)
            | ast::Decl::Class(_)
            | ast::Decl::Var(_)
            | ast::Decl::Using(_)
            | ast::Decl::TsInterface(_)
            | ast::Decl::TsTypeAlias(_)
            | ast::Decl::TsEnum(_) => decl.visit_with(self),
            ast::Decl::TsModule(module) if namespace_name(module).is_some() => {
                decl.visit_with(self)
            }
            _ => {
                self.scoped(NodeKind::Statement, self.range(decl.span()), |this| {
                    decl.visit_children_with(this)
                });
            }
        }
    }

    fn lower_module_decl(&mut self, decl: &ast::ModuleDecl) {
        match decl {
            ast::ModuleDecl::Import(import) => self.lower_import(import),
            ast::ModuleDecl::ExportDecl(export) => {
                self.scoped(
                    NodeKind::Export { default: false },
                    self.range(export.span),
                    |this| this.lower_decl(&export.decl),
                );
            }
            ast::ModuleDecl::ExportDefaultDecl(export) => {
                self.scoped(
                    NodeKind::Export { default: true },
                    self.range(export.span),
                    |this| match &export.decl {
                        ast::DefaultDecl::Fn(f) => match &f.ident {
                            Some(ident) => this.lower_function_decl(ident, &f.function),
                            None => f.visit_with(this),
                        },
                        ast::DefaultDecl::Class(c) => match &c.ident {
                            Some(ident) => this.lower_class_decl(ident, &c.class),
                            None => c.visit_with(this),
                        },
                        ast::DefaultDecl::TsInterfaceDecl(i) => i.visit_with(this),
                    },
                );
            }
            ast::ModuleDecl::ExportDefaultExpr(export) => {
                self.scoped(NodeKind::Statement, self.range(export.span), |this| {
                    match &*export.expr {
                        ast::Expr::Ident(ident) => this.reference(ident, false, true),
                        expr => expr.visit_with(this),
                    }
                });
            }
            ast::ModuleDecl::ExportNamed(export) => {
                self.scoped(NodeKind::Statement, self.range(export.span), |this| {
                    this.lower_named_export(export)
                });
            }
            ast::ModuleDecl::TsImportEquals(decl) => self.lower_import_equals(decl),
            other => {
                self.scoped(NodeKind::Statement, self.range(other.span()), |this| {
                    other.visit_children_with(this)
                });
            }
        }
    }

    fn lower_import(&mut self, import: &ast::ImportDecl) {
        let source = self
            .range(import.src.span)
            .map(|(lo, hi)| {
                self.slice(lo, hi)
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string()
            })
            .unwrap_or_default();
        self.scoped(
            NodeKind::Import { source },
            self.range(import.span),
            |this| {
                for specifier in &import.specifiers {
                    let local = match specifier {
                        ast::ImportSpecifier::Named(named) => &named.local,
                        ast::ImportSpecifier::Default(default) => &default.local,
                        ast::ImportSpecifier::Namespace(ns) => &ns.local,
                    };
                    this.binding(local, BindingKind::Import, false);
                }
            },
        );
    }

    fn lower_import_equals(&mut self, decl: &ast::TsImportEqualsDecl) {
        let Some((lo, hi)) = self.range(decl.span) else {
            return;
        };
        let source = match &decl.module_ref {
            ast::TsModuleRef::TsExternalModuleRef(external) => self
                .range(external.expr.span)
                .map(|(lo, hi)| {
                    self.slice(lo, hi)
                        .trim_matches(|c| c == '"' || c == '\'')
                        .to_string()
                }),
            ast::TsModuleRef::TsEntityName(_) => None,
        };
        let kind = NodeKind::ImportEquals { source };
        let body = |this: &mut Self| {
            this.binding(&decl.id, BindingKind::Import, false);
            if let ast::TsModuleRef::TsEntityName(name) = &decl.module_ref {
                name.visit_with(this);
            }
        };

        // `export import a = ...` spans the `export` keyword
        let start = self
            .slice(lo, hi)
            .find("import")
            .map(|offset| lo + offset as u32);
        match start {
            Some(start) if decl.is_export && start > lo => {
                self.scoped(NodeKind::Export { default: false }, Some((lo, hi)), |this| {
                    this.scoped(kind, Some((start, hi)), body)
                });
            }
            _ => self.scoped(kind, Some((lo, hi)), body),
        }
    }

    fn lower_namespace(
        &mut self,
        ident: &ast::Ident,
        span: swc_common::Span,
        body: Option<&ast::TsNamespaceBody>,
    ) {
        let kind = NodeKind::TypeDecl {
            kind: TypeDeclKind::Namespace,
        };
        self.scoped(kind, self.range_of(&[span, ident.span]), |this| {
            this.binding(ident, BindingKind::Type, false);
            if let Some(body) = body {
                body.visit_with(this);
            }
        });
    }

    fn lower_named_export(&mut self, export: &ast::NamedExport) {
        // Re-exports name bindings of another module
        if export.src.is_some() {
            return;
        }
        for specifier in &export.specifiers {
            if let ast::ExportSpecifier::Named(named) = specifier {
                if let ast::ModuleExportName::Ident(orig) = &named.orig {
                    self.reference(orig, false, true);
                }
            }
        }
    }

    fn lower_function_decl(&mut self, ident: &ast::Ident, function: &ast::Function) {
        let range = self.range_of(&[function.span, ident.span]);
        self.scoped(NodeKind::FunctionDecl, range, |this| {
            this.binding(ident, BindingKind::Function, false);
            function.visit_children_with(this);
        });
    }

    fn lower_class_decl(&mut self, ident: &ast::Ident, class: &ast::Class) {
        let range = self.range_of(&[class.span, ident.span]);
        self.scoped(NodeKind::ClassDecl, range, |this| {
            this.binding(ident, BindingKind::Class, false);
            class.visit_children_with(this);
        });
    }

    fn lower_var_declarators(&mut self, kind: VarKind, decls: &[ast::VarDeclarator]) {
        for declarator in decls {
            self.with_context(Some(kind.into()), &declarator.name);
            declarator.init.visit_with(self);
        }
    }

    /// Extend a top-level statement over a directly following `;`
    fn absorb_semicolon(&mut self, id: NodeId, hi: u32) -> u32 {
        let rest = self.slice(hi, self.source.len() as u32);
        let trimmed = rest.trim_start_matches([' ', '\t']);
        if !trimmed.starts_with(';') {
            return hi;
        }
        let consumed = (rest.len() - trimmed.len() + 1) as u32;
        let extra = self.slice(hi, hi + consumed).to_string();
        let node = &mut self.arena[id];
        match node.pieces.last_mut() {
            Some(Piece::Text(text)) => text.push_str(&extra),
            _ => node.pieces.push(Piece::Text(extra)),
        }
        if let Some(span) = node.span.as_mut() {
            span.hi = hi + consumed;
        }
        hi + consumed
    }

    fn attached(&self, comment: &Comment, leading: bool) -> AttachedComment {
        let block = comment.kind == CommentKind::Block;
        let text = comment.text.to_string();
        AttachedComment {
            doc: block && text.starts_with('*'),
            text,
            block,
            leading,
            pos: self.relative(comment.span.lo),
        }
    }

    /// Assemble the root: statements, separator text, and per-statement comments
    fn build_program(
        &mut self,
        statements: Vec<(u32, u32, u32, NodeId)>,
        comments: &SingleThreadedComments,
    ) -> NodeId {
        let mut pieces = Vec::new();
        let mut cursor = 0u32;

        for (lo, original_hi, hi, id) in statements {
            let mut leading: Vec<Comment> = comments
                .take_leading(BytePos(lo + self.base))
                .unwrap_or_default()
                .into_iter()
                .filter(|c| self.relative(c.span.lo).is_some_and(|p| p >= cursor))
                .collect();
            leading.sort_by_key(|c| c.span.lo);

            // Only comments not separated from the statement by a blank line travel with it
            let mut next_lo = lo;
            let mut split = leading.len();
            for (index, comment) in leading.iter().enumerate().rev() {
                let end = self.relative(comment.span.hi).unwrap_or(next_lo);
                if self.slice(end, next_lo).matches('\n').count() >= 2 {
                    break;
                }
                split = index;
                next_lo = self.relative(comment.span.lo).unwrap_or(next_lo);
            }
            let gap_end = next_lo;

            let mut trailing: Vec<Comment> = Vec::new();
            for pos in [original_hi, hi] {
                if let Some(found) = comments.get_trailing(BytePos(pos + self.base)) {
                    trailing.extend(found);
                }
            }
            trailing.sort_by_key(|c| c.span.lo);
            trailing.dedup_by_key(|c| c.span.lo);
            let same_line: Vec<Comment> = trailing
                .into_iter()
                .filter(|c| {
                    self.relative(c.span.lo)
                        .is_some_and(|p| p >= hi && !self.slice(hi, p).contains('\n'))
                })
                .collect();
            let after = same_line
                .iter()
                .filter_map(|c| self.relative(c.span.hi))
                .max()
                .unwrap_or(hi);

            if gap_end > cursor {
                pieces.push(Piece::Text(self.slice(cursor, gap_end).to_string()));
            }
            pieces.push(Piece::Child(id));

            let mut attached: Vec<AttachedComment> = leading[split..]
                .iter()
                .map(|c| self.attached(c, true))
                .collect();
            attached.extend(same_line.iter().map(|c| self.attached(c, false)));
            self.arena[id].comments = attached;

            cursor = after;
        }

        let end = self.source.len() as u32;
        if end > cursor {
            pieces.push(Piece::Text(self.slice(cursor, end).to_string()));
        }

        let root = self.arena.alloc(Node {
            kind: NodeKind::Program,
            parent: None,
            span: Some(Span { lo: 0, hi: end }),
            pieces,
            comments: Vec::new(),
        });
        let children: Vec<NodeId> = self.arena[root].children().collect();
        for child in children {
            self.arena[child].parent = Some(root);
        }
        root
    }
}

/// Name a `namespace` / `module` declaration binds; `declare module "x"`
/// and `declare global` bind nothing
fn namespace_name(module: &ast::TsModuleDecl) -> Option<&ast::Ident> {
    match &module.id {
        ast::TsModuleName::Ident(ident) if !module.global => Some(ident),
        _ => None,
    }
}

impl Visit for Lowerer<'_> {
    fn visit_fn_decl(&mut self, node: &ast::FnDecl) {
        self.lower_function_decl(&node.ident, &node.function);
    }

    fn visit_class_decl(&mut self, node: &ast::ClassDecl) {
        self.lower_class_decl(&node.ident, &node.class);
    }

    fn visit_var_decl(&mut self, node: &ast::VarDecl) {
        let kind = match node.kind {
            ast::VarDeclKind::Var => VarKind::Var,
            ast::VarDeclKind::Let => VarKind::Let,
            ast::VarDeclKind::Const => VarKind::Const,
        };
        self.scoped(NodeKind::VarDecl { kind }, self.range(node.span), |this| {
            this.lower_var_declarators(kind, &node.decls)
        });
    }

    fn visit_using_decl(&mut self, node: &ast::UsingDecl) {
        let kind = VarKind::Const;
        self.scoped(NodeKind::VarDecl { kind }, self.range(node.span), |this| {
            this.lower_var_declarators(kind, &node.decls)
        });
    }

    fn visit_ts_interface_decl(&mut self, node: &ast::TsInterfaceDecl) {
        let kind = NodeKind::TypeDecl {
            kind: TypeDeclKind::Interface,
        };
        self.scoped(kind, self.range(node.span), |this| {
            this.binding(&node.id, BindingKind::Type, false);
            node.type_params.visit_with(this);
            node.extends.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_ts_type_alias_decl(&mut self, node: &ast::TsTypeAliasDecl) {
        let kind = NodeKind::TypeDecl {
            kind: TypeDeclKind::Alias,
        };
        self.scoped(kind, self.range(node.span), |this| {
            this.binding(&node.id, BindingKind::Type, false);
            node.type_params.visit_with(this);
            node.type_ann.visit_with(this);
        });
    }

    fn visit_ts_enum_decl(&mut self, node: &ast::TsEnumDecl) {
        let kind = NodeKind::TypeDecl {
            kind: TypeDeclKind::Enum,
        };
        self.scoped(kind, self.range(node.span), |this| {
            this.binding(&node.id, BindingKind::Type, false);
            for member in &node.members {
                if let ast::TsEnumMemberId::Ident(ident) = &member.id {
                    this.binding(ident, BindingKind::EnumMember, false);
                }
                member.init.visit_with(this);
            }
        });
    }

    fn visit_ts_module_decl(&mut self, node: &ast::TsModuleDecl) {
        match namespace_name(node) {
            Some(ident) => self.lower_namespace(ident, node.span, node.body.as_ref()),
            None => node.body.visit_with(self),
        }
    }

    fn visit_ts_namespace_decl(&mut self, node: &ast::TsNamespaceDecl) {
        self.lower_namespace(&node.id, node.span, Some(&*node.body));
    }

    fn visit_ts_import_equals_decl(&mut self, node: &ast::TsImportEqualsDecl) {
        self.lower_import_equals(node);
    }

    fn visit_function(&mut self, node: &ast::Function) {
        self.scoped(NodeKind::Function, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_fn_expr(&mut self, node: &ast::FnExpr) {
        let mut spans = vec![node.function.span];
        spans.extend(node.ident.iter().map(|i| i.span));
        let range = self.range_of(&spans);
        self.scoped(NodeKind::Function, range, |this| {
            if let Some(ident) = &node.ident {
                this.binding(ident, BindingKind::Function, false);
            }
            node.function.visit_children_with(this);
        });
    }

    fn visit_arrow_expr(&mut self, node: &ast::ArrowExpr) {
        self.scoped(NodeKind::Function, self.range(node.span), |this| {
            node.type_params.visit_with(this);
            this.with_context(Some(BindingKind::Parameter), &node.params);
            node.return_type.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_constructor(&mut self, node: &ast::Constructor) {
        self.scoped(NodeKind::Function, self.range(node.span), |this| {
            node.params.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_getter_prop(&mut self, node: &ast::GetterProp) {
        self.scoped(NodeKind::Function, self.range(node.span), |this| {
            node.key.visit_with(this);
            node.type_ann.visit_with(this);
            node.body.visit_with(this);
        });
    }

    fn visit_setter_prop(&mut self, node: &ast::SetterProp) {
        self.scoped(NodeKind::Function, self.range(node.span), |this| {
            node.key.visit_with(this);
            this.with_context(Some(BindingKind::Parameter), &node.param);
            node.body.visit_with(this);
        });
    }

    fn visit_class_expr(&mut self, node: &ast::ClassExpr) {
        let mut spans = vec![node.class.span];
        spans.extend(node.ident.iter().map(|i| i.span));
        let range = self.range_of(&spans);
        self.scoped(NodeKind::Class, range, |this| {
            if let Some(ident) = &node.ident {
                this.binding(ident, BindingKind::Class, false);
            }
            node.class.visit_children_with(this);
        });
    }

    fn visit_block_stmt(&mut self, node: &ast::BlockStmt) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_for_stmt(&mut self, node: &ast::ForStmt) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_for_in_stmt(&mut self, node: &ast::ForInStmt) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_for_of_stmt(&mut self, node: &ast::ForOfStmt) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_switch_stmt(&mut self, node: &ast::SwitchStmt) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_catch_clause(&mut self, node: &ast::CatchClause) {
        self.scoped(NodeKind::Block, self.range(node.span), |this| {
            this.with_context(Some(BindingKind::CatchParam), &node.param);
            node.body.visit_with(this);
        });
    }

    fn visit_param(&mut self, node: &ast::Param) {
        self.with_context(None, &node.decorators);
        self.with_context(Some(BindingKind::Parameter), &node.pat);
    }

    fn visit_ts_param_prop(&mut self, node: &ast::TsParamProp) {
        self.with_context(None, &node.decorators);
        self.with_context(Some(BindingKind::Parameter), &node.param);
    }

    fn visit_binding_ident(&mut self, node: &ast::BindingIdent) {
        match self.binding_context {
            Some(kind) => self.binding(&node.id, kind, false),
            None => self.reference(&node.id, false, false),
        }
        self.with_context(None, &node.type_ann);
    }

    fn visit_assign_pat_prop(&mut self, node: &ast::AssignPatProp) {
        match self.binding_context {
            Some(kind) => self.binding(&node.key.id, kind, true),
            None => self.reference(&node.key.id, true, false),
        }
        self.with_context(None, &node.key.type_ann);
        self.with_context(None, &node.value);
    }

    fn visit_assign_pat(&mut self, node: &ast::AssignPat) {
        node.left.visit_with(self);
        self.with_context(None, &node.right);
    }

    fn visit_assign_expr(&mut self, node: &ast::AssignExpr) {
        self.with_context(None, &node.left);
        self.with_context(None, &node.right);
    }

    fn visit_expr(&mut self, node: &ast::Expr) {
        match node {
            ast::Expr::Ident(ident) => self.reference(ident, false, false),
            _ => node.visit_children_with(self),
        }
    }

    fn visit_member_expr(&mut self, node: &ast::MemberExpr) {
        self.scoped(NodeKind::Member, self.range(node.span), |this| {
            node.visit_children_with(this)
        });
    }

    fn visit_prop(&mut self, node: &ast::Prop) {
        match node {
            ast::Prop::Shorthand(ident) => self.reference(ident, true, false),
            _ => node.visit_children_with(self),
        }
    }

    fn visit_ts_entity_name(&mut self, node: &ast::TsEntityName) {
        match node {
            ast::TsEntityName::Ident(ident) => self.reference(ident, false, false),
            ast::TsEntityName::TsQualifiedName(qualified) => qualified.left.visit_with(self),
        }
    }

    fn visit_ts_type_param(&mut self, node: &ast::TsTypeParam) {
        self.binding(&node.name, BindingKind::TypeParameter, false);
        node.constraint.visit_with(self);
        node.default.visit_with(self);
    }

    // Parameter names in type signatures bind nothing at runtime
    fn visit_ts_fn_param(&mut self, node: &ast::TsFnParam) {
        match node {
            ast::TsFnParam::Ident(ident) => ident.type_ann.visit_with(self),
            ast::TsFnParam::Array(array) => array.type_ann.visit_with(self),
            ast::TsFnParam::Rest(rest) => rest.type_ann.visit_with(self),
            ast::TsFnParam::Object(object) => object.type_ann.visit_with(self),
        }
    }

    fn visit_ts_property_signature(&mut self, node: &ast::TsPropertySignature) {
        if node.computed {
            node.key.visit_with(self);
        }
        node.type_ann.visit_with(self);
    }

    fn visit_ts_method_signature(&mut self, node: &ast::TsMethodSignature) {
        if node.computed {
            node.key.visit_with(self);
        }
        node.type_params.visit_with(self);
        node.params.visit_with(self);
        node.type_ann.visit_with(self);
    }

    fn visit_ts_getter_signature(&mut self, node: &ast::TsGetterSignature) {
        if node.computed {
            node.key.visit_with(self);
        }
        node.type_ann.visit_with(self);
    }

    fn visit_ts_setter_signature(&mut self, node: &ast::TsSetterSignature) {
        if node.computed {
            node.key.visit_with(self);
        }
        node.param.visit_with(self);
    }

    fn visit_jsx_element_name(&mut self, node: &ast::JSXElementName) {
        match node {
            ast::JSXElementName::Ident(ident) => {
                // Lower-case tags are intrinsic elements, not bindings
                if ident.sym.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    self.reference(ident, false, false);
                }
            }
            ast::JSXElementName::JSXMemberExpr(member) => member.obj.visit_with(self),
            ast::JSXElementName::JSXNamespacedName(_) => {}
        }
    }

    fn visit_jsx_object(&mut self, node: &ast::JSXObject) {
        match node {
            ast::JSXObject::Ident(ident) => self.reference(ident, false, false),
            ast::JSXObject::JSXMemberExpr(member) => member.obj.visit_with(self),
        }
    }

    fn visit_import_decl(&mut self, _node: &ast::ImportDecl) {}

    fn visit_named_export(&mut self, node: &ast::NamedExport) {
        self.lower_named_export(node);
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{BindingKind, NodeKind, SyntaxTree, TypeDeclKind};
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn parse(source: &str) -> SyntaxTree {
        SwcCodec::default().parse(Path::new("lower.ts"), source).unwrap()
    }

    fn leaves(tree: &SyntaxTree) -> Vec<(String, bool)> {
        tree.descendants(tree.root())
            .into_iter()
            .filter_map(|id| match &tree.node(id).kind {
                NodeKind::Binding { name, .. } => Some((name.clone(), true)),
                NodeKind::Ident { name, .. } => Some((name.clone(), false)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn unmodified_tree_prints_original_text() {
        let source = "// header\n\n/** Formats. */\nexport function formatString(s: string): string {\n  return s.trim(); // trim\n}\n\nconst x = 1; // trailing\nlet y = { x };\n";
        let tree = parse(source);
        let printed = SwcCodec::default().print(&tree).unwrap();
        assert_eq!(printed, source);
    }

    #[test]
    fn property_names_are_not_references() {
        let tree = parse("const total = order.items.length + config[key];\n");
        assert_eq!(
            leaves(&tree),
            vec![
                ("total".to_string(), true),
                ("order".to_string(), false),
                ("config".to_string(), false),
                ("key".to_string(), false),
            ]
        );
    }

    #[test]
    fn parameters_and_patterns_are_bindings() {
        let tree = parse("function f(a, { b, c: d }, [e = g]) { h = a; }\n");
        assert_eq!(
            leaves(&tree),
            vec![
                ("f".to_string(), true),
                ("a".to_string(), true),
                ("b".to_string(), true),
                ("d".to_string(), true),
                ("e".to_string(), true),
                ("g".to_string(), false),
                ("h".to_string(), false),
                ("a".to_string(), false),
            ]
        );
    }

    #[test]
    fn doc_comment_attaches_to_following_statement() {
        let tree = parse("/** Adds. */\nfunction add() {}\n");
        let stmt = tree.top_level()[0];
        let comments = &tree.node(stmt).comments;
        assert_eq!(comments.len(), 1);
        assert!(comments[0].doc);
        assert!(comments[0].leading);
    }

    #[test]
    fn import_locals_are_import_bindings() {
        let tree = parse("import { a as b, c } from './dep';\n");
        let stmt = tree.top_level()[0];
        assert_eq!(
            tree.node(stmt).kind,
            NodeKind::Import {
                source: "./dep".to_string()
            }
        );
        let kinds: Vec<BindingKind> = tree
            .declared_bindings(stmt)
            .into_iter()
            .filter_map(|id| match tree.node(id).kind {
                NodeKind::Binding { kind, .. } => Some(kind),
                _ => None,
            })
            .collect();
        assert_eq!(kinds, vec![BindingKind::Import, BindingKind::Import]);
        assert_eq!(tree.declared_names(stmt), vec!["b", "c"]);
    }

    #[test]
    fn namespaces_and_import_equals_declare_names() {
        let tree = parse(
            "import fs = require('fs');\nexport import Alias = Shapes.Circle;\nexport namespace Shapes { export class Circle {} }\ndeclare module 'ambient' {}\n",
        );
        let top = tree.top_level();
        assert_eq!(
            tree.node(top[0]).kind,
            NodeKind::ImportEquals {
                source: Some("fs".to_string())
            }
        );
        assert_eq!(tree.declared_names(top[0]), vec!["fs"]);

        assert!(tree.is_export_wrapper(top[1]));
        assert_eq!(
            tree.node(tree.declaration(top[1])).kind,
            NodeKind::ImportEquals { source: None }
        );
        assert_eq!(tree.declared_names(top[1]), vec!["Alias"]);

        assert_eq!(
            tree.node(tree.declaration(top[2])).kind,
            NodeKind::TypeDecl {
                kind: TypeDeclKind::Namespace
            }
        );
        assert_eq!(tree.declared_names(top[2]), vec!["Shapes"]);
        assert!(tree.declared_names(top[3]).is_empty());

        let printed = SwcCodec::default().print(&tree).unwrap();
        assert!(printed.starts_with("import fs = require('fs');\nexport import Alias"));
    }
}
