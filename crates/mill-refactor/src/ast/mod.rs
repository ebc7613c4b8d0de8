//! Arena-backed syntax trees.
//!
//! A [`SyntaxTree`] owns every node of one file in an [`id_arena::Arena`].
//! Nodes refer to children and parents by [`NodeId`], never by pointer, so a
//! subtree can be copied into another tree by remapping ids.
//!
//! Only the syntactic forms the refactoring engine reasons about get a
//! dedicated [`NodeKind`]. Everything else is kept as verbatim text in the
//! node's [`Piece`] list, which the printer concatenates unchanged. An
//! unmodified tree therefore prints back to its original source.

pub mod lower;
pub mod print;

use id_arena::{Arena, Id};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub type NodeId = Id<Node>;

/// Byte range in the file a node was parsed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub lo: u32,
    pub hi: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDeclKind {
    Interface,
    Alias,
    Enum,
    /// `namespace N {}` or `module N {}`
    Namespace,
}

/// How a name was introduced into its scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Parameter,
    CatchParam,
    Import,
    TypeParameter,
    Type,
    EnumMember,
}

impl From<VarKind> for BindingKind {
    fn from(kind: VarKind) -> Self {
        match kind {
            VarKind::Var => BindingKind::Var,
            VarKind::Let => BindingKind::Let,
            VarKind::Const => BindingKind::Const,
        }
    }
}

/// Closed set of syntactic forms understood by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// File root; children are top-level statements
    Program,
    /// Any statement without a dedicated variant
    Statement,
    /// `import ... from "<source>"`
    Import { source: String },
    /// `import name = require("<source>")`, or `import name = Entity.name`
    /// without a source; the only binding child is the local name
    ImportEquals { source: Option<String> },
    /// `export <decl>` / `export default <decl>` wrapping one declaration child
    Export { default: bool },
    /// `function name(...) {}`; first child is the name binding
    FunctionDecl,
    /// `class Name {}`; first child is the name binding
    ClassDecl,
    VarDecl { kind: VarKind },
    /// interface, type alias, enum or namespace; first child is the name binding
    TypeDecl { kind: TypeDeclKind },
    /// Function expression, arrow, method, constructor or accessor
    Function,
    /// Class expression
    Class,
    /// Block-scoped region (block, loop head, catch clause, switch)
    Block,
    /// `object.property`; non-computed property names are plain text
    Member,
    /// A declared name
    Binding {
        name: String,
        kind: BindingKind,
        /// Property key when written as `{ key }` shorthand
        shorthand: Option<String>,
    },
    /// A reference to a name
    Ident {
        name: String,
        shorthand: Option<String>,
        /// Appears in `export { name }` or `export default name`
        export: bool,
    },
}

impl NodeKind {
    /// Whether entering this node opens a new scope frame
    pub fn opens_scope(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDecl
                | NodeKind::ClassDecl
                | NodeKind::TypeDecl { .. }
                | NodeKind::Function
                | NodeKind::Class
                | NodeKind::Block
        )
    }

    /// Module specifier of an import statement
    pub fn import_source(&self) -> Option<&str> {
        match self {
            NodeKind::Import { source } => Some(source),
            NodeKind::ImportEquals {
                source: Some(source),
            } => Some(source),
            _ => None,
        }
    }

    /// Declarations whose first child binds a name in the enclosing scope
    pub fn is_named_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::FunctionDecl | NodeKind::ClassDecl | NodeKind::TypeDecl { .. }
        )
    }
}

/// Unit of a node's printed form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Text(String),
    Child(NodeId),
}

/// A comment detached from the live node graph so it can travel with a
/// statement into another tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedComment {
    /// Comment body without its delimiters
    pub text: String,
    /// `/* */` rather than `//`
    pub block: bool,
    /// Precedes the statement rather than following it on the same line
    pub leading: bool,
    /// `/** */` documentation comment
    pub doc: bool,
    /// Byte offset in the file the comment came from
    pub pos: Option<u32>,
}

impl AttachedComment {
    pub fn render(&self) -> String {
        if self.block {
            format!("/*{}*/", self.text)
        } else {
            format!("//{}", self.text)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub span: Option<Span>,
    pub pieces: Vec<Piece>,
    pub comments: Vec<AttachedComment>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            span: None,
            pieces: Vec::new(),
            comments: Vec::new(),
        }
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.pieces.iter().filter_map(|piece| match piece {
            Piece::Child(id) => Some(*id),
            Piece::Text(_) => None,
        })
    }

    /// Name carried by a binding or reference leaf
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Binding { name, .. } | NodeKind::Ident { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// One file's parsed form
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    path: PathBuf,
    arena: Arena<Node>,
    root: NodeId,
}

impl SyntaxTree {
    /// A tree for a file with no statements
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Node::new(NodeKind::Program));
        Self {
            path: path.into(),
            arena,
            root,
        }
    }

    pub(crate) fn from_parts(path: PathBuf, arena: Arena<Node>, root: NodeId) -> Self {
        Self { path, arena, root }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.arena[id]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.arena[id]
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.arena.alloc(node)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.arena[id].children().collect()
    }

    /// Statements currently attached to the program root
    pub fn top_level(&self) -> Vec<NodeId> {
        self.children(self.root)
    }

    /// Pre-order walk of `id` and everything below it
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let children = self.children(current);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// The declaration inside a top-level statement, looking through `export`
    pub fn declaration(&self, stmt: NodeId) -> NodeId {
        match self.node(stmt).kind {
            NodeKind::Export { .. } => self
                .node(stmt)
                .children()
                .next()
                .unwrap_or(stmt),
            _ => stmt,
        }
    }

    pub fn is_export_wrapper(&self, stmt: NodeId) -> bool {
        matches!(self.node(stmt).kind, NodeKind::Export { .. })
    }

    pub fn is_default_export(&self, stmt: NodeId) -> bool {
        matches!(self.node(stmt).kind, NodeKind::Export { default: true })
    }

    /// Name binding leaf of a function, class or type declaration
    pub fn name_binding(&self, decl: NodeId) -> Option<NodeId> {
        if !self.node(decl).kind.is_named_declaration() {
            return None;
        }
        self.node(decl)
            .children()
            .find(|child| matches!(self.node(*child).kind, NodeKind::Binding { .. }))
    }

    /// Names a top-level statement introduces into the module scope
    pub fn declared_names(&self, stmt: NodeId) -> Vec<String> {
        self.declared_bindings(stmt)
            .into_iter()
            .filter_map(|id| self.node(id).name().map(str::to_string))
            .collect()
    }

    /// Binding leaves a top-level statement introduces into the module scope
    pub fn declared_bindings(&self, stmt: NodeId) -> Vec<NodeId> {
        let decl = self.declaration(stmt);
        match &self.node(decl).kind {
            NodeKind::FunctionDecl | NodeKind::ClassDecl | NodeKind::TypeDecl { .. } => {
                self.name_binding(decl).into_iter().collect()
            }
            NodeKind::VarDecl { .. } => self.pattern_bindings(decl),
            NodeKind::Import { .. } | NodeKind::ImportEquals { .. } => self
                .node(decl)
                .children()
                .filter(|c| matches!(self.node(*c).kind, NodeKind::Binding { .. }))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Binding leaves under `id` that are not inside a nested scope
    pub fn pattern_bindings(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            let node = self.node(current);
            match node.kind {
                NodeKind::Binding { .. } => out.push(current),
                ref kind if kind.opens_scope() => {}
                _ => stack.extend(self.children(current).into_iter().rev()),
            }
        }
        out
    }

    /// Names exported through `export { name }` or `export default name`
    pub fn exported_by_specifier(&self) -> HashSet<String> {
        let mut names = HashSet::new();
        for stmt in self.top_level() {
            if !matches!(self.node(stmt).kind, NodeKind::Statement) {
                continue;
            }
            for child in self.node(stmt).children() {
                if let NodeKind::Ident {
                    name, export: true, ..
                } = &self.node(child).kind
                {
                    names.insert(name.clone());
                }
            }
        }
        names
    }

    /// Whether a top-level statement's names are visible to other modules
    pub fn is_exported(&self, stmt: NodeId) -> bool {
        if self.is_export_wrapper(stmt) {
            return true;
        }
        let exported = self.exported_by_specifier();
        self.declared_names(stmt)
            .iter()
            .any(|name| exported.contains(name))
    }

    /// Attach `id` as the last top-level statement
    pub fn append_statement(&mut self, id: NodeId) {
        let root = self.root;
        let pieces = &mut self.arena[root].pieces;
        match pieces.iter().rposition(|p| matches!(p, Piece::Child(_))) {
            Some(last) => {
                pieces.insert(last + 1, Piece::Text("\n\n".to_string()));
                pieces.insert(last + 2, Piece::Child(id));
            }
            None => {
                let has_text = pieces
                    .iter()
                    .any(|p| matches!(p, Piece::Text(t) if !t.trim().is_empty()));
                if has_text {
                    pieces.push(Piece::Text("\n".to_string()));
                    pieces.push(Piece::Child(id));
                    pieces.push(Piece::Text("\n".to_string()));
                } else {
                    pieces.clear();
                    pieces.push(Piece::Child(id));
                    pieces.push(Piece::Text("\n".to_string()));
                }
            }
        }
        self.arena[id].parent = Some(root);
    }

    /// Attach `id` after the last top-level import, or first if there is none
    pub fn insert_import_statement(&mut self, id: NodeId) {
        let root = self.root;
        let last_import = self
            .top_level()
            .into_iter()
            .filter(|stmt| self.node(*stmt).kind.import_source().is_some())
            .last();
        let pieces = &mut self.arena[root].pieces;
        match last_import.and_then(|imp| pieces.iter().position(|p| *p == Piece::Child(imp))) {
            Some(pos) => {
                pieces.insert(pos + 1, Piece::Text("\n".to_string()));
                pieces.insert(pos + 2, Piece::Child(id));
            }
            None => match pieces.iter().position(|p| matches!(p, Piece::Child(_))) {
                Some(first) => {
                    pieces.insert(first, Piece::Child(id));
                    pieces.insert(first + 1, Piece::Text("\n\n".to_string()));
                }
                None => {
                    pieces.clear();
                    pieces.push(Piece::Child(id));
                    pieces.push(Piece::Text("\n".to_string()));
                }
            },
        }
        self.arena[id].parent = Some(root);
    }

    /// Detach a top-level statement together with one adjoining separator
    pub fn remove_statement(&mut self, id: NodeId) -> bool {
        let root = self.root;
        let pieces = &mut self.arena[root].pieces;
        let Some(pos) = pieces.iter().position(|p| *p == Piece::Child(id)) else {
            return false;
        };
        let child_after = pieces[pos + 1..]
            .iter()
            .any(|p| matches!(p, Piece::Child(_)));
        let child_before = pieces[..pos].iter().any(|p| matches!(p, Piece::Child(_)));

        if child_after && matches!(pieces.get(pos + 1), Some(Piece::Text(_))) {
            pieces.remove(pos + 1);
            pieces.remove(pos);
        } else if child_before && pos > 0 && matches!(pieces[pos - 1], Piece::Text(_)) {
            pieces.remove(pos);
            pieces.remove(pos - 1);
        } else {
            pieces.remove(pos);
        }
        self.arena[id].parent = None;
        true
    }

    /// Swap a top-level statement for another node in place
    pub fn replace_statement(&mut self, old: NodeId, new: NodeId) -> bool {
        let root = self.root;
        let Some(pos) = self.arena[root]
            .pieces
            .iter()
            .position(|p| *p == Piece::Child(old))
        else {
            return false;
        };
        self.arena[root].pieces[pos] = Piece::Child(new);
        self.arena[old].parent = None;
        self.arena[new].parent = Some(root);
        true
    }

    /// Wrap a top-level declaration in `export `, returning the wrapper
    pub fn wrap_in_export(&mut self, stmt: NodeId) -> NodeId {
        if self.is_export_wrapper(stmt) {
            return stmt;
        }
        let comments = std::mem::take(&mut self.arena[stmt].comments);
        let mut wrapper = Node::new(NodeKind::Export { default: false });
        wrapper.pieces = vec![Piece::Text("export ".to_string()), Piece::Child(stmt)];
        wrapper.comments = comments;
        let wrapper = self.alloc(wrapper);
        if self.arena[stmt].parent.is_some() {
            self.replace_statement(stmt, wrapper);
        }
        self.arena[stmt].parent = Some(wrapper);
        wrapper
    }

    /// Change the name carried by a binding or reference leaf
    pub fn set_name(&mut self, id: NodeId, new_name: &str) {
        match &mut self.arena[id].kind {
            NodeKind::Binding { name, .. } | NodeKind::Ident { name, .. } => {
                *name = new_name.to_string();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{LanguageCodec, SwcCodec};
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> SyntaxTree {
        SwcCodec::default().parse(Path::new("test.ts"), source).unwrap()
    }

    #[test]
    fn declared_names_cover_every_statement_form() {
        let tree = parse(
            "import def, { a as b } from './x';\nexport function f() {}\nclass C {}\nconst { p, q: [r] } = obj;\ninterface I {}\n",
        );
        let names: Vec<Vec<String>> = tree
            .top_level()
            .into_iter()
            .map(|stmt| tree.declared_names(stmt))
            .collect();
        assert_eq!(
            names,
            vec![
                vec!["def".to_string(), "b".to_string()],
                vec!["f".to_string()],
                vec!["C".to_string()],
                vec!["p".to_string(), "r".to_string()],
                vec!["I".to_string()],
            ]
        );
    }

    #[test]
    fn export_specifiers_mark_declarations_exported() {
        let tree = parse("function a() {}\nfunction b() {}\nexport { a };\n");
        let stmts = tree.top_level();
        assert!(tree.is_exported(stmts[0]));
        assert!(!tree.is_exported(stmts[1]));
    }

    #[test]
    fn remove_then_append_keeps_separators_tidy() {
        let mut tree = parse("function a() {}\n\nfunction b() {}\n");
        let stmts = tree.top_level();
        tree.remove_statement(stmts[0]);
        tree.append_statement(stmts[0]);
        let text = SwcCodec::default().print(&tree).unwrap();
        assert_eq!(text, "function b() {}\n\nfunction a() {}\n");
    }
}
