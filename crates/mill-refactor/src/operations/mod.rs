//! Operation executors.
//!
//! Executors mutate [`SyntaxTree`]s in place and never print. The engine and
//! the batch coordinator decide when trees are turned back into text, so a
//! sequence of operations can run against the same trees before generation.
//!
//! [`SyntaxTree`]: crate::ast::SyntaxTree

pub mod move_symbol;
pub mod remove;
pub mod rename;

use crate::analysis::DependencyAnalyzer;
use crate::codec::LanguageCodec;
use crate::config::RefactorConfig;
use crate::resolve::DeclarationResolver;

pub use move_symbol::{move_symbol, MoveReport, MovablePlan};
pub use remove::{remove, RemoveReport};
pub use rename::{rename, RenameReport};

/// Collaborators and policy shared by every executor run
#[derive(Clone, Copy)]
pub struct OperationContext<'a> {
    pub codec: &'a dyn LanguageCodec,
    pub resolver: &'a dyn DeclarationResolver,
    pub analyzer: &'a DependencyAnalyzer,
    pub config: &'a RefactorConfig,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::OperationContext;
    use crate::analysis::DependencyAnalyzer;
    use crate::ast::SyntaxTree;
    use crate::codec::{LanguageCodec, SwcCodec};
    use crate::command::{DeclarationKind, Selector};
    use crate::config::RefactorConfig;
    use crate::resolve::TopLevelResolver;
    use std::path::{Path, PathBuf};

    pub struct Fixture {
        pub codec: SwcCodec,
        pub resolver: TopLevelResolver,
        pub analyzer: DependencyAnalyzer,
        pub config: RefactorConfig,
    }

    impl Fixture {
        pub fn new() -> Self {
            Self::with_config(RefactorConfig::default())
        }

        pub fn with_config(config: RefactorConfig) -> Self {
            Self {
                codec: SwcCodec,
                resolver: TopLevelResolver,
                analyzer: DependencyAnalyzer::new(&config.extra_globals),
                config,
            }
        }

        pub fn context(&self) -> OperationContext<'_> {
            OperationContext {
                codec: &self.codec,
                resolver: &self.resolver,
                analyzer: &self.analyzer,
                config: &self.config,
            }
        }

        pub fn parse(&self, path: &str, source: &str) -> SyntaxTree {
            self.codec.parse(Path::new(path), source).unwrap()
        }

        pub fn print(&self, tree: &SyntaxTree) -> String {
            self.codec.print(tree).unwrap()
        }
    }

    pub fn selector(name: &str, kind: DeclarationKind, file: &str) -> Selector {
        Selector {
            name: name.to_string(),
            declaration_kind: kind,
            file_path: PathBuf::from(file),
        }
    }

    /// Collapse whitespace and quote style for structural comparisons
    pub fn normalized(text: &str) -> String {
        text.replace('\'', "\"")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }
}
