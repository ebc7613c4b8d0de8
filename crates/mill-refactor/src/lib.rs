//! mill-refactor: structural move, rename and remove refactorings for
//! TypeScript and JavaScript
//!
//! Source files are parsed with swc and lowered into arena-backed syntax
//! trees that print back to their original text. Executors analyse scopes
//! and free names on those trees, splice and prune top-level statements,
//! keep imports consistent, and regenerate text for every file they touch.

pub mod analysis;
pub mod ast;
pub mod batch;
pub mod cleanup;
pub mod clone;
pub mod codec;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod imports;
pub mod logging;
pub mod operations;
pub mod resolve;
pub mod splice;

// Engine facade
pub use engine::{FsSources, MemorySources, RefactorEngine, RefactorOutput, SourceProvider};

// Commands
pub use command::{DeclarationKind, Operation, RefactorCommand, Selector, CURRENT_SCHEMA_VERSION};

// Configuration
pub use config::{EngineConfig, LogFormat, LoggingConfig, RefactorConfig};

// Error types
pub use error::{RefactorError, RefactorResult, SchemaError};

// Trees and collaborators
pub use ast::{NodeId, NodeKind, SyntaxTree};
pub use cleanup::CleanedSource;
pub use codec::{LanguageCodec, SwcCodec};
pub use resolve::{DeclarationResolver, TopLevelResolver};

// Executors
pub use batch::{apply_batch, WorkingSet};
pub use operations::{MovablePlan, MoveReport, OperationContext, RemoveReport, RenameReport};
