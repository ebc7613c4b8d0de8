//! Batch coordination.
//!
//! A batch runs its commands in the order given against one [`WorkingSet`]
//! of trees, so later commands see what earlier ones did. Text is generated
//! once per touched file after every command has succeeded; if any command
//! fails, nothing is generated.

use crate::ast::SyntaxTree;
use crate::cleanup::CleanedSource;
use crate::codec::LanguageCodec;
use crate::command::{Operation, RefactorCommand};
use crate::engine::SourceProvider;
use crate::error::{RefactorError, RefactorResult, SchemaError};
use crate::imports::normalize;
use crate::operations::{self, OperationContext};
use crate::splice;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Trees loaded for one batch, keyed by normalized file path
pub struct WorkingSet<'a> {
    codec: &'a dyn LanguageCodec,
    sources: &'a dyn SourceProvider,
    trees: IndexMap<PathBuf, SyntaxTree>,
    touched: IndexSet<PathBuf>,
    /// Files that lost statements and get brace repair on output
    pruned: HashSet<PathBuf>,
}

impl<'a> WorkingSet<'a> {
    pub fn new(codec: &'a dyn LanguageCodec, sources: &'a dyn SourceProvider) -> Self {
        Self {
            codec,
            sources,
            trees: IndexMap::new(),
            touched: IndexSet::new(),
            pruned: HashSet::new(),
        }
    }

    /// Parse `path` into the set unless it is already there.
    ///
    /// A missing file is an error unless `create` is set, in which case it
    /// starts out empty.
    fn ensure_loaded(&mut self, path: &Path, create: bool) -> RefactorResult<PathBuf> {
        let key = normalize(path);
        if self.trees.contains_key(&key) {
            return Ok(key);
        }
        let tree = match self.sources.read(&key)? {
            Some(text) => self.codec.parse(&key, &text)?,
            None if create => {
                debug!(file_path = %key.display(), "Starting new file");
                SyntaxTree::empty(key.clone())
            }
            None => {
                return Err(RefactorError::Io {
                    path: key,
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "source file not found"),
                })
            }
        };
        self.trees.insert(key.clone(), tree);
        Ok(key)
    }

    fn tree_mut(&mut self, key: &Path) -> RefactorResult<&mut SyntaxTree> {
        self.trees.get_mut(key).ok_or_else(|| RefactorError::Io {
            path: key.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not loaded"),
        })
    }

    /// Run one command against the set
    pub fn apply(&mut self, ctx: &OperationContext<'_>, command: &RefactorCommand) -> RefactorResult<()> {
        let selector = &command.selector;
        match &command.operation {
            Operation::Move { target_file_path } => {
                let source_key = self.ensure_loaded(&selector.file_path, false)?;
                if normalize(target_file_path) == source_key {
                    return Err(SchemaError::invalid_field(
                        "targetFilePath",
                        "must differ from selector.filePath",
                    )
                    .into());
                }
                let target_key = self.ensure_loaded(target_file_path, true)?;

                let placeholder = SyntaxTree::empty(target_key.clone());
                let mut target = std::mem::replace(self.tree_mut(&target_key)?, placeholder);
                let result = self
                    .tree_mut(&source_key)
                    .and_then(|source| operations::move_symbol(ctx, source, &mut target, selector));
                *self.tree_mut(&target_key)? = target;
                result?;

                self.pruned.insert(source_key.clone());
                self.touched.insert(source_key);
                self.touched.insert(target_key);
            }
            Operation::Rename { new_name } => {
                let key = self.ensure_loaded(&selector.file_path, false)?;
                operations::rename(ctx, self.tree_mut(&key)?, selector, new_name)?;
                self.touched.insert(key);
            }
            Operation::Remove => {
                let key = self.ensure_loaded(&selector.file_path, false)?;
                operations::remove(ctx, self.tree_mut(&key)?, selector)?;
                self.pruned.insert(key.clone());
                self.touched.insert(key);
            }
        }
        Ok(())
    }

    /// Generate text for every touched file, in the order first touched
    pub fn generate(&self, ctx: &OperationContext<'_>) -> RefactorResult<IndexMap<PathBuf, CleanedSource>> {
        let mut outputs = IndexMap::new();
        for key in &self.touched {
            let Some(tree) = self.trees.get(key) else {
                continue;
            };
            let repair = self.pruned.contains(key);
            let text = splice::generate(self.codec, tree, repair, ctx.config.validate_output)?;
            outputs.insert(key.clone(), text);
        }
        Ok(outputs)
    }
}

/// Apply `commands` in order and return the final text of every touched file
pub fn apply_batch(
    ctx: &OperationContext<'_>,
    sources: &dyn SourceProvider,
    commands: &[RefactorCommand],
) -> RefactorResult<IndexMap<PathBuf, CleanedSource>> {
    let mut working_set = WorkingSet::new(ctx.codec, sources);
    for (index, command) in commands.iter().enumerate() {
        if let Err(e) = working_set.apply(ctx, command) {
            warn!(
                index,
                operation = command.operation.name(),
                symbol = %command.selector.name,
                error = %e,
                "Batch aborted"
            );
            return Err(e);
        }
    }
    let outputs = working_set.generate(ctx)?;
    info!(
        operations = commands.len(),
        files = outputs.len(),
        "Batch applied"
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{DeclarationKind, Selector, CURRENT_SCHEMA_VERSION};
    use crate::engine::MemorySources;
    use crate::operations::test_support::{normalized, Fixture};
    use pretty_assertions::assert_eq;

    fn command(name: &str, kind: DeclarationKind, file: &str, operation: Operation) -> RefactorCommand {
        RefactorCommand {
            schema_version: CURRENT_SCHEMA_VERSION,
            selector: Selector {
                name: name.to_string(),
                declaration_kind: kind,
                file_path: PathBuf::from(file),
            },
            operation,
        }
    }

    #[test]
    fn later_operations_see_earlier_renames() {
        let fx = Fixture::new();
        let sources = MemorySources::new().with_file(
            "src/a.ts",
            "export function oldName() { return 1; }\n\nexport function caller() { return oldName(); }\n",
        );
        let commands = vec![
            command(
                "oldName",
                DeclarationKind::Function,
                "src/a.ts",
                Operation::Rename {
                    new_name: "newName".to_string(),
                },
            ),
            command(
                "newName",
                DeclarationKind::Function,
                "src/a.ts",
                Operation::Move {
                    target_file_path: PathBuf::from("src/b.ts"),
                },
            ),
        ];

        let outputs = apply_batch(&fx.context(), &sources, &commands).unwrap();
        let files: Vec<&PathBuf> = outputs.keys().collect();
        assert_eq!(files, vec![&PathBuf::from("src/a.ts"), &PathBuf::from("src/b.ts")]);
        assert_eq!(
            normalized(outputs[&PathBuf::from("src/a.ts")].as_str()),
            "import { newName } from \"./b\"; export function caller() { return newName(); }"
        );
        assert_eq!(
            outputs[&PathBuf::from("src/b.ts")].as_str(),
            "export function newName() { return 1; }\n"
        );
    }

    #[test]
    fn stale_selector_fails_the_whole_batch() {
        let fx = Fixture::new();
        let sources = MemorySources::new().with_file("a.ts", "function f() {}\n");
        let commands = vec![
            command("f", DeclarationKind::Function, "a.ts", Operation::Remove),
            command(
                "f",
                DeclarationKind::Function,
                "a.ts",
                Operation::Rename {
                    new_name: "g".to_string(),
                },
            ),
        ];
        let err = apply_batch(&fx.context(), &sources, &commands).unwrap_err();
        assert!(matches!(err, RefactorError::SymbolNotFound { .. }));
    }

    #[test]
    fn missing_source_file_is_an_io_error() {
        let fx = Fixture::new();
        let sources = MemorySources::new();
        let commands = vec![command("f", DeclarationKind::Function, "nope.ts", Operation::Remove)];
        let err = apply_batch(&fx.context(), &sources, &commands).unwrap_err();
        assert!(matches!(err, RefactorError::Io { .. }));
    }

    #[test]
    fn move_into_same_file_is_rejected() {
        let fx = Fixture::new();
        let sources = MemorySources::new().with_file("a.ts", "function f() {}\n");
        let commands = vec![command(
            "f",
            DeclarationKind::Function,
            "a.ts",
            Operation::Move {
                target_file_path: PathBuf::from("./a.ts"),
            },
        )];
        let err = apply_batch(&fx.context(), &sources, &commands).unwrap_err();
        assert!(matches!(
            err,
            RefactorError::Schema(SchemaError::InvalidField { ref field, .. }) if field == "targetFilePath"
        ));
    }
}
