//! Engine facade and source providers.
//!
//! The engine never writes files. It reads current text through a
//! [`SourceProvider`] and returns the regenerated text of every file an
//! operation touched; callers decide what to do with it.

use crate::analysis::DependencyAnalyzer;
use crate::batch;
use crate::cleanup::CleanedSource;
use crate::codec::{LanguageCodec, SwcCodec};
use crate::command::{self, Operation, RefactorCommand, Selector, CURRENT_SCHEMA_VERSION};
use crate::config::{EngineConfig, RefactorConfig};
use crate::error::{RefactorError, RefactorResult};
use crate::imports::normalize;
use crate::operations::OperationContext;
use crate::resolve::{DeclarationResolver, TopLevelResolver};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Final text per touched file, in the order files were first touched
pub type RefactorOutput = IndexMap<PathBuf, CleanedSource>;

/// Supplies the current text of files
pub trait SourceProvider: Send + Sync {
    /// Text of `path`, or `None` when the file does not exist
    fn read(&self, path: &Path) -> RefactorResult<Option<String>>;
}

/// Files held in memory, keyed by normalized path
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: HashMap<PathBuf, String>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), text.into());
    }
}

impl SourceProvider for MemorySources {
    fn read(&self, path: &Path) -> RefactorResult<Option<String>> {
        Ok(self.files.get(&normalize(path)).cloned())
    }
}

/// Files under a project root on disk
#[derive(Debug, Clone)]
pub struct FsSources {
    root: PathBuf,
}

impl FsSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    /// Write every output back under the root, creating directories as needed
    pub fn write_all(&self, outputs: &RefactorOutput) -> RefactorResult<()> {
        for (path, text) in outputs {
            let full = self.resolve(path);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent).map_err(|source| RefactorError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(&full, text.as_str()).map_err(|source| RefactorError::Io {
                path: full.clone(),
                source,
            })?;
            debug!(file_path = %full.display(), "Wrote refactored file");
        }
        Ok(())
    }
}

impl SourceProvider for FsSources {
    fn read(&self, path: &Path) -> RefactorResult<Option<String>> {
        let full = self.resolve(path);
        match std::fs::read_to_string(&full) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(RefactorError::Io { path: full, source }),
        }
    }
}

/// Entry point for hosts: decodes commands and runs them
pub struct RefactorEngine {
    config: RefactorConfig,
    codec: Box<dyn LanguageCodec>,
    resolver: Box<dyn DeclarationResolver>,
    analyzer: DependencyAnalyzer,
}

impl Default for RefactorEngine {
    fn default() -> Self {
        Self::new(RefactorConfig::default())
    }
}

impl RefactorEngine {
    /// An engine using the swc codec and top-level selector resolution
    pub fn new(config: RefactorConfig) -> Self {
        Self::with_collaborators(config, Box::new(SwcCodec), Box::new(TopLevelResolver))
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.refactor.clone())
    }

    pub fn with_collaborators(
        config: RefactorConfig,
        codec: Box<dyn LanguageCodec>,
        resolver: Box<dyn DeclarationResolver>,
    ) -> Self {
        let analyzer = DependencyAnalyzer::new(&config.extra_globals);
        Self {
            config,
            codec,
            resolver,
            analyzer,
        }
    }

    pub fn config(&self) -> &RefactorConfig {
        &self.config
    }

    fn context(&self) -> OperationContext<'_> {
        OperationContext {
            codec: self.codec.as_ref(),
            resolver: self.resolver.as_ref(),
            analyzer: &self.analyzer,
            config: &self.config,
        }
    }

    /// Decode and validate one JSON command
    pub fn parse_command(&self, raw: &[u8]) -> RefactorResult<RefactorCommand> {
        command::parse(raw, &self.config.supported_schema_versions)
    }

    pub fn execute(
        &self,
        sources: &dyn SourceProvider,
        command: &RefactorCommand,
    ) -> RefactorResult<RefactorOutput> {
        batch::apply_batch(&self.context(), sources, std::slice::from_ref(command))
    }

    pub fn execute_json(&self, sources: &dyn SourceProvider, raw: &[u8]) -> RefactorResult<RefactorOutput> {
        let command = self.parse_command(raw)?;
        self.execute(sources, &command)
    }

    pub fn apply_batch(
        &self,
        sources: &dyn SourceProvider,
        commands: &[RefactorCommand],
    ) -> RefactorResult<RefactorOutput> {
        batch::apply_batch(&self.context(), sources, commands)
    }

    /// Decode a batch document (an array of commands, or an object with an
    /// `operations` array) and apply it
    pub fn apply_batch_json(&self, sources: &dyn SourceProvider, raw: &[u8]) -> RefactorResult<RefactorOutput> {
        let commands = command::parse_batch(raw, &self.config.supported_schema_versions)?;
        self.apply_batch(sources, &commands)
    }

    /// Move the selected declaration out of `source_text` into the file at
    /// `target_path`, whose current text is `target_text` (`None` for a new
    /// file). Returns the new source and target text.
    pub fn move_symbol(
        &self,
        selector: &Selector,
        source_text: &str,
        target_path: &Path,
        target_text: Option<&str>,
    ) -> RefactorResult<(CleanedSource, CleanedSource)> {
        let mut sources = MemorySources::new().with_file(&selector.file_path, source_text);
        if let Some(text) = target_text {
            sources.insert(target_path, text);
        }
        let mut outputs = self.execute(
            &sources,
            &single(
                selector,
                Operation::Move {
                    target_file_path: target_path.to_path_buf(),
                },
            ),
        )?;
        let source = take_output(&mut outputs, &selector.file_path)?;
        let target = take_output(&mut outputs, target_path)?;
        Ok((source, target))
    }

    /// Rename the selected declaration within `source_text`
    pub fn rename(&self, selector: &Selector, source_text: &str, new_name: &str) -> RefactorResult<CleanedSource> {
        let sources = MemorySources::new().with_file(&selector.file_path, source_text);
        let mut outputs = self.execute(
            &sources,
            &single(
                selector,
                Operation::Rename {
                    new_name: new_name.to_string(),
                },
            ),
        )?;
        take_output(&mut outputs, &selector.file_path)
    }

    /// Remove the selected declaration from `source_text`
    pub fn remove(&self, selector: &Selector, source_text: &str) -> RefactorResult<CleanedSource> {
        let sources = MemorySources::new().with_file(&selector.file_path, source_text);
        let mut outputs = self.execute(&sources, &single(selector, Operation::Remove))?;
        take_output(&mut outputs, &selector.file_path)
    }
}

fn single(selector: &Selector, operation: Operation) -> RefactorCommand {
    RefactorCommand {
        schema_version: CURRENT_SCHEMA_VERSION,
        selector: selector.clone(),
        operation,
    }
}

fn take_output(outputs: &mut RefactorOutput, path: &Path) -> RefactorResult<CleanedSource> {
    outputs
        .swap_remove(&normalize(path))
        .ok_or_else(|| RefactorError::generation(path, "no output produced"))
}
