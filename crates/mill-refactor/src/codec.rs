//! Parser/printer collaborator
//!
//! The engine only talks to source text through [`LanguageCodec`]. The swc
//! implementation parses TypeScript, TSX and JavaScript into an arena tree
//! and prints it back by concatenating verbatim text pieces.

use crate::ast::{lower, print, SyntaxTree};
use crate::error::{RefactorError, RefactorResult};
use std::path::Path;
use swc_common::comments::SingleThreadedComments;
use swc_common::{sync::Lrc, FileName, FilePathMapping, SourceMap};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, StringInput, Syntax, TsSyntax};
use tracing::debug;

/// Turns source text into a [`SyntaxTree`] and back
pub trait LanguageCodec: Send + Sync {
    fn parse(&self, path: &Path, source: &str) -> RefactorResult<SyntaxTree>;

    fn print(&self, tree: &SyntaxTree) -> RefactorResult<String>;

    /// Check that regenerated text is still syntactically valid
    fn validate(&self, path: &Path, text: &str) -> RefactorResult<()> {
        self.parse(path, text)
            .map(|_| ())
            .map_err(|e| RefactorError::generation(path, e.to_string()))
    }
}

/// swc-backed codec for `.ts`, `.tsx`, `.js`, `.jsx`, `.mjs` and `.cjs` files
#[derive(Debug, Default, Clone, Copy)]
pub struct SwcCodec;

/// Parser syntax for a file, chosen by extension
pub fn syntax_for(path: &Path) -> Syntax {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("js") | Some("jsx") | Some("mjs") | Some("cjs") => Syntax::Es(EsSyntax {
            jsx: true,
            ..Default::default()
        }),
        Some("tsx") => Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        }),
        _ => Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: true,
            ..Default::default()
        }),
    }
}

impl LanguageCodec for SwcCodec {
    fn parse(&self, path: &Path, source: &str) -> RefactorResult<SyntaxTree> {
        let cm = Lrc::new(SourceMap::new(FilePathMapping::empty()));
        let file_name = Lrc::new(FileName::Real(path.to_path_buf()));
        let source_file = cm.new_source_file(file_name, source.to_string());
        let comments = SingleThreadedComments::default();

        let lexer = Lexer::new(
            syntax_for(path),
            Default::default(),
            StringInput::from(&*source_file),
            Some(&comments),
        );
        let mut parser = Parser::new_from(lexer);

        let module = parser
            .parse_module()
            .map_err(|e| RefactorError::parse(path, format!("{:?}", e.kind())))?;

        let recovered = parser.take_errors();
        if let Some(first) = recovered.first() {
            return Err(RefactorError::parse(path, format!("{:?}", first.kind())));
        }

        debug!(
            file_path = %path.display(),
            statements = module.body.len(),
            "Parsed module"
        );

        Ok(lower::lower_module(
            path.to_path_buf(),
            source,
            source_file.start_pos,
            &module,
            &comments,
        ))
    }

    fn print(&self, tree: &SyntaxTree) -> RefactorResult<String> {
        Ok(print::print_tree(tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_follows_extension() {
        assert!(matches!(
            syntax_for(Path::new("a.tsx")),
            Syntax::Typescript(TsSyntax { tsx: true, .. })
        ));
        assert!(matches!(
            syntax_for(Path::new("a.ts")),
            Syntax::Typescript(TsSyntax { tsx: false, .. })
        ));
        assert!(matches!(syntax_for(Path::new("a.mjs")), Syntax::Es(_)));
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        let err = SwcCodec.parse(Path::new("broken.ts"), "function (").unwrap_err();
        assert!(matches!(err, RefactorError::Parse { .. }));
    }

    #[test]
    fn validate_reports_generation_failure() {
        let err = SwcCodec
            .validate(Path::new("out.ts"), "function f() {\n")
            .unwrap_err();
        assert!(matches!(err, RefactorError::GenerationFailure { .. }));
    }

    #[test]
    fn jsx_parses_in_jsx_files() {
        let tree = SwcCodec
            .parse(Path::new("view.jsx"), "const v = <Panel title=\"x\" />;\n")
            .unwrap();
        assert_eq!(tree.top_level().len(), 1);
    }
}
