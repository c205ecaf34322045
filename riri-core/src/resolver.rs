//! Import resolution: splice imported files into one program.
//!
//! Imports are expanded depth-first in declaration order. Each canonical
//! path is inlined at most once, which also breaks import cycles.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::ast::{Program, Stmt};
use crate::diagnostic::{Diagnostic, DiagnosticSink, TracingSink};
use crate::error::CoreError;
use crate::parser::parse_source;
use crate::source::{FsSource, ModuleSource};

pub struct ImportResolver<S, D> {
    source: S,
    sink: D,
    visited: BTreeSet<PathBuf>,
}

impl<S: ModuleSource, D: DiagnosticSink> ImportResolver<S, D> {
    pub fn new(source: S, sink: D) -> Self {
        Self {
            source,
            sink,
            visited: BTreeSet::new(),
        }
    }

    /// Record `path` as already inlined. Returns `false` if it was known.
    pub fn mark_visited(&mut self, path: impl Into<PathBuf>) -> bool {
        self.visited.insert(path.into())
    }

    /// Canonical paths of every file inlined so far, entry included.
    pub fn visited(&self) -> &BTreeSet<PathBuf> {
        &self.visited
    }

    pub fn into_sink(self) -> D {
        self.sink
    }

    /// Read, parse and fully resolve an entry file.
    ///
    /// The entry is marked visited first, so an import cycle leading back
    /// to it does not inline its statements a second time.
    pub fn resolve_entry(&mut self, path: &Path) -> Result<Program, CoreError> {
        let canonical = self.source.entry(path)?;
        self.mark_visited(canonical.clone());
        let program = self.load(&canonical)?;
        self.resolve_imports(program, base_dir_of(&canonical))
    }

    /// Replace every import in `program` with the resolved body of the
    /// imported file, relative to `base_dir`.
    pub fn resolve_imports(
        &mut self,
        program: Program,
        base_dir: &Path,
    ) -> Result<Program, CoreError> {
        let mut body = Vec::with_capacity(program.body.len());
        for stmt in program.body {
            let Stmt::Import { path: import } = stmt else {
                body.push(stmt);
                continue;
            };

            let resolved = self.source.resolve(&import, base_dir).inspect_err(|err| {
                self.sink
                    .report(Diagnostic::error(err.to_string()).in_file(base_dir.join(&import)))
            })?;

            if !self.mark_visited(resolved.clone()) {
                warn!(path = %resolved.display(), "skipping already imported module");
                self.sink.report(
                    Diagnostic::warning(format!("module '{import}' already imported; skipping"))
                        .in_file(resolved),
                );
                continue;
            }

            debug!(path = %resolved.display(), "resolving import");
            let imported = self.load(&resolved)?;
            let imported = self.resolve_imports(imported, base_dir_of(&resolved))?;
            body.extend(imported.body);
        }
        Ok(Program { body })
    }

    fn load(&mut self, path: &Path) -> Result<Program, CoreError> {
        let text = self.source.read(path)?;
        parse_source(&text).inspect_err(|err| {
            let mut diagnostic = Diagnostic::error(err.to_string()).in_file(path);
            if let Some((line, column)) = err.location() {
                diagnostic = diagnostic.at(line, column);
            }
            self.sink.report(diagnostic);
        })
    }
}

/// Resolve imports against the file system, reporting through `tracing`.
pub fn resolve_imports(program: Program, base_dir: &Path) -> Result<Program, CoreError> {
    ImportResolver::new(FsSource, TracingSink).resolve_imports(program, base_dir)
}

fn base_dir_of(path: &Path) -> &Path {
    path.parent().unwrap_or(Path::new(""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expr;
    use crate::diagnostic::Severity;
    use crate::source::MemorySource;

    fn declared_names(program: &Program) -> Vec<String> {
        program
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::VariableDeclaration { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn splices_imports_in_order_depth_first() {
        let source = MemorySource::new()
            .with(
                "/p/main.rr",
                "let m0 = 0; import \"a.rr\"; import \"b.rr\"; let m1 = 1;",
            )
            .with("/p/a.rr", "let a0 = 0; import \"lib/c.rr\"; let a1 = 1;")
            .with("/p/lib/c.rr", "let c = 0;")
            .with("/p/b.rr", "let b = 0;");

        let mut resolver = ImportResolver::new(source, Vec::new());
        let program = resolver
            .resolve_entry(Path::new("/p/main.rr"))
            .expect("resolve");

        assert_eq!(
            declared_names(&program),
            vec!["m0", "a0", "c", "a1", "b", "m1"]
        );
        assert!(!program.body.iter().any(|s| matches!(s, Stmt::Import { .. })));
        assert_eq!(resolver.visited().len(), 4);
        assert!(resolver.into_sink().is_empty());
    }

    #[test]
    fn cycles_terminate_with_each_file_once() {
        let source = MemorySource::new()
            .with("/p/x.rr", "import \"y.rr\"; let x = 1;")
            .with("/p/y.rr", "import \"x.rr\"; let y = 2;");

        let mut resolver = ImportResolver::new(source, Vec::new());
        let program = resolver
            .resolve_entry(Path::new("/p/x.rr"))
            .expect("resolve");

        assert_eq!(declared_names(&program), vec!["y", "x"]);
        let sink = resolver.into_sink();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].severity, Severity::Warning);
    }

    #[test]
    fn duplicate_imports_are_inlined_once() {
        let source = MemorySource::new()
            .with("/p/util.rr", "func helper() { return 1; }");
        let program = Program {
            body: vec![
                Stmt::Import {
                    path: "util.rr".to_string(),
                },
                Stmt::Import {
                    path: "./util.rr".to_string(),
                },
                Stmt::Expression(Expr::Call {
                    callee: Box::new(Expr::ident("helper")),
                    args: vec![],
                }),
            ],
        };

        let mut resolver = ImportResolver::new(source, Vec::new());
        let program = resolver
            .resolve_imports(program, Path::new("/p"))
            .expect("resolve");
        assert_eq!(program.body.len(), 2);
        assert!(matches!(program.body[0], Stmt::FunctionDeclaration(_)));
    }

    #[test]
    fn missing_import_aborts_resolution() {
        let source = MemorySource::new()
            .with("/p/main.rr", "import \"ok.rr\"; import \"gone.rr\";")
            .with("/p/ok.rr", "let ok = 1;");

        let mut resolver = ImportResolver::new(source, Vec::new());
        let err = resolver
            .resolve_entry(Path::new("/p/main.rr"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Import { .. }));
        let sink = resolver.into_sink();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].severity, Severity::Error);
    }

    #[test]
    fn missing_entry_fails_before_any_import() {
        let source = MemorySource::new().with("/p/lib.rr", "let lib = 1;");

        let mut resolver = ImportResolver::new(source, Vec::new());
        let err = resolver
            .resolve_entry(Path::new("/p/main.rr"))
            .unwrap_err();
        assert!(matches!(err, CoreError::SourceIo(_)));
        assert!(resolver.into_sink().is_empty());
    }

    #[test]
    fn syntax_error_in_import_reports_file_and_position() {
        let source = MemorySource::new()
            .with("/p/main.rr", "import \"bad.rr\";")
            .with("/p/bad.rr", "let a = 1;\nlet = 2;");

        let mut resolver = ImportResolver::new(source, Vec::new());
        let err = resolver
            .resolve_entry(Path::new("/p/main.rr"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Syntax { line: 2, .. }));

        let sink = resolver.into_sink();
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].file.as_deref(), Some(Path::new("/p/bad.rr")));
        assert_eq!(sink[0].line, Some(2));
    }
}
