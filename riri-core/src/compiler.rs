use std::path::{Path, PathBuf};

use tracing::{debug, info_span};

use crate::codegen_cpp::{EmitOptions, emit};
use crate::diagnostic::TracingSink;
use crate::error::CoreError;
use crate::parser::parse_source;
use crate::resolver::ImportResolver;
use crate::source::FsSource;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationArtifact {
    /// The complete C++20 translation unit.
    pub cpp: String,
    /// Canonical paths of every file inlined, entry file included.
    pub source_files: Vec<PathBuf>,
}

/// Compile the RiriLang file at `path`, following its imports.
pub fn compile_file(path: &Path, options: &EmitOptions) -> Result<CompilationArtifact, CoreError> {
    let _span = info_span!("compile", path = %path.display()).entered();

    let mut resolver = ImportResolver::new(FsSource, TracingSink);
    let program = resolver.resolve_entry(path)?;
    debug!(
        files = resolver.visited().len(),
        statements = program.body.len(),
        "imports resolved"
    );

    let cpp = emit(&program, options)?;
    Ok(CompilationArtifact {
        cpp,
        source_files: resolver.visited().iter().cloned().collect(),
    })
}

/// Compile in-memory source. Imports are resolved relative to `base_dir`.
pub fn compile_source(
    source: &str,
    base_dir: &Path,
    options: &EmitOptions,
) -> Result<CompilationArtifact, CoreError> {
    let program = parse_source(source)?;
    let mut resolver = ImportResolver::new(FsSource, TracingSink);
    let program = resolver.resolve_imports(program, base_dir)?;
    let cpp = emit(&program, options)?;
    Ok(CompilationArtifact {
        cpp,
        source_files: resolver.visited().iter().cloned().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn compiles_source_without_imports() {
        let artifact = compile_source("print(1);", Path::new("."), &EmitOptions::default())
            .expect("compile");
        assert!(artifact.cpp.contains("std::cout << 1 << std::endl;"));
        assert!(artifact.source_files.is_empty());
    }

    #[test]
    fn compiles_file_with_imports() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("lib.rr"), "func twice(x) { return x * 2; }").expect("write");
        let main = dir.path().join("main.rr");
        fs::write(&main, "import \"lib.rr\";\nprint(twice(4));").expect("write");

        let artifact = compile_file(&main, &EmitOptions::default()).expect("compile");
        assert!(artifact.cpp.contains("auto twice(auto x) {"));
        assert!(!artifact.cpp.contains("// import"));
        assert_eq!(artifact.source_files.len(), 2);
    }

    #[test]
    fn missing_entry_is_an_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = compile_file(&dir.path().join("nope.rr"), &EmitOptions::default()).unwrap_err();
        assert!(matches!(err, CoreError::SourceIo(_)), "{err:?}");
        assert_eq!(err.kind(), "io");
        assert_eq!(err.location(), None);
    }
}
