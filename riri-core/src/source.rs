//! Where imported modules come from.
//!
//! The resolver only needs three capabilities: locate the entry file, turn
//! an import path plus a base directory into a canonical path, and read the
//! text at that path.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::CoreError;

pub trait ModuleSource {
    /// Canonical path of the entry file. A missing entry is a
    /// [`CoreError::SourceIo`], not an import failure.
    fn entry(&self, path: &Path) -> Result<PathBuf, CoreError>;

    /// Resolve `import` against `base_dir`, failing if no module exists there.
    fn resolve(&self, import: &str, base_dir: &Path) -> Result<PathBuf, CoreError>;

    fn read(&self, path: &Path) -> Result<String, CoreError>;
}

/// Modules on the local file system.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSource;

impl ModuleSource for FsSource {
    fn entry(&self, path: &Path) -> Result<PathBuf, CoreError> {
        let canonical = path.canonicalize()?;
        if !canonical.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a file", path.display()),
            )
            .into());
        }
        Ok(canonical)
    }

    fn resolve(&self, import: &str, base_dir: &Path) -> Result<PathBuf, CoreError> {
        let candidate = base_dir.join(import);
        if !candidate.is_file() {
            return Err(missing_module(import, candidate));
        }
        candidate.canonicalize().map_err(|err| CoreError::Import {
            message: format!("cannot canonicalize module '{import}': {err}"),
            path: candidate,
        })
    }

    fn read(&self, path: &Path) -> Result<String, CoreError> {
        fs::read_to_string(path).map_err(|err| CoreError::Import {
            message: format!("failed to read module: {err}"),
            path: path.to_path_buf(),
        })
    }
}

/// In-memory module table keyed by lexically normalized path.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    files: BTreeMap<PathBuf, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, text: impl Into<String>) -> &mut Self {
        self.files.insert(normalize(path.as_ref()), text.into());
        self
    }

    pub fn with(mut self, path: impl AsRef<Path>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }
}

impl ModuleSource for MemorySource {
    fn entry(&self, path: &Path) -> Result<PathBuf, CoreError> {
        let candidate = normalize(path);
        if self.files.contains_key(&candidate) {
            Ok(candidate)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
            .into())
        }
    }

    fn resolve(&self, import: &str, base_dir: &Path) -> Result<PathBuf, CoreError> {
        let candidate = normalize(&base_dir.join(import));
        if self.files.contains_key(&candidate) {
            Ok(candidate)
        } else {
            Err(missing_module(import, candidate))
        }
    }

    fn read(&self, path: &Path) -> Result<String, CoreError> {
        self.files
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| CoreError::Import {
                message: "failed to read module: not found".to_string(),
                path: path.to_path_buf(),
            })
    }
}

fn missing_module(import: &str, path: PathBuf) -> CoreError {
    CoreError::Import {
        message: format!("Cannot find module '{import}'"),
        path,
    }
}

/// Resolve `.` and `..` components without touching the file system.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_dot_segments() {
        assert_eq!(normalize(Path::new("/a/./b/../c.rr")), PathBuf::from("/a/c.rr"));
        assert_eq!(normalize(Path::new("lib/../main.rr")), PathBuf::from("main.rr"));
    }

    #[test]
    fn memory_source_resolves_relative_imports() {
        let source = MemorySource::new()
            .with("/proj/main.rr", "import \"lib/util.rr\";")
            .with("/proj/lib/util.rr", "let u = 1;");

        let resolved = source
            .resolve("lib/util.rr", Path::new("/proj"))
            .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/proj/lib/util.rr"));
        assert_eq!(source.read(&resolved).expect("read"), "let u = 1;");

        let back = source.resolve("../main.rr", Path::new("/proj/lib")).expect("resolve");
        assert_eq!(back, PathBuf::from("/proj/main.rr"));
    }

    #[test]
    fn missing_module_is_import_error() {
        let err = MemorySource::new()
            .resolve("nope.rr", Path::new("/proj"))
            .unwrap_err();
        match err {
            CoreError::Import { message, .. } => assert_eq!(message, "Cannot find module 'nope.rr'"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn fs_source_canonicalizes_existing_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("lib")).expect("mkdir");
        std::fs::write(dir.path().join("lib/a.rr"), "let a = 1;").expect("write");

        let resolved = FsSource
            .resolve("./lib/../lib/a.rr", dir.path())
            .expect("resolve");
        assert!(resolved.is_absolute());
        assert_eq!(FsSource.read(&resolved).expect("read"), "let a = 1;");
        assert!(FsSource.resolve("missing.rr", dir.path()).is_err());
    }

    #[test]
    fn missing_entry_is_a_source_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FsSource.entry(&dir.path().join("absent.rr")).unwrap_err();
        assert_eq!(err.kind(), "io");
        assert!(err.to_string().starts_with("failed to read source:"));

        let err = FsSource.entry(dir.path()).unwrap_err();
        assert!(matches!(err, CoreError::SourceIo(_)));

        let err = MemorySource::new().entry(Path::new("/p/main.rr")).unwrap_err();
        match err {
            CoreError::SourceIo(err) => assert_eq!(err.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
