//! Source resolution for `import("./path")`.
//!
//! The evaluator never touches the file system directly; it asks a
//! [`SourceLoader`] for the text of a path relative to the importing file's
//! directory. [`FsLoader`] is the disk‑backed implementation.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::debug;

/// A source file located by a loader.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub path: PathBuf,
    pub source: String,
}

impl LoadedSource {
    /// Directory that imports inside this file are relative to.
    pub fn dir(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Namespace name for the imported module: the file stem.
    pub fn module_name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string())
    }
}

pub trait SourceLoader {
    /// `Ok(None)` means "no such file"; `Err` is a failure reading one that
    /// exists.
    fn load(&self, base_dir: &Path, relative: &str) -> io::Result<Option<LoadedSource>>;
}

/// Reads imports from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLoader;

impl SourceLoader for FsLoader {
    fn load(&self, base_dir: &Path, relative: &str) -> io::Result<Option<LoadedSource>> {
        let path = base_dir.join(relative);
        debug!("Loading import from {}", path.display());

        if !path.is_file() {
            return Ok(None);
        }

        let source = fs::read_to_string(&path)?;

        Ok(Some(LoadedSource { path, source }))
    }
}
