//! Access to shader sources.
//!
//! The generator never touches the filesystem directly; every read goes through a
//! [`SourceProvider`] so that sources can also come from memory.

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
};

pub trait SourceProvider {
    fn read_text(&self, path: &Path) -> io::Result<String>;

    fn exists(&self, path: &Path) -> bool;

    /// Returns a path that identifies the file uniquely, used to detect recursive includes.
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

impl<P: SourceProvider + ?Sized> SourceProvider for &P {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        (**self).read_text(path)
    }

    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }
}

/// Reads sources from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl SourceProvider for FileSystem {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        std::fs::canonicalize(path)
    }
}

/// Sources held in memory, keyed by lexically normalized path.
#[derive(Debug, Clone, Default)]
pub struct InMemory {
    files: HashMap<PathBuf, String>,
}

impl InMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: impl AsRef<Path>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, source: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), source.into());
    }

    pub fn remove(&mut self, path: impl AsRef<Path>) -> Option<String> {
        self.files.remove(&normalize(path.as_ref()))
    }
}

impl SourceProvider for InMemory {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source for {}", path.display()),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize(path))
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let normalized = normalize(path);
        let known = self.files.contains_key(&normalized)
            || self.files.keys().any(|file| file.starts_with(&normalized));
        if known {
            Ok(normalized)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no source for {}", path.display()),
            ))
        }
    }
}

/// Resolves `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push("..");
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_normalizes_paths() {
        let sources = InMemory::new().with("shaders/lib/../common.glsl", "float x;");

        assert!(sources.exists(Path::new("./shaders/common.glsl")));
        assert_eq!(
            sources
                .canonicalize(Path::new("shaders/lib/./../common.glsl"))
                .unwrap(),
            PathBuf::from("shaders/common.glsl")
        );
        assert_eq!(
            sources.read_text(Path::new("shaders/common.glsl")).unwrap(),
            "float x;"
        );
    }

    #[test]
    fn in_memory_missing_file() {
        let sources = InMemory::new();
        let error = sources.read_text(Path::new("missing.frag")).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::NotFound);
        assert!(sources.canonicalize(Path::new("missing.frag")).is_err());
    }

    #[test]
    fn in_memory_directories_canonicalize() {
        let sources = InMemory::new().with("shaders/post/blur.frag", "");
        assert_eq!(
            sources.canonicalize(Path::new("./shaders/post/")).unwrap(),
            PathBuf::from("shaders/post")
        );
        assert!(!sources.exists(Path::new("shaders/post")));
    }
}
