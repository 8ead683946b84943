//! Artifact sinks: where generated files end up.
//!
//! The coordinator never touches the filesystem itself. It hands a finished
//! [`Generated`](crate::generate::Generated) to an [`ArtifactSink`], which
//! creates the output directory once and then receives every file in order.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("{} already exists", path.display())]
    DirectoryExists { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What to do when the output directory is already there.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExistingDirPolicy {
    /// Stop with [`SinkError::DirectoryExists`].
    #[default]
    Fail,
    /// Write into it, replacing files with the same name.
    Merge,
    /// Use the first free `<name>_2`, `<name>_3`, ...
    Version,
}

/// Destination for generated artifacts.
pub trait ArtifactSink {
    /// Create the output directory for `name` and return the directory that
    /// artifacts should be written into. Called once per run.
    fn create_dir(&mut self, name: &Path) -> Result<PathBuf, SinkError>;

    /// Write one artifact. `path` is inside a directory returned by
    /// [`create_dir`](Self::create_dir).
    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), SinkError>;
}

/// Pick the directory to use for `name` under `policy`.
fn resolve_dir(
    name: &Path,
    policy: ExistingDirPolicy,
    exists: impl Fn(&Path) -> bool,
) -> Result<PathBuf, SinkError> {
    if !exists(name) {
        return Ok(name.to_path_buf());
    }
    match policy {
        ExistingDirPolicy::Fail => Err(SinkError::DirectoryExists {
            path: name.to_path_buf(),
        }),
        ExistingDirPolicy::Merge => Ok(name.to_path_buf()),
        ExistingDirPolicy::Version => {
            let base = name.as_os_str().to_string_lossy().into_owned();
            let mut n = 2;
            loop {
                let candidate = PathBuf::from(format!("{}_{}", base, n));
                if !exists(&candidate) {
                    return Ok(candidate);
                }
                n += 1;
            }
        }
    }
}

/// Writes artifacts under a root directory on disk.
#[derive(Debug, Clone)]
pub struct FsSink {
    root: PathBuf,
    existing: ExistingDirPolicy,
}

impl FsSink {
    pub fn new(root: impl Into<PathBuf>, existing: ExistingDirPolicy) -> Self {
        Self {
            root: root.into(),
            existing,
        }
    }
}

impl ArtifactSink for FsSink {
    fn create_dir(&mut self, name: &Path) -> Result<PathBuf, SinkError> {
        let root = &self.root;
        let relative = resolve_dir(name, self.existing, |p| root.join(p).exists())?;
        let dir = root.join(&relative);
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        tracing::debug!(dir = %dir.display(), "created output directory");
        Ok(dir)
    }

    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), SinkError> {
        std::fs::write(path, contents).map_err(|source| SinkError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Keeps artifacts in memory. Used by tests and by callers that post-process
/// output before saving it.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub dirs: BTreeSet<PathBuf>,
    pub files: BTreeMap<PathBuf, Vec<u8>>,
    pub existing: ExistingDirPolicy,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents of a written file as text.
    pub fn text(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files
            .get(path.as_ref())
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

impl ArtifactSink for MemorySink {
    fn create_dir(&mut self, name: &Path) -> Result<PathBuf, SinkError> {
        let dirs = &self.dirs;
        let dir = resolve_dir(name, self.existing, |p| dirs.contains(p))?;
        self.dirs.insert(dir.clone());
        Ok(dir)
    }

    fn write(&mut self, path: &Path, contents: &[u8]) -> Result<(), SinkError> {
        self.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_sink_fails_on_existing_dir_by_default() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("shop")).unwrap();

        let mut sink = FsSink::new(root.path(), ExistingDirPolicy::default());
        let err = sink.create_dir(Path::new("shop")).unwrap_err();
        assert!(matches!(err, SinkError::DirectoryExists { ref path } if path == Path::new("shop")));
    }

    #[test]
    fn fs_sink_merges_into_existing_dir() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("shop")).unwrap();
        std::fs::write(root.path().join("shop/keep.txt"), "kept").unwrap();

        let mut sink = FsSink::new(root.path(), ExistingDirPolicy::Merge);
        let dir = sink.create_dir(Path::new("shop")).unwrap();
        sink.write(&dir.join("models.go"), b"package shop\n").unwrap();

        assert_eq!(dir, root.path().join("shop"));
        assert!(dir.join("keep.txt").exists());
        assert_eq!(std::fs::read_to_string(dir.join("models.go")).unwrap(), "package shop\n");
    }

    #[test]
    fn fs_sink_versions_existing_dirs() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir(root.path().join("shop")).unwrap();
        std::fs::create_dir(root.path().join("shop_2")).unwrap();

        let mut sink = FsSink::new(root.path(), ExistingDirPolicy::Version);
        let dir = sink.create_dir(Path::new("shop")).unwrap();
        assert_eq!(dir, root.path().join("shop_3"));
        assert!(dir.is_dir());
    }

    #[test]
    fn write_failure_names_the_path() {
        let root = tempfile::tempdir().unwrap();
        let mut sink = FsSink::new(root.path(), ExistingDirPolicy::Fail);
        let path = root.path().join("missing/models.go");
        let err = sink.write(&path, b"x").unwrap_err();
        assert!(matches!(err, SinkError::Io { path: ref p, .. } if *p == path));
    }

    #[test]
    fn memory_sink_applies_policy() {
        let mut sink = MemorySink::new();
        sink.create_dir(Path::new("shop")).unwrap();
        assert!(sink.create_dir(Path::new("shop")).is_err());

        sink.existing = ExistingDirPolicy::Version;
        assert_eq!(sink.create_dir(Path::new("shop")).unwrap(), PathBuf::from("shop_2"));
    }

    #[test]
    fn policy_from_config_text() {
        #[derive(Deserialize)]
        struct Output {
            on_existing: ExistingDirPolicy,
        }
        let output: Output = serde_json::from_str(r#"{ "on_existing": "version" }"#).unwrap();
        assert_eq!(output.on_existing, ExistingDirPolicy::Version);
    }
}
