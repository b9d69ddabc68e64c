//! File-system collaborator.
//!
//! The engine only touches the disk through [`FileSystem`]: `ReadFiles` asks
//! it for matching input files and opens them, `WriteFiles` writes through it.
//! [`PhysicalFileSystem`] is the real implementation, rooted at the site
//! directory with input and output directories resolved against that root.
//!
//! Input patterns are `glob` patterns matched against paths relative to the
//! input directory, always with forward slashes:
//!
//! ```text
//! input/
//! ├── index.md            "index.md"        matches "*.md", "**/*.md"
//! └── posts/
//!     └── hello.md        "posts/hello.md"  matches "posts/*.md", "**/*.md"
//! ```

use crate::document::Content;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),
    #[error("input directory not found: {0}")]
    MissingInput(PathBuf),
}

pub trait FileSystem: Send + Sync {
    fn root_path(&self) -> &Path;
    fn input_path(&self) -> &Path;
    fn output_path(&self) -> &Path;

    /// Files under the input directory matching `pattern`, relative to it, sorted.
    fn find_input_files(&self, pattern: &str) -> Result<Vec<PathBuf>, FsError>;

    /// Open an input file for lazy reading.
    fn open_file(&self, path: &Path) -> io::Result<Content>;

    /// Write `bytes` to `path`, creating parent directories.
    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    fn input_file(&self, relative: &Path) -> PathBuf {
        self.input_path().join(relative)
    }

    fn output_file(&self, relative: &Path) -> PathBuf {
        self.output_path().join(relative)
    }
}

#[derive(Debug, Clone)]
pub struct PhysicalFileSystem {
    root: PathBuf,
    input: PathBuf,
    output: PathBuf,
}

impl PhysicalFileSystem {
    /// `input` and `output` are resolved against `root` unless absolute.
    pub fn new(root: impl Into<PathBuf>, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        let root = root.into();
        let input = root.join(input);
        let output = root.join(output);
        Self {
            root,
            input,
            output,
        }
    }
}

impl FileSystem for PhysicalFileSystem {
    fn root_path(&self) -> &Path {
        &self.root
    }

    fn input_path(&self) -> &Path {
        &self.input
    }

    fn output_path(&self) -> &Path {
        &self.output
    }

    fn find_input_files(&self, pattern: &str) -> Result<Vec<PathBuf>, FsError> {
        let pattern = glob::Pattern::new(pattern)?;
        if !self.input.is_dir() {
            return Err(FsError::MissingInput(self.input.clone()));
        }
        let options = glob::MatchOptions {
            require_literal_separator: true,
            ..Default::default()
        };

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.input).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable input entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.input) else {
                continue;
            };
            if pattern.matches_with(&slash_path(relative), options) {
                found.push(relative.to_path_buf());
            }
        }
        Ok(found)
    }

    fn open_file(&self, path: &Path) -> io::Result<Content> {
        Content::open(path)
    }

    fn write_file(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }
}

/// Output paths written during the current run.
///
/// `WriteFiles` claims a destination before writing it; a second claim on
/// the same path within a run is a collision.
#[derive(Debug, Default)]
pub struct OutputClaims {
    claimed: Mutex<HashSet<PathBuf>>,
}

impl OutputClaims {
    /// Returns false if `path` was already claimed this run.
    pub fn claim(&self, path: &Path) -> bool {
        self.lock().insert(path.to_path_buf())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.claimed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Relative path with `/` separators, for pattern matching and metadata.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether joining `relative` onto a directory stays inside that directory:
/// no root, drive prefix, or `..` segment.
pub fn is_contained(relative: &Path) -> bool {
    relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site() -> (TempDir, PhysicalFileSystem) {
        let tmp = TempDir::new().unwrap();
        let input = tmp.path().join("input");
        fs::create_dir_all(input.join("posts/2024")).unwrap();
        fs::write(input.join("index.md"), "home").unwrap();
        fs::write(input.join("about.txt"), "about").unwrap();
        fs::write(input.join("posts/hello.md"), "hello").unwrap();
        fs::write(input.join("posts/2024/old.md"), "old").unwrap();
        let fs = PhysicalFileSystem::new(tmp.path(), "input", "output");
        (tmp, fs)
    }

    #[test]
    fn double_star_matches_every_depth() {
        let (_tmp, fs) = site();
        let found: Vec<String> = fs
            .find_input_files("**/*.md")
            .unwrap()
            .iter()
            .map(|p| slash_path(p))
            .collect();
        assert_eq!(found, vec!["index.md", "posts/2024/old.md", "posts/hello.md"]);
    }

    #[test]
    fn single_star_stays_in_one_directory() {
        let (_tmp, fs) = site();
        let found = fs.find_input_files("posts/*.md").unwrap();
        assert_eq!(found, vec![PathBuf::from("posts/hello.md")]);
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let fs = PhysicalFileSystem::new(tmp.path(), "nope", "out");
        assert!(matches!(
            fs.find_input_files("*"),
            Err(FsError::MissingInput(_))
        ));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let (_tmp, fs) = site();
        assert!(matches!(fs.find_input_files("[*"), Err(FsError::Pattern(_))));
    }

    #[test]
    fn second_claim_on_a_path_fails() {
        let claims = OutputClaims::default();
        assert!(claims.claim(Path::new("out/a.html")));
        assert!(!claims.claim(Path::new("out/a.html")));
        assert!(claims.claim(Path::new("out/b.html")));
        claims.clear();
        assert!(claims.is_empty());
    }

    #[test]
    fn write_creates_parent_directories() {
        let (_tmp, fs) = site();
        let target = fs.output_file(Path::new("a/b/c.html"));
        fs.write_file(&target, b"<p>hi</p>").unwrap();
        assert_eq!(std::fs::read_to_string(target).unwrap(), "<p>hi</p>");
    }

    #[test]
    fn contained_paths_have_only_normal_segments() {
        assert!(is_contained(Path::new("posts/hello.html")));
        assert!(is_contained(Path::new("./index.html")));
        assert!(!is_contained(Path::new("../escaped.txt")));
        assert!(!is_contained(Path::new("posts/../../escaped.txt")));
        assert!(!is_contained(Path::new("/etc/passwd")));
    }
}
