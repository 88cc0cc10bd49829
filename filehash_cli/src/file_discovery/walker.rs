//! Directory walker module for file discovery

use super::{DiscoveryError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Options for file discovery
#[derive(Debug, Clone, Default)]
pub struct FileDiscoveryOptions {
    /// Descend into subdirectories
    pub recursive: bool,
    /// Follow symbolic links
    pub follow_links: bool,
}

impl FileDiscoveryOptions {
    /// Create new options with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set recursive processing
    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }
}

/// Streaming enumeration of the regular files below one root
pub struct FileDiscovery {
    walker: walkdir::IntoIter,
}

impl FileDiscovery {
    /// Start walking `path`, which may itself be a file
    pub fn new(path: &Path, options: &FileDiscoveryOptions) -> Result<Self> {
        if !path.exists() {
            return Err(DiscoveryError::PathNotFound(path.to_path_buf()));
        }

        let mut walker = WalkDir::new(path)
            .follow_links(options.follow_links)
            .sort_by_file_name();
        if !options.recursive {
            walker = walker.max_depth(1);
        }

        Ok(Self {
            walker: walker.into_iter(),
        })
    }

    fn is_hashable(entry: &DirEntry) -> bool {
        entry.file_type().is_file()
    }
}

impl Iterator for FileDiscovery {
    type Item = PathBuf;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.walker.next()? {
                Ok(entry) if Self::is_hashable(&entry) => {
                    return Some(entry.into_path());
                }
                Ok(_) => continue,
                Err(e) => {
                    // unreadable subtrees are skipped, not fatal
                    log::warn!("Walk error: {e}");
                    continue;
                }
            }
        }
    }
}

/// Collect the files behind `paths` as sorted absolute paths without duplicates
pub fn discover_files(paths: &[PathBuf], options: &FileDiscoveryOptions) -> Result<Vec<PathBuf>> {
    let mut files = BTreeSet::new();

    for root in paths {
        for file in FileDiscovery::new(root, options)? {
            let absolute = std::fs::canonicalize(&file)?;
            files.insert(absolute);
        }
    }

    Ok(files.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_directory() -> TempDir {
        let dir = TempDir::new().unwrap();
        let base = dir.path();

        fs::write(base.join("video1.mkv"), b"test").unwrap();
        fs::write(base.join("video2.mp4"), b"test").unwrap();

        let subdir = base.join("subdir");
        fs::create_dir(&subdir).unwrap();
        fs::write(subdir.join("nested.mkv"), b"test").unwrap();

        dir
    }

    fn names(files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_non_recursive_skips_subdirectories() {
        let dir = create_test_directory();
        let files =
            discover_files(&[dir.path().to_path_buf()], &FileDiscoveryOptions::new()).unwrap();

        assert_eq!(names(&files), vec!["video1.mkv", "video2.mp4"]);
    }

    #[test]
    fn test_recursive_finds_nested_files() {
        let dir = create_test_directory();
        let options = FileDiscoveryOptions::new().with_recursive(true);
        let files = discover_files(&[dir.path().to_path_buf()], &options).unwrap();

        assert_eq!(files.len(), 3);
        assert!(names(&files).contains(&"nested.mkv".to_string()));
        assert!(files.iter().all(|f| f.is_absolute()));
    }

    #[test]
    fn test_duplicates_collapse() {
        let dir = create_test_directory();
        let file = dir.path().join("video1.mkv");
        let files = discover_files(
            &[file.clone(), dir.path().to_path_buf(), file],
            &FileDiscoveryOptions::new(),
        )
        .unwrap();

        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");

        match discover_files(&[missing.clone()], &FileDiscoveryOptions::new()) {
            Err(DiscoveryError::PathNotFound(path)) => assert_eq!(path, missing),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }
}
