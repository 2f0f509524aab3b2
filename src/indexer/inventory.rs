//! Repository snapshot: file records and the in-memory path set the
//! resolver checks candidates against.

use std::collections::BTreeSet;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::languages::{classify, Language};

/// Metadata about one file in the repository snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRecord {
    /// Repository-relative path with `/` separators.
    pub path: String,
    /// `None` when the file is not in a supported language.
    pub language: Option<Language>,
    pub size_bytes: u64,
}

impl FileRecord {
    /// Builds a record, classifying the language from the path alone.
    pub fn new(path: impl Into<String>, size_bytes: u64) -> Self {
        let path = path.into();
        let language = classify(&path, None);
        Self {
            path,
            language,
            size_bytes,
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn is_supported(&self) -> bool {
        self.language.is_some()
    }
}

/// Sorted set of known repository paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileInventory {
    paths: BTreeSet<String>,
}

impl FileInventory {
    pub fn from_records(records: &[FileRecord]) -> Self {
        Self {
            paths: records.iter().map(|r| r.path.clone()).collect(),
        }
    }

    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    /// Files directly inside `dir` (not in subdirectories), in path order.
    pub fn files_in_dir<'a>(&'a self, dir: &str) -> impl Iterator<Item = &'a str> + 'a {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };
        let prefix_len = prefix.len();
        let range = self
            .paths
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded));
        range
            .take_while(move |path| path.starts_with(prefix.as_str()))
            .filter(move |path| !path[prefix_len..].contains('/'))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

/// Joins two slash-separated fragments, either of which may be empty.
pub fn join_path(base: &str, rest: &str) -> String {
    match (base.is_empty(), rest.is_empty()) {
        (true, _) => rest.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base.trim_end_matches('/'), rest),
    }
}

/// Directory part of a repository path; empty for files at the root.
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Collapses `.` and `..` segments. Returns `None` when the path climbs
/// above the repository root.
pub fn normalize_path(path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_classifies_language() {
        assert_eq!(FileRecord::new("pkg/a.py", 10).language, Some(Language::Python));
        assert_eq!(FileRecord::new("README.md", 10).language, None);
        assert!(!FileRecord::new("README.md", 10).is_supported());
    }

    #[test]
    fn test_files_in_dir_excludes_nested() {
        let inventory = FileInventory::from_paths(["lib/a.go", "lib/b.go", "lib/sub/c.go", "libx/d.go", "root.go"]);
        let files: Vec<&str> = inventory.files_in_dir("lib").collect();
        assert_eq!(files, vec!["lib/a.go", "lib/b.go"]);

        let root: Vec<&str> = inventory.files_in_dir("").collect();
        assert_eq!(root, vec!["root.go"]);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "a.py"), "a.py");
        assert_eq!(join_path("pkg", ""), "pkg");
        assert_eq!(join_path("pkg", "b"), "pkg/b");
        assert_eq!(join_path("", ""), "");
    }

    #[test]
    fn test_parent_dir() {
        assert_eq!(parent_dir("pkg/sub/a.py"), "pkg/sub");
        assert_eq!(parent_dir("a.py"), "");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("src/./a/../b.js"), Some("src/b.js".to_string()));
        assert_eq!(normalize_path("src/../../x"), None);
        assert_eq!(normalize_path(""), Some(String::new()));
    }
}
