use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::error::Result;
use crate::indexer::inventory::FileRecord;
use crate::languages::classify;

/// Bytes read from an extensionless file to look for a shebang.
const SNIFF_BYTES: u64 = 256;

/// Walks a checkout and produces the repository snapshot.
///
/// Every regular file becomes a [`FileRecord`], supported or not: unsupported
/// files still take part in resolution (`import "./data.json"`).
#[derive(Debug, Clone, Default)]
pub struct FileWalker {
    include_hidden: bool,
}

impl FileWalker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Returns records sorted by path, with `/`-separated relative paths.
    pub fn walk(&self, root: &Path) -> Result<Vec<FileRecord>> {
        let mut records = Vec::new();

        let walker = WalkBuilder::new(root)
            .hidden(!self.include_hidden)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .ignore(true)
            .require_git(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        for result in walker {
            let entry = match result {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            let Some(relative) = relative_path(root, path) else {
                continue;
            };
            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);

            let language = if path.extension().is_some() {
                classify(&relative, None)
            } else {
                classify(&relative, sniff_first_line(path).as_deref())
            };

            records.push(FileRecord::new(relative, size_bytes).with_language(language));
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        debug!("Walked {} files under {}", records.len(), root.display());
        Ok(records)
    }
}

/// Repository-relative path with `/` separators, or `None` for the root itself.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn sniff_first_line(path: &Path) -> Option<String> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file.take(SNIFF_BYTES));
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line).ok()?;
    String::from_utf8(line).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::Language;
    use std::fs::{self, File};
    use std::io::Write;
    use tempfile::TempDir;

    fn create_file(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        let mut file = File::create(path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
    }

    fn paths(records: &[FileRecord]) -> Vec<&str> {
        records.iter().map(|r| r.path.as_str()).collect()
    }

    #[test]
    fn test_walk_recursive_and_sorted() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "src/module/deep/file.rs", "");
        create_file(temp_dir.path(), "root.rs", "");
        create_file(temp_dir.path(), "src/lib.rs", "");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();

        assert_eq!(paths(&files), vec!["root.rs", "src/lib.rs", "src/module/deep/file.rs"]);
    }

    #[test]
    fn test_walk_keeps_unsupported_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "main.rs", "fn main() {}");
        create_file(temp_dir.path(), "README.md", "# Readme");
        create_file(temp_dir.path(), "script.py", "print('hello')");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();

        assert_eq!(files.len(), 3);
        let readme = files.iter().find(|r| r.path == "README.md").unwrap();
        assert_eq!(readme.language, None);
        let script = files.iter().find(|r| r.path == "script.py").unwrap();
        assert_eq!(script.language, Some(Language::Python));
        assert_eq!(script.size_bytes, 14);
    }

    #[test]
    fn test_walk_sniffs_shebang_for_extensionless_files() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "bin/tool", "#!/usr/bin/env python3\nimport os\n");
        create_file(temp_dir.path(), "Makefile", "all:\n");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();

        let tool = files.iter().find(|r| r.path == "bin/tool").unwrap();
        assert_eq!(tool.language, Some(Language::Python));
        let make = files.iter().find(|r| r.path == "Makefile").unwrap();
        assert_eq!(make.language, None);
    }

    #[test]
    fn test_walk_respects_gitignore() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), ".gitignore", "target/\n*.generated.rs\n");
        create_file(temp_dir.path(), "src/main.rs", "fn main() {}");
        create_file(temp_dir.path(), "target/debug/build.rs", "");
        create_file(temp_dir.path(), "generated.generated.rs", "");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();

        assert_eq!(paths(&files), vec!["src/main.rs"]);
    }

    #[test]
    fn test_walk_hidden_files_ignored() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "visible.rs", "fn main() {}");
        create_file(temp_dir.path(), ".hidden.rs", "fn hidden() {}");

        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["visible.rs"]);

        let all = FileWalker::new().include_hidden(true).walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&all), vec![".hidden.rs", "visible.rs"]);
    }

    #[test]
    fn test_walk_skips_git_directory() {
        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), ".git/HEAD", "ref: refs/heads/main\n");
        create_file(temp_dir.path(), "a.go", "package a\n");

        let files = FileWalker::new().include_hidden(true).walk(temp_dir.path()).unwrap();
        assert_eq!(paths(&files), vec!["a.go"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_continues_past_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        create_file(temp_dir.path(), "a.go", "package a\n");
        create_file(temp_dir.path(), "locked/b.go", "package b\n");
        let locked = temp_dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let result = FileWalker::new().walk(temp_dir.path());
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let files = result.unwrap();
        assert!(paths(&files).contains(&"a.go"));
    }

        #[test]
    fn test_walk_empty_directory() {
        let temp_dir = TempDir::new().unwrap();
        let files = FileWalker::new().walk(temp_dir.path()).unwrap();
        assert!(files.is_empty());
    }
}
