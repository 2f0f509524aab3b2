//! Documentation tree state: whether a checkout already carries generated
//! pages, and where a source file's page lives.

use std::path::Path;

use walkdir::WalkDir;

use crate::indexer::inventory::FileRecord;

/// Subdirectory of the docs root holding per-file pages.
pub const CODE_PAGES_DIR: &str = "code";

/// True when `docs_dir` (relative to `root`) contains any Markdown file.
pub fn has_existing_docs(root: &Path, docs_dir: &str) -> bool {
    let docs_root = root.join(docs_dir);
    if !docs_root.is_dir() {
        return false;
    }
    WalkDir::new(&docs_root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .any(|entry| {
            entry.file_type().is_file() && entry.path().extension().is_some_and(|ext| ext == "md")
        })
}

/// Page for a source file, relative to the docs root: `code/<path>.md`.
pub fn doc_page_for(path: &str) -> String {
    format!("{}/{}.md", CODE_PAGES_DIR, path)
}

/// Markdown for the docs root `index.md`, one link per page in path order.
pub fn render_index(files: &[FileRecord]) -> String {
    let mut paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
    paths.sort_unstable();
    paths.dedup();

    let mut out = String::from("# CodeAtlas Documentation\n\nGenerated pages:\n\n");
    for path in paths {
        out.push_str(&format!("- [{}]({})\n", path, doc_page_for(path)));
    }
    out
}
