pub mod go;
pub mod javascript;
pub mod python;
pub mod rust;

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::indexer::import_resolver::ResolveContext;
use crate::indexer::inventory::{join_path, FileInventory};

/// Languages the import extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Rust,
    Go,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Rust,
        Language::Go,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Rust => "rust",
            Language::Go => "go",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "py" | "pyi" => Some(Language::Python),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "ts" | "tsx" | "mts" | "cts" => Some(Language::TypeScript),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    /// Detects an interpreter from a `#!` line.
    pub fn from_shebang(first_line: &str) -> Option<Self> {
        let line = first_line.strip_prefix("#!")?;
        let interpreter = line
            .split_whitespace()
            .flat_map(|word| word.rsplit('/').next())
            .find(|word| *word != "env" && !word.starts_with('-'))?;

        if interpreter.starts_with("python") {
            Some(Language::Python)
        } else if interpreter == "node" || interpreter.starts_with("nodejs") {
            Some(Language::JavaScript)
        } else if interpreter == "deno" || interpreter == "ts-node" || interpreter == "tsx" {
            Some(Language::TypeScript)
        } else {
            None
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies a file by extension, sniffing the first line of content for
/// extensionless scripts. `None` means the file is not extracted.
pub fn classify(path: &str, head: Option<&str>) -> Option<Language> {
    match Path::new(path).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => Language::from_extension(ext),
        None => head
            .and_then(|content| content.lines().next())
            .and_then(Language::from_shebang),
    }
}

/// How an import token names its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportKind {
    /// Module path that may live in the repository (`crate::a`, `pkg.mod`).
    Absolute,
    /// Explicitly relative to the importing file (`./x`, `..mod`, `super::x`).
    Relative,
    /// Bare package name, usually external (`react`, `fmt`, `serde::Serialize`).
    Package,
}

/// Import token as it appears in the source, before resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImport {
    pub source_file: String,
    pub token: String,
    pub kind: ImportKind,
}

impl RawImport {
    pub fn new(source_file: impl Into<String>, token: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            source_file: source_file.into(),
            token: token.into(),
            kind,
        }
    }
}

/// Where the resolver starts looking for a module path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// The importing file's directory, shifted up `up` levels.
    Importer { up: usize },
    /// The importing file's directory, then the language roots.
    ImporterThenRoots,
    /// Only the language roots.
    Roots,
}

impl Anchor {
    pub fn for_kind(kind: ImportKind, up: usize) -> Self {
        match kind {
            ImportKind::Relative => Anchor::Importer { up },
            ImportKind::Absolute => Anchor::ImporterThenRoots,
            ImportKind::Package => Anchor::Roots,
        }
    }
}

/// One candidate module location derived from a raw import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRequest {
    /// Slash-separated path without extension; empty means the base directory itself.
    pub path: String,
    pub anchor: Anchor,
}

impl ModuleRequest {
    pub fn new(path: impl Into<String>, anchor: Anchor) -> Self {
        Self {
            path: path.into(),
            anchor,
        }
    }
}

/// Per-language extraction and resolution rules.
///
/// Implementations are stateless: `extract` only looks at the text it is
/// given, and `module_requests` only at the import and the shared inventory.
pub trait ImportStrategy: Send + Sync {
    fn language(&self) -> Language;

    /// Scans `content` and returns import tokens in first-seen order.
    fn extract(&self, source_file: &str, content: &str) -> Vec<RawImport>;

    /// Source extensions tried after the bare path, canonical first.
    fn source_extensions(&self) -> &[&'static str];

    /// Entry file names that make a directory importable.
    fn package_entries(&self) -> &[&'static str];

    /// Candidate module paths for an import, longest first.
    fn module_requests(&self, import: &RawImport, ctx: &ResolveContext<'_>) -> Vec<ModuleRequest>;

    /// Root directories for the root-relative step.
    fn roots(&self, _source_file: &str, _ctx: &ResolveContext<'_>) -> Vec<String> {
        vec![String::new()]
    }

    /// Finds the entry file of the package directory `dir`.
    fn package_entry(&self, dir: &str, inventory: &FileInventory) -> Option<String> {
        self.package_entries()
            .iter()
            .map(|entry| join_path(dir, entry))
            .find(|candidate| inventory.contains(candidate))
    }
}

pub struct LanguageRegistry {
    strategies: HashMap<Language, Arc<dyn ImportStrategy>>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };

        registry.register(Arc::new(python::PythonImports));
        registry.register(Arc::new(javascript::JavaScriptImports::javascript()));
        registry.register(Arc::new(javascript::JavaScriptImports::typescript()));
        registry.register(Arc::new(rust::RustImports));
        registry.register(Arc::new(go::GoImports));

        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn ImportStrategy>) {
        self.strategies.insert(strategy.language(), strategy);
    }

    pub fn get(&self, language: Language) -> Option<&dyn ImportStrategy> {
        self.strategies.get(&language).map(|s| s.as_ref())
    }

    /// Extracts raw imports, or nothing for a language without a strategy.
    pub fn extract(&self, language: Language, source_file: &str, content: &str) -> Vec<RawImport> {
        self.get(language)
            .map(|strategy| strategy.extract(source_file, content))
            .unwrap_or_default()
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        let mut languages: Vec<Language> = self.strategies.keys().copied().collect();
        languages.sort();
        languages
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Counts leading occurrences of `prefix` and returns the remainder.
pub(crate) fn strip_repeated<'a>(mut s: &'a str, prefix: &str) -> (usize, &'a str) {
    let mut count = 0;
    while let Some(rest) = s.strip_prefix(prefix) {
        count += 1;
        s = rest;
    }
    (count, s)
}

/// Splits a JS/Go style relative specifier into up-levels and the remaining path.
pub(crate) fn split_relative_specifier(token: &str) -> (usize, String) {
    let token = token.trim_start_matches("./");
    if token == "." {
        return (0, String::new());
    }
    if token == ".." {
        return (1, String::new());
    }
    let (up, rest) = strip_repeated(token, "../");
    if rest == ".." {
        return (up + 1, String::new());
    }
    (up, rest.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_new() {
        let registry = LanguageRegistry::new();
        for language in Language::ALL {
            assert!(registry.get(language).is_some(), "{} missing", language);
        }
    }

    #[test]
    fn test_registry_supported_languages_sorted() {
        let registry = LanguageRegistry::default();
        assert_eq!(registry.supported_languages(), Language::ALL.to_vec());
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify("pkg/a.py", None), Some(Language::Python));
        assert_eq!(classify("stubs/a.pyi", None), Some(Language::Python));
        assert_eq!(classify("src/x.js", None), Some(Language::JavaScript));
        assert_eq!(classify("src/x.mjs", None), Some(Language::JavaScript));
        assert_eq!(classify("src/App.tsx", None), Some(Language::TypeScript));
        assert_eq!(classify("src/lib.rs", None), Some(Language::Rust));
        assert_eq!(classify("lib/util.go", None), Some(Language::Go));
        assert_eq!(classify("src/Main.PY", None), Some(Language::Python));
    }

    #[test]
    fn test_classify_unsupported() {
        assert_eq!(classify("README.md", None), None);
        assert_eq!(classify("Main.java", None), None);
        assert_eq!(classify("Makefile", None), None);
        assert_eq!(classify("Makefile", Some("all:\n\techo hi\n")), None);
    }

    #[test]
    fn test_classify_sniffs_shebang_without_extension() {
        assert_eq!(
            classify("bin/tool", Some("#!/usr/bin/env python3\nimport os\n")),
            Some(Language::Python)
        );
        assert_eq!(classify("bin/run", Some("#!/usr/bin/node\n")), Some(Language::JavaScript));
        assert_eq!(
            classify("bin/task", Some("#!/usr/bin/env -S deno run\n")),
            Some(Language::TypeScript)
        );
        assert_eq!(classify("bin/sh", Some("#!/bin/sh\n")), None);
    }

    #[test]
    fn test_extension_wins_over_shebang() {
        assert_eq!(classify("tool.sh", Some("#!/usr/bin/env python\n")), None);
    }

    #[test]
    fn test_anchor_for_kind() {
        assert_eq!(Anchor::for_kind(ImportKind::Relative, 2), Anchor::Importer { up: 2 });
        assert_eq!(Anchor::for_kind(ImportKind::Absolute, 0), Anchor::ImporterThenRoots);
        assert_eq!(Anchor::for_kind(ImportKind::Package, 0), Anchor::Roots);
    }

    #[test]
    fn test_split_relative_specifier() {
        assert_eq!(split_relative_specifier("./y"), (0, "y".to_string()));
        assert_eq!(split_relative_specifier("../../lib/z"), (2, "lib/z".to_string()));
        assert_eq!(split_relative_specifier("./"), (0, String::new()));
        assert_eq!(split_relative_specifier(".."), (1, String::new()));
        assert_eq!(split_relative_specifier("../.."), (2, String::new()));
        assert_eq!(split_relative_specifier("./dir/"), (0, "dir".to_string()));
    }
}
