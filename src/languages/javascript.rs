use once_cell::sync::Lazy;
use regex::Regex;

use super::{split_relative_specifier, Anchor, ImportKind, ImportStrategy, Language, ModuleRequest, RawImport};
use crate::indexer::import_resolver::ResolveContext;

/// ES module and CommonJS imports. One instance per language so that the
/// extension preference follows the importing file.
pub struct JavaScriptImports {
    language: Language,
}

// Character classes exclude quotes and semicolons but match newlines, which
// lets multi-line specifier lists through.
static IMPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import\s+[^'";]*?\bfrom\s*['"]([^'"\n]+)['"]"#).unwrap()
});
static IMPORT_BARE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?m)^[ \t]*import\s*['"]([^'"\n]+)['"]"#).unwrap());
static EXPORT_FROM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*export\s+[^'";]*?\bfrom\s*['"]([^'"\n]+)['"]"#).unwrap()
});
static REQUIRE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\brequire\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#).unwrap());

const JS_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];
const TS_EXTENSIONS: &[&str] = &["ts", "tsx", "d.ts", "mts", "cts", "js", "jsx"];
const JS_ENTRIES: &[&str] = &[
    "index.js",
    "index.jsx",
    "index.mjs",
    "index.cjs",
    "index.ts",
    "index.tsx",
];
const TS_ENTRIES: &[&str] = &["index.ts", "index.tsx", "index.d.ts", "index.js", "index.jsx"];

impl JavaScriptImports {
    pub fn javascript() -> Self {
        Self {
            language: Language::JavaScript,
        }
    }

    pub fn typescript() -> Self {
        Self {
            language: Language::TypeScript,
        }
    }

    fn kind_of(specifier: &str) -> ImportKind {
        if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
            ImportKind::Relative
        } else if specifier.starts_with('/') {
            ImportKind::Absolute
        } else {
            ImportKind::Package
        }
    }
}

impl ImportStrategy for JavaScriptImports {
    fn language(&self) -> Language {
        self.language
    }

    fn extract(&self, source_file: &str, content: &str) -> Vec<RawImport> {
        let mut found: Vec<(usize, &str)> = Vec::new();
        for re in [&*IMPORT_FROM_RE, &*IMPORT_BARE_RE, &*EXPORT_FROM_RE, &*REQUIRE_RE] {
            for caps in re.captures_iter(content) {
                if let Some(m) = caps.get(1) {
                    found.push((m.start(), m.as_str()));
                }
            }
        }
        found.sort_by_key(|(offset, _)| *offset);
        found.dedup_by_key(|(offset, _)| *offset);

        found
            .into_iter()
            .map(|(_, specifier)| RawImport::new(source_file, specifier, Self::kind_of(specifier)))
            .collect()
    }

    fn source_extensions(&self) -> &[&'static str] {
        match self.language {
            Language::TypeScript => TS_EXTENSIONS,
            _ => JS_EXTENSIONS,
        }
    }

    fn package_entries(&self) -> &[&'static str] {
        match self.language {
            Language::TypeScript => TS_ENTRIES,
            _ => JS_ENTRIES,
        }
    }

    fn module_requests(&self, import: &RawImport, _ctx: &ResolveContext<'_>) -> Vec<ModuleRequest> {
        let (up, path, anchor) = match import.kind {
            ImportKind::Relative => {
                let (up, path) = split_relative_specifier(&import.token);
                (up, path, Anchor::Importer { up })
            }
            // A leading slash is the project root, never the importing directory.
            ImportKind::Absolute => (0, import.token.trim_start_matches('/').to_string(), Anchor::Roots),
            ImportKind::Package => (0, import.token.clone(), Anchor::Roots),
        };

        let mut requests = vec![ModuleRequest::new(path.clone(), anchor)];
        // ESM TypeScript writes `./x.js` for a `./x.ts` source.
        if self.language == Language::TypeScript {
            if let Some(stem) = path.strip_suffix(".js") {
                let anchor = if import.kind == ImportKind::Relative {
                    Anchor::Importer { up }
                } else {
                    anchor
                };
                requests.push(ModuleRequest::new(stem, anchor));
            }
        }
        requests
    }
}
