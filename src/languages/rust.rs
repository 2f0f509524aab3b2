use once_cell::sync::Lazy;
use regex::Regex;

use super::{strip_repeated, Anchor, ImportKind, ImportStrategy, Language, ModuleRequest, RawImport};
use crate::indexer::import_resolver::ResolveContext;
use crate::indexer::inventory::{join_path, parent_dir};

/// `use` trees and out-of-line `mod` declarations.
///
/// Tokens keep their Rust spelling (`crate::a::b`, `super::x`); mapping to
/// files happens in [`ImportStrategy::module_requests`], which knows where the
/// importing file sits in the module tree.
pub struct RustImports;

static USE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#\[[^\]]*\]\s*)*(?:pub(?:\([^)]*\))?\s+)?use\s+([^;]+);").unwrap()
});
static MOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*(?:#\[[^\]]*\]\s*)*(?:pub(?:\([^)]*\))?\s+)?mod\s+([A-Za-z_][A-Za-z0-9_]*)\s*;")
        .unwrap()
});

/// Files whose child modules live next to them rather than in a same-named directory.
const MODULE_ROOT_FILES: &[&str] = &["mod", "lib", "main"];

impl ImportStrategy for RustImports {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract(&self, source_file: &str, content: &str) -> Vec<RawImport> {
        let mut found: Vec<(usize, RawImport)> = Vec::new();

        for caps in USE_RE.captures_iter(content) {
            let Some(tree) = caps.get(1) else { continue };
            let compact: String = tree.as_str().split_whitespace().collect::<Vec<_>>().join(" ");
            for path in expand_use_tree(&compact) {
                found.push((tree.start(), RawImport::new(source_file, path.clone(), kind_of(&path))));
            }
        }

        for caps in MOD_RE.captures_iter(content) {
            let Some(name) = caps.get(1) else { continue };
            found.push((
                name.start(),
                RawImport::new(source_file, name.as_str(), ImportKind::Relative),
            ));
        }

        // Stable sort keeps the expansion order of a single `use` tree.
        found.sort_by_key(|(offset, _)| *offset);
        found.into_iter().map(|(_, import)| import).collect()
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["rs"]
    }

    fn package_entries(&self) -> &[&'static str] {
        &["mod.rs"]
    }

    fn module_requests(&self, import: &RawImport, _ctx: &ResolveContext<'_>) -> Vec<ModuleRequest> {
        let own_dir = module_subdir(&import.source_file);
        let token = import.token.as_str();
        if matches!(token, "crate" | "self" | "super") {
            return Vec::new();
        }

        // `mod x;` is the only relative token without a path prefix.
        if import.kind == ImportKind::Relative && !token.contains("::") {
            return vec![ModuleRequest::new(join_path(own_dir, token), Anchor::Importer { up: 0 })];
        }

        let (prefix, anchor, rest) = if let Some(rest) = token.strip_prefix("crate::") {
            (String::new(), Anchor::Roots, rest)
        } else if let Some(rest) = token.strip_prefix("self::") {
            (own_dir.to_string(), Anchor::Importer { up: 0 }, rest)
        } else if token.starts_with("super::") {
            let (levels, rest) = strip_repeated(token, "super::");
            // The first `super` of a non-root file only leaves its own directory.
            if own_dir.is_empty() {
                (String::new(), Anchor::Importer { up: levels }, rest)
            } else {
                (String::new(), Anchor::Importer { up: levels - 1 }, rest)
            }
        } else {
            (own_dir.to_string(), Anchor::Importer { up: 0 }, token)
        };

        let segments: Vec<&str> = rest.split("::").filter(|s| !s.is_empty()).collect();
        (1..=segments.len())
            .rev()
            .map(|len| ModuleRequest::new(join_path(&prefix, &segments[..len].join("/")), anchor))
            .collect()
    }

    fn roots(&self, source_file: &str, ctx: &ResolveContext<'_>) -> Vec<String> {
        let mut roots = Vec::new();
        let mut dir = parent_dir(source_file);
        loop {
            if ["lib.rs", "main.rs"]
                .iter()
                .any(|root| ctx.inventory.contains(&join_path(dir, root)))
            {
                roots.push(dir.to_string());
                break;
            }
            if dir.is_empty() {
                break;
            }
            dir = parent_dir(dir);
        }
        if !roots.iter().any(|r| r.is_empty()) {
            roots.push(String::new());
        }
        roots
    }
}

fn kind_of(path: &str) -> ImportKind {
    if path == "crate" || path.starts_with("crate::") {
        ImportKind::Absolute
    } else if path.starts_with("self::") || path.starts_with("super::") || path == "self" || path == "super" {
        ImportKind::Relative
    } else {
        ImportKind::Package
    }
}

/// Directory holding the children of the module defined by `source_file`,
/// relative to the file's own directory.
fn module_subdir(source_file: &str) -> &str {
    let name = source_file.rsplit('/').next().unwrap_or(source_file);
    let stem = name.strip_suffix(".rs").unwrap_or(name);
    if MODULE_ROOT_FILES.contains(&stem) {
        ""
    } else {
        stem
    }
}

/// Flattens a `use` tree into `::` paths, dropping aliases and globs.
fn expand_use_tree(tree: &str) -> Vec<String> {
    let tree = tree.trim().trim_start_matches("::");
    let Some(open) = tree.find('{') else {
        return clean_leaf(tree).into_iter().collect();
    };
    let Some(close) = tree.rfind('}') else {
        return Vec::new();
    };
    if close < open {
        return Vec::new();
    }

    let prefix = tree[..open].trim().trim_end_matches("::");
    let mut paths = Vec::new();
    for item in split_top_level(&tree[open + 1..close]) {
        let item = item.trim();
        if item.is_empty() {
            continue;
        }
        if item == "self" {
            if !prefix.is_empty() {
                paths.push(prefix.to_string());
            }
            continue;
        }
        for sub in expand_use_tree(item) {
            if prefix.is_empty() {
                paths.push(sub);
            } else {
                paths.push(format!("{}::{}", prefix, sub));
            }
        }
    }
    paths
}

fn clean_leaf(path: &str) -> Option<String> {
    let path = path.split(" as ").next().unwrap_or(path).trim();
    let path = path.trim_end_matches('*').trim_end_matches("::").replace(' ', "");
    if path.is_empty() || !path.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ':') {
        return None;
    }
    Some(path)
}

fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}
