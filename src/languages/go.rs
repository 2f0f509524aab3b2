use once_cell::sync::Lazy;
use regex::Regex;

use super::{split_relative_specifier, Anchor, ImportKind, ImportStrategy, Language, ModuleRequest, RawImport};
use crate::indexer::import_resolver::ResolveContext;
use crate::indexer::inventory::FileInventory;

/// Go import specs, single-line and grouped.
pub struct GoImports;

static SINGLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^[ \t]*import[ \t]+(?:[A-Za-z_]\w*[ \t]+|[._][ \t]+)?["`]([^"`\n]+)["`]"#).unwrap()
});
static BLOCK_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*import[ \t]*\(").unwrap());
static SPEC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:[A-Za-z_]\w*\s+|[._]\s+)?["`]([^"`\n]+)["`]"#).unwrap());

impl GoImports {
    fn kind_of(path: &str) -> ImportKind {
        if path == "." || path == ".." || path.starts_with("./") || path.starts_with("../") {
            ImportKind::Relative
        } else if path.split('/').next().is_some_and(|first| first.contains('.')) {
            ImportKind::Absolute
        } else {
            ImportKind::Package
        }
    }
}

impl ImportStrategy for GoImports {
    fn language(&self) -> Language {
        Language::Go
    }

    fn extract(&self, source_file: &str, content: &str) -> Vec<RawImport> {
        let mut found: Vec<(usize, &str)> = Vec::new();

        for caps in SINGLE_RE.captures_iter(content) {
            if let Some(m) = caps.get(1) {
                found.push((m.start(), m.as_str()));
            }
        }

        found.extend(grouped_specs(content));

        found.sort_by_key(|(offset, _)| *offset);
        found
            .into_iter()
            .map(|(_, path)| RawImport::new(source_file, path, Self::kind_of(path)))
            .collect()
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["go"]
    }

    fn package_entries(&self) -> &[&'static str] {
        &[]
    }

    fn module_requests(&self, import: &RawImport, ctx: &ResolveContext<'_>) -> Vec<ModuleRequest> {
        if import.kind == ImportKind::Relative {
            let (up, path) = split_relative_specifier(&import.token);
            return vec![ModuleRequest::new(path, Anchor::Importer { up })];
        }

        // Imports under the repository's own module path are root-relative.
        if let Some(module) = ctx.go_module {
            if import.token == module {
                return vec![ModuleRequest::new("", Anchor::Roots)];
            }
            if let Some(rest) = import.token.strip_prefix(module).and_then(|r| r.strip_prefix('/')) {
                return vec![ModuleRequest::new(rest, Anchor::Roots)];
            }
        }

        vec![ModuleRequest::new(import.token.clone(), Anchor::for_kind(import.kind, 0))]
    }

    /// A Go package is a directory; its entry is the first non-test source
    /// file in path order.
    fn package_entry(&self, dir: &str, inventory: &FileInventory) -> Option<String> {
        inventory
            .files_in_dir(dir)
            .find(|path| path.ends_with(".go") && !path.ends_with("_test.go"))
            .map(str::to_string)
    }
}

/// Specs inside `import ( ... )` blocks with their byte offsets.
///
/// Scanned line by line with `//` comments removed, so a `)` in a comment
/// does not close the block. A block that never closes yields nothing.
fn grouped_specs(content: &str) -> Vec<(usize, &str)> {
    let mut found = Vec::new();
    let mut block: Option<Vec<(usize, &str)>> = None;
    let mut line_start = 0;

    for line in content.split_inclusive('\n') {
        let code = line.find("//").map_or(line, |idx| &line[..idx]);
        let mut body_start = 0;
        if block.is_none() {
            if let Some(open) = BLOCK_OPEN_RE.find(code) {
                block = Some(Vec::new());
                body_start = open.end();
            }
        }

        if let Some(specs) = block.as_mut() {
            let body = &code[body_start..];
            let (inner, closed) = match body.find(')') {
                Some(idx) => (&body[..idx], true),
                None => (body, false),
            };
            for spec in SPEC_RE.captures_iter(inner) {
                if let Some(m) = spec.get(1) {
                    specs.push((line_start + body_start + m.start(), m.as_str()));
                }
            }
            if closed {
                found.extend(block.take().unwrap_or_default());
            }
        }

        line_start += line.len();
    }

    found
}

/// Reads the module path from `go.mod` content.
pub fn module_path(go_mod: &str) -> Option<String> {
    go_mod
        .lines()
        .map(str::trim)
        .find_map(|line| {
            line.strip_prefix("module")
                .filter(|rest| rest.starts_with(char::is_whitespace))
        })
        .map(|rest| rest.trim().trim_matches('"').to_string())
        .filter(|module| !module.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(content: &str) -> Vec<(String, ImportKind)> {
        GoImports
            .extract("cmd/app/main.go", content)
            .into_iter()
            .map(|i| (i.token, i.kind))
            .collect()
    }

    #[test]
    fn test_single_imports() {
        let content = "package main\n\nimport \"fmt\"\nimport util \"example.com/app/lib\"\nimport _ \"./local\"\n";
        assert_eq!(
            tokens(content),
            vec![
                ("fmt".to_string(), ImportKind::Package),
                ("example.com/app/lib".to_string(), ImportKind::Absolute),
                ("./local".to_string(), ImportKind::Relative),
            ]
        );
    }

    #[test]
    fn test_grouped_imports() {
        let content = r#"package main

import (
    "fmt"
    // "commented/out"
    h "net/http"
    . "example.com/app/dot"

    "example.com/app/lib" // trailing
)

func main() {}
"#;
        let found: Vec<String> = tokens(content).into_iter().map(|(t, _)| t).collect();
        assert_eq!(found, vec!["fmt", "net/http", "example.com/app/dot", "example.com/app/lib"]);
    }

    #[test]
    fn test_mixed_single_and_grouped_keep_file_order() {
        let content = "import \"a.io/first\"\nimport (\n\t\"b.io/second\"\n)\nimport \"c.io/third\"\n";
        let found: Vec<String> = tokens(content).into_iter().map(|(t, _)| t).collect();
        assert_eq!(found, vec!["a.io/first", "b.io/second", "c.io/third"]);
    }

    #[test]
    fn test_parenthesis_in_comment_does_not_end_block() {
        let content = "import (\n\t\"fmt\" // print (stdout)\n\t\"example.com/app/lib\"\n)\n";
        let found: Vec<String> = tokens(content).into_iter().map(|(t, _)| t).collect();
        assert_eq!(found, vec!["fmt", "example.com/app/lib"]);
    }

    #[test]
    fn test_one_line_block() {
        let content = "import (\"fmt\"; \"os\")\n\nfunc main() {}\n";
        let found: Vec<String> = tokens(content).into_iter().map(|(t, _)| t).collect();
        assert_eq!(found, vec!["fmt", "os"]);
    }

    #[test]
    fn test_unterminated_block_is_tolerated() {
        let content = "import (\n\t\"fmt\"\n\nvar x = 1\n";
        assert!(tokens(content).is_empty());
    }

    #[test]
    fn test_module_path() {
        assert_eq!(
            module_path("// header\nmodule example.com/app\n\ngo 1.22\n"),
            Some("example.com/app".to_string())
        );
        assert_eq!(module_path("go 1.22\n"), None);
        assert_eq!(module_path("modulename x\n"), None);
    }

    #[test]
    fn test_module_prefixed_imports_anchor_at_root() {
        let inventory = FileInventory::default();
        let ctx = ResolveContext::new(&inventory).with_go_module(Some("example.com/app"));
        let import = RawImport::new("cmd/app/main.go", "example.com/app/lib", ImportKind::Absolute);
        assert_eq!(
            GoImports.module_requests(&import, &ctx),
            vec![ModuleRequest::new("lib", Anchor::Roots)]
        );

        let external = RawImport::new("cmd/app/main.go", "example.com/application/x", ImportKind::Absolute);
        assert_eq!(
            GoImports.module_requests(&external, &ctx),
            vec![ModuleRequest::new("example.com/application/x", Anchor::ImporterThenRoots)]
        );
    }

    #[test]
    fn test_package_entry_skips_tests() {
        let inventory = FileInventory::from_paths(["lib/a_test.go", "lib/b.go", "lib/sub/c.go"]);
        assert_eq!(GoImports.package_entry("lib", &inventory), Some("lib/b.go".to_string()));
        assert_eq!(GoImports.package_entry("missing", &inventory), None);
    }
}
