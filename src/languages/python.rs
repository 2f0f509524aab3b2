use once_cell::sync::Lazy;
use regex::Regex;

use super::{strip_repeated, Anchor, ImportKind, ImportStrategy, Language, ModuleRequest, RawImport};
use crate::indexer::import_resolver::ResolveContext;

pub struct PythonImports;

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^import\s+(.+)$").unwrap());
static FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^from\s+(\.*)\s*([A-Za-z_][\w.]*)?\s+import\b(.*)$").unwrap());
static MODULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z_][\w]*(\.[A-Za-z_][\w]*)*$").unwrap());

/// Names imported by `from <dots> import ...` that may continue on later lines.
struct PendingNames {
    dots: String,
    closing: char,
}

impl ImportStrategy for PythonImports {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, source_file: &str, content: &str) -> Vec<RawImport> {
        let mut imports = Vec::new();
        let mut pending: Option<PendingNames> = None;

        let statements = content.lines().flat_map(|line| strip_comment(line).split(';'));
        for statement in statements {
            let line = statement.trim();

            if let Some(state) = pending.take() {
                let (names, done) = match state.closing {
                    ')' => match line.split_once(')') {
                        Some((names, _)) => (names, true),
                        None => (line, false),
                    },
                    _ => match line.strip_suffix('\\') {
                        Some(names) => (names, false),
                        None => (line, true),
                    },
                };
                push_relative_names(&mut imports, source_file, &state.dots, names);
                if !done {
                    pending = Some(state);
                }
                continue;
            }

            if line.is_empty() {
                continue;
            }

            if let Some(caps) = IMPORT_RE.captures(line) {
                for item in caps[1].trim_end_matches('\\').split(',') {
                    let Some(module) = item.split_whitespace().next() else {
                        continue;
                    };
                    if MODULE_RE.is_match(module) {
                        imports.push(RawImport::new(source_file, module, ImportKind::Absolute));
                    }
                }
                continue;
            }

            let Some(caps) = FROM_RE.captures(line) else {
                continue;
            };
            let dots = caps.get(1).map_or("", |m| m.as_str());
            let module = caps.get(2).map_or("", |m| m.as_str());

            match (dots.is_empty(), module.is_empty()) {
                (true, true) => {}
                (true, false) => {
                    imports.push(RawImport::new(source_file, module, ImportKind::Absolute));
                }
                (false, false) => {
                    imports.push(RawImport::new(
                        source_file,
                        format!("{}{}", dots, module),
                        ImportKind::Relative,
                    ));
                }
                (false, true) => {
                    // `from . import a, b` names sibling modules of the package.
                    let names = caps[3].trim();
                    if let Some(open) = names.strip_prefix('(') {
                        match open.split_once(')') {
                            Some((inner, _)) => {
                                push_relative_names(&mut imports, source_file, dots, inner)
                            }
                            None => {
                                push_relative_names(&mut imports, source_file, dots, open);
                                pending = Some(PendingNames {
                                    dots: dots.to_string(),
                                    closing: ')',
                                });
                            }
                        }
                    } else if let Some(head) = names.strip_suffix('\\') {
                        push_relative_names(&mut imports, source_file, dots, head);
                        pending = Some(PendingNames {
                            dots: dots.to_string(),
                            closing: '\\',
                        });
                    } else if names == "*" {
                        imports.push(RawImport::new(source_file, dots, ImportKind::Relative));
                    } else {
                        push_relative_names(&mut imports, source_file, dots, names);
                    }
                }
            }
        }

        imports
    }

    fn source_extensions(&self) -> &[&'static str] {
        &["py", "pyi"]
    }

    fn package_entries(&self) -> &[&'static str] {
        &["__init__.py", "__init__.pyi"]
    }

    fn module_requests(&self, import: &RawImport, _ctx: &ResolveContext<'_>) -> Vec<ModuleRequest> {
        let (dots, module) = strip_repeated(&import.token, ".");
        let path = module.replace('.', "/");
        let anchor = if dots > 0 {
            // One dot is the current package; each extra dot climbs a level.
            Anchor::Importer { up: dots - 1 }
        } else {
            Anchor::for_kind(import.kind, 0)
        };
        vec![ModuleRequest::new(path, anchor)]
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn push_relative_names(imports: &mut Vec<RawImport>, source_file: &str, dots: &str, names: &str) {
    for item in names.split(',') {
        let Some(name) = item.split_whitespace().next() else {
            continue;
        };
        let name = name.trim_matches(|c| c == '(' || c == ')');
        if name.is_empty() || name == "*" || !MODULE_RE.is_match(name) {
            continue;
        }
        imports.push(RawImport::new(
            source_file,
            format!("{}{}", dots, name),
            ImportKind::Relative,
        ));
    }
}
