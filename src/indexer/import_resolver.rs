//! Import Resolution for mapping raw import tokens to repository files
//!
//! Resolution runs against the in-memory [`FileInventory`], never the
//! working tree, so the same inventory always yields the same answer.
//! For every language the steps are tried in the same order:
//!
//! 1. the module path as a file under the base directory, bare and then with
//!    each source extension;
//! 2. the module path as a package directory holding an entry file;
//! 3. steps 1-2 again from each language root.
//!
//! A token that matches nothing is external and resolves to `None`.

use crate::indexer::inventory::{join_path, normalize_path, parent_dir, FileInventory};
use crate::languages::{Anchor, ImportStrategy, Language, LanguageRegistry, RawImport};

/// Read-only state shared by every resolution in a run.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub inventory: &'a FileInventory,
    /// Module path declared in the repository's `go.mod`.
    pub go_module: Option<&'a str>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(inventory: &'a FileInventory) -> Self {
        Self {
            inventory,
            go_module: None,
        }
    }

    pub fn with_go_module(mut self, go_module: Option<&'a str>) -> Self {
        self.go_module = go_module;
        self
    }
}

/// Resolves raw imports to repository-relative paths.
pub struct ModuleResolver<'a> {
    registry: &'a LanguageRegistry,
    ctx: ResolveContext<'a>,
}

impl<'a> ModuleResolver<'a> {
    pub fn new(registry: &'a LanguageRegistry, ctx: ResolveContext<'a>) -> Self {
        Self { registry, ctx }
    }

    /// Returns the file `import` refers to, or `None` for external or
    /// unknown modules.
    pub fn resolve(&self, language: Language, import: &RawImport) -> Option<String> {
        let strategy = self.registry.get(language)?;
        let source_dir = parent_dir(&import.source_file);
        let mut roots: Option<Vec<String>> = None;

        for request in strategy.module_requests(import, &self.ctx) {
            let bases = match request.anchor {
                Anchor::Importer { up } => ascend(source_dir, up).into_iter().collect(),
                Anchor::ImporterThenRoots => {
                    let mut bases = vec![source_dir.to_string()];
                    bases.extend(self.roots_for(strategy, import, &mut roots).iter().cloned());
                    bases
                }
                Anchor::Roots => self.roots_for(strategy, import, &mut roots).clone(),
            };

            let mut tried: Vec<&str> = Vec::new();
            for base in &bases {
                if tried.contains(&base.as_str()) {
                    continue;
                }
                tried.push(base);
                if let Some(hit) = self.probe(strategy, base, &request.path) {
                    return Some(hit);
                }
            }
        }

        None
    }

    fn roots_for<'r>(
        &self,
        strategy: &dyn ImportStrategy,
        import: &RawImport,
        cache: &'r mut Option<Vec<String>>,
    ) -> &'r Vec<String> {
        cache.get_or_insert_with(|| strategy.roots(&import.source_file, &self.ctx))
    }

    /// Steps 1 and 2 for one base directory.
    fn probe(&self, strategy: &dyn ImportStrategy, base: &str, path: &str) -> Option<String> {
        let candidate = normalize_path(&join_path(base, path))?;
        let inventory = self.ctx.inventory;

        if !path.is_empty() {
            if inventory.contains(&candidate) {
                return Some(candidate);
            }
            for ext in strategy.source_extensions() {
                let with_ext = format!("{}.{}", candidate, ext);
                if inventory.contains(&with_ext) {
                    return Some(with_ext);
                }
            }
        }

        strategy.package_entry(&candidate, inventory)
    }
}

/// Moves `dir` up `levels` directories; `None` above the repository root.
fn ascend(dir: &str, levels: usize) -> Option<String> {
    let mut current = dir;
    for _ in 0..levels {
        if current.is_empty() {
            return None;
        }
        current = parent_dir(current);
    }
    Some(current.to_string())
}
