use std::io;
use std::path::Path;

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::graph::{DependencyGraph, ResolvedDependency};
use crate::indexer::import_resolver::{ModuleResolver, ResolveContext};
use crate::indexer::inventory::{FileInventory, FileRecord};
use crate::languages::{go, LanguageRegistry};

/// Default cap on the size of a file handed to the extractor.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 1024 * 1024;

/// Counters reported after a dependency analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    pub files_analyzed: usize,
    /// Supported files that could not be read, were not UTF-8, or were too large.
    pub files_skipped: usize,
    pub imports_seen: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub graph: DependencyGraph,
    pub stats: AnalysisStats,
}

enum FileOutcome {
    Skipped,
    Analyzed {
        edges: Vec<ResolvedDependency>,
        imports: usize,
        unresolved: usize,
    },
}

/// Runs extraction and resolution over a repository snapshot and builds the
/// dependency graph.
pub struct DependencyAnalyzer<'r> {
    registry: &'r LanguageRegistry,
    max_file_bytes: u64,
    progress: ProgressBar,
}

impl<'r> DependencyAnalyzer<'r> {
    pub fn new(registry: &'r LanguageRegistry) -> Self {
        Self {
            registry,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            progress: ProgressBar::hidden(),
        }
    }

    pub fn with_max_file_bytes(mut self, max_file_bytes: u64) -> Self {
        self.max_file_bytes = max_file_bytes;
        self
    }

    /// Ticks `progress` once per supported file.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Analyzes files of a checkout rooted at `root`.
    pub fn analyze_dir(&self, root: &Path, records: &[FileRecord]) -> AnalysisResult {
        self.analyze(records, |path| std::fs::read(root.join(path)))
    }

    /// Analyzes `records`, loading content through `read`.
    ///
    /// Edges come out in inventory order regardless of how the work was
    /// scheduled across threads.
    pub fn analyze<F>(&self, records: &[FileRecord], read: F) -> AnalysisResult
    where
        F: Fn(&str) -> io::Result<Vec<u8>> + Sync,
    {
        let inventory = FileInventory::from_records(records);
        let go_module = if inventory.contains("go.mod") {
            read("go.mod")
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .and_then(|content| go::module_path(&content))
        } else {
            None
        };
        if let Some(module) = &go_module {
            debug!("Go module path: {}", module);
        }

        let ctx = ResolveContext::new(&inventory).with_go_module(go_module.as_deref());
        let resolver = ModuleResolver::new(self.registry, ctx);

        let supported: Vec<&FileRecord> = records.iter().filter(|r| r.is_supported()).collect();
        self.progress.set_length(supported.len() as u64);

        let outcomes: Vec<FileOutcome> = supported
            .par_iter()
            .map(|record| {
                let outcome = self.analyze_file(record, &resolver, &read);
                self.progress.inc(1);
                outcome
            })
            .collect();
        self.progress.finish_and_clear();

        let mut stats = AnalysisStats::default();
        let mut edges = Vec::new();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Skipped => stats.files_skipped += 1,
                FileOutcome::Analyzed {
                    edges: file_edges,
                    imports,
                    unresolved,
                } => {
                    stats.files_analyzed += 1;
                    stats.imports_seen += imports;
                    stats.unresolved += unresolved;
                    edges.extend(file_edges);
                }
            }
        }

        let graph = DependencyGraph::build(edges);
        info!(
            "Analyzed {} files ({} skipped): {} imports, {} unresolved, {} edges",
            stats.files_analyzed,
            stats.files_skipped,
            stats.imports_seen,
            stats.unresolved,
            graph.edge_count()
        );

        AnalysisResult { graph, stats }
    }

    fn analyze_file<F>(&self, record: &FileRecord, resolver: &ModuleResolver<'_>, read: &F) -> FileOutcome
    where
        F: Fn(&str) -> io::Result<Vec<u8>> + Sync,
    {
        let Some(language) = record.language else {
            return FileOutcome::Skipped;
        };

        if record.size_bytes > self.max_file_bytes {
            warn!(
                "Skipping {}: {} bytes exceeds limit of {}",
                record.path, record.size_bytes, self.max_file_bytes
            );
            return FileOutcome::Skipped;
        }

        let bytes = match read(&record.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Skipping {}: {}", record.path, e);
                return FileOutcome::Skipped;
            }
        };
        let content = match String::from_utf8(bytes) {
            Ok(content) => content,
            Err(_) => {
                warn!("Skipping {}: content is not valid UTF-8", record.path);
                return FileOutcome::Skipped;
            }
        };

        let imports = self.registry.extract(language, &record.path, &content);
        let mut edges = Vec::new();
        let mut unresolved = 0;
        for import in &imports {
            match resolver.resolve(language, import) {
                Some(target) => edges.push(ResolvedDependency::new(record.path.clone(), target)),
                None => {
                    debug!("Unresolved import {:?} in {}", import.token, record.path);
                    unresolved += 1;
                }
            }
        }

        FileOutcome::Analyzed {
            edges,
            imports: imports.len(),
            unresolved,
        }
    }
}
