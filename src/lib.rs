pub mod config;
pub mod docs;
pub mod error;
pub mod git;
pub mod graph;
pub mod indexer;
pub mod languages;
pub mod selection;

use once_cell::sync::Lazy;

pub use config::AtlasConfig;
pub use error::{AtlasError, Result};
pub use git::{ChangeDetector, ChangeSet, ChangeStatus, ChangedFile, DiffRequest, DiffSource, GitCli};
pub use graph::{DependencyGraph, ResolvedDependency};
pub use indexer::{
    AnalysisResult, AnalysisStats, DependencyAnalyzer, FileInventory, FileRecord, FileWalker, ModuleResolver,
    ResolveContext,
};
pub use languages::{classify, ImportKind, ImportStrategy, Language, LanguageRegistry, RawImport};
pub use selection::{ExclusionPolicy, PathPolicy, RunMode, RunPlan, WorkSelector};

/// Global language registry instance (lazily initialized)
pub static REGISTRY: Lazy<LanguageRegistry> = Lazy::new(LanguageRegistry::new);
