pub mod analyzer;
pub mod import_resolver;
pub mod inventory;
pub mod walker;

pub use analyzer::{AnalysisResult, AnalysisStats, DependencyAnalyzer};
pub use import_resolver::{ModuleResolver, ResolveContext};
pub use inventory::{FileInventory, FileRecord};
pub use walker::FileWalker;
