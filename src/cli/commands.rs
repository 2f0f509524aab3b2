use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use code_atlas::config::AtlasConfig;
use code_atlas::docs::{doc_page_for, has_existing_docs, render_index};
use code_atlas::error::Result;
use code_atlas::git::{ChangeDetector, ChangeSet, DiffRequest, GitCli};
use code_atlas::graph::DependencyGraph;
use code_atlas::indexer::{AnalysisStats, DependencyAnalyzer, FileRecord, FileWalker};
use code_atlas::selection::{RunMode, WorkSelector};
use code_atlas::REGISTRY;

#[derive(Parser)]
#[command(name = "code-atlas")]
#[command(about = "Import graphs and incremental work selection for repository documentation")]
#[command(version)]
#[command(after_long_help = r#"
EXAMPLES:
    # Print the dependency graph of the current checkout
    code-atlas deps

    # Dependencies and dependents of one file, as JSON
    code-atlas deps ./repo --file src/app.py --format json

    # Files changed by the last commit
    code-atlas changed --head HEAD

    # Files changed by a pull request
    code-atlas changed --event pull-request --base origin/main --head HEAD

    # What the next documentation run should regenerate
    code-atlas plan --head "$GITHUB_SHA" --base "$BEFORE_SHA"

    # Docs index page for every documentable file
    code-atlas index > docs/index.md
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// YAML config file (defaults to <PATH>/.codeatlas.yaml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the import graph and print it
    Deps {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Only show dependencies and dependents of this repository path
        #[arg(long)]
        file: Option<String>,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the files added or modified between two git states
    Changed {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Head commit
        #[arg(long)]
        head: String,

        /// Base commit (push: previous head; pull-request: target branch)
        #[arg(long)]
        base: Option<String>,

        /// Triggering event (push, pull-request)
        #[arg(long, default_value = "push")]
        event: String,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Select the files the next documentation run must regenerate
    Plan {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Head commit
        #[arg(long, default_value = "HEAD")]
        head: String,

        /// Base commit (push: previous head; pull-request: target branch)
        #[arg(long)]
        base: Option<String>,

        /// Triggering event (push, pull-request)
        #[arg(long, default_value = "push")]
        event: String,

        /// Output format (text, json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Print the Markdown index linking every documentable file's page
    Index {
        /// Repository root
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

/// Explicit `--config` wins; otherwise the repository's own config file.
pub fn load_config(path: &Path, explicit: Option<&Path>) -> Result<AtlasConfig> {
    match explicit {
        Some(file) => AtlasConfig::load(file),
        None => AtlasConfig::discover(path),
    }
}

#[derive(Serialize)]
struct GraphReport<'a> {
    stats: AnalysisStats,
    graph: &'a DependencyGraph,
}

#[derive(Serialize)]
struct FileReport<'a> {
    file: &'a str,
    dependencies: Vec<&'a str>,
    dependents: Vec<&'a str>,
}

/// Prints the dependency graph, or one file's neighbourhood.
pub fn show_dependencies(path: &Path, config: &AtlasConfig, file: Option<String>, format: &str) -> Result<()> {
    let files = FileWalker::new().walk(path)?;

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::with_template("{spinner} analyzing {pos}/{len} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    let result = DependencyAnalyzer::new(&REGISTRY)
        .with_max_file_bytes(config.max_file_bytes)
        .with_progress(progress)
        .analyze_dir(path, &files);
    let graph = &result.graph;

    if let Some(file) = file.as_deref() {
        let report = FileReport {
            file,
            dependencies: graph.dependencies_of(file),
            dependents: graph.dependents_of(file),
        };
        if format == "json" {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("Dependencies of {} ({}):", file, report.dependencies.len());
        for dep in &report.dependencies {
            println!("  {}", dep);
        }
        println!("Dependents of {} ({}):", file, report.dependents.len());
        for dep in &report.dependents {
            println!("  {}", dep);
        }
        return Ok(());
    }

    if format == "json" {
        let report = GraphReport {
            stats: result.stats,
            graph,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let stats = result.stats;
    println!(
        "Analyzed {} files ({} skipped), {} imports, {} unresolved",
        stats.files_analyzed, stats.files_skipped, stats.imports_seen, stats.unresolved
    );
    if graph.is_empty() {
        println!("No internal dependencies found");
        return Ok(());
    }

    println!("Dependency graph ({} edges):", graph.edge_count());
    for source in graph.files() {
        let deps = graph.dependencies_of(source);
        if deps.is_empty() {
            continue;
        }
        println!("{}", source);
        for dep in deps {
            println!("  -> {}", dep);
        }
    }

    Ok(())
}

fn detector(path: &Path, config: &AtlasConfig) -> ChangeDetector {
    ChangeDetector::new(Arc::new(GitCli::new(path))).with_timeout(config.git_timeout())
}

/// Prints the change set for a request. Diff failures are returned, not
/// printed as an empty list.
pub async fn show_changed(path: &Path, config: &AtlasConfig, request: DiffRequest, format: &str) -> Result<()> {
    let changes = detector(path, config).changed_files(&request).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&changes)?);
        return Ok(());
    }

    if changes.is_empty() {
        println!("No changed files in {}", request);
        return Ok(());
    }
    println!("Changed files in {} ({}):", request, changes.len());
    for file in changes.iter() {
        println!("  {}", file);
    }
    Ok(())
}

#[derive(Serialize)]
struct PlanItem<'a> {
    #[serde(flatten)]
    record: &'a FileRecord,
    doc_page: String,
}

#[derive(Serialize)]
struct PlanReport<'a> {
    mode: RunMode,
    docs_dir: &'a str,
    items: Vec<PlanItem<'a>>,
}

/// Prints the files the next documentation run should regenerate.
pub async fn show_plan(path: &Path, config: &AtlasConfig, request: DiffRequest, format: &str) -> Result<()> {
    let files = FileWalker::new().walk(path)?;
    let has_docs = has_existing_docs(path, &config.docs_dir);

    // First runs document everything, so git is only consulted for updates.
    let changes = if has_docs {
        detector(path, config).changed_files(&request).await
    } else {
        Ok(ChangeSet::default())
    };

    let selector = WorkSelector::new(config.exclusion_policy()?);
    let plan = selector.plan(&files, has_docs, changes)?;

    let docs_dir = config.docs_dir.trim_end_matches('/');
    let report = PlanReport {
        mode: plan.mode,
        docs_dir,
        items: plan
            .items
            .iter()
            .map(|record| PlanItem {
                record,
                doc_page: format!("{}/{}", docs_dir, doc_page_for(&record.path)),
            })
            .collect(),
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Mode: {}", report.mode.as_str());
    if report.items.is_empty() {
        println!("Nothing to document");
        return Ok(());
    }
    println!("Files to document ({}):", report.items.len());
    for item in &report.items {
        let language = item.record.language.map(|l| l.as_str()).unwrap_or("unknown");
        println!("  {} ({}) -> {}", item.record.path, language, item.doc_page);
    }
    Ok(())
}

/// Prints the docs root `index.md` for every eligible file.
pub fn show_index(path: &Path, config: &AtlasConfig) -> Result<()> {
    let files = FileWalker::new().walk(path)?;
    let selector = WorkSelector::new(config.exclusion_policy()?);
    let eligible = selector.select(&files, false, &ChangeSet::default());
    print!("{}", render_index(&eligible));
    Ok(())
}
