//! Decides which files a documentation run must (re)generate.

use glob::{MatchOptions, Pattern};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AtlasError, Result};
use crate::git::ChangeSet;
use crate::indexer::inventory::FileRecord;

/// Decides whether a path may be documented at all.
pub trait PathPolicy: Send + Sync {
    fn is_excluded(&self, path: &str) -> bool;
}

impl<F> PathPolicy for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_excluded(&self, path: &str) -> bool {
        self(path)
    }
}

/// Glob deny-list over repository-relative paths.
#[derive(Debug, Clone, Default)]
pub struct ExclusionPolicy {
    patterns: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

impl ExclusionPolicy {
    pub fn new<I, S>(globs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = globs
            .into_iter()
            .map(|g| Pattern::new(g.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Excludes nothing.
    pub fn none() -> Self {
        Self::default()
    }
}

impl PathPolicy for ExclusionPolicy {
    fn is_excluded(&self, path: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern.matches_with(path, MATCH_OPTIONS))
    }
}

/// How a [`RunPlan`] was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// No documentation yet: every eligible file.
    FirstRun,
    /// Only eligible files touched by the change set.
    Incremental,
    /// Documentation exists but the diff could not be computed.
    Fallback,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::FirstRun => "first_run",
            RunMode::Incremental => "incremental",
            RunMode::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunPlan {
    pub mode: RunMode,
    pub items: Vec<FileRecord>,
}

pub struct WorkSelector<P: PathPolicy> {
    policy: P,
}

impl<P: PathPolicy> WorkSelector<P> {
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    /// Eligible: a supported language and not excluded by the policy.
    pub fn is_eligible(&self, record: &FileRecord) -> bool {
        record.is_supported() && !self.policy.is_excluded(&record.path)
    }

    /// Files to document this run, sorted by path and de-duplicated.
    pub fn select(&self, all_files: &[FileRecord], has_existing_docs: bool, changes: &ChangeSet) -> Vec<FileRecord> {
        let mut items: Vec<FileRecord> = all_files
            .iter()
            .filter(|record| self.is_eligible(record))
            .filter(|record| !has_existing_docs || changes.contains(&record.path))
            .cloned()
            .collect();
        items.sort_by(|a, b| a.path.cmp(&b.path));
        items.dedup_by(|a, b| a.path == b.path);
        items
    }

    /// Like [`select`](Self::select), but falls back to a full run when the
    /// change set is unavailable. Other errors are returned unchanged.
    pub fn plan(
        &self,
        all_files: &[FileRecord],
        has_existing_docs: bool,
        changes: Result<ChangeSet>,
    ) -> Result<RunPlan> {
        let plan = if !has_existing_docs {
            RunPlan {
                mode: RunMode::FirstRun,
                items: self.select(all_files, false, &ChangeSet::default()),
            }
        } else {
            match changes {
                Ok(changes) => RunPlan {
                    mode: RunMode::Incremental,
                    items: self.select(all_files, true, &changes),
                },
                Err(AtlasError::DiffUnavailable { request, reason }) => {
                    warn!("Diff for {} unavailable ({}); documenting all files", request, reason);
                    RunPlan {
                        mode: RunMode::Fallback,
                        items: self.select(all_files, false, &ChangeSet::default()),
                    }
                }
                Err(e) => return Err(e),
            }
        };

        info!("{} run: {} files selected", plan.mode.as_str(), plan.items.len());
        Ok(plan)
    }
}
