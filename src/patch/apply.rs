use super::prescan::prescan_file;
use super::rewrite::{preview_file, rewrite_file};
use crate::exclusions::ExclusionRuleSet;
use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Counters reported after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// Files rewritten successfully (or previewed, in a dry run).
    pub processed: usize,
    pub failed: usize,
    /// Files whose content changed, or would change in a dry run.
    pub changed: usize,
}

pub fn is_java_source(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(".java"))
}

/// Walks a source tree and patches every `.java` file in it.
#[derive(Debug)]
pub struct Patcher {
    root: PathBuf,
    exclusions: ExclusionRuleSet,
    dry_run: bool,
}

impl Patcher {
    /// Fails when `root` does not exist or is not a directory.
    pub fn new(root: &Path, exclusions: ExclusionRuleSet) -> Result<Self> {
        if !root.is_dir() {
            bail!("{} does not exist or is not a directory", root.display());
        }
        let root = root
            .canonicalize()
            .with_context(|| format!("failed to resolve {}", root.display()))?;
        Ok(Self {
            root,
            exclusions,
            dry_run: false,
        })
    }

    /// Compute rewrites without writing them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn exclusions(&self) -> &ExclusionRuleSet {
        &self.exclusions
    }

    /// Patch the whole tree, depth first in file-name order. A failing file
    /// is counted and skipped.
    pub fn run(&self) -> PatchSummary {
        let mut summary = PatchSummary::default();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("walk error: {}", err);
                    summary.failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_java_source(entry.path()) {
                continue;
            }
            match self.process_file(entry.path()) {
                Ok(changed) => {
                    summary.processed += 1;
                    if changed {
                        summary.changed += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(path=%entry.path().display(), "{:#}", err);
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Prescan and rewrite a single file. Returns whether its content changed.
    pub fn process_file(&self, path: &Path) -> Result<bool> {
        let overrides = prescan_file(path, &self.exclusions);
        for (short, full) in overrides.iter() {
            tracing::trace!(path=%path.display(), "keep {} as {}", short, full);
        }
        let changed = if self.dry_run {
            preview_file(path, &overrides)?.is_changed()
        } else {
            rewrite_file(path, &overrides)?
        };
        tracing::debug!(path=%path.display(), changed, "processed");
        Ok(changed)
    }
}
