//! Modified/deleted source regions of a commit relative to its first parent.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::LinkerConfig;
use crate::diff::{parse_unified_diff, FileDiff};
use crate::error::VcsError;
use crate::types::RegionMap;
use crate::vcs::Vcs;

/// Extracts old-file line regions from zero-context diffs, limited to source files.
#[derive(Debug, Clone)]
pub struct RegionExtractor {
  config: LinkerConfig,
}

impl RegionExtractor {
  pub fn new(config: LinkerConfig) -> Self {
    Self { config }
  }

  /// Regions of `commit` keyed by the file path at its parent.
  ///
  /// Root commits, unknown revisions and unreadable diffs give an empty map.
  /// Only systemic failures are returned as errors.
  pub fn modified_regions(&self, vcs: &dyn Vcs, commit: &str) -> Result<RegionMap, VcsError> {
    let parent = match degrade(vcs.first_parent(commit), commit, "parent")? {
      Some(Some(parent)) => parent,
      Some(None) => {
        debug!(commit, "root commit has no parent to diff against");
        return Ok(RegionMap::new());
      }
      None => return Ok(RegionMap::new()),
    };
    self.regions_against(vcs, commit, &parent)
  }

  /// Regions of `commit` relative to an explicit `parent`.
  pub fn regions_against(
    &self,
    vcs: &dyn Vcs,
    commit: &str,
    parent: &str,
  ) -> Result<RegionMap, VcsError> {
    let Some(names) = degrade(vcs.names_changed(commit, parent), commit, "names")? else {
      return Ok(RegionMap::new());
    };
    let sources: HashSet<String> = names
      .into_iter()
      .filter(|name| self.config.is_source_file(name))
      .collect();
    if sources.is_empty() {
      debug!(commit, "no source files changed");
      return Ok(RegionMap::new());
    }

    let Some(text) = degrade(vcs.diff(commit, parent, 0), commit, "diff")? else {
      return Ok(RegionMap::new());
    };
    Ok(self.regions_from_diff(&text, &sources))
  }

  /// Collect regions from diff text for files in `sources` (matched on either path).
  pub fn regions_from_diff(&self, text: &str, sources: &HashSet<String>) -> RegionMap {
    let mut regions = RegionMap::new();
    for file in parse_unified_diff(text) {
      let Some(path) = self.attributable_path(&file, sources) else {
        continue;
      };
      let lines = file.removed_lines();
      if lines.is_empty() {
        continue;
      }
      let entry = regions.entry(path).or_default();
      entry.extend(lines);
      entry.sort_unstable();
      entry.dedup();
    }
    regions
  }

  /// The path to blame at the parent, if this file section may contribute regions.
  fn attributable_path(&self, file: &FileDiff, sources: &HashSet<String>) -> Option<String> {
    if file.binary || file.is_added() || file.is_deleted() {
      return None;
    }
    if file.malformed {
      warn!(
        file = file.old_path.as_deref().unwrap_or("?"),
        "skipping file with unparseable hunk header"
      );
      return None;
    }
    let old = file.old_path.as_deref()?;
    let new = file.new_path.as_deref().unwrap_or(old);
    let listed = sources.contains(new) || sources.contains(old);
    if listed && (self.config.is_source_file(old) || self.config.is_source_file(new)) {
      Some(old.to_string())
    } else {
      None
    }
  }
}

/// Turn per-commit misses into `Ok(None)`; keep systemic failures as errors.
fn degrade<T>(result: Result<T, VcsError>, commit: &str, step: &str) -> Result<Option<T>, VcsError> {
  match result {
    Ok(v) => Ok(Some(v)),
    Err(e) if e.is_systemic() => Err(e),
    Err(e) => {
      warn!(commit, step, error = %e, "could not compute regions");
      Ok(None)
    }
  }
}
