//! Historical attribution: blame each region at the fix's parent.

use std::collections::HashSet;

use tracing::debug;

use crate::error::VcsError;
use crate::types::{BlameOrigin, RegionMap};
use crate::vcs::Vcs;

/// Resolves regions to the distinct commits that last touched them.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistoricalAttributor;

impl HistoricalAttributor {
  pub fn new() -> Self {
    Self
  }

  /// Blame `regions` of `commit`, seeded at its first parent.
  pub fn attribute(
    &self,
    vcs: &dyn Vcs,
    regions: &RegionMap,
    commit: &str,
  ) -> Result<Vec<BlameOrigin>, VcsError> {
    if regions.is_empty() {
      return Ok(Vec::new());
    }
    match vcs.first_parent(commit) {
      Ok(Some(parent)) => self.attribute_at(vcs, regions, commit, &parent),
      Ok(None) => Ok(Vec::new()),
      Err(e) if e.is_systemic() => Err(e),
      Err(e) => {
        debug!(commit, error = %e, "no parent to blame at");
        Ok(Vec::new())
      }
    }
  }

  /// Blame `regions` at `parent`. Origins are distinct, in discovery order
  /// (files and lines ascending); the fixing commit itself is never returned.
  pub fn attribute_at(
    &self,
    vcs: &dyn Vcs,
    regions: &RegionMap,
    commit: &str,
    parent: &str,
  ) -> Result<Vec<BlameOrigin>, VcsError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut origins = Vec::new();

    for (path, lines) in regions {
      for &line in lines {
        if line == 0 {
          continue;
        }
        let origin = match vcs.blame(path, line, parent) {
          Ok(Some(origin)) => origin,
          Ok(None) => continue,
          Err(e) if e.is_systemic() => return Err(e),
          Err(e) => {
            debug!(commit, path = path.as_str(), line, error = %e, "blame miss");
            continue;
          }
        };
        if origin.commit_hash == commit {
          continue;
        }
        if seen.insert(origin.commit_hash.clone()) {
          debug!(
            commit,
            inducing = origin.commit_hash.as_str(),
            path = path.as_str(),
            line,
            "blamed"
          );
          origins.push(origin);
        }
      }
    }

    Ok(origins)
  }
}

/// Just the hashes of a set of origins.
pub fn origin_hashes(origins: &[BlameOrigin]) -> Vec<&str> {
  origins.iter().map(|o| o.commit_hash.as_str()).collect()
}
