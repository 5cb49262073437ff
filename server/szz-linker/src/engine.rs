//! Core engine: links corrective commits to the commits that induced them.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, error, info};

use crate::blame::HistoricalAttributor;
use crate::config::LinkerConfig;
use crate::error::{LinkError, VcsError};
use crate::issues::IssueTracker;
use crate::regions::RegionExtractor;
use crate::types::{Commit, LinkReport};
use crate::vcs::Vcs;
use crate::window::AttributionWindow;

/// Inducing commit hash -> corrective commit hashes it caused, in discovery order.
pub type LinkageEdges = BTreeMap<String, Vec<String>>;

/// The linkage engine for one working copy. Holds no state across runs; the
/// `linked` flag on each commit is what makes runs incremental.
pub struct LinkageEngine<V: Vcs> {
  vcs: V,
  extractor: RegionExtractor,
  attributor: HistoricalAttributor,
  issue_tracker: Option<Box<dyn IssueTracker + Send>>,
  lookback_days: Option<u32>,
}

impl<V: Vcs> LinkageEngine<V> {
  pub fn new(vcs: V, config: LinkerConfig) -> Self {
    let lookback_days = config.lookback_days;
    Self {
      vcs,
      extractor: RegionExtractor::new(config),
      attributor: HistoricalAttributor::new(),
      issue_tracker: None,
      lookback_days,
    }
  }

  pub fn with_defaults(vcs: V) -> Self {
    Self::new(vcs, LinkerConfig::default())
  }

  pub fn with_issue_tracker(mut self, tracker: impl IssueTracker + Send + 'static) -> Self {
    self.issue_tracker = Some(Box::new(tracker));
    self
  }

  pub fn vcs(&self) -> &V {
    &self.vcs
  }

  /// Link every corrective commit (`fix`) of `history` not yet `linked`.
  ///
  /// Corrective commits are processed oldest first. Each processed commit is
  /// marked `linked` even when nothing could be attributed. Afterwards every
  /// blamed commit in `history` gets `contains_bug` and its `fixes` extended.
  ///
  /// A systemic failure stops the batch: commits processed before it keep
  /// their `linked` flag and their edges are applied; the failing commit and
  /// everything after it stay unlinked for the next run.
  pub fn link_corrective_commits(&self, history: &mut [Commit]) -> Result<LinkReport, LinkError> {
    let mut pending: Vec<usize> = history
      .iter()
      .enumerate()
      .filter(|(_, c)| c.fix && !c.linked)
      .map(|(i, _)| i)
      .collect();
    pending.sort_by(|&a, &b| {
      let (a, b) = (&history[a], &history[b]);
      (a.author_date_unix_timestamp, &a.commit_hash).cmp(&(b.author_date_unix_timestamp, &b.commit_hash))
    });

    info!(pending = pending.len(), "linking corrective commits");

    let mut edges = LinkageEdges::new();
    let mut done: HashSet<String> = HashSet::new();
    let mut report = LinkReport::default();
    let mut failure: Option<LinkError> = None;

    for idx in pending {
      let hash = history[idx].commit_hash.clone();
      if done.contains(&hash) {
        history[idx].linked = true;
        continue;
      }

      match self.link_commit(&history[idx]) {
        Ok(inducing) => {
          if inducing.is_empty() {
            report.unattributed += 1;
          }
          for buggy in inducing {
            let fixes = edges.entry(buggy).or_default();
            if !fixes.contains(&hash) {
              fixes.push(hash.clone());
            }
          }
          history[idx].linked = true;
          done.insert(hash);
          report.processed += 1;
        }
        Err(e) => {
          error!(commit = hash.as_str(), error = %e, "working copy failure, aborting batch");
          failure = Some(LinkError::working_copy(&hash, e));
          break;
        }
      }
    }

    report.inducing = apply_edges(history, &edges);
    info!(
      processed = report.processed,
      unattributed = report.unattributed,
      inducing = report.inducing,
      "marked bug-inducing commits"
    );

    match failure {
      Some(e) => Err(e),
      None => Ok(report),
    }
  }

  /// Inducing commit hashes for one corrective commit (regions -> blame -> window).
  pub fn link_commit(&self, commit: &Commit) -> Result<Vec<String>, VcsError> {
    let hash = commit.commit_hash.as_str();

    let parent = match self.vcs.first_parent(hash) {
      Ok(Some(parent)) => parent,
      Ok(None) => {
        debug!(commit = hash, "root commit, nothing to link");
        return Ok(Vec::new());
      }
      Err(e) if e.is_systemic() => return Err(e),
      Err(e) => {
        debug!(commit = hash, error = %e, "cannot resolve parent");
        return Ok(Vec::new());
      }
    };

    let regions = self.extractor.regions_against(&self.vcs, hash, &parent)?;
    debug!(
      commit = hash,
      files = regions.len(),
      lines = regions.values().map(Vec::len).sum::<usize>(),
      "regions"
    );

    let origins = self.attributor.attribute_at(&self.vcs, &regions, hash, &parent)?;

    let tracker = self.issue_tracker.as_deref().map(|t| t as &dyn IssueTracker);
    let window = AttributionWindow::for_commit(commit, tracker, self.lookback_days);

    let inducing: Vec<String> = origins
      .into_iter()
      .filter(|origin| {
        let admitted = window.admits(origin.timestamp);
        if !admitted {
          debug!(
            commit = hash,
            candidate = origin.commit_hash.as_str(),
            "candidate outside attribution window"
          );
        }
        admitted
      })
      .map(|origin| origin.commit_hash)
      .collect();

    info!(commit = hash, inducing = inducing.len(), "linked");
    Ok(inducing)
  }
}

/// Mark every commit named in `edges`: `contains_bug = true` and its `fixes`
/// extended with the new corrective hashes. Returns how many commits were marked.
pub fn apply_edges(history: &mut [Commit], edges: &LinkageEdges) -> usize {
  let mut marked = 0;
  for commit in history.iter_mut() {
    let Some(fixing) = edges.get(&commit.commit_hash) else {
      continue;
    };
    commit.contains_bug = true;
    for hash in fixing {
      if !commit.fixes.contains(hash) {
        commit.fixes.push(hash.clone());
      }
    }
    marked += 1;
  }
  let unknown = edges
    .keys()
    .filter(|k| !history.iter().any(|c| &c.commit_hash == *k))
    .count();
  if unknown > 0 {
    debug!(unknown, "inducing commits missing from history");
  }
  marked
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::issues::StaticIssueTracker;
  use crate::vcs::testing::MemoryVcs;

  const FIX_A5: &str = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -5 +5 @@
-    return i
+    return i + 1
";

  const FIX_A5_B2: &str = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -5 +5 @@
-    return i
+    return i + 1
diff --git a/b.py b/b.py
--- a/b.py
+++ b/b.py
@@ -2 +2 @@
-x = None
+x = 0
";

  fn corrective(hash: &str, ts: i64, message: &str) -> Commit {
    let mut c = Commit::new(hash, ts).with_message(message);
    c.fix = true;
    c
  }

  fn scenario() -> (MemoryVcs, Vec<Commit>) {
    let vcs = MemoryVcs::default()
      .with_commit("c2", "c1", "")
      .with_commit("c3", "c2", FIX_A5)
      .with_blame("a.py", 5, "c2", "c2", 200);
    let history = vec![
      Commit::new("c1", 100).with_message("initial import"),
      Commit::new("c2", 200).with_message("tweak loop"),
      corrective("c3", 300, "fix: correct off-by-one"),
    ];
    (vcs, history)
  }

  #[test]
  fn single_line_fix_blames_previous_modifier() {
    let (vcs, mut history) = scenario();
    let engine = LinkageEngine::with_defaults(vcs);
    let report = engine.link_corrective_commits(&mut history).unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(report.inducing, 1);
    assert!(history[1].contains_bug);
    assert_eq!(history[1].fixes, vec!["c3".to_string()]);
    assert!(history[2].linked);
    assert!(!history[0].contains_bug);
    assert!(!history[2].contains_bug);
  }

  #[test]
  fn second_run_is_a_no_op() {
    let (vcs, mut history) = scenario();
    let engine = LinkageEngine::with_defaults(vcs);
    engine.link_corrective_commits(&mut history).unwrap();
    let after_first = history.clone();
    let calls_after_first = engine.vcs().diff_calls.borrow().len();

    let report = engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(report.processed, 0);
    assert_eq!(history, after_first);
    assert_eq!(engine.vcs().diff_calls.borrow().len(), calls_after_first);
  }

  #[test]
  fn unattributable_fix_is_still_linked() {
    let vcs = MemoryVcs::default().with_commit("f", "p", FIX_A5);
    let mut history = vec![corrective("f", 10, "fix it")];
    let engine = LinkageEngine::with_defaults(vcs);
    let report = engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(report.unattributed, 1);
    assert!(history[0].linked);
  }

  #[test]
  fn multi_file_fix_marks_both_origins() {
    let vcs = MemoryVcs::default()
      .with_commit("f", "p", FIX_A5_B2)
      .with_blame("a.py", 5, "p", "ca", 10)
      .with_blame("b.py", 2, "p", "cb", 20);
    let mut history = vec![
      Commit::new("ca", 10),
      Commit::new("cb", 20),
      Commit::new("p", 30),
      corrective("f", 40, "fix two bugs"),
    ];
    let engine = LinkageEngine::with_defaults(vcs);
    let report = engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(report.inducing, 2);
    assert!(history[0].contains_bug && history[1].contains_bug);
    assert!(!history[2].contains_bug);
  }

  #[test]
  fn later_fixes_accumulate_on_the_same_inducer() {
    let vcs = MemoryVcs::default()
      .with_commit("f1", "p1", FIX_A5)
      .with_commit("f2", "p2", FIX_A5)
      .with_blame("a.py", 5, "p1", "bad", 10)
      .with_blame("a.py", 5, "p2", "bad", 10);
    let mut history = vec![Commit::new("bad", 10), corrective("f1", 20, "fix")];
    let engine = LinkageEngine::with_defaults(vcs);
    engine.link_corrective_commits(&mut history).unwrap();

    // A new fix arrives in a later run.
    history.push(corrective("f2", 30, "fix again"));
    engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(history[0].fixes, vec!["f1".to_string(), "f2".to_string()]);
  }

  #[test]
  fn systemic_failure_keeps_earlier_progress() {
    let mut vcs = MemoryVcs::default()
      .with_commit("f1", "p", FIX_A5)
      .with_commit("f2", "f1", FIX_A5)
      .with_blame("a.py", 5, "p", "bad", 5);
    vcs.broken_at = Some("f2".into());
    let mut history = vec![
      Commit::new("bad", 5),
      corrective("f1", 10, "fix one"),
      corrective("f2", 20, "fix two"),
    ];
    let engine = LinkageEngine::with_defaults(vcs);
    let err = engine.link_corrective_commits(&mut history).unwrap_err();

    assert_eq!(err.commit(), Some("f2"));
    assert!(history[1].linked);
    assert!(!history[2].linked);
    assert!(history[0].contains_bug);
    assert_eq!(history[0].fixes, vec!["f1".to_string()]);
  }

  #[test]
  fn processes_oldest_fix_first() {
    let vcs = MemoryVcs::default()
      .with_commit("late", "p", FIX_A5)
      .with_commit("early", "p", FIX_A5);
    let mut history = vec![corrective("late", 50, "fix"), corrective("early", 10, "fix")];
    let engine = LinkageEngine::with_defaults(vcs);
    engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(*engine.vcs().diff_calls.borrow(), vec!["early".to_string(), "late".to_string()]);
    assert!(history.iter().all(|c| c.linked));
  }

  #[test]
  fn issue_date_excludes_commits_after_the_report() {
    let mut tracker = StaticIssueTracker::new();
    tracker.insert(9, 150);
    let vcs = MemoryVcs::default()
      .with_commit("f", "p", FIX_A5_B2)
      .with_blame("a.py", 5, "p", "before", 100)
      .with_blame("b.py", 2, "p", "after", 200);
    let mut history = vec![
      Commit::new("before", 100),
      Commit::new("after", 200),
      corrective("f", 300, "fix #9"),
    ];
    let engine = LinkageEngine::with_defaults(vcs).with_issue_tracker(tracker);
    engine.link_corrective_commits(&mut history).unwrap();
    assert!(history[0].contains_bug);
    assert!(!history[1].contains_bug);
  }

  #[test]
  fn lookback_window_limits_attribution() {
    let vcs = MemoryVcs::default()
      .with_commit("f", "p", FIX_A5)
      .with_blame("a.py", 5, "p", "ancient", 0);
    let mut history = vec![Commit::new("ancient", 0), corrective("f", 10 * 86_400, "fix")];
    let config = LinkerConfig {
      lookback_days: Some(5),
      ..LinkerConfig::default()
    };
    let engine = LinkageEngine::new(vcs, config);
    let report = engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(report.unattributed, 1);
    assert!(!history[0].contains_bug);
    assert!(history[1].linked);
  }

  #[test]
  fn non_corrective_commits_are_ignored() {
    let (vcs, mut history) = scenario();
    history[2].fix = false;
    let engine = LinkageEngine::with_defaults(vcs);
    let report = engine.link_corrective_commits(&mut history).unwrap();
    assert_eq!(report.processed, 0);
    assert!(!history[2].linked);
  }

  #[test]
  fn apply_edges_ignores_unknown_hashes() {
    let mut history = vec![Commit::new("a", 1)];
    let mut edges = LinkageEdges::new();
    edges.insert("a".into(), vec!["f".into()]);
    edges.insert("zzz".into(), vec!["f".into()]);
    assert_eq!(apply_edges(&mut history, &edges), 1);
    assert!(history[0].contains_bug);
  }
}
