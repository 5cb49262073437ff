//! Repository-level analysis pass: status bookkeeping around one linkage run.

use chrono::Utc;
use tracing::{error, info};

use crate::engine::LinkageEngine;
use crate::error::LinkError;
use crate::types::{Commit, LinkReport, Repository, RepositoryStatus};
use crate::vcs::Vcs;

/// Link `history` and move `repo` through Analyzing -> Analyzed.
///
/// On failure the repository is left in `Error`; whatever the engine linked
/// before failing stays applied to `history`.
pub fn analyze_repository<V: Vcs>(
  repo: &mut Repository,
  history: &mut [Commit],
  engine: &LinkageEngine<V>,
) -> Result<LinkReport, LinkError> {
  repo.status = RepositoryStatus::Analyzing;
  info!(repository = repo.id.as_str(), commits = history.len(), "analyzing");

  match engine.link_corrective_commits(history) {
    Ok(report) => {
      repo.status = RepositoryStatus::Analyzed;
      repo.analysis_date = Some(Utc::now().to_rfc3339());
      info!(repository = repo.id.as_str(), linked = report.processed, "analysis done");
      Ok(report)
    }
    Err(e) => {
      repo.status = RepositoryStatus::Error;
      error!(repository = repo.id.as_str(), error = %e, "analysis failed");
      Err(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::vcs::testing::MemoryVcs;

  const FIX: &str = "\
--- a/a.py
+++ b/a.py
@@ -1 +1 @@
-a
+b
";

  fn fix(hash: &str, ts: i64) -> Commit {
    let mut c = Commit::new(hash, ts);
    c.fix = true;
    c
  }

  #[test]
  fn successful_run_marks_analyzed() {
    let vcs = MemoryVcs::default()
      .with_commit("f", "p", FIX)
      .with_blame("a.py", 1, "p", "p", 1);
    let engine = LinkageEngine::with_defaults(vcs);
    let mut repo = Repository::new("r1");
    let mut history = vec![Commit::new("p", 1), fix("f", 2)];

    let report = analyze_repository(&mut repo, &mut history, &engine).unwrap();
    assert_eq!(report.inducing, 1);
    assert_eq!(repo.status, RepositoryStatus::Analyzed);
    assert!(repo.analysis_date.is_some());
  }

  #[test]
  fn systemic_failure_marks_error() {
    let mut vcs = MemoryVcs::default().with_commit("f", "p", FIX);
    vcs.broken_at = Some("f".into());
    let engine = LinkageEngine::with_defaults(vcs);
    let mut repo = Repository::new("r1");
    let mut history = vec![fix("f", 2)];

    assert!(analyze_repository(&mut repo, &mut history, &engine).is_err());
    assert_eq!(repo.status, RepositoryStatus::Error);
    assert!(repo.analysis_date.is_none());
    assert!(!history[0].linked);
  }
}
