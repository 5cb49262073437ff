//! Attribution window: which prior commits may be blamed for a fix.
//!
//! An inducing commit must predate the effective cutoff: the oldest open date
//! of the issues the fix references, or the fix itself when none are known.
//! Without an issue date an optional look-back bound also applies.

use chrono::Duration;

use crate::issues::{oldest_issue_opened, IssueTracker};
use crate::types::Commit;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributionWindow {
  /// Candidates must be strictly older than this (unix seconds).
  pub cutoff: i64,
  /// Candidates must be at least this recent, when bounded.
  pub earliest: Option<i64>,
  /// Whether the cutoff came from an issue tracker.
  pub from_issue: bool,
}

impl AttributionWindow {
  pub fn for_commit(
    commit: &Commit,
    tracker: Option<&dyn IssueTracker>,
    lookback_days: Option<u32>,
  ) -> Self {
    let fixed_at = commit.author_date_unix_timestamp;
    let issue_opened = tracker.and_then(|t| oldest_issue_opened(t, &commit.commit_message));

    match issue_opened {
      Some(opened) => Self {
        cutoff: opened.min(fixed_at),
        earliest: None,
        from_issue: true,
      },
      None => Self {
        cutoff: fixed_at,
        earliest: lookback_days
          .map(|days| fixed_at.saturating_sub(Duration::days(i64::from(days)).num_seconds())),
        from_issue: false,
      },
    }
  }

  pub fn admits(&self, timestamp: i64) -> bool {
    timestamp < self.cutoff && self.earliest.map_or(true, |earliest| timestamp >= earliest)
  }
}
