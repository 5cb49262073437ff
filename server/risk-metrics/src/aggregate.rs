//! Buckets a linked history into buggy / non-buggy samples.

use chrono::Duration;
use szz_linker::{Classification, Commit, Metric};
use tracing::{debug, info};

use crate::config::AggregatorConfig;
use crate::median::median;
use crate::types::{DatasetRow, MetricMedian};

/// Modeling samples for one repository.
#[derive(Debug, Clone, Default)]
pub struct RepositoryMetrics {
  rows: Vec<DatasetRow>,
  skipped_merges: usize,
  skipped_recent: usize,
}

impl RepositoryMetrics {
  /// All values of `metric` in the buggy (`true`) or non-buggy group.
  pub fn samples(&self, metric: Metric, buggy: bool) -> Vec<f64> {
    self
      .rows
      .iter()
      .filter(|r| r.is_buggy == buggy)
      .map(|r| r.metrics.get(metric))
      .collect()
  }

  pub fn num_buggy(&self) -> usize {
    self.rows.iter().filter(|r| r.is_buggy).count()
  }

  pub fn num_nonbuggy(&self) -> usize {
    self.rows.len() - self.num_buggy()
  }

  pub fn skipped_merges(&self) -> usize {
    self.skipped_merges
  }

  pub fn skipped_recent(&self) -> usize {
    self.skipped_recent
  }

  /// Per-metric medians of both groups, in `Metric::ALL` order.
  pub fn medians(&self) -> Vec<MetricMedian> {
    Metric::ALL
      .iter()
      .map(|&metric| MetricMedian {
        metric,
        buggy: median(&self.samples(metric, true)),
        nonbuggy: median(&self.samples(metric, false)),
      })
      .collect()
  }

  /// Rows for the logistic-regression fitter, in history order.
  pub fn dataset(&self) -> &[DatasetRow] {
    &self.rows
  }
}

/// Merge commits that change no lines carry no signal.
fn is_empty_merge(commit: &Commit) -> bool {
  let merge = commit.classification == Classification::Merge || commit.is_merge();
  merge && commit.metrics.la == 0.0 && commit.metrics.ld == 0.0
}

/// Collect modeling samples from `history` as of `reference_time` (unix seconds).
pub fn aggregate(history: &[Commit], config: &AggregatorConfig, reference_time: i64) -> RepositoryMetrics {
  let newest_allowed = config
    .recent_cutoff_days
    .map(|days| reference_time.saturating_sub(Duration::days(i64::from(days)).num_seconds()));

  let mut out = RepositoryMetrics::default();
  for commit in history {
    if is_empty_merge(commit) {
      out.skipped_merges += 1;
      continue;
    }
    if newest_allowed.is_some_and(|limit| commit.author_date_unix_timestamp > limit) {
      debug!(commit = commit.commit_hash.as_str(), "too recent to model");
      out.skipped_recent += 1;
      continue;
    }
    out.rows.push(DatasetRow {
      commit_hash: commit.commit_hash.clone(),
      metrics: commit.metrics,
      is_buggy: commit.contains_bug,
    });
  }

  info!(
    buggy = out.num_buggy(),
    nonbuggy = out.num_nonbuggy(),
    skipped_merges = out.skipped_merges,
    skipped_recent = out.skipped_recent,
    "aggregated commits"
  );
  out
}
