//! Output types for the aggregator (JSON contract with the model fitter).

use serde::Serialize;
use szz_linker::{CommitMetrics, Metric};

/// One modeling sample: a commit's metrics and whether it induced a bug.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetRow {
  pub commit_hash: String,
  #[serde(flatten)]
  pub metrics: CommitMetrics,
  pub is_buggy: bool,
}

/// Median of one metric in each group; `None` when the group is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricMedian {
  pub metric: Metric,
  pub buggy: Option<f64>,
  pub nonbuggy: Option<f64>,
}

/// Output: one JSON object to stdout.
#[derive(Debug, Serialize)]
pub struct Output {
  pub num_buggy: usize,
  pub num_nonbuggy: usize,
  pub skipped_merges: usize,
  pub skipped_recent: usize,
  pub medians: Vec<MetricMedian>,
  pub dataset: Vec<DatasetRow>,
}
