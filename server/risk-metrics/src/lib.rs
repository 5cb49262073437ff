//! Risk metrics aggregation over a linked commit history.
//! Used by the binary for stdin/stdout; can also be called as a library.

pub mod aggregate;
pub mod config;
mod median;
pub mod types;

pub use aggregate::{aggregate, RepositoryMetrics};
pub use config::AggregatorConfig;
pub use types::{DatasetRow, MetricMedian, Output};

use szz_linker::Commit;

/// Aggregate `history` as of `reference_time` and build the output (no I/O).
pub fn run(history: &[Commit], config: &AggregatorConfig, reference_time: i64) -> Output {
  let metrics = aggregate(history, config, reference_time);
  Output {
    num_buggy: metrics.num_buggy(),
    num_nonbuggy: metrics.num_nonbuggy(),
    skipped_merges: metrics.skipped_merges(),
    skipped_recent: metrics.skipped_recent(),
    medians: metrics.medians(),
    dataset: metrics.dataset().to_vec(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn run_returns_valid_output_shape() {
    let mut buggy = Commit::new("a", 0);
    buggy.contains_bug = true;
    let history = vec![buggy, Commit::new("b", 0)];
    let out = run(&history, &AggregatorConfig::default(), 365 * 86_400);
    assert_eq!(out.num_buggy, 1);
    assert_eq!(out.num_nonbuggy, 1);
    assert_eq!(out.dataset.len(), 2);
    assert_eq!(out.medians.len(), 13);
  }
}
