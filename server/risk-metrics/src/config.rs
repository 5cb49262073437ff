//! Aggregator configuration with sane defaults.

/// Tunable bounds for which commits feed the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
  /// Commits younger than this many days (relative to the reference time)
  /// are left out: their bugs may not have been reported yet. `None` keeps all.
  pub recent_cutoff_days: Option<u32>,
}

impl Default for AggregatorConfig {
  fn default() -> Self {
    Self {
      recent_cutoff_days: Some(30),
    }
  }
}
