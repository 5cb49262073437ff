//! Issue-tracker capability: when was a referenced bug report opened.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

static ISSUE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+)").expect("valid issue regex"));

/// Source of bug-report open dates.
pub trait IssueTracker {
  /// Unix timestamp at which `issue_id` was opened, if known.
  fn date_opened(&self, issue_id: u64) -> Option<i64>;
}

/// Issue numbers referenced as `#123` in a commit message, first occurrence order.
pub fn referenced_issues(commit_message: &str) -> Vec<u64> {
  let mut ids: Vec<u64> = Vec::new();
  for cap in ISSUE_REF.captures_iter(commit_message) {
    if let Ok(id) = cap[1].parse::<u64>() {
      if !ids.contains(&id) {
        ids.push(id);
      }
    }
  }
  ids
}

/// Oldest open date among the issues a message references.
pub fn oldest_issue_opened(tracker: &dyn IssueTracker, commit_message: &str) -> Option<i64> {
  referenced_issues(commit_message)
    .into_iter()
    .filter_map(|id| {
      let opened = tracker.date_opened(id);
      if opened.is_none() {
        debug!(issue = id, "issue not found in tracker");
      }
      opened
    })
    .min()
}

/// One issue record as exported by a tracker (GitHub field names).
#[derive(Debug, Clone, Deserialize)]
pub struct IssueRecord {
  pub number: u64,
  pub created_at: DateTime<Utc>,
}

/// In-memory tracker, typically loaded from an exported JSON array of issues.
#[derive(Debug, Clone, Default)]
pub struct StaticIssueTracker {
  opened: HashMap<u64, i64>,
}

impl StaticIssueTracker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&mut self, issue_id: u64, opened_unix: i64) {
    self.opened.insert(issue_id, opened_unix);
  }

  pub fn from_records(records: impl IntoIterator<Item = IssueRecord>) -> Self {
    let opened = records
      .into_iter()
      .map(|r| (r.number, r.created_at.timestamp()))
      .collect();
    Self { opened }
  }

  pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
    let records: Vec<IssueRecord> = serde_json::from_str(text)?;
    Ok(Self::from_records(records))
  }

  pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    Self::from_json_str(&text)
  }

  pub fn len(&self) -> usize {
    self.opened.len()
  }

  pub fn is_empty(&self) -> bool {
    self.opened.is_empty()
  }
}

impl IssueTracker for StaticIssueTracker {
  fn date_opened(&self, issue_id: u64) -> Option<i64> {
    self.opened.get(&issue_id).copied()
  }
}
