//! Core types for the linker (commit records, regions, attribution, outputs).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Category tag assigned to a commit from its message (or parent count for merges).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub enum Classification {
  #[serde(rename = "Merge")]
  Merge,
  #[serde(rename = "Corrective")]
  Corrective,
  #[serde(rename = "Feature Addition")]
  FeatureAddition,
  #[serde(rename = "Non Functional")]
  NonFunctional,
  #[serde(rename = "Perfective")]
  Perfective,
  #[serde(rename = "Preventative")]
  Preventative,
  #[default]
  #[serde(rename = "None")]
  Unclassified,
}

impl Classification {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Merge => "Merge",
      Self::Corrective => "Corrective",
      Self::FeatureAddition => "Feature Addition",
      Self::NonFunctional => "Non Functional",
      Self::Perfective => "Perfective",
      Self::Preventative => "Preventative",
      Self::Unclassified => "None",
    }
  }
}

impl fmt::Display for Classification {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

// ---------------------------------------------------------------------------
// Evolution metrics
// ---------------------------------------------------------------------------

/// Names of the per-commit evolution metrics, for generic iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
  Ns,
  Nd,
  Nf,
  Entropy,
  La,
  Ld,
  Lt,
  Ndev,
  Age,
  Nuc,
  Exp,
  Rexp,
  Sexp,
}

impl Metric {
  pub const ALL: [Metric; 13] = [
    Metric::Ns,
    Metric::Nd,
    Metric::Nf,
    Metric::Entropy,
    Metric::La,
    Metric::Ld,
    Metric::Lt,
    Metric::Ndev,
    Metric::Age,
    Metric::Nuc,
    Metric::Exp,
    Metric::Rexp,
    Metric::Sexp,
  ];

  pub fn name(self) -> &'static str {
    match self {
      Self::Ns => "ns",
      Self::Nd => "nd",
      Self::Nf => "nf",
      Self::Entropy => "entropy",
      Self::La => "la",
      Self::Ld => "ld",
      Self::Lt => "lt",
      Self::Ndev => "ndev",
      Self::Age => "age",
      Self::Nuc => "nuc",
      Self::Exp => "exp",
      Self::Rexp => "rexp",
      Self::Sexp => "sexp",
    }
  }
}

/// Evolution metrics computed at ingestion time for one commit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommitMetrics {
  /// Modified subsystems.
  pub ns: f64,
  /// Modified directories.
  pub nd: f64,
  /// Modified files.
  pub nf: f64,
  /// Distribution of modified lines across files.
  pub entropy: f64,
  /// Lines added.
  pub la: f64,
  /// Lines deleted.
  pub ld: f64,
  /// Lines in the touched files before the change.
  pub lt: f64,
  /// Developers that previously touched the files.
  pub ndev: f64,
  /// Average interval since the files were last changed.
  pub age: f64,
  /// Unique prior changes to the files.
  pub nuc: f64,
  /// Author experience.
  pub exp: f64,
  /// Recent author experience.
  pub rexp: f64,
  /// Author experience in the same subsystem.
  pub sexp: f64,
}

impl CommitMetrics {
  pub fn get(&self, metric: Metric) -> f64 {
    match metric {
      Metric::Ns => self.ns,
      Metric::Nd => self.nd,
      Metric::Nf => self.nf,
      Metric::Entropy => self.entropy,
      Metric::La => self.la,
      Metric::Ld => self.ld,
      Metric::Lt => self.lt,
      Metric::Ndev => self.ndev,
      Metric::Age => self.age,
      Metric::Nuc => self.nuc,
      Metric::Exp => self.exp,
      Metric::Rexp => self.rexp,
      Metric::Sexp => self.sexp,
    }
  }
}

// ---------------------------------------------------------------------------
// Commit record
// ---------------------------------------------------------------------------

/// One historical change, as produced by history extraction.
///
/// Linkage fields (`contains_bug`, `fixes`, `linked`) are written only by the
/// linkage engine. Unknown fields in the JSON record are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Commit {
  pub commit_hash: String,
  #[serde(default)]
  pub repository_id: String,
  #[serde(default)]
  pub author_name: String,
  #[serde(default)]
  pub author_email: String,
  pub author_date_unix_timestamp: i64,
  #[serde(default)]
  pub commit_message: String,
  #[serde(default)]
  pub parent_hashes: Vec<String>,
  #[serde(default)]
  pub fileschanged: Vec<String>,

  #[serde(default)]
  pub fix: bool,
  #[serde(default)]
  pub classification: Classification,

  #[serde(default)]
  pub contains_bug: bool,
  /// Hashes of the corrective commits this commit is known to have caused.
  #[serde(default)]
  pub fixes: Vec<String>,
  #[serde(default)]
  pub linked: bool,

  #[serde(flatten)]
  pub metrics: CommitMetrics,
  #[serde(default)]
  pub glm_probability: f64,
}

impl Commit {
  pub fn new(commit_hash: impl Into<String>, author_date_unix_timestamp: i64) -> Self {
    Self {
      commit_hash: commit_hash.into(),
      repository_id: String::new(),
      author_name: String::new(),
      author_email: String::new(),
      author_date_unix_timestamp,
      commit_message: String::new(),
      parent_hashes: Vec::new(),
      fileschanged: Vec::new(),
      fix: false,
      classification: Classification::Unclassified,
      contains_bug: false,
      fixes: Vec::new(),
      linked: false,
      metrics: CommitMetrics::default(),
      glm_probability: 0.0,
    }
  }

  pub fn with_message(mut self, message: impl Into<String>) -> Self {
    self.commit_message = message.into();
    self
  }

  pub fn is_merge(&self) -> bool {
    self.parent_hashes.len() > 1
  }
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RepositoryStatus {
  #[default]
  #[serde(rename = "Waiting to be Analyzed")]
  WaitingToBeAnalyzed,
  #[serde(rename = "Analyzing")]
  Analyzing,
  #[serde(rename = "Analyzed")]
  Analyzed,
  #[serde(rename = "Error")]
  Error,
}

/// The repository owning a commit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
  pub id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub url: String,
  #[serde(default)]
  pub status: RepositoryStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub analysis_date: Option<String>,
}

impl Repository {
  pub fn new(id: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      name: String::new(),
      url: String::new(),
      status: RepositoryStatus::default(),
      analysis_date: None,
    }
  }
}

// ---------------------------------------------------------------------------
// Regions and attribution (transient)
// ---------------------------------------------------------------------------

/// File path (as of the parent revision) -> old-file line numbers modified or deleted.
pub type RegionMap = BTreeMap<String, Vec<u32>>;

/// The commit that last touched a line, as reported by blame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlameOrigin {
  pub commit_hash: String,
  pub timestamp: i64,
}

/// Summary of one linkage batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
  /// Corrective commits processed and marked linked in this run.
  pub processed: usize,
  /// Processed commits for which no inducing commit was found.
  pub unattributed: usize,
  /// Distinct commits marked as bug-inducing in this run.
  pub inducing: usize,
}

// ---------------------------------------------------------------------------
// CLI stream wrappers
// ---------------------------------------------------------------------------

/// Structured error output for the binary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorOutput {
  pub error: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub commit: Option<String>,
}

impl ErrorOutput {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      error: true,
      message: message.into(),
      commit: None,
    }
  }

  pub fn with_commit(mut self, commit: impl Into<String>) -> Self {
    self.commit = Some(commit.into());
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn classification_serializes_with_display_names() {
    let json = serde_json::to_string(&Classification::FeatureAddition).unwrap();
    assert_eq!(json, "\"Feature Addition\"");
    let back: Classification = serde_json::from_str("\"None\"").unwrap();
    assert_eq!(back, Classification::Unclassified);
  }

  #[test]
  fn commit_record_defaults_linkage_fields() {
    let json = r#"{
      "commit_hash": "abc",
      "author_date_unix_timestamp": 100,
      "la": 3.0,
      "unknown": true
    }"#;
    let commit: Commit = serde_json::from_str(json).unwrap();
    assert!(!commit.linked);
    assert!(!commit.contains_bug);
    assert!(commit.fixes.is_empty());
    assert_eq!(commit.metrics.la, 3.0);
    assert_eq!(commit.classification, Classification::Unclassified);
  }

  #[test]
  fn fixes_serialize_as_json_array() {
    let mut commit = Commit::new("c2", 2);
    commit.fixes = vec!["c3".into()];
    let value = serde_json::to_value(&commit).unwrap();
    assert_eq!(value["fixes"], serde_json::json!(["c3"]));
  }

  #[test]
  fn metrics_are_reachable_by_name() {
    let metrics = CommitMetrics {
      sexp: 7.0,
      ..CommitMetrics::default()
    };
    assert_eq!(metrics.get(Metric::Sexp), 7.0);
    assert_eq!(Metric::ALL.len(), 13);
    assert_eq!(Metric::Entropy.name(), "entropy");
  }
}
