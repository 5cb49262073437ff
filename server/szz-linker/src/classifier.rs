//! Commit classification from message keywords; merges detected by parent count.

use crate::config::{CategoryConfig, LinkerConfig};
use crate::types::{Classification, Commit};

/// One keyword category. Words are lowercase; a message word matches when it
/// contains any of them (so "fixed" matches "fix").
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
  label: Classification,
  words: Vec<String>,
}

impl Category {
  pub fn new(label: Classification, words: Vec<String>) -> Self {
    Self {
      label,
      words: words
        .into_iter()
        .map(|w| w.to_lowercase())
        .filter(|w| !w.is_empty())
        .collect(),
    }
  }

  pub fn label(&self) -> Classification {
    self.label
  }

  pub fn belongs(&self, commit_message: &str) -> bool {
    let msg = commit_message.to_lowercase();
    msg
      .split_whitespace()
      .any(|word| self.words.iter().any(|assoc| word.contains(assoc.as_str())))
  }
}

impl From<&CategoryConfig> for Category {
  fn from(config: &CategoryConfig) -> Self {
    Self::new(config.label, config.words.clone())
  }
}

/// Immutable, ordered set of categories; the first match wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
  categories: Vec<Category>,
}

impl Classifier {
  pub fn new(categories: Vec<Category>) -> Self {
    Self { categories }
  }

  pub fn from_config(config: &LinkerConfig) -> Self {
    Self::new(config.categories.iter().map(Category::from).collect())
  }

  pub fn with_defaults() -> Self {
    Self::from_config(&LinkerConfig::default())
  }

  /// Category of a bare commit message.
  pub fn categorize(&self, commit_message: &str) -> Classification {
    self
      .categories
      .iter()
      .find(|c| c.belongs(commit_message))
      .map(Category::label)
      .unwrap_or(Classification::Unclassified)
  }

  /// Category of a commit record. More than one parent always means Merge.
  pub fn classify(&self, commit: &Commit) -> Classification {
    if commit.is_merge() {
      return Classification::Merge;
    }
    self.categorize(&commit.commit_message)
  }

  pub fn is_corrective(&self, commit: &Commit) -> bool {
    self.classify(commit) == Classification::Corrective
  }
}

/// Set `classification` and `fix` on every commit of a history.
pub fn classify_history(classifier: &Classifier, history: &mut [Commit]) {
  for commit in history.iter_mut() {
    let label = classifier.classify(commit);
    commit.classification = label;
    commit.fix = label == Classification::Corrective;
  }
}
