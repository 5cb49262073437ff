//! SZZ Commit Linker: finds the commits that introduced bugs.
//!
//! Classifies commits as corrective from their messages, diffs each unlinked
//! corrective commit against its first parent, blames the modified lines at
//! that parent, and marks the blamed commits `contains_bug` with the fixes
//! they caused.
//!
//! Works against a local working copy through libgit2; no DB, no network.

pub mod analyzer;
pub mod blame;
pub mod classifier;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod issues;
pub mod regions;
pub mod types;
pub mod vcs;
pub mod window;

pub use analyzer::analyze_repository;
pub use classifier::{classify_history, Classifier};
pub use config::LinkerConfig;
pub use engine::LinkageEngine;
pub use error::{ConfigError, LinkError, VcsError};
pub use issues::{IssueTracker, StaticIssueTracker};
pub use types::{Classification, Commit, CommitMetrics, LinkReport, Metric, Repository, RepositoryStatus};
pub use vcs::{GitBackend, Vcs};
