//! Version-control capability used by the linker, and its libgit2 backend.
//!
//! Every operation runs against an explicit working copy; nothing depends on
//! the process working directory. A process-wide lease keeps at most one
//! backend (and so one linkage run) per working copy.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use git2::{BlameOptions, DiffFindOptions, DiffFormat, DiffOptions, Repository};
use once_cell::sync::Lazy;

use crate::error::VcsError;
use crate::types::BlameOrigin;

/// Diff and blame operations over one repository history.
pub trait Vcs {
  /// First parent of `commit`; `None` for a root commit.
  fn first_parent(&self, commit: &str) -> Result<Option<String>, VcsError>;

  /// Paths touched between `parent` and `commit` (new path for renames).
  fn names_changed(&self, commit: &str, parent: &str) -> Result<Vec<String>, VcsError>;

  /// Unified diff text from `parent` to `commit`.
  fn diff(&self, commit: &str, parent: &str, context_lines: u32) -> Result<String, VcsError>;

  /// The commit that last touched `line` of `path` as of `at`.
  fn blame(&self, path: &str, line: u32, at: &str) -> Result<Option<BlameOrigin>, VcsError>;
}

static ACTIVE_WORKING_COPIES: Lazy<Mutex<HashSet<PathBuf>>> = Lazy::new(Default::default);

/// Exclusive claim on a working copy for the lifetime of the value.
#[derive(Debug)]
pub struct WorkingCopyLease {
  path: PathBuf,
}

impl WorkingCopyLease {
  pub fn acquire(path: &Path) -> Result<Self, VcsError> {
    let mut active = ACTIVE_WORKING_COPIES
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if !active.insert(path.to_path_buf()) {
      return Err(VcsError::Busy {
        path: path.to_path_buf(),
      });
    }
    Ok(Self {
      path: path.to_path_buf(),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Drop for WorkingCopyLease {
  fn drop(&mut self) {
    let mut active = ACTIVE_WORKING_COPIES
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    active.remove(&self.path);
  }
}

/// libgit2-backed [`Vcs`] over a local clone.
pub struct GitBackend {
  repo: Repository,
  lease: WorkingCopyLease,
}

impl GitBackend {
  /// Open the working copy at `path` and take its lease.
  pub fn open(path: &Path) -> Result<Self, VcsError> {
    let canonical = path
      .canonicalize()
      .map_err(|e| VcsError::unavailable(path, e.to_string()))?;
    let lease = WorkingCopyLease::acquire(&canonical)?;
    let repo = Repository::open(&canonical)
      .map_err(|e| VcsError::unavailable(&canonical, e.message()))?;
    Ok(Self { repo, lease })
  }

  pub fn path(&self) -> &Path {
    self.lease.path()
  }

  fn resolve(&self, rev: &str) -> Result<git2::Commit<'_>, VcsError> {
    let object = self.repo.revparse_single(rev).map_err(|e| match e.code() {
      git2::ErrorCode::NotFound | git2::ErrorCode::Ambiguous | git2::ErrorCode::InvalidSpec => {
        VcsError::UnknownRevision(rev.to_string())
      }
      _ => VcsError::Git(e),
    })?;
    object
      .peel_to_commit()
      .map_err(|_| VcsError::UnknownRevision(rev.to_string()))
  }

  fn tree_diff(
    &self,
    commit: &str,
    parent: &str,
    context_lines: u32,
  ) -> Result<git2::Diff<'_>, VcsError> {
    let new_tree = self.resolve(commit)?.tree()?;
    let old_tree = self.resolve(parent)?.tree()?;

    let mut opts = DiffOptions::new();
    opts.context_lines(context_lines);
    opts.ignore_filemode(true);
    let mut diff = self
      .repo
      .diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;

    let mut find = DiffFindOptions::new();
    find.renames(true);
    diff.find_similar(Some(&mut find))?;
    Ok(diff)
  }
}

impl Vcs for GitBackend {
  fn first_parent(&self, commit: &str) -> Result<Option<String>, VcsError> {
    let commit = self.resolve(commit)?;
    Ok(commit.parent_ids().next().map(|oid| oid.to_string()))
  }

  fn names_changed(&self, commit: &str, parent: &str) -> Result<Vec<String>, VcsError> {
    let diff = self.tree_diff(commit, parent, 0)?;
    let names = diff
      .deltas()
      .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
      .map(|p| p.to_string_lossy().replace('\\', "/"))
      .collect();
    Ok(names)
  }

  fn diff(&self, commit: &str, parent: &str, context_lines: u32) -> Result<String, VcsError> {
    let diff = self.tree_diff(commit, parent, context_lines)?;
    let mut text = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
      let body = match line.origin() {
        origin @ ('+' | '-' | ' ') => {
          text.push(origin);
          true
        }
        // End-of-file newline markers carry no line of their own.
        '=' | '>' | '<' => return true,
        _ => false,
      };
      let content = String::from_utf8_lossy(line.content());
      text.push_str(&content);
      // The last line of a file without a trailing newline arrives unterminated.
      if body && !content.ends_with('\n') {
        text.push('\n');
      }
      true
    })?;
    Ok(text)
  }

  fn blame(&self, path: &str, line: u32, at: &str) -> Result<Option<BlameOrigin>, VcsError> {
    if line == 0 {
      return Ok(None);
    }
    let at = self.resolve(at)?.id();

    let mut opts = BlameOptions::new();
    opts
      .newest_commit(at)
      .min_line(line as usize)
      .max_line(line as usize)
      .track_copies_same_file(true)
      .track_copies_same_commit_moves(true);
    let blame = self.repo.blame_file(Path::new(path), Some(&mut opts))?;

    let Some(id) = blame.get_line(line as usize).map(|hunk| hunk.final_commit_id()) else {
      return Ok(None);
    };
    let origin = self.repo.find_commit(id)?;
    let timestamp = origin.author().when().seconds();
    Ok(Some(BlameOrigin {
      commit_hash: id.to_string(),
      timestamp,
    }))
  }
}


#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lease_is_exclusive_until_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let lease = WorkingCopyLease::acquire(dir.path()).unwrap();
    assert_eq!(lease.path(), dir.path());
    let err = WorkingCopyLease::acquire(dir.path()).unwrap_err();
    assert!(matches!(err, VcsError::Busy { .. }));
    drop(lease);
    assert!(WorkingCopyLease::acquire(dir.path()).is_ok());
  }

  #[test]
  fn missing_working_copy_is_systemic() {
    let err = match GitBackend::open(Path::new("/definitely/not/a/clone")) {
      Ok(_) => panic!("open should fail"),
      Err(e) => e,
    };
    assert!(err.is_systemic());
  }

  #[test]
  fn non_repository_directory_is_systemic() {
    let dir = tempfile::tempdir().unwrap();
    let err = match GitBackend::open(dir.path()) {
      Ok(_) => panic!("open should fail"),
      Err(e) => e,
    };
    assert!(matches!(err, VcsError::Unavailable { .. }));
  }
}
