//! Unified diff parsing (git flavour, any context width).
//!
//! Produces, per file, the old-file line numbers that were deleted or modified.
//! Added-only lines never appear: they did not exist before the change.

/// One `@@ -a,b +c,d @@` hunk and the old-file lines it removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
  pub old_start: u32,
  pub old_lines: u32,
  pub new_start: u32,
  pub new_lines: u32,
  /// Old-file line numbers marked `-` in the hunk body.
  pub removed: Vec<u32>,
}

/// One file section of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
  /// Path before the change; `None` when the file was created.
  pub old_path: Option<String>,
  /// Path after the change; `None` when the file was deleted.
  pub new_path: Option<String>,
  pub binary: bool,
  /// A hunk header could not be parsed; the file's regions are unreliable.
  pub malformed: bool,
  pub hunks: Vec<Hunk>,
}

impl FileDiff {
  pub fn is_added(&self) -> bool {
    self.old_path.is_none()
  }

  pub fn is_deleted(&self) -> bool {
    self.new_path.is_none()
  }

  pub fn is_rename(&self) -> bool {
    matches!((&self.old_path, &self.new_path), (Some(a), Some(b)) if a != b)
  }

  /// All removed old-file lines, ascending, without line 0.
  pub fn removed_lines(&self) -> Vec<u32> {
    let mut lines: Vec<u32> = self
      .hunks
      .iter()
      .flat_map(|h| h.removed.iter().copied())
      .filter(|&l| l != 0)
      .collect();
    lines.sort_unstable();
    lines.dedup();
    lines
  }
}

/// Remaining body lines of the hunk being walked.
struct HunkCursor {
  old_line: u32,
  old_remaining: u32,
  new_remaining: u32,
}

impl HunkCursor {
  fn is_done(&self) -> bool {
    self.old_remaining == 0 && self.new_remaining == 0
  }
}

/// Parse unified diff text into per-file sections.
pub fn parse_unified_diff(text: &str) -> Vec<FileDiff> {
  let mut files: Vec<FileDiff> = Vec::new();
  let mut cursor: Option<HunkCursor> = None;

  for line in text.lines() {
    // Inside a hunk body the header counts decide what a line is, so removed
    // lines that look like "--- a/x" are not mistaken for file headers.
    if let Some(cur) = cursor.as_mut() {
      if !cur.is_done() && is_body_line(line) {
        if let Some(file) = files.last_mut() {
          walk_body_line(file, cur, line);
        }
        continue;
      }
      cursor = None;
    }

    if let Some(rest) = line.strip_prefix("diff --git ") {
      let (old, new) = split_git_header_paths(rest);
      files.push(FileDiff {
        old_path: old,
        new_path: new,
        ..FileDiff::default()
      });
      continue;
    }

    if files.is_empty() {
      // Plain unified diff without "diff --git" lines.
      if line.starts_with("--- ") {
        files.push(FileDiff::default());
      } else {
        continue;
      }
    }
    let Some(file) = files.last_mut() else {
      continue;
    };

    if let Some(rest) = line.strip_prefix("--- ") {
      if !file.hunks.is_empty() || file.malformed {
        // A new plain-diff file section.
        files.push(FileDiff::default());
      }
      if let Some(file) = files.last_mut() {
        file.old_path = parse_header_path(rest, "a/");
      }
    } else if let Some(rest) = line.strip_prefix("+++ ") {
      file.new_path = parse_header_path(rest, "b/");
    } else if let Some(rest) = line.strip_prefix("rename from ") {
      file.old_path = Some(unquote(rest).to_string());
    } else if let Some(rest) = line.strip_prefix("rename to ") {
      file.new_path = Some(unquote(rest).to_string());
    } else if line.starts_with("new file mode") {
      file.old_path = None;
    } else if line.starts_with("deleted file mode") {
      file.new_path = None;
    } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
      file.binary = true;
    } else if line.starts_with("@@") {
      match parse_hunk_header(line) {
        Some(hunk) => {
          cursor = Some(HunkCursor {
            old_line: hunk.old_start,
            old_remaining: hunk.old_lines,
            new_remaining: hunk.new_lines,
          });
          file.hunks.push(hunk);
        }
        None => file.malformed = true,
      }
    }
  }

  files
}

fn is_body_line(line: &str) -> bool {
  matches!(line.as_bytes().first(), None | Some(b' ' | b'-' | b'+' | b'\\'))
}

fn walk_body_line(file: &mut FileDiff, cur: &mut HunkCursor, line: &str) {
  let Some(hunk) = file.hunks.last_mut() else {
    return;
  };
  match line.as_bytes().first() {
    Some(b'-') => {
      if cur.old_line != 0 {
        hunk.removed.push(cur.old_line);
      }
      cur.old_line = cur.old_line.saturating_add(1);
      cur.old_remaining = cur.old_remaining.saturating_sub(1);
    }
    Some(b'+') => {
      cur.new_remaining = cur.new_remaining.saturating_sub(1);
    }
    Some(b'\\') => {}
    // Context line (or an empty context line with its leading space trimmed).
    _ => {
      cur.old_line = cur.old_line.saturating_add(1);
      cur.old_remaining = cur.old_remaining.saturating_sub(1);
      cur.new_remaining = cur.new_remaining.saturating_sub(1);
    }
  }
}

/// Parse `@@ -a[,b] +c[,d] @@ ...`. A missing count means 1.
pub fn parse_hunk_header(line: &str) -> Option<Hunk> {
  let body = line.strip_prefix("@@")?;
  let end = body.find("@@")?;
  let mut parts = body[..end].split_whitespace();
  let (old_start, old_lines) = parse_range(parts.next()?.strip_prefix('-')?)?;
  let (new_start, new_lines) = parse_range(parts.next()?.strip_prefix('+')?)?;
  Some(Hunk {
    old_start,
    old_lines,
    new_start,
    new_lines,
    removed: Vec::new(),
  })
}

fn parse_range(s: &str) -> Option<(u32, u32)> {
  match s.split_once(',') {
    Some((start, count)) => Some((start.parse().ok()?, count.parse().ok()?)),
    None => Some((s.parse().ok()?, 1)),
  }
}

fn parse_header_path(rest: &str, prefix: &str) -> Option<String> {
  let raw = rest.split('\t').next().unwrap_or(rest).trim_end();
  let path = unquote(raw);
  if path == "/dev/null" {
    return None;
  }
  Some(path.strip_prefix(prefix).unwrap_or(path).to_string())
}

/// Best-effort split of `a/<old> b/<new>` from a `diff --git` line.
fn split_git_header_paths(rest: &str) -> (Option<String>, Option<String>) {
  let rest = rest.trim();
  match rest.find(" b/").or_else(|| rest.find(" \"b/")) {
    Some(idx) => {
      let old = unquote(&rest[..idx]);
      let new = unquote(&rest[idx + 1..]);
      (
        Some(old.strip_prefix("a/").unwrap_or(old).to_string()),
        Some(new.strip_prefix("b/").unwrap_or(new).to_string()),
      )
    }
    None => (None, None),
  }
}

fn unquote(s: &str) -> &str {
  s.trim().trim_matches('"')
}
