//! Binary entrypoint: read commit JSON lines from stdin, write them back linked.
//!
//! Each input line is a Commit record of one repository. Output is every
//! record (updated in place) followed, on failure, by one ErrorOutput line.
//! Records are always written so partial progress is never lost.

use clap::Parser;
use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use szz_linker::types::ErrorOutput;
use szz_linker::{
  analyze_repository, classify_history, Classifier, Commit, GitBackend, LinkError, LinkageEngine,
  LinkerConfig, Repository, StaticIssueTracker,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "szz-linker", about = "Link bug-fixing commits to the commits that introduced the bug")]
struct Args {
  /// Local working copy of the repository.
  #[arg(long)]
  repo: PathBuf,

  /// TOML file with extensions, look-back window and category words.
  #[arg(long)]
  config: Option<PathBuf>,

  /// JSON array of issues ({"number", "created_at"}) used for cutoff dates.
  #[arg(long)]
  issues: Option<PathBuf>,

  /// Classify records before linking (sets `fix` and `classification`).
  #[arg(long)]
  classify: bool,

  /// Repository id used in logs; defaults to the working copy's directory name.
  #[arg(long)]
  repository_id: Option<String>,
}

fn main() {
  init_tracing();
  let args = Args::parse();

  let stdout = io::stdout();
  let mut out = io::BufWriter::new(stdout.lock());

  let mut commits = match read_commits(&mut out) {
    Ok(c) => c,
    Err(e) => {
      let _ = writeln!(io::stderr(), "szz-linker: read error: {}", e);
      std::process::exit(1);
    }
  };

  let outcome = link(&args, &mut commits);

  for commit in &commits {
    let _ = serde_json::to_writer(&mut out, commit);
    let _ = writeln!(out);
  }

  if let Err(e) = outcome {
    let err = match e.downcast_ref::<LinkError>().and_then(LinkError::commit) {
      Some(commit) => ErrorOutput::new(e.to_string()).with_commit(commit),
      None => ErrorOutput::new(e.to_string()),
    };
    let _ = serde_json::to_writer(&mut out, &err);
    let _ = writeln!(out);
    let _ = out.flush();
    std::process::exit(1);
  }

  let _ = out.flush();
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

/// Parse stdin; malformed lines are reported as ErrorOutput and skipped.
fn read_commits(out: &mut impl Write) -> io::Result<Vec<Commit>> {
  let mut commits = Vec::new();
  for line in io::stdin().lock().lines() {
    let line = line?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
      continue;
    }
    match serde_json::from_str::<Commit>(trimmed) {
      Ok(c) => commits.push(c),
      Err(e) => {
        let err = ErrorOutput::new(format!("json parse: {}", e));
        let _ = serde_json::to_writer(&mut *out, &err);
        let _ = writeln!(out);
      }
    }
  }
  Ok(commits)
}

fn link(args: &Args, commits: &mut [Commit]) -> Result<(), Box<dyn Error>> {
  let config = match &args.config {
    Some(path) => LinkerConfig::from_path(path)?,
    None => LinkerConfig::default(),
  };

  if args.classify {
    classify_history(&Classifier::from_config(&config), commits);
  }

  let backend = GitBackend::open(&args.repo).map_err(LinkError::from)?;
  info!(working_copy = %backend.path().display(), "opened working copy");
  let mut engine = LinkageEngine::new(backend, config);
  if let Some(path) = &args.issues {
    let tracker = StaticIssueTracker::from_path(path).map_err(LinkError::from)?;
    info!(issues = tracker.len(), "loaded issue tracker");
    engine = engine.with_issue_tracker(tracker);
  }

  let id = args.repository_id.clone().unwrap_or_else(|| {
    args
      .repo
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default()
  });
  let mut repo = Repository::new(id);
  let report = analyze_repository(&mut repo, commits, &engine)?;
  info!(
    processed = report.processed,
    unattributed = report.unattributed,
    inducing = report.inducing,
    "done"
  );
  Ok(())
}
