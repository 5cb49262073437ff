//! Binary entrypoint: read a JSON array of commits from stdin, write one summary to stdout.

use chrono::Utc;
use clap::Parser;
use risk_metrics::{run, AggregatorConfig};
use std::io::{self, Read, Write};
use szz_linker::Commit;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "risk-metrics", about = "Bucket linked commits into buggy / non-buggy modeling samples")]
struct Args {
  /// Leave out commits younger than this many days (0 keeps everything).
  #[arg(long, default_value_t = 30)]
  cutoff_days: u32,

  /// Reference time as unix seconds; defaults to now.
  #[arg(long)]
  reference_time: Option<i64>,
}

fn main() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();

  let args = Args::parse();
  if let Err(e) = run_binary(&args) {
    let _ = writeln!(io::stderr(), "risk-metrics error: {}", e);
    std::process::exit(1);
  }
}

fn run_binary(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
  let mut raw = String::new();
  io::stdin().lock().read_to_string(&mut raw)?;
  let history: Vec<Commit> = serde_json::from_str(&raw)?;

  let config = AggregatorConfig {
    recent_cutoff_days: (args.cutoff_days > 0).then_some(args.cutoff_days),
  };
  let reference_time = args.reference_time.unwrap_or_else(|| Utc::now().timestamp());

  let out = run(&history, &config, reference_time);
  let json = serde_json::to_vec(&out)?;
  io::stdout().write_all(&json)?;
  Ok(())
}
